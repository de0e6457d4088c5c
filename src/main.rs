use std::sync::Arc;
use std::time::Duration as StdDuration;

use actix_web::{get, middleware, App, HttpResponse, HttpServer, Responder};
use dotenv::dotenv;
use log::{error, info};
use serde_json::json;

use buffalogs_rs::config::Settings;
use buffalogs_rs::db::{self, DatabaseConnection, NullLogStore};
use buffalogs_rs::scheduler::Scheduler;
use buffalogs_rs::{retention, risk_aggregator};

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Drives the ingestion scheduler (§4.9) on a fixed tick, independent of request traffic.
fn spawn_scheduler(db: Arc<DatabaseConnection>, settings: Settings) {
    tokio::spawn(async move {
        let scheduler = Scheduler::new(db, Arc::new(NullLogStore));
        let mut interval = tokio::time::interval(StdDuration::from_secs(60));
        loop {
            interval.tick().await;
            if let Err(err) = scheduler.tick(&settings.detection).await {
                error!("scheduler tick failed: {err}");
            }
        }
    });
}

fn spawn_risk_aggregator(db: Arc<DatabaseConnection>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(StdDuration::from_secs(300));
        loop {
            interval.tick().await;
            if let Err(err) = risk_aggregator::update_risk_scores(&db).await {
                error!("risk aggregation failed: {err}");
            }
        }
    });
}

fn spawn_retention(db: Arc<DatabaseConnection>, retention_days: i64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(StdDuration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            if let Err(err) = retention::run(&db, retention_days).await {
                error!("retention cleanup failed: {err}");
            }
        }
    });
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::from_env();
    info!(
        "starting detector server at {}:{}",
        settings.server.host, settings.server.port
    );

    let db = db::init_db(&settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    spawn_scheduler(db.clone(), settings.clone());
    spawn_risk_aggregator(db.clone());
    spawn_retention(db.clone(), settings.detection.retention_days);

    let host = settings.server.host.clone();
    let port = settings.server.port;

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .service(health_check)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
