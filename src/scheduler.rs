//! §4.9: the ingestion scheduler. Advances a persistent window pointer, fetching
//! events per user per sub-window and driving the field processor, with bounded
//! catch-up and data-loss semantics.
//!
//! Runs as a background Tokio task ticking on a fixed interval, the way the
//! teacher's rate limiter middleware keeps its own cache fresh — here the sweep
//! is proactive and periodic rather than piggybacked on a request.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use tokio::task::JoinSet;

use crate::config::DetectionConfig;
use crate::db::{DatabaseConnection, LogStore};
use crate::errors::DetectorError;
use crate::field_processor;
use crate::models::{Config, NewTaskSettings, TaskSettings, PROCESS_LOGS_TASK};

/// The pure decision made from the current pointer and the wall clock; kept free
/// of I/O so it can be unit tested directly against §8's Scenario E.
#[derive(Debug, PartialEq)]
pub enum SchedulerDecision {
    DataLoss {
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    },
    Process {
        subwindows: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    },
}

/// §4.9 steps 2–6. The data-loss lag check (step 3) is evaluated once, at entry,
/// not re-evaluated on every catch-up iteration — otherwise a backlog between the
/// data-loss threshold and `max_subwindows * slide` could never be walked down,
/// which would make the "bounded catch-up" rationale in §4.9 moot (see DESIGN.md).
pub fn plan(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    slide_minutes: i64,
    data_loss_minutes: i64,
    max_subwindows: u32,
) -> SchedulerDecision {
    let lag = now - end;
    if lag >= Duration::minutes(data_loss_minutes) {
        let new_end = now - Duration::minutes(1);
        let new_start = new_end - Duration::minutes(slide_minutes);
        return SchedulerDecision::DataLoss { new_start, new_end };
    }

    let slide = Duration::minutes(slide_minutes);
    let ceiling = now - Duration::minutes(1);

    let mut subwindows = Vec::new();
    let (mut s, mut e) = (start, end);
    for _ in 0..max_subwindows {
        let (s_next, e_next) = (s + slide, e + slide);
        if e_next > ceiling {
            break;
        }
        subwindows.push((s_next, e_next));
        s = s_next;
        e = e_next;
        if ceiling - e < slide {
            break;
        }
    }

    SchedulerDecision::Process { subwindows }
}

pub struct Scheduler {
    db: Arc<DatabaseConnection>,
    log_store: Arc<dyn LogStore>,
}

impl Scheduler {
    pub fn new(db: Arc<DatabaseConnection>, log_store: Arc<dyn LogStore>) -> Self {
        Scheduler { db, log_store }
    }

    /// One invocation: loads the pointer, computes the plan, and either resets
    /// (data loss) or walks forward through each sub-window, persisting the
    /// pointer only after that sub-window's alerts/logins are durably written.
    /// A sub-window whose processing fails or times out stops the walk right there —
    /// earlier sub-windows in this invocation keep their already-persisted pointer
    /// advances, but the failed one and everything after it are left for the next tick.
    pub async fn tick(&self, detection: &DetectionConfig) -> Result<(), DetectorError> {
        let now = Utc::now();
        let (start, end) = self.load_or_init_pointer(now, detection.slide_minutes).await?;

        match plan(now, start, end, detection.slide_minutes, detection.data_loss_minutes, detection.max_subwindows_per_invocation) {
            SchedulerDecision::DataLoss { new_start, new_end } => {
                warn!(
                    "scheduler data loss: pointer lag exceeded {}m threshold, resetting to ({new_start}, {new_end})",
                    detection.data_loss_minutes
                );
                self.persist_pointer(new_start, new_end).await?;
                Ok(())
            }
            SchedulerDecision::Process { subwindows } => {
                if subwindows.is_empty() {
                    return Ok(());
                }
                for (s, e) in subwindows {
                    // Fetched fresh per sub-window so a policy change committed mid-invocation
                    // takes effect starting with the very next sub-window, not the next tick.
                    let config = self.load_config_snapshot(detection).await?;
                    let deadline = StdDuration::from_secs((detection.sub_window_timeout_minutes.max(0) as u64) * 60);
                    match tokio::time::timeout(
                        deadline,
                        self.process_subwindow(&config, detection.velocity_max_kmh as f64, s, e),
                    )
                    .await
                    {
                        Ok(Ok(())) => {
                            self.persist_pointer(s, e).await?;
                        }
                        Ok(Err(err)) => {
                            error!("sub-window [{s}, {e}] processing failed, pointer not advanced: {err}");
                            return Err(err);
                        }
                        Err(_elapsed) => {
                            error!(
                                "sub-window [{s}, {e}] exceeded the {}m deadline, pointer not advanced",
                                detection.sub_window_timeout_minutes
                            );
                            return Err(DetectorError::TransientIo(format!(
                                "sub-window [{s}, {e}] processing deadline exceeded"
                            )));
                        }
                    }
                }
                Ok(())
            }
        }
    }

    async fn load_or_init_pointer(&self, now: DateTime<Utc>, slide_minutes: i64) -> Result<(DateTime<Utc>, DateTime<Utc>), DetectorError> {
        if let Some(settings) = self.db.get_task_settings(PROCESS_LOGS_TASK).await? {
            return Ok((settings.start_date, settings.end_date));
        }

        let end = now - Duration::minutes(1);
        let start = end - Duration::minutes(slide_minutes);
        self.persist_pointer(start, end).await?;
        Ok((start, end))
    }

    async fn persist_pointer(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<TaskSettings, DetectorError> {
        self.db
            .put_task_settings(NewTaskSettings::new(PROCESS_LOGS_TASK, start, end))
            .await
    }

    /// A snapshot Config value is fetched at each sub-window boundary (§5, §9) so
    /// a mid-window policy change can't flip behavior for events already in flight,
    /// and a policy change committed mid-invocation still applies starting with the
    /// next sub-window rather than waiting for the next tick.
    async fn load_config_snapshot(&self, detection: &DetectionConfig) -> Result<Config, DetectorError> {
        if let Some(config) = self.db.get_config().await? {
            return Ok(config);
        }
        self.db.put_config(crate::models::NewConfig::from_detection_config(detection)).await
    }

    /// Per-user failures are isolated from each other (§7: one user's failure doesn't
    /// stop others in the same sub-window), but if *any* user's task failed or panicked
    /// the sub-window as a whole did not durably persist, so this returns `Err` — the
    /// caller must not advance the pointer past a sub-window that failed partway.
    async fn process_subwindow(
        &self,
        config: &Config,
        velocity_max_kmh: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), DetectorError> {
        let users = self.db.all_users().await?;

        let mut joins = JoinSet::new();
        for user in users {
            let db = self.db.clone();
            let log_store = self.log_store.clone();
            let config = config.clone();
            joins.spawn(async move {
                let raw_events = log_store.fetch(&user.username, start, end).await?;
                let mut events: Vec<_> = raw_events.iter().filter_map(field_processor::normalize).collect();
                events.sort_by_key(|e| e.timestamp);
                field_processor::process_user_events(&db, &user, &config, velocity_max_kmh, &events).await
            });
        }

        let mut first_failure: Option<DetectorError> = None;
        while let Some(result) = joins.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!("per-user sub-window processing failed: {err}");
                    first_failure.get_or_insert(err);
                }
                Err(join_err) => {
                    error!("per-user task panicked: {join_err}");
                    first_failure.get_or_insert(DetectorError::Fatal(format!("per-user task panicked: {join_err}")));
                }
            }
        }

        if let Some(err) = first_failure {
            return Err(err);
        }

        info!("processed sub-window [{start}, {end}]");
        Ok(())
    }
}
