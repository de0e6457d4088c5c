use crate::schema::task_settings;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// The scheduler's persistent window pointer for one named task (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = task_settings)]
pub struct TaskSettings {
    pub id: i32,
    pub task_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

pub const PROCESS_LOGS_TASK: &str = "process_logs";

#[derive(Debug, Insertable)]
#[diesel(table_name = task_settings)]
pub struct NewTaskSettings {
    pub task_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl NewTaskSettings {
    pub fn new(task_name: &str, start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        NewTaskSettings {
            task_name: task_name.to_string(),
            start_date,
            end_date,
        }
    }
}
