use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::policy::ScheduleWindow;

/// Per-employee working window. At most one active row per employee;
/// creating a new one deactivates the previous.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Schedule {
    pub id: u64,
    pub user_id: u64,
    pub entry_time: NaiveTime,
    pub exit_time: NaiveTime,
    pub grace_minutes: u32,
    pub is_active: bool,
}

impl Schedule {
    pub fn window(&self) -> ScheduleWindow {
        ScheduleWindow {
            entry: self.entry_time,
            exit: self.exit_time,
            grace_minutes: self.grace_minutes,
        }
    }
}
