use chrono::{Datelike, TimeZone, Utc};
use govdata::Millis;
use serde::Serialize;

/// Where the data context is in its lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LoadPhase {
    #[default]
    Uninitialized,
    #[serde(rename_all = "camelCase")]
    Loading { started_at: Millis },
    #[serde(rename_all = "camelCase")]
    Ready { loaded_at: Millis },
    #[serde(rename_all = "camelCase")]
    Failed { error: String, failed_at: Millis },
}

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Millis;

    fn current_year(&self) -> i32 {
        Utc.timestamp_millis_opt(self.now_millis())
            .single()
            .map(|dt| dt.year())
            .unwrap_or_else(|| Utc::now().year())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
pub use manual::ManualClock;
