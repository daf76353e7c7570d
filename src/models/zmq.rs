use serde::{Deserialize, Serialize};

use crate::domain::opportunity::Opportunity;

/// Jobs accepted by the background forecast worker.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ZmqForecastMessage {
    /// An opportunity was created (`before` empty), updated or deleted (`after` empty).
    OpportunityChanged {
        company_id: i32,
        #[serde(default)]
        before: Option<Opportunity>,
        #[serde(default)]
        after: Option<Opportunity>,
    },
    /// Recompute every active forecast type for one owner and period.
    Recalculate {
        company_id: i32,
        owner_id: i32,
        period_id: i32,
    },
}
