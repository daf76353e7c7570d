//! Forecast engine: condition filtering, bucket aggregation and
//! synchronization with opportunity writes.

pub mod calculator;
pub mod condition;
pub mod sync;

pub use calculator::{BulkOutcome, DEFAULT_BATCH_SIZE, ForecastCalculator, calculate_values};
pub use condition::{CompiledConditions, ConditionError};
pub use sync::{OpportunityChange, affected_buckets, recompute_for_change};
