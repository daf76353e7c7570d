pub mod currency;
pub mod errors;
pub mod fiscal_year;
pub mod forecast;
pub mod opportunity;
pub mod opportunity_splits;
pub mod shortcut_keys;
pub mod users;

pub use errors::{ServiceError, ServiceResult};
