//! Domain aggregates the forecast engine and services operate on.

pub mod fiscal_year;
pub mod forecast;
pub mod opportunity;
pub mod opportunity_split;
pub mod shortcut_key;
pub mod types;
pub mod user;
