//! Database models shared across the CRM repository.

pub mod config;
pub mod fiscal_year;
pub mod forecast;
pub mod opportunity;
pub mod opportunity_split;
pub mod shortcut_key;
pub mod user;
pub mod zmq;
