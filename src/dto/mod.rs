//! DTO modules returned by services to the command line and the worker.

pub mod fiscal_year;
pub mod forecast;
