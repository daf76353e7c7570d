//! Fiscal calendar generation and yearly rollover.

pub mod calendar;
pub mod rollover;

pub use calendar::{
    PlannedYear, current_index, fiscal_year_end, generate_fiscal_year, plan_fiscal_years,
};
pub use rollover::{RolloverPlan, plan_rollover};
