//! Decides how the current fiscal year moves forward over time.

use chrono::NaiveDate;

use crate::domain::fiscal_year::FiscalYear;
use crate::domain::types::FiscalYearId;

/// Steps needed to keep a configuration's years up to date.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RolloverPlan {
    /// Year that takes over the current flag.
    pub promote: Option<FiscalYearId>,
    /// Start of a year that must be created after the (new) current one.
    pub create_from: Option<NaiveDate>,
}

impl RolloverPlan {
    pub fn is_noop(&self) -> bool {
        self.promote.is_none() && self.create_from.is_none()
    }
}

/// Plans one rollover step for `current` given every year of its
/// configuration.
///
/// Once `today` is past the current year's end, the earliest later year is
/// promoted. A following year is planned whenever the (possibly promoted)
/// current year has none.
pub fn plan_rollover(today: NaiveDate, current: &FiscalYear, years: &[FiscalYear]) -> RolloverPlan {
    let next_after = |end: NaiveDate| {
        years
            .iter()
            .filter(|y| y.start_date > end)
            .min_by_key(|y| y.start_date)
    };

    let mut plan = RolloverPlan::default();
    let mut effective_end = current.end_date;

    if today > current.end_date {
        if let Some(next) = next_after(current.end_date) {
            plan.promote = Some(next.id);
            effective_end = next.end_date;
        }
    }

    if next_after(effective_end).is_none() {
        plan.create_from = effective_end.succ_opt();
    }

    plan
}
