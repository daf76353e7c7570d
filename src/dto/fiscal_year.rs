//! Result shapes of fiscal calendar services.

use serde::Serialize;

use crate::domain::types::{CompanyId, FiscalYearId};

/// What the rollover did for one company.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RolloverOutcome {
    pub company_id: CompanyId,
    pub promoted: Option<FiscalYearId>,
    pub created: Option<FiscalYearId>,
}

/// Totals of a rollover run over every configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RolloverReport {
    pub outcomes: Vec<RolloverOutcome>,
    /// Configurations without a current year.
    pub skipped: usize,
    pub failed: usize,
}
