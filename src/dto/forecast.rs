//! Result shapes of forecast services.

use serde::Serialize;

use crate::domain::forecast::{Forecast, ForecastValues};
use crate::domain::types::{ForecastId, UserId};

/// Old and new values of one recalculated bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastChange {
    pub forecast_id: ForecastId,
    pub owner_id: UserId,
    pub name: String,
    pub before: ForecastValues,
    pub after: ForecastValues,
}

impl ForecastChange {
    /// Columns that moved, as (column, old, new).
    pub fn changed_columns(&self) -> Vec<(&'static str, f64, f64)> {
        let (b, a) = (&self.before, &self.after);
        [
            ("pipeline", b.pipeline, a.pipeline),
            ("best_case", b.best_case, a.best_case),
            ("commit", b.commit, a.commit),
            ("closed", b.closed, a.closed),
            ("actual", b.actual, a.actual),
        ]
        .into_iter()
        .filter(|(_, old, new)| (old - new).abs() > 1e-6)
        .collect()
    }
}

/// Outcome of a recalculation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecalculationReport {
    pub dry_run: bool,
    /// Buckets recomputed without error.
    pub processed: usize,
    /// Buckets written (or that would be written on a dry run).
    pub changed: usize,
    pub errors: usize,
    pub changes: Vec<ForecastChange>,
}

/// Flat CSV row of a stored bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastExportRow {
    pub id: i32,
    pub owner_id: i32,
    pub forecast_type_id: i32,
    pub fiscal_year_id: i32,
    pub period_id: i32,
    pub name: String,
    pub target: f64,
    pub pipeline: f64,
    pub best_case: f64,
    pub commit: f64,
    pub closed: f64,
    pub actual: f64,
    pub gap: f64,
    pub attainment: Option<f64>,
}

impl From<&Forecast> for ForecastExportRow {
    fn from(forecast: &Forecast) -> Self {
        Self {
            id: forecast.id.get(),
            owner_id: forecast.owner_id.get(),
            forecast_type_id: forecast.forecast_type_id.get(),
            fiscal_year_id: forecast.fiscal_year_id.get(),
            period_id: forecast.period_id.get(),
            name: forecast.name.clone(),
            target: forecast.target,
            pipeline: forecast.values.pipeline,
            best_case: forecast.values.best_case,
            commit: forecast.values.commit,
            closed: forecast.values.closed,
            actual: forecast.values.actual,
            gap: forecast.gap(),
            attainment: forecast.attainment(),
        }
    }
}
