//! Forecast configuration (types, conditions, targets) and forecast buckets.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    CompanyId, FiscalYearId, ForecastCategory, ForecastConditionId, ForecastId, ForecastMeasure,
    ForecastTargetId, ForecastTypeId, ForecastTypeName, PeriodId, QuarterId, UserId,
};

/// Which forecast categories contribute to a forecast type's columns.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryFlags {
    pub pipeline: bool,
    pub best_case: bool,
    pub commit: bool,
    pub closed: bool,
}

impl Default for CategoryFlags {
    fn default() -> Self {
        Self {
            pipeline: true,
            best_case: true,
            commit: true,
            closed: true,
        }
    }
}

impl CategoryFlags {
    pub fn includes(&self, category: ForecastCategory) -> bool {
        match category {
            ForecastCategory::Pipeline => self.pipeline,
            ForecastCategory::BestCase => self.best_case,
            ForecastCategory::Commit => self.commit,
            ForecastCategory::Closed => self.closed,
            ForecastCategory::Omitted => false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForecastType {
    pub id: ForecastTypeId,
    pub company_id: CompanyId,
    pub name: ForecastTypeName,
    pub measure: ForecastMeasure,
    pub include: CategoryFlags,
    pub is_active: bool,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewForecastType {
    pub company_id: CompanyId,
    pub name: ForecastTypeName,
    pub measure: ForecastMeasure,
    pub include: CategoryFlags,
    pub is_active: bool,
    pub description: Option<String>,
}

impl ForecastType {
    /// Monetary types are rescaled by currency conversion.
    pub fn is_monetary(&self) -> bool {
        self.measure != ForecastMeasure::Quantity
    }
}

/// How a condition joins the group it opens or continues.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    /// Blank input means AND; anything but `or` is AND as well.
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("or") {
            LogicalOperator::Or
        } else {
            LogicalOperator::And
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
        }
    }
}

/// Stored rule row narrowing the opportunities a forecast type counts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForecastCondition {
    pub id: ForecastConditionId,
    pub forecast_type_id: ForecastTypeId,
    pub field: String,
    pub operator: String,
    pub value: String,
    pub logical_operator: LogicalOperator,
    pub order: i32,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewForecastCondition {
    pub field: String,
    pub operator: String,
    pub value: String,
    pub logical_operator: LogicalOperator,
    pub order: i32,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForecastTarget {
    pub id: ForecastTargetId,
    pub company_id: CompanyId,
    pub assigned_to: UserId,
    pub period_id: PeriodId,
    pub forecast_type_id: ForecastTypeId,
    pub target: f64,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewForecastTarget {
    pub company_id: CompanyId,
    pub assigned_to: UserId,
    pub period_id: PeriodId,
    pub forecast_type_id: ForecastTypeId,
    pub target: f64,
}

/// Category totals of one forecast bucket.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ForecastValues {
    pub pipeline: f64,
    pub best_case: f64,
    pub commit: f64,
    pub closed: f64,
    /// Won opportunities regardless of category flags.
    pub actual: f64,
}

const VALUE_EPSILON: f64 = 1e-6;

impl ForecastValues {
    /// True when any column moved by more than rounding noise.
    pub fn differs_from(&self, other: &ForecastValues) -> bool {
        [
            (self.pipeline, other.pipeline),
            (self.best_case, other.best_case),
            (self.commit, other.commit),
            (self.closed, other.closed),
            (self.actual, other.actual),
        ]
        .iter()
        .any(|(a, b)| (a - b).abs() > VALUE_EPSILON)
    }

    #[must_use]
    pub fn scaled(self, rate: f64) -> Self {
        Self {
            pipeline: self.pipeline * rate,
            best_case: self.best_case * rate,
            commit: self.commit * rate,
            closed: self.closed * rate,
            actual: self.actual * rate,
        }
    }
}

/// Forecast bucket: one owner, one forecast type, one period.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub id: ForecastId,
    pub company_id: CompanyId,
    pub owner_id: UserId,
    pub forecast_type_id: ForecastTypeId,
    pub fiscal_year_id: FiscalYearId,
    pub quarter_id: QuarterId,
    pub period_id: PeriodId,
    pub name: String,
    pub target: f64,
    pub values: ForecastValues,
    pub updated_at: NaiveDateTime,
}

impl Forecast {
    /// Remaining distance to target from closed business; never negative.
    pub fn gap(&self) -> f64 {
        (self.target - self.values.closed).max(0.0)
    }

    /// Closed business as a percentage of target, `None` without a target.
    pub fn attainment(&self) -> Option<f64> {
        (self.target > 0.0).then(|| self.values.closed / self.target * 100.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewForecast {
    pub company_id: CompanyId,
    pub owner_id: UserId,
    pub forecast_type_id: ForecastTypeId,
    pub fiscal_year_id: FiscalYearId,
    pub quarter_id: QuarterId,
    pub period_id: PeriodId,
    pub name: String,
    pub target: f64,
    pub values: ForecastValues,
}

/// Name given to a freshly created bucket.
pub fn forecast_name(forecast_type: &ForecastType, period_name: &str) -> String {
    format!("{} - {}", forecast_type.name, period_name)
}
