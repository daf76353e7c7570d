//! Diesel models for forecast configuration and forecast buckets.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::forecast::{
    CategoryFlags, Forecast as DomainForecast, ForecastCondition as DomainForecastCondition,
    ForecastTarget as DomainForecastTarget, ForecastType as DomainForecastType, ForecastValues,
    LogicalOperator, NewForecast as DomainNewForecast,
    NewForecastCondition as DomainNewForecastCondition,
    NewForecastTarget as DomainNewForecastTarget, NewForecastType as DomainNewForecastType,
};
use crate::domain::types::{
    CompanyId, FiscalYearId, ForecastConditionId, ForecastId, ForecastTargetId, ForecastTypeId,
    ForecastTypeName, PeriodId, QuarterId, TypeConstraintError, UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::forecast_types)]
pub struct ForecastType {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub measure: String,
    pub include_pipeline: bool,
    pub include_best_case: bool,
    pub include_commit: bool,
    pub include_closed: bool,
    pub is_active: bool,
    pub description: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::forecast_types)]
pub struct NewForecastType<'a> {
    pub company_id: i32,
    pub name: &'a str,
    pub measure: &'a str,
    pub include_pipeline: bool,
    pub include_best_case: bool,
    pub include_commit: bool,
    pub include_closed: bool,
    pub is_active: bool,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::forecast_conditions)]
pub struct ForecastCondition {
    pub id: i32,
    pub forecast_type_id: i32,
    pub field: String,
    pub operator: String,
    pub value: String,
    pub logical_operator: String,
    pub condition_order: i32,
    pub is_active: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::forecast_conditions)]
pub struct NewForecastCondition<'a> {
    pub forecast_type_id: i32,
    pub field: &'a str,
    pub operator: &'a str,
    pub value: &'a str,
    pub logical_operator: &'a str,
    pub condition_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::forecast_targets)]
pub struct ForecastTarget {
    pub id: i32,
    pub company_id: i32,
    pub assigned_to: i32,
    pub period_id: i32,
    pub forecast_type_id: i32,
    pub target: f64,
    pub is_active: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::forecast_targets)]
pub struct NewForecastTarget {
    pub company_id: i32,
    pub assigned_to: i32,
    pub period_id: i32,
    pub forecast_type_id: i32,
    pub target: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::forecasts)]
pub struct Forecast {
    pub id: i32,
    pub company_id: i32,
    pub owner_id: i32,
    pub forecast_type_id: i32,
    pub fiscal_year_id: i32,
    pub quarter_id: i32,
    pub period_id: i32,
    pub name: String,
    pub target: f64,
    pub pipeline: f64,
    pub best_case: f64,
    pub commit_value: f64,
    pub closed: f64,
    pub actual: f64,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::forecasts)]
pub struct NewForecast<'a> {
    pub company_id: i32,
    pub owner_id: i32,
    pub forecast_type_id: i32,
    pub fiscal_year_id: i32,
    pub quarter_id: i32,
    pub period_id: i32,
    pub name: &'a str,
    pub target: f64,
    pub pipeline: f64,
    pub best_case: f64,
    pub commit_value: f64,
    pub closed: f64,
    pub actual: f64,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::forecasts)]
/// Recomputed value columns of a forecast bucket.
pub struct ForecastValuesChangeset {
    pub target: f64,
    pub pipeline: f64,
    pub best_case: f64,
    pub commit_value: f64,
    pub closed: f64,
    pub actual: f64,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<ForecastType> for DomainForecastType {
    type Error = TypeConstraintError;

    fn try_from(row: ForecastType) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ForecastTypeId::new(row.id)?,
            company_id: CompanyId::new(row.company_id)?,
            name: ForecastTypeName::new(row.name)?,
            measure: row.measure.parse()?,
            include: CategoryFlags {
                pipeline: row.include_pipeline,
                best_case: row.include_best_case,
                commit: row.include_commit,
                closed: row.include_closed,
            },
            is_active: row.is_active,
            description: row.description,
        })
    }
}

impl<'a> From<&'a DomainNewForecastType> for NewForecastType<'a> {
    fn from(forecast_type: &'a DomainNewForecastType) -> Self {
        Self {
            company_id: forecast_type.company_id.get(),
            name: forecast_type.name.as_str(),
            measure: forecast_type.measure.code(),
            include_pipeline: forecast_type.include.pipeline,
            include_best_case: forecast_type.include.best_case,
            include_commit: forecast_type.include.commit,
            include_closed: forecast_type.include.closed,
            is_active: forecast_type.is_active,
            description: forecast_type.description.as_deref(),
        }
    }
}

impl TryFrom<ForecastCondition> for DomainForecastCondition {
    type Error = TypeConstraintError;

    fn try_from(row: ForecastCondition) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ForecastConditionId::new(row.id)?,
            forecast_type_id: ForecastTypeId::new(row.forecast_type_id)?,
            logical_operator: LogicalOperator::parse_lenient(&row.logical_operator),
            field: row.field,
            operator: row.operator,
            value: row.value,
            order: row.condition_order,
            is_active: row.is_active,
        })
    }
}

impl<'a> NewForecastCondition<'a> {
    pub fn new(forecast_type_id: ForecastTypeId, condition: &'a DomainNewForecastCondition) -> Self {
        Self {
            forecast_type_id: forecast_type_id.get(),
            field: &condition.field,
            operator: &condition.operator,
            value: &condition.value,
            logical_operator: condition.logical_operator.code(),
            condition_order: condition.order,
            is_active: condition.is_active,
        }
    }
}

impl TryFrom<ForecastTarget> for DomainForecastTarget {
    type Error = TypeConstraintError;

    fn try_from(row: ForecastTarget) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ForecastTargetId::new(row.id)?,
            company_id: CompanyId::new(row.company_id)?,
            assigned_to: UserId::new(row.assigned_to)?,
            period_id: PeriodId::new(row.period_id)?,
            forecast_type_id: ForecastTypeId::new(row.forecast_type_id)?,
            target: row.target,
            is_active: row.is_active,
        })
    }
}

impl From<&DomainNewForecastTarget> for NewForecastTarget {
    fn from(target: &DomainNewForecastTarget) -> Self {
        Self {
            company_id: target.company_id.get(),
            assigned_to: target.assigned_to.get(),
            period_id: target.period_id.get(),
            forecast_type_id: target.forecast_type_id.get(),
            target: target.target,
            is_active: true,
        }
    }
}

impl TryFrom<Forecast> for DomainForecast {
    type Error = TypeConstraintError;

    fn try_from(row: Forecast) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ForecastId::new(row.id)?,
            company_id: CompanyId::new(row.company_id)?,
            owner_id: UserId::new(row.owner_id)?,
            forecast_type_id: ForecastTypeId::new(row.forecast_type_id)?,
            fiscal_year_id: FiscalYearId::new(row.fiscal_year_id)?,
            quarter_id: QuarterId::new(row.quarter_id)?,
            period_id: PeriodId::new(row.period_id)?,
            name: row.name,
            target: row.target,
            values: ForecastValues {
                pipeline: row.pipeline,
                best_case: row.best_case,
                commit: row.commit_value,
                closed: row.closed,
                actual: row.actual,
            },
            updated_at: row.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewForecast> for NewForecast<'a> {
    fn from(forecast: &'a DomainNewForecast) -> Self {
        Self {
            company_id: forecast.company_id.get(),
            owner_id: forecast.owner_id.get(),
            forecast_type_id: forecast.forecast_type_id.get(),
            fiscal_year_id: forecast.fiscal_year_id.get(),
            quarter_id: forecast.quarter_id.get(),
            period_id: forecast.period_id.get(),
            name: &forecast.name,
            target: forecast.target,
            pipeline: forecast.values.pipeline,
            best_case: forecast.values.best_case,
            commit_value: forecast.values.commit,
            closed: forecast.values.closed,
            actual: forecast.values.actual,
        }
    }
}

impl ForecastValuesChangeset {
    pub fn new(target: f64, values: &ForecastValues, updated_at: NaiveDateTime) -> Self {
        Self {
            target,
            pipeline: values.pipeline,
            best_case: values.best_case,
            commit_value: values.commit,
            closed: values.closed,
            actual: values.actual,
            updated_at,
        }
    }
}
