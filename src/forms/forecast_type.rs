//! Forecast type creation form with its flat condition rows.

use std::collections::BTreeMap;

use serde::Deserialize;
use validator::Validate;

use crate::domain::forecast::{
    CategoryFlags, LogicalOperator, NewForecastCondition, NewForecastType,
};
use crate::domain::types::{CompanyId, ForecastMeasure, ForecastTypeName};
use crate::forecast::condition::ConditionField;
use crate::forms::{FormError, non_blank, parse_choice};

fn default_true() -> bool {
    true
}

/// Form creating a forecast type.
///
/// Condition rows arrive as flat keys `field_N`, `operator_N`, `value_N` and
/// `logical_operator_N`; the first row may omit the `_N` suffix.
#[derive(Debug, Deserialize, Validate)]
pub struct ForecastTypeForm {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub measure: String,
    #[serde(default = "default_true")]
    pub include_pipeline: bool,
    #[serde(default = "default_true")]
    pub include_best_case: bool,
    #[serde(default = "default_true")]
    pub include_commit: bool,
    #[serde(default = "default_true")]
    pub include_closed: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub rows: BTreeMap<String, String>,
}

/// One condition row as submitted.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConditionRow {
    pub row: u32,
    pub field: String,
    pub operator: String,
    pub value: String,
    pub logical_operator: String,
}

/// Splits `operator_3` into (`operator`, 3); a bare key is row 0.
fn split_row_key(key: &str) -> (&str, u32) {
    match key.rsplit_once('_') {
        Some((base, suffix)) if !suffix.is_empty() => match suffix.parse::<u32>() {
            Ok(row) => (base, row),
            Err(_) => (key, 0),
        },
        _ => (key, 0),
    }
}

/// Collects condition rows from a flat key map, ordered by row number.
///
/// Rows without a field or an operator are dropped.
pub fn extract_condition_rows(map: &BTreeMap<String, String>) -> Vec<ConditionRow> {
    let mut rows: BTreeMap<u32, ConditionRow> = BTreeMap::new();

    for (key, value) in map {
        let (base, row) = split_row_key(key);
        let slot = match base {
            "field" | "operator" | "value" | "logical_operator" => {
                rows.entry(row).or_insert_with(|| ConditionRow {
                    row,
                    ..ConditionRow::default()
                })
            }
            _ => continue,
        };
        let value = value.trim().to_string();
        match base {
            "field" => slot.field = value,
            "operator" => slot.operator = value,
            "value" => slot.value = value,
            _ => slot.logical_operator = value,
        }
    }

    rows.into_values()
        .filter(|r| !r.field.is_empty() && !r.operator.is_empty())
        .collect()
}

pub struct ForecastTypePayload {
    pub name: ForecastTypeName,
    pub measure: ForecastMeasure,
    pub include: CategoryFlags,
    pub is_active: bool,
    pub description: Option<String>,
    pub conditions: Vec<NewForecastCondition>,
}

impl TryFrom<ForecastTypeForm> for ForecastTypePayload {
    type Error = FormError;

    fn try_from(form: ForecastTypeForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let name = ForecastTypeName::new(form.name).map_err(|_| FormError::InvalidName)?;
        let measure = parse_choice::<ForecastMeasure>("measure", &form.measure)?;

        let conditions = extract_condition_rows(&form.rows)
            .into_iter()
            .map(|row| {
                row.field
                    .parse::<ConditionField>()
                    .map_err(|e| FormError::InvalidCondition {
                        row: row.row,
                        message: e.to_string(),
                    })?;
                Ok(NewForecastCondition {
                    field: row.field,
                    operator: row.operator,
                    value: row.value,
                    logical_operator: LogicalOperator::parse_lenient(&row.logical_operator),
                    order: row.row as i32,
                    is_active: true,
                })
            })
            .collect::<Result<Vec<_>, FormError>>()?;

        Ok(Self {
            name,
            measure,
            include: CategoryFlags {
                pipeline: form.include_pipeline,
                best_case: form.include_best_case,
                commit: form.include_commit,
                closed: form.include_closed,
            },
            is_active: form.is_active,
            description: non_blank(form.description).map(|d| d.trim().to_string()),
            conditions,
        })
    }
}

impl ForecastTypePayload {
    pub fn into_domain(self, company_id: CompanyId) -> (NewForecastType, Vec<NewForecastCondition>) {
        (
            NewForecastType {
                company_id,
                name: self.name,
                measure: self.measure,
                include: self.include,
                is_active: self.is_active,
                description: self.description,
            },
            self.conditions,
        )
    }
}
