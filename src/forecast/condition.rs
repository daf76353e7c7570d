//! Compiles stored forecast condition rows into an opportunity predicate.
//!
//! Conditions are evaluated in `order`. Consecutive conditions that share a
//! logical operator form one group joined by that operator; the groups are
//! then joined with AND. A row whose operator is unknown behaves like
//! `equals`, while an unknown field cannot be compiled at all.

use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::forecast::{ForecastCondition, LogicalOperator};
use crate::domain::opportunity::Opportunity;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("unknown condition field `{0}`")]
    UnknownField(String),
}

/// Opportunity attribute a condition can test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionField {
    Name,
    AccountName,
    Amount,
    ExpectedRevenue,
    Quantity,
    Probability,
    CloseDate,
    ForecastCategory,
    Stage,
    StageType,
    Owner,
    LeadSource,
    OpportunityType,
    NextStep,
    Description,
}

impl FromStr for ConditionField {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.trim() {
            "name" => ConditionField::Name,
            "account_name" => ConditionField::AccountName,
            "amount" => ConditionField::Amount,
            "expected_revenue" => ConditionField::ExpectedRevenue,
            "quantity" => ConditionField::Quantity,
            "probability" => ConditionField::Probability,
            "close_date" => ConditionField::CloseDate,
            "forecast_category" => ConditionField::ForecastCategory,
            "stage" => ConditionField::Stage,
            "stage__stage_type" | "stage_type" => ConditionField::StageType,
            "owner" => ConditionField::Owner,
            "lead_source" => ConditionField::LeadSource,
            "opportunity_type" => ConditionField::OpportunityType,
            "next_step" => ConditionField::NextStep,
            "description" => ConditionField::Description,
            other => return Err(ConditionError::UnknownField(other.to_string())),
        };
        Ok(field)
    }
}

/// Comparison applied between a field and the condition value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    IsEmpty,
    IsNotEmpty,
}

impl ConditionOperator {
    /// Unknown operators compare for equality.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim() {
            "not_equals" => ConditionOperator::NotEquals,
            "contains" => ConditionOperator::Contains,
            "not_contains" => ConditionOperator::NotContains,
            "starts_with" => ConditionOperator::StartsWith,
            "ends_with" => ConditionOperator::EndsWith,
            "greater_than" => ConditionOperator::GreaterThan,
            "greater_than_equal" => ConditionOperator::GreaterThanEqual,
            "less_than" => ConditionOperator::LessThan,
            "less_than_equal" => ConditionOperator::LessThanEqual,
            "is_empty" => ConditionOperator::IsEmpty,
            "is_not_empty" => ConditionOperator::IsNotEmpty,
            _ => ConditionOperator::Equals,
        }
    }

    /// Positive form of a negated operator.
    fn split_negation(self) -> (Self, bool) {
        match self {
            ConditionOperator::NotEquals => (ConditionOperator::Equals, true),
            ConditionOperator::NotContains => (ConditionOperator::Contains, true),
            ConditionOperator::IsNotEmpty => (ConditionOperator::IsEmpty, true),
            other => (other, false),
        }
    }
}

/// Value read from an opportunity for comparison.
#[derive(Clone, Debug, PartialEq)]
enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl FieldValue {
    fn text(value: Option<&str>) -> Self {
        value.map_or(FieldValue::Null, |v| FieldValue::Text(v.to_string()))
    }

    fn number(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Null, FieldValue::Number)
    }

    fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(format_number(*n)),
            FieldValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn read_field(opportunity: &Opportunity, field: ConditionField) -> FieldValue {
    match field {
        ConditionField::Name => FieldValue::Text(opportunity.name.as_str().to_string()),
        ConditionField::AccountName => FieldValue::text(opportunity.account_name.as_deref()),
        ConditionField::Amount => FieldValue::number(opportunity.amount),
        ConditionField::ExpectedRevenue => FieldValue::number(opportunity.expected_revenue),
        ConditionField::Quantity => FieldValue::number(opportunity.quantity.map(f64::from)),
        ConditionField::Probability => {
            FieldValue::Number(f64::from(opportunity.probability.get()))
        }
        ConditionField::CloseDate => FieldValue::Date(opportunity.close_date),
        ConditionField::ForecastCategory => {
            FieldValue::Text(opportunity.forecast_category.code().to_string())
        }
        ConditionField::Stage => FieldValue::Number(f64::from(opportunity.stage.id.get())),
        ConditionField::StageType => FieldValue::Text(opportunity.stage.stage_type.code().to_string()),
        ConditionField::Owner => FieldValue::Number(f64::from(opportunity.owner_id.get())),
        ConditionField::LeadSource => FieldValue::text(opportunity.lead_source.as_deref()),
        ConditionField::OpportunityType => FieldValue::text(opportunity.opportunity_type.as_deref()),
        ConditionField::NextStep => FieldValue::text(opportunity.next_step.as_deref()),
        ConditionField::Description => FieldValue::text(opportunity.description.as_deref()),
    }
}

/// Operand for ordering comparisons: float when the text has a dot,
/// integer when it parses as one, raw text otherwise.
#[derive(Clone, Debug, PartialEq)]
enum Operand {
    Number(f64),
    Text(String),
}

fn convert_value(value: &str) -> Operand {
    let trimmed = value.trim();
    let parsed = if trimmed.contains('.') {
        trimmed.parse::<f64>().ok()
    } else {
        trimmed.parse::<i64>().ok().map(|n| n as f64)
    };
    parsed.map_or_else(|| Operand::Text(value.to_string()), Operand::Number)
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// One compiled condition row.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    field: ConditionField,
    operator: ConditionOperator,
    negated: bool,
    value: String,
}

impl Predicate {
    pub fn new(field: ConditionField, operator: ConditionOperator, value: &str) -> Self {
        let (operator, negated) = operator.split_negation();
        Self {
            field,
            operator,
            negated,
            value: value.to_string(),
        }
    }

    pub fn compile(condition: &ForecastCondition) -> Result<Self, ConditionError> {
        Ok(Self::new(
            condition.field.parse()?,
            ConditionOperator::parse_lenient(&condition.operator),
            &condition.value,
        ))
    }

    pub fn matches(&self, opportunity: &Opportunity) -> bool {
        let positive = self.matches_positive(&read_field(opportunity, self.field));
        positive != self.negated
    }

    fn matches_positive(&self, actual: &FieldValue) -> bool {
        use std::cmp::Ordering;

        let ordering = |wanted: fn(Ordering) -> bool| -> bool {
            compare(actual, &self.value).is_some_and(wanted)
        };

        match self.operator {
            ConditionOperator::IsEmpty => match actual {
                FieldValue::Null => true,
                FieldValue::Text(s) => s.is_empty(),
                _ => false,
            },
            ConditionOperator::Equals => equals(actual, &self.value),
            ConditionOperator::Contains => text_test(actual, &self.value, |a, b| a.contains(b)),
            ConditionOperator::StartsWith => {
                text_test(actual, &self.value, |a, b| a.starts_with(b))
            }
            ConditionOperator::EndsWith => text_test(actual, &self.value, |a, b| a.ends_with(b)),
            ConditionOperator::GreaterThan => ordering(|o| o == Ordering::Greater),
            ConditionOperator::GreaterThanEqual => ordering(|o| o != Ordering::Less),
            ConditionOperator::LessThan => ordering(|o| o == Ordering::Less),
            ConditionOperator::LessThanEqual => ordering(|o| o != Ordering::Greater),
            // Folded into their positive forms by `split_negation`.
            ConditionOperator::NotEquals
            | ConditionOperator::NotContains
            | ConditionOperator::IsNotEmpty => false,
        }
    }
}

fn equals(actual: &FieldValue, expected: &str) -> bool {
    match actual {
        FieldValue::Null => false,
        FieldValue::Text(s) => s == expected,
        FieldValue::Number(n) => expected
            .trim()
            .parse::<f64>()
            .is_ok_and(|e| (n - e).abs() < f64::EPSILON),
        FieldValue::Date(d) => parse_date(expected).is_some_and(|e| *d == e),
    }
}

/// Case-insensitive text test over the rendered field value.
fn text_test(actual: &FieldValue, expected: &str, test: fn(&str, &str) -> bool) -> bool {
    actual
        .as_text()
        .is_some_and(|a| test(&a.to_lowercase(), &expected.to_lowercase()))
}

fn compare(actual: &FieldValue, expected: &str) -> Option<std::cmp::Ordering> {
    match actual {
        FieldValue::Null => None,
        FieldValue::Date(d) => parse_date(expected).map(|e| d.cmp(&e)),
        FieldValue::Number(n) => match convert_value(expected) {
            Operand::Number(e) => n.partial_cmp(&e),
            Operand::Text(_) => None,
        },
        FieldValue::Text(s) => Some(s.as_str().cmp(expected)),
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Group {
    operator: LogicalOperator,
    predicates: Vec<Predicate>,
}

impl Group {
    fn matches(&self, opportunity: &Opportunity) -> bool {
        match self.operator {
            LogicalOperator::And => self.predicates.iter().all(|p| p.matches(opportunity)),
            LogicalOperator::Or => self.predicates.iter().any(|p| p.matches(opportunity)),
        }
    }
}

/// Compiled filter of one forecast type; empty means every opportunity passes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledConditions {
    groups: Vec<Group>,
}

impl CompiledConditions {
    pub fn compile(conditions: &[ForecastCondition]) -> Result<Self, ConditionError> {
        let mut active = conditions.iter().filter(|c| c.is_active).collect::<Vec<_>>();
        active.sort_by_key(|c| (c.order, c.id));

        let mut groups: Vec<Group> = Vec::new();
        for condition in active {
            let predicate = Predicate::compile(condition)?;
            match groups.last_mut() {
                Some(group) if group.operator == condition.logical_operator => {
                    group.predicates.push(predicate)
                }
                _ => groups.push(Group {
                    operator: condition.logical_operator,
                    predicates: vec![predicate],
                }),
            }
        }

        Ok(Self { groups })
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn matches(&self, opportunity: &Opportunity) -> bool {
        self.groups.iter().all(|g| g.matches(opportunity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::opportunity::OpportunityStage;
    use crate::domain::types::{
        CompanyId, ForecastCategory, ForecastConditionId, ForecastTypeId, OpportunityId,
        OpportunityName, Probability, StageId, StageName, StageType, UserId,
    };

    fn opportunity() -> Opportunity {
        let now = chrono::Utc::now().naive_utc();
        Opportunity {
            id: OpportunityId::new(1).expect("valid id"),
            company_id: CompanyId::new(1).expect("valid company"),
            owner_id: UserId::new(7).expect("valid owner"),
            stage: OpportunityStage {
                id: StageId::new(3).expect("valid stage"),
                company_id: CompanyId::new(1).expect("valid company"),
                name: StageName::new("Proposal").expect("valid name"),
                probability: Probability::new(50).expect("valid probability"),
                stage_type: StageType::Open,
                is_final: false,
                order: 2,
            },
            name: OpportunityName::new("Enterprise Renewal").expect("valid name"),
            account_name: Some("Acme".into()),
            amount: Some(1500.0),
            probability: Probability::new(50).expect("valid probability"),
            expected_revenue: Some(750.0),
            quantity: None,
            close_date: NaiveDate::from_ymd_opt(2025, 2, 10).expect("valid date"),
            forecast_category: ForecastCategory::Commit,
            lead_source: None,
            opportunity_type: Some("".into()),
            next_step: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn condition(
        order: i32,
        field: &str,
        operator: &str,
        value: &str,
        logical: LogicalOperator,
    ) -> ForecastCondition {
        ForecastCondition {
            id: ForecastConditionId::new(order + 1).expect("valid id"),
            forecast_type_id: ForecastTypeId::new(1).expect("valid type"),
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
            logical_operator: logical,
            order,
            is_active: true,
        }
    }

    fn check(field: &str, operator: &str, value: &str) -> bool {
        let c = condition(0, field, operator, value, LogicalOperator::And);
        Predicate::compile(&c).expect("compiles").matches(&opportunity())
    }

    #[test]
    fn text_operators_are_case_insensitive_except_equals() {
        assert!(check("name", "contains", "RENEWAL"));
        assert!(check("name", "starts_with", "enterprise"));
        assert!(check("name", "ends_with", "wal"));
        assert!(!check("name", "equals", "enterprise renewal"));
        assert!(check("name", "equals", "Enterprise Renewal"));
        assert!(check("name", "not_contains", "upsell"));
    }

    #[test]
    fn numeric_comparisons_convert_the_value() {
        assert!(check("amount", "greater_than", "1000"));
        assert!(check("amount", "greater_than_equal", "1500.0"));
        assert!(!check("amount", "less_than", "1500"));
        assert!(check("probability", "less_than_equal", "50"));
        assert!(!check("amount", "greater_than", "lots"));
        assert!(check("stage", "equals", "3"));
        assert!(check("owner", "not_equals", "8"));
    }

    #[test]
    fn dates_compare_chronologically() {
        assert!(check("close_date", "greater_than", "2025-01-31"));
        assert!(check("close_date", "equals", "2025-02-10"));
        assert!(!check("close_date", "less_than", "2025-02-10"));
    }

    #[test]
    fn absent_values_fail_positive_and_pass_negated_predicates() {
        assert!(!check("lead_source", "equals", "web"));
        assert!(!check("lead_source", "contains", "w"));
        assert!(check("lead_source", "not_equals", "web"));
        assert!(check("lead_source", "is_empty", ""));
        assert!(check("opportunity_type", "is_empty", ""));
        assert!(check("account_name", "is_not_empty", ""));
        assert!(!check("quantity", "greater_than", "0"));
    }

    #[test]
    fn unknown_operator_means_equals() {
        assert!(check("forecast_category", "matches", "commit"));
        assert!(check("stage__stage_type", "whatever", "open"));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let c = condition(0, "colour", "equals", "red", LogicalOperator::And);
        assert_eq!(
            CompiledConditions::compile(&[c]),
            Err(ConditionError::UnknownField("colour".into()))
        );
    }

    #[test]
    fn consecutive_operators_group_and_groups_are_anded() {
        use LogicalOperator::{And, Or};

        // (category = pipeline OR category = commit) AND (amount > 1000 AND name contains renewal)
        let rows = vec![
            condition(0, "forecast_category", "equals", "pipeline", Or),
            condition(1, "forecast_category", "equals", "commit", Or),
            condition(2, "amount", "greater_than", "1000", And),
            condition(3, "name", "contains", "renewal", And),
        ];
        let compiled = CompiledConditions::compile(&rows).expect("compiles");
        assert!(compiled.matches(&opportunity()));

        // Order column decides grouping, not input order.
        let mut shuffled = rows.clone();
        shuffled.reverse();
        assert_eq!(CompiledConditions::compile(&shuffled), Ok(compiled));

        let failing = vec![
            condition(0, "forecast_category", "equals", "pipeline", Or),
            condition(1, "forecast_category", "equals", "best_case", Or),
            condition(2, "amount", "greater_than", "1000", And),
        ];
        assert!(
            !CompiledConditions::compile(&failing)
                .expect("compiles")
                .matches(&opportunity())
        );
    }

    #[test]
    fn inactive_conditions_are_ignored() {
        let mut c = condition(0, "amount", "less_than", "10", LogicalOperator::And);
        c.is_active = false;
        let compiled = CompiledConditions::compile(&[c]).expect("compiles");
        assert!(compiled.is_empty());
        assert!(compiled.matches(&opportunity()));
    }
}
