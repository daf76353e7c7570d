//! Diesel models for opportunities and their pipeline stages.

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::domain::opportunity::{
    NewOpportunity as DomainNewOpportunity, NewOpportunityStage as DomainNewOpportunityStage,
    Opportunity as DomainOpportunity, OpportunityFields, OpportunityStage as DomainOpportunityStage,
};
use crate::domain::types::{
    CompanyId, OpportunityId, OpportunityName, Probability, StageId, StageName,
    TypeConstraintError, UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::opportunity_stages)]
pub struct OpportunityStage {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub probability: i32,
    pub stage_type: String,
    pub is_final: bool,
    pub stage_order: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::opportunity_stages)]
pub struct NewOpportunityStage<'a> {
    pub company_id: i32,
    pub name: &'a str,
    pub probability: i32,
    pub stage_type: &'a str,
    pub is_final: bool,
    pub stage_order: i32,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable, Associations)]
#[diesel(belongs_to(OpportunityStage, foreign_key = stage_id))]
#[diesel(table_name = crate::schema::opportunities)]
/// Diesel model for [`crate::domain::opportunity::Opportunity`] without its stage.
pub struct Opportunity {
    pub id: i32,
    pub company_id: i32,
    pub owner_id: i32,
    pub stage_id: i32,
    pub name: String,
    pub account_name: Option<String>,
    pub amount: Option<f64>,
    pub probability: i32,
    pub expected_revenue: Option<f64>,
    pub quantity: Option<i32>,
    pub close_date: NaiveDate,
    pub forecast_category: String,
    pub lead_source: Option<String>,
    pub opportunity_type: Option<String>,
    pub next_step: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::opportunities)]
pub struct NewOpportunity<'a> {
    pub company_id: i32,
    pub owner_id: i32,
    pub stage_id: i32,
    pub name: &'a str,
    pub account_name: Option<&'a str>,
    pub amount: Option<f64>,
    pub probability: i32,
    pub expected_revenue: Option<f64>,
    pub quantity: Option<i32>,
    pub close_date: NaiveDate,
    pub forecast_category: &'a str,
    pub lead_source: Option<&'a str>,
    pub opportunity_type: Option<&'a str>,
    pub next_step: Option<&'a str>,
    pub description: Option<&'a str>,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::opportunities)]
#[diesel(treat_none_as_null = true)]
/// Full replacement of the editable columns.
pub struct UpdateOpportunity<'a> {
    pub owner_id: i32,
    pub stage_id: i32,
    pub name: &'a str,
    pub account_name: Option<&'a str>,
    pub amount: Option<f64>,
    pub probability: i32,
    pub expected_revenue: Option<f64>,
    pub quantity: Option<i32>,
    pub close_date: NaiveDate,
    pub forecast_category: &'a str,
    pub lead_source: Option<&'a str>,
    pub opportunity_type: Option<&'a str>,
    pub next_step: Option<&'a str>,
    pub description: Option<&'a str>,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<OpportunityStage> for DomainOpportunityStage {
    type Error = TypeConstraintError;

    fn try_from(stage: OpportunityStage) -> Result<Self, Self::Error> {
        Ok(Self {
            id: StageId::new(stage.id)?,
            company_id: CompanyId::new(stage.company_id)?,
            name: StageName::new(stage.name)?,
            probability: Probability::new(stage.probability)?,
            stage_type: stage.stage_type.parse()?,
            is_final: stage.is_final,
            order: stage.stage_order,
        })
    }
}

impl<'a> From<&'a DomainNewOpportunityStage> for NewOpportunityStage<'a> {
    fn from(stage: &'a DomainNewOpportunityStage) -> Self {
        Self {
            company_id: stage.company_id.get(),
            name: stage.name.as_str(),
            probability: stage.probability.into(),
            stage_type: stage.stage_type.code(),
            is_final: stage.is_final,
            stage_order: stage.order,
        }
    }
}

impl TryFrom<(Opportunity, OpportunityStage)> for DomainOpportunity {
    type Error = TypeConstraintError;

    fn try_from((row, stage): (Opportunity, OpportunityStage)) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OpportunityId::new(row.id)?,
            company_id: CompanyId::new(row.company_id)?,
            owner_id: UserId::new(row.owner_id)?,
            stage: DomainOpportunityStage::try_from(stage)?,
            name: OpportunityName::new(row.name)?,
            account_name: row.account_name,
            amount: row.amount,
            probability: Probability::new(row.probability)?,
            expected_revenue: row.expected_revenue,
            quantity: row.quantity,
            close_date: row.close_date,
            forecast_category: row.forecast_category.parse()?,
            lead_source: row.lead_source,
            opportunity_type: row.opportunity_type,
            next_step: row.next_step,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl<'a> From<&'a DomainNewOpportunity> for NewOpportunity<'a> {
    fn from(opportunity: &'a DomainNewOpportunity) -> Self {
        let fields = &opportunity.fields;
        Self {
            company_id: opportunity.company_id.get(),
            owner_id: fields.owner_id.get(),
            stage_id: fields.stage_id.get(),
            name: fields.name.as_str(),
            account_name: fields.account_name.as_deref(),
            amount: fields.amount,
            probability: fields.probability.into(),
            expected_revenue: fields.expected_revenue(),
            quantity: fields.quantity,
            close_date: fields.close_date,
            forecast_category: fields.forecast_category.code(),
            lead_source: fields.lead_source.as_deref(),
            opportunity_type: fields.opportunity_type.as_deref(),
            next_step: fields.next_step.as_deref(),
            description: fields.description.as_deref(),
        }
    }
}

impl<'a> UpdateOpportunity<'a> {
    pub fn new(fields: &'a OpportunityFields, updated_at: NaiveDateTime) -> Self {
        Self {
            owner_id: fields.owner_id.get(),
            stage_id: fields.stage_id.get(),
            name: fields.name.as_str(),
            account_name: fields.account_name.as_deref(),
            amount: fields.amount,
            probability: fields.probability.into(),
            expected_revenue: fields.expected_revenue(),
            quantity: fields.quantity,
            close_date: fields.close_date,
            forecast_category: fields.forecast_category.code(),
            lead_source: fields.lead_source.as_deref(),
            opportunity_type: fields.opportunity_type.as_deref(),
            next_step: fields.next_step.as_deref(),
            description: fields.description.as_deref(),
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ForecastCategory, StageType};

    fn stage_row() -> OpportunityStage {
        OpportunityStage {
            id: 4,
            company_id: 1,
            name: "Negotiation".into(),
            probability: 60,
            stage_type: "open".into(),
            is_final: false,
            stage_order: 3,
        }
    }

    #[test]
    fn joins_row_and_stage_into_domain() {
        let now = chrono::Utc::now().naive_utc();
        let row = Opportunity {
            id: 9,
            company_id: 1,
            owner_id: 2,
            stage_id: 4,
            name: "Big deal".into(),
            account_name: None,
            amount: Some(500.0),
            probability: 60,
            expected_revenue: Some(300.0),
            quantity: None,
            close_date: NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date"),
            forecast_category: "best_case".into(),
            lead_source: None,
            opportunity_type: None,
            next_step: None,
            description: None,
            created_at: now,
            updated_at: now,
        };
        let domain = DomainOpportunity::try_from((row, stage_row())).expect("valid row");
        assert_eq!(domain.stage.stage_type, StageType::Open);
        assert_eq!(domain.forecast_category, ForecastCategory::BestCase);
        assert_eq!(domain.owner_id.get(), 2);
    }

    #[test]
    fn unknown_stage_type_is_rejected() {
        let mut stage = stage_row();
        stage.stage_type = "archived".into();
        assert!(DomainOpportunityStage::try_from(stage).is_err());
    }
}
