use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    CompanyId, ForecastCategory, OpportunityId, OpportunityName, Probability, StageId, StageName,
    StageType, UserId,
};

/// Step of the sales pipeline an opportunity sits in.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OpportunityStage {
    pub id: StageId,
    pub company_id: CompanyId,
    pub name: StageName,
    pub probability: Probability,
    pub stage_type: StageType,
    pub is_final: bool,
    pub order: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewOpportunityStage {
    pub company_id: CompanyId,
    pub name: StageName,
    pub probability: Probability,
    pub stage_type: StageType,
    pub is_final: bool,
    pub order: i32,
}

impl OpportunityStage {
    /// Category an opportunity moves to when it enters this stage, if forced.
    pub fn implied_category(&self) -> Option<ForecastCategory> {
        match self.stage_type {
            StageType::Won => Some(ForecastCategory::Closed),
            StageType::Lost => Some(ForecastCategory::Omitted),
            StageType::Open => None,
        }
    }
}

/// Potential deal tracked against an owner, a stage and a close date.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub company_id: CompanyId,
    pub owner_id: UserId,
    pub stage: OpportunityStage,
    pub name: OpportunityName,
    pub account_name: Option<String>,
    pub amount: Option<f64>,
    pub probability: Probability,
    /// Derived from `amount` and `probability` on every write.
    pub expected_revenue: Option<f64>,
    pub quantity: Option<i32>,
    pub close_date: NaiveDate,
    pub forecast_category: ForecastCategory,
    pub lead_source: Option<String>,
    pub opportunity_type: Option<String>,
    pub next_step: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Editable opportunity attributes shared by inserts and updates.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OpportunityFields {
    pub owner_id: UserId,
    pub stage_id: StageId,
    pub name: OpportunityName,
    pub account_name: Option<String>,
    pub amount: Option<f64>,
    pub probability: Probability,
    pub quantity: Option<i32>,
    pub close_date: NaiveDate,
    pub forecast_category: ForecastCategory,
    pub lead_source: Option<String>,
    pub opportunity_type: Option<String>,
    pub next_step: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewOpportunity {
    pub company_id: CompanyId,
    pub fields: OpportunityFields,
}

pub type UpdateOpportunity = OpportunityFields;

/// Trims optional text, dropping blanks.
fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl OpportunityFields {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        owner_id: UserId,
        stage_id: StageId,
        name: OpportunityName,
        amount: Option<f64>,
        probability: Probability,
        quantity: Option<i32>,
        close_date: NaiveDate,
        forecast_category: ForecastCategory,
    ) -> Self {
        Self {
            owner_id,
            stage_id,
            name,
            account_name: None,
            amount,
            probability,
            quantity,
            close_date,
            forecast_category,
            lead_source: None,
            opportunity_type: None,
            next_step: None,
            description: None,
        }
    }

    /// Attaches the free-text attributes, sanitizing the HTML description.
    #[must_use]
    pub fn with_details(
        mut self,
        account_name: Option<String>,
        lead_source: Option<String>,
        opportunity_type: Option<String>,
        next_step: Option<String>,
        description: Option<String>,
    ) -> Self {
        self.account_name = clean_text(account_name);
        self.lead_source = clean_text(lead_source);
        self.opportunity_type = clean_text(opportunity_type);
        self.next_step = clean_text(next_step);
        self.description = clean_text(description.map(|d| ammonia::clean(&d)));
        self
    }

    /// Weighted revenue; absent when no amount is known.
    pub fn expected_revenue(&self) -> Option<f64> {
        self.amount.map(|amount| self.probability.weight(amount))
    }
}

impl Opportunity {
    /// Editable view of the stored record.
    pub fn fields(&self) -> OpportunityFields {
        OpportunityFields {
            owner_id: self.owner_id,
            stage_id: self.stage.id,
            name: self.name.clone(),
            account_name: self.account_name.clone(),
            amount: self.amount,
            probability: self.probability,
            quantity: self.quantity,
            close_date: self.close_date,
            forecast_category: self.forecast_category,
            lead_source: self.lead_source.clone(),
            opportunity_type: self.opportunity_type.clone(),
            next_step: self.next_step.clone(),
            description: self.description.clone(),
        }
    }

    /// Fields moved by a stage transition: probability and, for final outcomes, category.
    pub fn moved_to_stage(&self, stage: &OpportunityStage) -> OpportunityFields {
        let mut fields = self.fields();
        fields.stage_id = stage.id;
        fields.probability = stage.probability;
        if let Some(category) = stage.implied_category() {
            fields.forecast_category = category;
        }
        fields
    }
}
