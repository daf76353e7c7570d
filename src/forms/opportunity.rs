//! Opportunity create/update form.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::domain::opportunity::{OpportunityFields, OpportunityStage};
use crate::domain::types::{ForecastCategory, OpportunityName, Probability, StageId, UserId};
use crate::forms::{FormError, non_blank, parse_choice};

#[derive(Debug, Deserialize, Validate)]
pub struct OpportunityForm {
    pub owner_id: i32,
    pub stage_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub amount: Option<f64>,
    /// Defaults to the stage probability.
    #[serde(default)]
    pub probability: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    pub close_date: String,
    /// Defaults to `pipeline` unless the stage forces a category.
    #[serde(default)]
    pub forecast_category: Option<String>,
    #[serde(default)]
    pub lead_source: Option<String>,
    #[serde(default)]
    pub opportunity_type: Option<String>,
    #[serde(default)]
    pub next_step: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub struct OpportunityPayload {
    pub owner_id: UserId,
    pub stage_id: StageId,
    pub name: OpportunityName,
    pub account_name: Option<String>,
    pub amount: Option<f64>,
    pub probability: Option<Probability>,
    pub quantity: Option<i32>,
    pub close_date: NaiveDate,
    pub forecast_category: Option<ForecastCategory>,
    pub lead_source: Option<String>,
    pub opportunity_type: Option<String>,
    pub next_step: Option<String>,
    pub description: Option<String>,
}

impl TryFrom<OpportunityForm> for OpportunityPayload {
    type Error = FormError;

    fn try_from(form: OpportunityForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let close_date = NaiveDate::parse_from_str(form.close_date.trim(), "%Y-%m-%d")
            .map_err(|_| FormError::InvalidDate(form.close_date.clone()))?;
        let probability = form
            .probability
            .map(|p| Probability::new(p).map_err(|_| FormError::InvalidProbability))
            .transpose()?;
        let forecast_category = non_blank(form.forecast_category)
            .map(|c| parse_choice::<ForecastCategory>("forecast category", &c))
            .transpose()?;

        Ok(Self {
            owner_id: UserId::new(form.owner_id).map_err(|_| FormError::InvalidId("owner"))?,
            stage_id: StageId::new(form.stage_id).map_err(|_| FormError::InvalidId("stage"))?,
            name: OpportunityName::new(form.name).map_err(|_| FormError::InvalidName)?,
            account_name: form.account_name,
            amount: form.amount,
            probability,
            quantity: form.quantity,
            close_date,
            forecast_category,
            lead_source: form.lead_source,
            opportunity_type: form.opportunity_type,
            next_step: form.next_step,
            description: form.description,
        })
    }
}

impl OpportunityPayload {
    /// Resolves defaults against the chosen stage.
    ///
    /// Won and lost stages force their category over the submitted one.
    pub fn into_fields(self, stage: &OpportunityStage) -> OpportunityFields {
        let category = stage
            .implied_category()
            .or(self.forecast_category)
            .unwrap_or(ForecastCategory::Pipeline);

        OpportunityFields::new(
            self.owner_id,
            self.stage_id,
            self.name,
            self.amount,
            self.probability.unwrap_or(stage.probability),
            self.quantity,
            self.close_date,
            category,
        )
        .with_details(
            self.account_name,
            self.lead_source,
            self.opportunity_type,
            self.next_step,
            self.description,
        )
    }
}
