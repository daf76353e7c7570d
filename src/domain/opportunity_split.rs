use serde::{Deserialize, Serialize};

use crate::domain::opportunity::Opportunity;
use crate::domain::types::{
    CompanyId, OpportunityId, OpportunitySplitId, SplitField, SplitLabel, SplitTypeId, UserId,
};

/// Slack allowed when checking that percentages add up to 100.
pub const PERCENT_TOLERANCE: f64 = 0.01;

/// How credit for an opportunity is divided between team members.
///
/// Revenue splits (`totals_100_percent`) must always account for the whole
/// opportunity; overlay splits may add up to anything.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SplitType {
    pub id: SplitTypeId,
    pub company_id: CompanyId,
    pub label: SplitLabel,
    pub split_field: SplitField,
    pub totals_100_percent: bool,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewSplitType {
    pub company_id: CompanyId,
    pub label: SplitLabel,
    pub split_field: SplitField,
    pub totals_100_percent: bool,
    pub is_active: bool,
}

impl SplitType {
    /// Value of the split field on `opportunity`; absent counts as 0.
    pub fn base_value(&self, opportunity: &Opportunity) -> f64 {
        match self.split_field {
            SplitField::Amount => opportunity.amount,
            SplitField::ExpectedRevenue => opportunity.expected_revenue,
        }
        .unwrap_or(0.0)
    }
}

/// Share of one user in an opportunity under one split type.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OpportunitySplit {
    pub id: OpportunitySplitId,
    pub company_id: CompanyId,
    pub opportunity_id: OpportunityId,
    pub user_id: UserId,
    pub split_type_id: SplitTypeId,
    pub percentage: f64,
    pub amount: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewOpportunitySplit {
    pub company_id: CompanyId,
    pub opportunity_id: OpportunityId,
    pub user_id: UserId,
    pub split_type_id: SplitTypeId,
    pub percentage: f64,
    pub amount: f64,
}

impl NewOpportunitySplit {
    /// A share of `percentage` with its amount taken from the split field.
    #[must_use]
    pub fn share(
        split_type: &SplitType,
        opportunity: &Opportunity,
        user_id: UserId,
        percentage: f64,
    ) -> Self {
        Self {
            company_id: opportunity.company_id,
            opportunity_id: opportunity.id,
            user_id,
            split_type_id: split_type.id,
            percentage,
            amount: split_type.base_value(opportunity) * percentage / 100.0,
        }
    }
}

/// Whether the percentages add up to 100, within [`PERCENT_TOLERANCE`].
pub fn totals_hundred(percentages: impl IntoIterator<Item = f64>) -> bool {
    let total: f64 = percentages.into_iter().sum();
    (total - 100.0).abs() <= PERCENT_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_allow_rounding_slack() {
        assert!(totals_hundred([33.33, 33.33, 33.34]));
        assert!(totals_hundred([100.0]));
        assert!(!totals_hundred([60.0, 30.0]));
        assert!(!totals_hundred(std::iter::empty()));
    }
}
