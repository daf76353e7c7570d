use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::opportunity_split::NewSplitType;
use crate::domain::types::{CompanyId, SplitField, SplitLabel, SplitTypeId, UserId};
use crate::forms::{FormError, parse_choice};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct SplitTypeForm {
    #[validate(length(min = 1, max = 255))]
    pub label: String,
    pub split_field: String,
    #[serde(default = "default_true")]
    pub totals_100_percent: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

pub struct SplitTypePayload {
    pub label: SplitLabel,
    pub split_field: SplitField,
    pub totals_100_percent: bool,
    pub is_active: bool,
}

impl TryFrom<SplitTypeForm> for SplitTypePayload {
    type Error = FormError;

    fn try_from(form: SplitTypeForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            label: SplitLabel::new(form.label).map_err(|_| FormError::InvalidName)?,
            split_field: parse_choice("split field", &form.split_field)?,
            totals_100_percent: form.totals_100_percent,
            is_active: form.is_active,
        })
    }
}

impl SplitTypePayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewSplitType {
        NewSplitType {
            company_id,
            label: self.label,
            split_field: self.split_field,
            totals_100_percent: self.totals_100_percent,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SplitShareForm {
    pub user_id: i32,
    pub percentage: f64,
}

/// Every member's share of one opportunity under one split type.
#[derive(Debug, Deserialize, Validate)]
pub struct OpportunitySplitsForm {
    pub split_type_id: i32,
    #[validate(length(min = 1))]
    pub shares: Vec<SplitShareForm>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitShare {
    pub user_id: UserId,
    pub percentage: f64,
}

pub struct OpportunitySplitsPayload {
    pub split_type_id: SplitTypeId,
    pub shares: Vec<SplitShare>,
}

impl TryFrom<OpportunitySplitsForm> for OpportunitySplitsPayload {
    type Error = FormError;

    fn try_from(form: OpportunitySplitsForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let mut seen = HashSet::new();
        let mut shares = Vec::with_capacity(form.shares.len());
        for share in form.shares {
            let user_id = UserId::new(share.user_id).map_err(|_| FormError::InvalidId("user"))?;
            if !seen.insert(user_id) {
                return Err(FormError::InvalidSplit(format!(
                    "user {user_id} appears more than once"
                )));
            }
            if !share.percentage.is_finite() || !(0.0..=100.0).contains(&share.percentage) {
                return Err(FormError::InvalidSplit(format!(
                    "percentage {} of user {user_id} is outside 0..=100",
                    share.percentage
                )));
            }
            shares.push(SplitShare {
                user_id,
                percentage: share.percentage,
            });
        }

        Ok(Self {
            split_type_id: SplitTypeId::new(form.split_type_id)
                .map_err(|_| FormError::InvalidId("split type"))?,
            shares,
        })
    }
}
