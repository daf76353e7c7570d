use serde::Deserialize;
use validator::Validate;

use crate::domain::forecast::NewForecastTarget;
use crate::domain::types::{CompanyId, ForecastTypeId, PeriodId, UserId};
use crate::forms::FormError;

/// Assigns one target to each selected user for a period and forecast type.
#[derive(Debug, Deserialize, Validate)]
pub struct ForecastTargetForm {
    pub forecast_type_id: i32,
    pub period_id: i32,
    #[validate(length(min = 1))]
    pub user_ids: Vec<i32>,
    #[validate(range(min = 0.0))]
    pub target: f64,
}

pub struct ForecastTargetPayload {
    pub forecast_type_id: ForecastTypeId,
    pub period_id: PeriodId,
    pub user_ids: Vec<UserId>,
    pub target: f64,
}

impl TryFrom<ForecastTargetForm> for ForecastTargetPayload {
    type Error = FormError;

    fn try_from(form: ForecastTargetForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let mut user_ids = form
            .user_ids
            .iter()
            .map(|&id| UserId::new(id).map_err(|_| FormError::InvalidId("user")))
            .collect::<Result<Vec<_>, _>>()?;
        user_ids.sort_unstable();
        user_ids.dedup();

        Ok(Self {
            forecast_type_id: ForecastTypeId::new(form.forecast_type_id)
                .map_err(|_| FormError::InvalidId("forecast type"))?,
            period_id: PeriodId::new(form.period_id).map_err(|_| FormError::InvalidId("period"))?,
            user_ids,
            target: form.target,
        })
    }
}

impl ForecastTargetPayload {
    pub fn into_domain(self, company_id: CompanyId) -> Vec<NewForecastTarget> {
        self.user_ids
            .into_iter()
            .map(|assigned_to| NewForecastTarget {
                company_id,
                assigned_to,
                period_id: self.period_id,
                forecast_type_id: self.forecast_type_id,
                target: self.target,
            })
            .collect()
    }
}
