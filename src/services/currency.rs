use crate::domain::types::CompanyId;
use crate::repository::{ForecastWriter, OpportunityWriter};
use crate::services::{ServiceError, ServiceResult};

/// Rows rewritten by a currency conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ConversionOutcome {
    pub opportunities: usize,
    pub forecasts: usize,
}

/// Multiplies every monetary value of the company by `rate`.
///
/// Opportunity amounts (with expected revenue) are converted first, then the
/// targets and values of monetary forecast types. Quantity forecasts keep
/// their values.
pub fn convert_company_currency<R>(
    repo: &R,
    company_id: CompanyId,
    rate: f64,
    batch_size: usize,
) -> ServiceResult<ConversionOutcome>
where
    R: OpportunityWriter + ForecastWriter + ?Sized,
{
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ServiceError::Form(format!(
            "conversion rate must be a positive number, got {rate}"
        )));
    }

    log::info!("Converting currency of company {company_id} at rate {rate}");
    let opportunities = repo
        .scale_opportunity_amounts(company_id, rate, batch_size)
        .map_err(|e| {
            log::error!("Failed to convert opportunity amounts: {e}");
            ServiceError::from(e)
        })?;
    let forecasts = repo
        .scale_forecast_values(company_id, rate, batch_size)
        .map_err(|e| {
            log::error!("Failed to convert forecasts after {opportunities} opportunities: {e}");
            ServiceError::from(e)
        })?;

    Ok(ConversionOutcome {
        opportunities,
        forecasts,
    })
}
