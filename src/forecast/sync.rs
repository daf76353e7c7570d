//! Keeps stored forecast buckets in step with opportunity writes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::fiscal_year::Period;
use crate::domain::forecast::Forecast;
use crate::domain::opportunity::Opportunity;
use crate::domain::types::{CompanyId, UserId};
use crate::forecast::calculator::ForecastCalculator;
use crate::repository::ForecastStore;
use crate::services::ServiceResult;

/// Opportunity state around a create, update or delete.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct OpportunityChange {
    pub before: Option<Opportunity>,
    pub after: Option<Opportunity>,
}

impl OpportunityChange {
    pub fn created(opportunity: Opportunity) -> Self {
        Self {
            before: None,
            after: Some(opportunity),
        }
    }

    pub fn updated(before: Opportunity, after: Opportunity) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(opportunity: Opportunity) -> Self {
        Self {
            before: Some(opportunity),
            after: None,
        }
    }
}

/// Owner and close date locating one forecast bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AffectedBucket {
    pub owner_id: UserId,
    pub close_date: NaiveDate,
}

impl From<&Opportunity> for AffectedBucket {
    fn from(opportunity: &Opportunity) -> Self {
        Self {
            owner_id: opportunity.owner_id,
            close_date: opportunity.close_date,
        }
    }
}

/// Buckets whose totals may have moved because of `change`.
///
/// An update that leaves every editable field and the stage outcome intact
/// touches nothing. Moving the owner or the close date touches the old and
/// the new bucket.
pub fn affected_buckets(change: &OpportunityChange) -> Vec<AffectedBucket> {
    let mut buckets = Vec::with_capacity(2);
    match (&change.before, &change.after) {
        (None, None) => {}
        (None, Some(after)) => buckets.push(after.into()),
        (Some(before), None) => buckets.push(before.into()),
        (Some(before), Some(after)) => {
            let unchanged = before.fields() == after.fields()
                && before.stage.stage_type == after.stage.stage_type;
            if !unchanged {
                buckets.push(before.into());
                let moved: AffectedBucket = after.into();
                if !buckets.contains(&moved) {
                    buckets.push(moved);
                }
            }
        }
    }
    buckets
}

/// Recomputes every active forecast type for one owner and period.
pub fn recompute_bucket<R>(
    repo: &R,
    company_id: CompanyId,
    owner_id: UserId,
    period: &Period,
) -> ServiceResult<Vec<Forecast>>
where
    R: ForecastStore + ?Sized,
{
    let mut calculator = ForecastCalculator::new(repo, company_id);
    if let Some(fiscal_year) = repo.get_fiscal_year_by_id(period.fiscal_year_id, company_id)? {
        calculator = calculator.with_fiscal_year(fiscal_year);
    }
    let types = repo.list_forecast_types(company_id, true)?;

    let mut forecasts = Vec::with_capacity(types.len());
    for forecast_type in &types {
        forecasts.push(calculator.create_or_update_period_forecast(
            owner_id,
            forecast_type,
            period,
        )?);
    }
    Ok(forecasts)
}

/// Recomputes the buckets touched by `change`.
///
/// A close date outside every configured period is logged and skipped.
pub fn recompute_for_change<R>(
    repo: &R,
    company_id: CompanyId,
    change: &OpportunityChange,
) -> ServiceResult<Vec<Forecast>>
where
    R: ForecastStore + ?Sized,
{
    let mut seen = Vec::new();
    let mut forecasts = Vec::new();

    for bucket in affected_buckets(change) {
        let Some(period) = repo.find_period_by_date(company_id, bucket.close_date)? else {
            log::info!(
                "No fiscal period covers {} for company {company_id}; forecasts not updated",
                bucket.close_date
            );
            continue;
        };
        if seen.contains(&(bucket.owner_id, period.id)) {
            continue;
        }
        seen.push((bucket.owner_id, period.id));

        forecasts.extend(recompute_bucket(repo, company_id, bucket.owner_id, &period)?);
    }

    Ok(forecasts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::opportunity::OpportunityStage;
    use crate::domain::types::{
        ForecastCategory, OpportunityId, OpportunityName, Probability, StageId, StageName,
        StageType,
    };

    fn opportunity(owner: i32, close: (i32, u32, u32)) -> Opportunity {
        let now = chrono::Utc::now().naive_utc();
        let probability = Probability::new(10).expect("valid probability");
        Opportunity {
            id: OpportunityId::new(1).expect("valid id"),
            company_id: CompanyId::new(1).expect("valid company"),
            owner_id: UserId::new(owner).expect("valid owner"),
            stage: OpportunityStage {
                id: StageId::new(1).expect("valid stage"),
                company_id: CompanyId::new(1).expect("valid company"),
                name: StageName::new("Prospecting").expect("valid name"),
                probability,
                stage_type: StageType::Open,
                is_final: false,
                order: 1,
            },
            name: OpportunityName::new("Deal").expect("valid name"),
            account_name: None,
            amount: Some(10.0),
            probability,
            expected_revenue: Some(1.0),
            quantity: None,
            close_date: NaiveDate::from_ymd_opt(close.0, close.1, close.2).expect("valid date"),
            forecast_category: ForecastCategory::Pipeline,
            lead_source: None,
            opportunity_type: None,
            next_step: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_and_delete_touch_one_bucket() {
        let o = opportunity(1, (2025, 3, 1));
        assert_eq!(
            affected_buckets(&OpportunityChange::created(o.clone())),
            vec![AffectedBucket::from(&o)]
        );
        assert_eq!(
            affected_buckets(&OpportunityChange::deleted(o.clone())),
            vec![AffectedBucket::from(&o)]
        );
    }

    #[test]
    fn untouched_update_is_ignored() {
        let o = opportunity(1, (2025, 3, 1));
        let mut later = o.clone();
        later.updated_at += chrono::Duration::seconds(5);
        assert!(affected_buckets(&OpportunityChange::updated(o, later)).is_empty());
    }

    #[test]
    fn amount_change_touches_the_current_bucket_once() {
        let o = opportunity(1, (2025, 3, 1));
        let mut changed = o.clone();
        changed.amount = Some(99.0);
        assert_eq!(
            affected_buckets(&OpportunityChange::updated(o.clone(), changed)),
            vec![AffectedBucket::from(&o)]
        );
    }

    #[test]
    fn moving_owner_or_date_touches_both_buckets() {
        let o = opportunity(1, (2025, 3, 1));
        let moved = opportunity(2, (2025, 6, 1));
        let buckets = affected_buckets(&OpportunityChange::updated(o.clone(), moved.clone()));
        assert_eq!(
            buckets,
            vec![AffectedBucket::from(&o), AffectedBucket::from(&moved)]
        );
    }
}
