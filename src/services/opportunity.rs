//! Opportunity writes followed by owner split sync and forecast
//! recomputation.

use crate::domain::opportunity::{NewOpportunity, Opportunity, OpportunityStage};
use crate::domain::types::{CompanyId, OpportunityId, StageId, UserId};
use crate::forecast::sync::{OpportunityChange, recompute_for_change};
use crate::forms::opportunity::{OpportunityForm, OpportunityPayload};
use crate::repository::{
    ForecastStore, OpportunityReader, OpportunityWriter, SplitReader, SplitWriter, UserReader,
};
use crate::services::opportunity_splits::sync_owner_splits;
use crate::services::{ServiceError, ServiceResult};

/// Keeps the owner inside every revenue split; failures are logged.
fn sync_splits<R>(repo: &R, opportunity: &Opportunity, owner_changed: bool)
where
    R: SplitReader + SplitWriter + ?Sized,
{
    if let Err(e) = sync_owner_splits(repo, opportunity, owner_changed) {
        log::error!("Failed to sync splits of opportunity {}: {e}", opportunity.id);
    }
}

/// Recomputes the buckets touched by `change`.
///
/// The opportunity write has already happened, so a failure here is logged
/// and does not fail the caller.
fn sync_forecasts<R>(repo: &R, company_id: CompanyId, change: &OpportunityChange)
where
    R: ForecastStore + ?Sized,
{
    if let Err(e) = recompute_for_change(repo, company_id, change) {
        log::error!("Failed to recompute forecasts for company {company_id}: {e}");
    }
}

fn load_stage<R>(repo: &R, stage_id: StageId, company_id: CompanyId) -> ServiceResult<OpportunityStage>
where
    R: OpportunityReader + ?Sized,
{
    repo.get_stage_by_id(stage_id, company_id)?
        .ok_or_else(|| ServiceError::Form(format!("unknown stage {stage_id}")))
}

fn ensure_owner<R>(repo: &R, owner_id: UserId, company_id: CompanyId) -> ServiceResult<()>
where
    R: UserReader + ?Sized,
{
    match repo.get_user_by_id(owner_id, company_id)? {
        Some(_) => Ok(()),
        None => Err(ServiceError::Form(format!("unknown owner {owner_id}"))),
    }
}

fn load_opportunity<R>(
    repo: &R,
    opportunity_id: OpportunityId,
    company_id: CompanyId,
) -> ServiceResult<Opportunity>
where
    R: OpportunityReader + ?Sized,
{
    repo.get_opportunity_by_id(opportunity_id, company_id)?
        .ok_or(ServiceError::NotFound)
}

pub fn create_opportunity<R>(
    repo: &R,
    company_id: CompanyId,
    form: OpportunityForm,
) -> ServiceResult<Opportunity>
where
    R: OpportunityWriter + ForecastStore + SplitReader + SplitWriter + ?Sized,
{
    let payload = OpportunityPayload::try_from(form)?;
    ensure_owner(repo, payload.owner_id, company_id)?;
    let stage = load_stage(repo, payload.stage_id, company_id)?;

    let opportunity = repo
        .create_opportunity(&NewOpportunity {
            company_id,
            fields: payload.into_fields(&stage),
        })
        .map_err(|e| {
            log::error!("Failed to create opportunity: {e}");
            e
        })?;

    sync_splits(repo, &opportunity, false);
    sync_forecasts(repo, company_id, &OpportunityChange::created(opportunity.clone()));
    Ok(opportunity)
}

pub fn update_opportunity<R>(
    repo: &R,
    company_id: CompanyId,
    opportunity_id: OpportunityId,
    form: OpportunityForm,
) -> ServiceResult<Opportunity>
where
    R: OpportunityWriter + ForecastStore + SplitReader + SplitWriter + ?Sized,
{
    let payload = OpportunityPayload::try_from(form)?;
    let before = load_opportunity(repo, opportunity_id, company_id)?;
    ensure_owner(repo, payload.owner_id, company_id)?;
    let stage = load_stage(repo, payload.stage_id, company_id)?;

    let after = repo
        .update_opportunity(opportunity_id, company_id, &payload.into_fields(&stage))
        .map_err(|e| {
            log::error!("Failed to update opportunity {opportunity_id}: {e}");
            e
        })?;

    sync_splits(repo, &after, before.owner_id != after.owner_id);
    sync_forecasts(repo, company_id, &OpportunityChange::updated(before, after.clone()));
    Ok(after)
}

pub fn delete_opportunity<R>(
    repo: &R,
    company_id: CompanyId,
    opportunity_id: OpportunityId,
) -> ServiceResult<()>
where
    R: OpportunityWriter + ForecastStore + ?Sized,
{
    let before = load_opportunity(repo, opportunity_id, company_id)?;
    repo.delete_opportunity(opportunity_id, company_id)?;

    sync_forecasts(repo, company_id, &OpportunityChange::deleted(before));
    Ok(())
}

/// Moves the opportunity to another stage, taking over the stage
/// probability and any category the stage forces.
pub fn change_stage<R>(
    repo: &R,
    company_id: CompanyId,
    opportunity_id: OpportunityId,
    stage_id: StageId,
) -> ServiceResult<Opportunity>
where
    R: OpportunityWriter + ForecastStore + ?Sized,
{
    let before = load_opportunity(repo, opportunity_id, company_id)?;
    let stage = load_stage(repo, stage_id, company_id)?;

    let after = repo.update_opportunity(opportunity_id, company_id, &before.moved_to_stage(&stage))?;

    sync_forecasts(repo, company_id, &OpportunityChange::updated(before, after.clone()));
    Ok(after)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::types::{
        ForecastCategory, OpportunityName, Probability, StageName, StageType,
    };
    use crate::repository::mock::MockRepository;
    use chrono::NaiveDate;

    fn company() -> CompanyId {
        CompanyId::new(1).expect("valid company")
    }

    fn stage(id: i32, stage_type: StageType, probability: i32) -> OpportunityStage {
        OpportunityStage {
            id: StageId::new(id).expect("valid stage"),
            company_id: company(),
            name: StageName::new(format!("Stage {id}")).expect("valid name"),
            probability: Probability::new(probability).expect("valid probability"),
            stage_type,
            is_final: stage_type != StageType::Open,
            order: id,
        }
    }

    fn opportunity() -> Opportunity {
        let now = chrono::Utc::now().naive_utc();
        Opportunity {
            id: OpportunityId::new(5).expect("valid id"),
            company_id: company(),
            owner_id: UserId::new(1).expect("valid owner"),
            stage: stage(1, StageType::Open, 20),
            name: OpportunityName::new("Renewal").expect("valid name"),
            account_name: None,
            amount: Some(500.0),
            probability: Probability::new(20).expect("valid probability"),
            expected_revenue: Some(100.0),
            quantity: None,
            close_date: NaiveDate::from_ymd_opt(2025, 2, 1).expect("valid date"),
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
    fn change_stage_to_won_closes_the_deal() {
        let mut repo = MockRepository::new();
        repo.expect_get_opportunity_by_id()
            .returning(|_, _| Ok(Some(opportunity())));
        repo.expect_get_stage_by_id()
            .returning(|_, _| Ok(Some(stage(9, StageType::Won, 100))));
        repo.expect_update_opportunity()
            .withf(|_, _, fields| {
                fields.forecast_category == ForecastCategory::Closed
                    && fields.probability.get() == 100
                    && fields.stage_id.get() == 9
            })
            .returning(|_, _, fields| {
                let mut updated = opportunity();
                updated.stage = stage(9, StageType::Won, 100);
                updated.probability = fields.probability;
                updated.forecast_category = fields.forecast_category;
                Ok(updated)
            });
        // No period covers the close date: recomputation is skipped.
        repo.expect_find_period_by_date().returning(|_, _| Ok(None));

        let updated = change_stage(
            &repo,
            company(),
            OpportunityId::new(5).expect("valid id"),
            StageId::new(9).expect("valid stage"),
        )
        .expect("stage changed");
        assert_eq!(updated.forecast_category, ForecastCategory::Closed);
    }

    #[test]
    fn unknown_stage_is_a_form_error() {
        let mut repo = MockRepository::new();
        repo.expect_get_opportunity_by_id()
            .returning(|_, _| Ok(Some(opportunity())));
        repo.expect_get_stage_by_id().returning(|_, _| Ok(None));
        repo.expect_update_opportunity().never();

        let result = change_stage(
            &repo,
            company(),
            OpportunityId::new(5).expect("valid id"),
            StageId::new(9).expect("valid stage"),
        );
        assert!(matches!(result, Err(ServiceError::Form(_))));
    }

    #[test]
    fn deleting_a_missing_opportunity_is_not_found() {
        let mut repo = MockRepository::new();
        repo.expect_get_opportunity_by_id().returning(|_, _| Ok(None));
        repo.expect_delete_opportunity().never();

        let result = delete_opportunity(&repo, company(), OpportunityId::new(5).expect("valid id"));
        assert!(matches!(result, Err(ServiceError::NotFound)));
    }

    #[test]
    fn reassigned_owner_joins_revenue_split_at_zero() {
        use crate::domain::opportunity_split::{OpportunitySplit, SplitType};
        use crate::domain::types::{
            OpportunitySplitId, SplitField, SplitLabel, SplitTypeId, UserEmail, UserName,
        };
        use crate::domain::user::User;

        let mut repo = MockRepository::new();
        repo.expect_get_opportunity_by_id()
            .returning(|_, _| Ok(Some(opportunity())));
        repo.expect_get_user_by_id().returning(|id, company_id| {
            Ok(Some(User {
                id,
                company_id,
                name: UserName::new("Grace").expect("valid name"),
                email: UserEmail::new("grace@example.com").expect("valid email"),
                is_active: true,
            }))
        });
        repo.expect_get_stage_by_id()
            .returning(|_, _| Ok(Some(stage(1, StageType::Open, 20))));
        repo.expect_update_opportunity().returning(|_, _, fields| {
            let mut updated = opportunity();
            updated.owner_id = fields.owner_id;
            Ok(updated)
        });
        repo.expect_list_split_types().returning(|_, _| {
            Ok(vec![SplitType {
                id: SplitTypeId::new(1).expect("valid id"),
                company_id: company(),
                label: SplitLabel::new("Revenue").expect("valid label"),
                split_field: SplitField::Amount,
                totals_100_percent: true,
                is_active: true,
            }])
        });
        repo.expect_list_opportunity_splits().returning(|opportunity_id, _| {
            Ok(vec![OpportunitySplit {
                id: OpportunitySplitId::new(1).expect("valid id"),
                company_id: company(),
                opportunity_id,
                user_id: UserId::new(1).expect("valid user"),
                split_type_id: SplitTypeId::new(1).expect("valid id"),
                percentage: 100.0,
                amount: 500.0,
            }])
        });
        repo.expect_create_opportunity_split()
            .withf(|split| split.user_id.get() == 2 && split.percentage == 0.0)
            .times(1)
            .returning(|split| {
                Ok(OpportunitySplit {
                    id: OpportunitySplitId::new(2).expect("valid id"),
                    company_id: split.company_id,
                    opportunity_id: split.opportunity_id,
                    user_id: split.user_id,
                    split_type_id: split.split_type_id,
                    percentage: split.percentage,
                    amount: split.amount,
                })
            });
        repo.expect_find_period_by_date().returning(|_, _| Ok(None));

        let form = OpportunityForm {
            owner_id: 2,
            stage_id: 1,
            name: "Renewal".into(),
            account_name: None,
            amount: Some(500.0),
            probability: None,
            quantity: None,
            close_date: "2025-02-01".into(),
            forecast_category: None,
            lead_source: None,
            opportunity_type: None,
            next_step: None,
            description: None,
        };
        let updated = update_opportunity(
            &repo,
            company(),
            OpportunityId::new(5).expect("valid id"),
            form,
        )
        .expect("opportunity updated");
        assert_eq!(updated.owner_id.get(), 2);
    }

    #[test]
    fn recompute_failure_does_not_fail_the_write() {
        let mut repo = MockRepository::new();
        repo.expect_get_opportunity_by_id()
            .returning(|_, _| Ok(Some(opportunity())));
        repo.expect_delete_opportunity().returning(|_, _| Ok(()));
        repo.expect_find_period_by_date().returning(|_, _| {
            Err(crate::repository::errors::RepositoryError::ConnectionError(
                "pool exhausted".into(),
            ))
        });

        assert!(
            delete_opportunity(&repo, company(), OpportunityId::new(5).expect("valid id")).is_ok()
        );
    }
}
