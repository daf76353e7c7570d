//! Split types and the division of opportunity credit between users.

use crate::domain::opportunity::Opportunity;
use crate::domain::opportunity_split::{
    NewOpportunitySplit, OpportunitySplit, PERCENT_TOLERANCE, SplitType, totals_hundred,
};
use crate::domain::types::{CompanyId, OpportunityId};
use crate::forms::opportunity_split::{
    OpportunitySplitsForm, OpportunitySplitsPayload, SplitTypeForm, SplitTypePayload,
};
use crate::repository::{OpportunityReader, SplitReader, SplitWriter, UserReader};
use crate::services::{ServiceError, ServiceResult};

pub fn create_split_type<R>(
    repo: &R,
    company_id: CompanyId,
    form: SplitTypeForm,
) -> ServiceResult<SplitType>
where
    R: SplitWriter + ?Sized,
{
    let payload = SplitTypePayload::try_from(form)?;
    repo.create_split_type(&payload.into_domain(company_id))
        .map_err(|e| {
            log::error!("Failed to create split type: {e}");
            ServiceError::from(e)
        })
}

/// Replaces the shares of one split type on an opportunity.
///
/// Shares of a revenue split type must add up to 100%.
pub fn save_opportunity_splits<R>(
    repo: &R,
    company_id: CompanyId,
    opportunity_id: OpportunityId,
    form: OpportunitySplitsForm,
) -> ServiceResult<Vec<OpportunitySplit>>
where
    R: OpportunityReader + UserReader + SplitReader + SplitWriter + ?Sized,
{
    let payload = OpportunitySplitsPayload::try_from(form)?;
    let opportunity = repo
        .get_opportunity_by_id(opportunity_id, company_id)?
        .ok_or(ServiceError::NotFound)?;
    let split_type = repo
        .get_split_type_by_id(payload.split_type_id, company_id)?
        .ok_or_else(|| {
            ServiceError::Form(format!("unknown split type {}", payload.split_type_id))
        })?;

    for share in &payload.shares {
        if repo.get_user_by_id(share.user_id, company_id)?.is_none() {
            return Err(ServiceError::Form(format!("unknown user {}", share.user_id)));
        }
    }

    if split_type.totals_100_percent
        && !totals_hundred(payload.shares.iter().map(|s| s.percentage))
    {
        let total: f64 = payload.shares.iter().map(|s| s.percentage).sum();
        return Err(ServiceError::Form(format!(
            "{} splits must total 100%, got {total}%",
            split_type.label
        )));
    }

    let splits = payload
        .shares
        .iter()
        .map(|s| NewOpportunitySplit::share(&split_type, &opportunity, s.user_id, s.percentage))
        .collect::<Vec<_>>();

    repo.replace_opportunity_splits(opportunity.id, split_type.id, &splits)
        .map_err(|e| {
            log::error!("Failed to save splits of opportunity {opportunity_id}: {e}");
            ServiceError::from(e)
        })
}

pub fn list_opportunity_splits<R>(
    repo: &R,
    company_id: CompanyId,
    opportunity_id: OpportunityId,
) -> ServiceResult<Vec<OpportunitySplit>>
where
    R: OpportunityReader + SplitReader + ?Sized,
{
    if repo.get_opportunity_by_id(opportunity_id, company_id)?.is_none() {
        return Err(ServiceError::NotFound);
    }
    Ok(repo.list_opportunity_splits(opportunity_id, None)?)
}

/// Gives the owner a share under every active revenue split type they are
/// missing from.
///
/// A new owner of an existing opportunity joins at 0%; otherwise the owner
/// takes whatever percentage is still unallocated. Returns the number of
/// splits created.
pub fn sync_owner_splits<R>(
    repo: &R,
    opportunity: &Opportunity,
    owner_changed: bool,
) -> ServiceResult<usize>
where
    R: SplitReader + SplitWriter + ?Sized,
{
    let revenue_types = repo
        .list_split_types(opportunity.company_id, true)?
        .into_iter()
        .filter(|t| t.totals_100_percent);

    let mut created = 0;
    for split_type in revenue_types {
        let splits = repo.list_opportunity_splits(opportunity.id, Some(split_type.id))?;
        if splits.iter().any(|s| s.user_id == opportunity.owner_id) {
            continue;
        }

        let percentage = if owner_changed {
            0.0
        } else {
            let allocated: f64 = splits.iter().map(|s| s.percentage).sum();
            if allocated >= 100.0 - PERCENT_TOLERANCE {
                continue;
            }
            100.0 - allocated
        };

        repo.create_opportunity_split(&NewOpportunitySplit::share(
            &split_type,
            opportunity,
            opportunity.owner_id,
            percentage,
        ))?;
        log::info!(
            "Owner {} joined {} split of opportunity {} at {percentage}%",
            opportunity.owner_id,
            split_type.label,
            opportunity.id
        );
        created += 1;
    }

    Ok(created)
}
