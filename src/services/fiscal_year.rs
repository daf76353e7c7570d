//! Fiscal calendar configuration, generation and yearly rollover.

use chrono::NaiveDate;

use crate::domain::fiscal_year::{
    CalendarSettings, FiscalYear, FiscalYearConfig, NewFiscalYearConfig,
};
use crate::domain::types::CompanyId;
use crate::dto::fiscal_year::{RolloverOutcome, RolloverReport};
use crate::fiscal::{
    PlannedYear, current_index, generate_fiscal_year, plan_fiscal_years, plan_rollover,
};
use crate::forms::fiscal_year::{FiscalYearConfigForm, FiscalYearConfigPayload};
use crate::repository::{FiscalYearReader, FiscalYearWriter};
use crate::services::{ServiceError, ServiceResult};

pub fn save_fiscal_year_config<R>(
    repo: &R,
    company_id: CompanyId,
    form: FiscalYearConfigForm,
) -> ServiceResult<FiscalYearConfig>
where
    R: FiscalYearWriter + ?Sized,
{
    let payload = FiscalYearConfigPayload::try_from(form)?;
    repo.save_fiscal_year_config(&payload.into_domain(company_id))
        .map_err(|e| {
            log::error!("Failed to save fiscal year config of company {company_id}: {e}");
            ServiceError::from(e)
        })
}

/// The company configuration, saved with calendar defaults when missing.
pub fn get_or_create_config<R>(repo: &R, company_id: CompanyId) -> ServiceResult<FiscalYearConfig>
where
    R: FiscalYearReader + FiscalYearWriter + ?Sized,
{
    if let Some(config) = repo.get_fiscal_year_config(company_id)? {
        return Ok(config);
    }
    log::info!("Creating default fiscal year config for company {company_id}");
    Ok(repo.save_fiscal_year_config(&NewFiscalYearConfig {
        company_id,
        settings: CalendarSettings::default(),
    })?)
}

/// Creates `count` consecutive years from `first_year` and flags the one
/// containing `today` as current.
///
/// New years are chained onto the stored ones: a slot that meets an existing
/// year keeps it, so no two years of a config ever overlap. Returns the
/// years created by this call.
pub fn generate_fiscal_years<R>(
    repo: &R,
    company_id: CompanyId,
    first_year: i32,
    count: usize,
    today: NaiveDate,
) -> ServiceResult<Vec<FiscalYear>>
where
    R: FiscalYearReader + FiscalYearWriter + ?Sized,
{
    let config = get_or_create_config(repo, company_id)?;
    let existing = repo.list_fiscal_years(config.id)?;
    let planned = plan_fiscal_years(&config, first_year, count, &existing)?;
    let current = current_index(&planned, today);

    let mut created = Vec::new();
    let mut current_id = None;
    for (index, slot) in planned.into_iter().enumerate() {
        let id = match slot {
            PlannedYear::Stored(found) => {
                log::info!("Fiscal year {} already covers {}", found.name, found.start_date);
                found.id
            }
            PlannedYear::New(year) => {
                let stored = repo.create_fiscal_year(&year)?;
                log::info!("Created fiscal year {}", stored.name);
                let id = stored.id;
                created.push(stored);
                id
            }
        };
        if index == current {
            current_id = Some(id);
        }
    }

    if let Some(fiscal_year_id) = current_id {
        repo.set_current_fiscal_year(config.id, fiscal_year_id)?;
    }

    Ok(created)
}

fn roll_over<R>(repo: &R, config: &FiscalYearConfig, today: NaiveDate) -> ServiceResult<Option<RolloverOutcome>>
where
    R: FiscalYearReader + FiscalYearWriter + ?Sized,
{
    let years = repo.list_fiscal_years(config.id)?;
    let Some(current) = years.iter().find(|y| y.is_current) else {
        return Ok(None);
    };

    let plan = plan_rollover(today, current, &years);
    let mut outcome = RolloverOutcome {
        company_id: config.company_id,
        promoted: None,
        created: None,
    };

    if let Some(next) = plan.promote {
        repo.set_current_fiscal_year(config.id, next)?;
        log::info!("Fiscal year {next} is now current for company {}", config.company_id);
        outcome.promoted = Some(next);
    }
    if let Some(start) = plan.create_from {
        let year = repo.create_fiscal_year(&generate_fiscal_year(config, start, false)?)?;
        log::info!("Created fiscal year {} for company {}", year.name, config.company_id);
        outcome.created = Some(year.id);
    }

    Ok(Some(outcome))
}

/// Moves every company past the end of its current fiscal year onto the
/// next one and keeps one future year generated.
///
/// A company that fails is logged and counted; the others still roll over.
pub fn update_fiscal_years<R>(repo: &R, today: NaiveDate) -> ServiceResult<RolloverReport>
where
    R: FiscalYearReader + FiscalYearWriter + ?Sized,
{
    let mut report = RolloverReport::default();

    for config in repo.list_fiscal_year_configs()? {
        match roll_over(repo, &config, today) {
            Ok(Some(outcome)) => {
                if outcome.promoted.is_some() || outcome.created.is_some() {
                    report.outcomes.push(outcome);
                }
            }
            Ok(None) => {
                log::warn!("Company {} has no current fiscal year", config.company_id);
                report.skipped += 1;
            }
            Err(e) => {
                log::error!(
                    "Failed to roll over fiscal year of company {}: {e}",
                    config.company_id
                );
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
