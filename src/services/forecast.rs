//! Forecast configuration, generation and recalculation.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::domain::fiscal_year::{FiscalYear, Period};
use crate::domain::forecast::{Forecast, ForecastType, ForecastValues};
use crate::domain::types::{CompanyId, FiscalYearId, ForecastTypeId, PeriodId, UserId};
use crate::dto::forecast::{ForecastChange, RecalculationReport};
use crate::forecast::calculator::{BulkOutcome, DEFAULT_BATCH_SIZE, ForecastCalculator};
use crate::forms::forecast_target::{ForecastTargetForm, ForecastTargetPayload};
use crate::forms::forecast_type::{ForecastTypeForm, ForecastTypePayload};
use crate::repository::{
    FiscalYearReader, ForecastListQuery, ForecastReader, ForecastStore, ForecastValuesUpdate,
    ForecastWriter, UserReader,
};
use crate::services::{ServiceError, ServiceResult};

/// Narrows which stored buckets a recalculation touches.
#[derive(Debug, Clone, Default)]
pub struct RecalculationFilter {
    pub company_id: Option<CompanyId>,
    pub owner_id: Option<UserId>,
    pub fiscal_year_id: Option<FiscalYearId>,
    pub forecast_type_id: Option<ForecastTypeId>,
}

impl From<&RecalculationFilter> for ForecastListQuery {
    fn from(filter: &RecalculationFilter) -> Self {
        ForecastListQuery {
            company_id: filter.company_id,
            owner_id: filter.owner_id,
            fiscal_year_id: filter.fiscal_year_id,
            forecast_type_id: filter.forecast_type_id,
            period_ids: None,
        }
    }
}

/// Lookups shared by every bucket of a recalculation run.
struct RecalculationContext<'a, R: ?Sized> {
    repo: &'a R,
    calculators: HashMap<CompanyId, ForecastCalculator<'a, R>>,
    types: HashMap<ForecastTypeId, Option<ForecastType>>,
    periods: HashMap<PeriodId, Option<Period>>,
}

impl<'a, R> RecalculationContext<'a, R>
where
    R: ForecastStore + ?Sized,
{
    fn new(repo: &'a R) -> Self {
        Self {
            repo,
            calculators: HashMap::new(),
            types: HashMap::new(),
            periods: HashMap::new(),
        }
    }

    fn recompute(&mut self, forecast: &Forecast) -> ServiceResult<ForecastValues> {
        let company_id = forecast.company_id;
        let repo = self.repo;

        let forecast_type = match self.types.entry(forecast.forecast_type_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(repo.get_forecast_type_by_id(forecast.forecast_type_id, company_id)?)
            }
        }
        .clone()
        .ok_or(ServiceError::NotFound)?;

        let period = match self.periods.entry(forecast.period_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(repo.get_period_by_id(forecast.period_id, company_id)?),
        }
        .clone()
        .ok_or(ServiceError::NotFound)?;

        self.calculators
            .entry(company_id)
            .or_insert_with(|| ForecastCalculator::new(repo, company_id))
            .calculate_forecast_values(forecast.owner_id, &period, &forecast_type)
    }
}

/// Recomputes stored buckets matching `filter`, writing only the ones whose
/// values moved. With `dry_run` nothing is written.
///
/// Buckets are processed per (owner, fiscal year) group in owner and period
/// order; a failing bucket is counted and the run continues.
pub fn recalculate_forecasts<R>(
    repo: &R,
    filter: &RecalculationFilter,
    dry_run: bool,
    batch_size: usize,
) -> ServiceResult<RecalculationReport>
where
    R: ForecastStore + ?Sized,
{
    let forecasts = repo.list_forecasts(filter.into())?;
    let mut report = RecalculationReport {
        dry_run,
        ..RecalculationReport::default()
    };
    if forecasts.is_empty() {
        log::warn!("No forecasts found to recalculate");
        return Ok(report);
    }
    log::info!("Found {} forecasts to recalculate", forecasts.len());

    let mut groups: Vec<((UserId, FiscalYearId), Vec<&Forecast>)> = Vec::new();
    for forecast in &forecasts {
        let key = (forecast.owner_id, forecast.fiscal_year_id);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, items)) => items.push(forecast),
            None => groups.push((key, vec![forecast])),
        }
    }

    let mut context = RecalculationContext::new(repo);
    for ((owner_id, fiscal_year_id), items) in groups {
        log::info!("Processing owner {owner_id}, fiscal year {fiscal_year_id}");

        let mut updates = Vec::new();
        for forecast in items {
            match context.recompute(forecast) {
                Ok(values) => {
                    report.processed += 1;
                    if values.differs_from(&forecast.values) {
                        let change = ForecastChange {
                            forecast_id: forecast.id,
                            owner_id,
                            name: forecast.name.clone(),
                            before: forecast.values,
                            after: values,
                        };
                        for (column, old, new) in change.changed_columns() {
                            log::info!("{}: {column} {old} -> {new}", forecast.name);
                        }
                        report.changes.push(change);
                        updates.push(ForecastValuesUpdate {
                            id: forecast.id,
                            target: forecast.target,
                            values,
                        });
                    }
                }
                Err(e) => {
                    report.errors += 1;
                    log::error!("Failed to recalculate forecast {}: {e}", forecast.id);
                }
            }
        }

        if updates.is_empty() {
            continue;
        }
        if dry_run {
            report.changed += updates.len();
            continue;
        }
        match repo.update_forecast_values(&updates, batch_size) {
            Ok(_) => report.changed += updates.len(),
            Err(e) => {
                log::error!("Failed to save forecasts of owner {owner_id}: {e}");
                report.processed -= updates.len();
                report.errors += updates.len();
            }
        }
    }

    Ok(report)
}

fn resolve_fiscal_year<R>(
    repo: &R,
    company_id: CompanyId,
    fiscal_year_id: Option<FiscalYearId>,
) -> ServiceResult<FiscalYear>
where
    R: FiscalYearReader + ?Sized,
{
    let fiscal_year = match fiscal_year_id {
        Some(id) => repo.get_fiscal_year_by_id(id, company_id)?,
        None => repo.get_current_fiscal_year(company_id)?,
    };
    fiscal_year.ok_or(ServiceError::NotFound)
}

/// Creates missing buckets and refreshes existing ones for every active
/// user, period and forecast type of the fiscal year (current by default).
pub fn generate_forecasts<R>(
    repo: &R,
    company_id: CompanyId,
    fiscal_year_id: Option<FiscalYearId>,
    batch_size: usize,
) -> ServiceResult<BulkOutcome>
where
    R: ForecastStore + ?Sized,
{
    let fiscal_year = resolve_fiscal_year(repo, company_id, fiscal_year_id)?;
    log::info!("Generating forecasts for {}", fiscal_year.name);

    ForecastCalculator::new(repo, company_id)
        .with_fiscal_year(fiscal_year)
        .with_batch_size(batch_size)
        .ensure_company_forecasts()
}

/// Creates or refreshes every bucket of one user in the fiscal year.
pub fn generate_forecasts_for_user<R>(
    repo: &R,
    company_id: CompanyId,
    owner_id: UserId,
    fiscal_year_id: Option<FiscalYearId>,
) -> ServiceResult<Vec<Forecast>>
where
    R: ForecastStore + ?Sized,
{
    if repo.get_user_by_id(owner_id, company_id)?.is_none() {
        return Err(ServiceError::NotFound);
    }
    let fiscal_year = resolve_fiscal_year(repo, company_id, fiscal_year_id)?;

    ForecastCalculator::new(repo, company_id)
        .with_fiscal_year(fiscal_year)
        .generate_forecasts_for_user(owner_id, None)
}

pub fn create_forecast_type<R>(
    repo: &R,
    company_id: CompanyId,
    form: ForecastTypeForm,
) -> ServiceResult<ForecastType>
where
    R: ForecastWriter + ?Sized,
{
    let payload = ForecastTypePayload::try_from(form)?;
    let (forecast_type, conditions) = payload.into_domain(company_id);

    repo.create_forecast_type(&forecast_type, &conditions)
        .map_err(|e| {
            log::error!("Failed to create forecast type: {e}");
            ServiceError::from(e)
        })
}

/// Saves the targets and copies them onto buckets that already exist.
pub fn create_forecast_targets<R>(
    repo: &R,
    company_id: CompanyId,
    form: ForecastTargetForm,
) -> ServiceResult<usize>
where
    R: ForecastReader + ForecastWriter + FiscalYearReader + UserReader + ?Sized,
{
    let payload = ForecastTargetPayload::try_from(form)?;

    if repo
        .get_forecast_type_by_id(payload.forecast_type_id, company_id)?
        .is_none()
    {
        return Err(ServiceError::Form(format!(
            "unknown forecast type {}",
            payload.forecast_type_id
        )));
    }
    if repo.get_period_by_id(payload.period_id, company_id)?.is_none() {
        return Err(ServiceError::Form(format!(
            "unknown period {}",
            payload.period_id
        )));
    }
    for user_id in &payload.user_ids {
        if repo.get_user_by_id(*user_id, company_id)?.is_none() {
            return Err(ServiceError::Form(format!("unknown user {user_id}")));
        }
    }

    let targets = payload.into_domain(company_id);
    let saved = repo.save_forecast_targets(&targets)?;

    let mut updates = Vec::new();
    for target in &targets {
        if let Some(forecast) =
            repo.get_forecast(target.assigned_to, target.forecast_type_id, target.period_id)?
        {
            updates.push(ForecastValuesUpdate {
                id: forecast.id,
                target: target.target,
                values: forecast.values,
            });
        }
    }
    if !updates.is_empty() {
        repo.update_forecast_values(&updates, DEFAULT_BATCH_SIZE)?;
    }

    Ok(saved)
}

pub fn list_forecasts<R>(
    repo: &R,
    company_id: CompanyId,
    fiscal_year_id: Option<FiscalYearId>,
    owner_id: Option<UserId>,
) -> ServiceResult<Vec<Forecast>>
where
    R: ForecastReader + ?Sized,
{
    let mut query = ForecastListQuery::new().company(company_id);
    if let Some(id) = fiscal_year_id {
        query = query.fiscal_year(id);
    }
    if let Some(id) = owner_id {
        query = query.owner(id);
    }
    Ok(repo.list_forecasts(query)?)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::forecast::CategoryFlags;
    use crate::domain::types::{ForecastId, ForecastMeasure, ForecastTypeName, QuarterId};
    use crate::repository::mock::MockRepository;
    use chrono::NaiveDate;

    fn company() -> CompanyId {
        CompanyId::new(1).expect("valid company")
    }

    fn forecast(id: i32, pipeline: f64) -> Forecast {
        Forecast {
            id: ForecastId::new(id).expect("valid id"),
            company_id: company(),
            owner_id: UserId::new(1).expect("valid owner"),
            forecast_type_id: ForecastTypeId::new(1).expect("valid type"),
            fiscal_year_id: FiscalYearId::new(1).expect("valid year"),
            quarter_id: QuarterId::new(1).expect("valid quarter"),
            period_id: PeriodId::new(1).expect("valid period"),
            name: format!("Revenue - P{id} 2025"),
            target: 0.0,
            values: ForecastValues {
                pipeline,
                ..ForecastValues::default()
            },
            updated_at: chrono::Utc::now().naive_utc(),
        }
    }

    fn forecast_type() -> ForecastType {
        ForecastType {
            id: ForecastTypeId::new(1).expect("valid type"),
            company_id: company(),
            name: ForecastTypeName::new("Revenue").expect("valid name"),
            measure: ForecastMeasure::Amount,
            include: CategoryFlags::default(),
            is_active: true,
            description: None,
        }
    }

    fn period() -> Period {
        Period {
            id: PeriodId::new(1).expect("valid period"),
            company_id: company(),
            fiscal_year_id: FiscalYearId::new(1).expect("valid year"),
            quarter_id: QuarterId::new(1).expect("valid quarter"),
            quarter_number: 1,
            period_number: 1,
            name: "P1 2025".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 31).expect("valid date"),
        }
    }

    fn repo_with(forecasts: Vec<Forecast>) -> MockRepository {
        let mut repo = MockRepository::new();
        repo.expect_list_forecasts()
            .returning(move |_| Ok(forecasts.clone()));
        repo.expect_get_forecast_type_by_id()
            .returning(|_, _| Ok(Some(forecast_type())));
        repo.expect_get_period_by_id()
            .returning(|_, _| Ok(Some(period())));
        repo.expect_list_forecast_conditions()
            .returning(|_| Ok(Vec::new()));
        // No opportunities: every bucket recomputes to zero.
        repo.expect_list_opportunities().returning(|_| Ok(Vec::new()));
        repo
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let mut repo = repo_with(vec![forecast(1, 100.0), forecast(2, 0.0)]);
        repo.expect_update_forecast_values().never();

        let report = recalculate_forecasts(&repo, &RecalculationFilter::default(), true, 500)
            .expect("report");
        assert_eq!(report.processed, 2);
        assert_eq!(report.changed, 1);
        assert_eq!(report.changes[0].after, ForecastValues::default());
    }

    #[test]
    fn only_moved_buckets_are_written() {
        let mut repo = repo_with(vec![forecast(1, 100.0), forecast(2, 0.0)]);
        repo.expect_update_forecast_values()
            .withf(|updates, _| updates.len() == 1 && updates[0].id.get() == 1)
            .times(1)
            .returning(|updates, _| Ok(updates.len()));

        let report = recalculate_forecasts(&repo, &RecalculationFilter::default(), false, 500)
            .expect("report");
        assert_eq!(report.changed, 1);
        assert_eq!(report.errors, 0);
    }

    #[test]
    fn missing_forecast_type_counts_as_error() {
        let mut repo = MockRepository::new();
        repo.expect_list_forecasts()
            .returning(|_| Ok(vec![forecast(1, 5.0)]));
        repo.expect_get_forecast_type_by_id().returning(|_, _| Ok(None));
        repo.expect_update_forecast_values().never();

        let report = recalculate_forecasts(&repo, &RecalculationFilter::default(), false, 500)
            .expect("report");
        assert_eq!(report.errors, 1);
        assert_eq!(report.processed, 0);
    }

    #[test]
    fn targets_for_unknown_users_are_rejected() {
        let mut repo = MockRepository::new();
        repo.expect_get_forecast_type_by_id()
            .returning(|_, _| Ok(Some(forecast_type())));
        repo.expect_get_period_by_id()
            .returning(|_, _| Ok(Some(period())));
        repo.expect_get_user_by_id().returning(|_, _| Ok(None));
        repo.expect_save_forecast_targets().never();

        let result = create_forecast_targets(
            &repo,
            company(),
            ForecastTargetForm {
                forecast_type_id: 1,
                period_id: 1,
                user_ids: vec![4],
                target: 1000.0,
            },
        );
        assert!(matches!(result, Err(ServiceError::Form(_))));
    }
}
