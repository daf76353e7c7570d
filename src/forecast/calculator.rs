//! Aggregates matching opportunities into forecast buckets.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;

use crate::domain::fiscal_year::{FiscalYear, Period};
use crate::domain::forecast::{
    Forecast, ForecastType, ForecastValues, NewForecast, forecast_name,
};
use crate::domain::opportunity::Opportunity;
use crate::domain::types::{
    CompanyId, ForecastCategory, ForecastMeasure, ForecastTypeId, PeriodId, StageType, UserId,
};
use crate::forecast::condition::CompiledConditions;
use crate::repository::{
    ForecastListQuery, ForecastStore, ForecastValuesUpdate, OpportunityListQuery,
};
use crate::services::ServiceResult;

pub const DEFAULT_BATCH_SIZE: usize = 500;

fn measure(opportunity: &Opportunity, measure: ForecastMeasure) -> f64 {
    match measure {
        ForecastMeasure::Amount => opportunity.amount.unwrap_or(0.0),
        ForecastMeasure::ExpectedRevenue => opportunity.expected_revenue.unwrap_or(0.0),
        ForecastMeasure::Quantity => 1.0,
    }
}

/// Sums already filtered opportunities into the five forecast columns.
///
/// Category columns respect the type's include flags. `actual` counts every
/// opportunity in a won stage.
pub fn calculate_values<'a, I>(opportunities: I, forecast_type: &ForecastType) -> ForecastValues
where
    I: IntoIterator<Item = &'a Opportunity>,
{
    let include = forecast_type.include;
    let mut values = ForecastValues::default();

    for opportunity in opportunities {
        let value = measure(opportunity, forecast_type.measure);
        let category = opportunity.forecast_category;
        if include.includes(category) {
            match category {
                ForecastCategory::Pipeline => values.pipeline += value,
                ForecastCategory::BestCase => values.best_case += value,
                ForecastCategory::Commit => values.commit += value,
                ForecastCategory::Closed => values.closed += value,
                ForecastCategory::Omitted => {}
            }
        }
        if opportunity.stage.stage_type == StageType::Won {
            values.actual += value;
        }
    }

    values
}

/// Counts produced by a bulk run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub created: usize,
    pub updated: usize,
}

impl BulkOutcome {
    fn absorb(&mut self, other: BulkOutcome) {
        self.created += other.created;
        self.updated += other.updated;
    }
}

/// Forecast computation for one company, optionally bound to a fiscal year.
///
/// Compiled conditions are cached per forecast type for the life of the
/// calculator.
pub struct ForecastCalculator<'a, R: ?Sized> {
    repo: &'a R,
    company_id: CompanyId,
    fiscal_year: Option<FiscalYear>,
    batch_size: usize,
    conditions: HashMap<ForecastTypeId, CompiledConditions>,
}

impl<'a, R> ForecastCalculator<'a, R>
where
    R: ForecastStore + ?Sized,
{
    pub fn new(repo: &'a R, company_id: CompanyId) -> Self {
        Self {
            repo,
            company_id,
            fiscal_year: None,
            batch_size: DEFAULT_BATCH_SIZE,
            conditions: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_fiscal_year(mut self, fiscal_year: FiscalYear) -> Self {
        self.fiscal_year = Some(fiscal_year);
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn conditions_for(&mut self, forecast_type: &ForecastType) -> ServiceResult<&CompiledConditions> {
        match self.conditions.entry(forecast_type.id) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let rows = self.repo.list_forecast_conditions(forecast_type.id)?;
                let compiled = CompiledConditions::compile(&rows).map_err(|e| {
                    log::error!(
                        "Failed to compile conditions of forecast type {}: {e}",
                        forecast_type.id
                    );
                    e
                })?;
                Ok(&*entry.insert(compiled))
            }
        }
    }

    fn load_opportunities(
        &mut self,
        owners: impl IntoIterator<Item = UserId>,
        from: NaiveDate,
        to: NaiveDate,
        forecast_type: &ForecastType,
    ) -> ServiceResult<Vec<Opportunity>> {
        let query = OpportunityListQuery::new(self.company_id)
            .owners(owners)
            .closing_between(from, to);
        let opportunities = self.repo.list_opportunities(query)?;
        let conditions = self.conditions_for(forecast_type)?;
        Ok(opportunities
            .into_iter()
            .filter(|o| conditions.matches(o))
            .collect())
    }

    /// Values of one owner's bucket for `period`.
    pub fn calculate_forecast_values(
        &mut self,
        owner_id: UserId,
        period: &Period,
        forecast_type: &ForecastType,
    ) -> ServiceResult<ForecastValues> {
        let opportunities =
            self.load_opportunities([owner_id], period.start_date, period.end_date, forecast_type)?;
        Ok(calculate_values(&opportunities, forecast_type))
    }

    fn target_for(
        &self,
        owner_id: UserId,
        forecast_type: &ForecastType,
        period: &Period,
    ) -> ServiceResult<f64> {
        let targets =
            self.repo
                .list_forecast_targets(forecast_type.id, &[owner_id], &[period.id])?;
        Ok(targets.first().map_or(0.0, |t| t.target))
    }

    /// Creates the bucket or refreshes its values; a missing target is
    /// filled from the configured forecast targets.
    pub fn create_or_update_period_forecast(
        &mut self,
        owner_id: UserId,
        forecast_type: &ForecastType,
        period: &Period,
    ) -> ServiceResult<Forecast> {
        let values = self.calculate_forecast_values(owner_id, period, forecast_type)?;

        match self.repo.get_forecast(owner_id, forecast_type.id, period.id)? {
            Some(mut forecast) => {
                if forecast.target == 0.0 {
                    forecast.target = self.target_for(owner_id, forecast_type, period)?;
                }
                forecast.values = values;
                self.repo.update_forecast_values(
                    &[ForecastValuesUpdate {
                        id: forecast.id,
                        target: forecast.target,
                        values,
                    }],
                    self.batch_size,
                )?;
                Ok(forecast)
            }
            None => {
                let target = self.target_for(owner_id, forecast_type, period)?;
                let forecast = self.repo.create_forecast(&NewForecast {
                    company_id: self.company_id,
                    owner_id,
                    forecast_type_id: forecast_type.id,
                    fiscal_year_id: period.fiscal_year_id,
                    quarter_id: period.quarter_id,
                    period_id: period.id,
                    name: forecast_name(forecast_type, &period.name),
                    target,
                    values,
                })?;
                Ok(forecast)
            }
        }
    }

    /// Every period of the bound fiscal year for one owner; all active types
    /// when `forecast_type` is `None`.
    pub fn generate_forecasts_for_user(
        &mut self,
        owner_id: UserId,
        forecast_type: Option<&ForecastType>,
    ) -> ServiceResult<Vec<Forecast>> {
        let Some(fiscal_year) = self.fiscal_year.clone() else {
            log::warn!(
                "No fiscal year bound for company {}; skipping forecasts of user {owner_id}",
                self.company_id
            );
            return Ok(Vec::new());
        };

        let periods = self.repo.list_periods(fiscal_year.id)?;
        let types = match forecast_type {
            Some(t) => vec![t.clone()],
            None => self.repo.list_forecast_types(self.company_id, true)?,
        };

        let mut forecasts = Vec::with_capacity(periods.len() * types.len());
        for forecast_type in &types {
            for period in &periods {
                forecasts.push(self.create_or_update_period_forecast(
                    owner_id,
                    forecast_type,
                    period,
                )?);
            }
        }
        Ok(forecasts)
    }

    /// Recomputes stored buckets of one forecast type with a single
    /// opportunity query, writing only the rows whose values or missing
    /// target changed. Returns the number of rows written.
    pub fn bulk_calculate_forecast_values(
        &mut self,
        forecasts: &[Forecast],
        forecast_type: &ForecastType,
        periods: &[Period],
    ) -> ServiceResult<usize> {
        let periods_by_id = periods
            .iter()
            .map(|p| (p.id, p))
            .collect::<HashMap<PeriodId, &Period>>();
        let forecasts = forecasts
            .iter()
            .filter(|f| {
                let known = periods_by_id.contains_key(&f.period_id);
                if !known {
                    log::warn!("Forecast {} refers to an unknown period; skipped", f.id);
                }
                known
            })
            .collect::<Vec<_>>();
        if forecasts.is_empty() {
            return Ok(0);
        }

        let owners = forecasts
            .iter()
            .map(|f| f.owner_id)
            .collect::<BTreeSet<UserId>>();
        let involved = forecasts
            .iter()
            .map(|f| periods_by_id[&f.period_id])
            .collect::<Vec<_>>();
        let (from, to) = involved.iter().fold(
            (involved[0].start_date, involved[0].end_date),
            |(from, to), p| (from.min(p.start_date), to.max(p.end_date)),
        );

        let opportunities =
            self.load_opportunities(owners.iter().copied(), from, to, forecast_type)?;

        let mut sorted_periods = involved.clone();
        sorted_periods.sort_by_key(|p| p.start_date);
        sorted_periods.dedup_by_key(|p| p.id);

        let mut buckets: HashMap<(UserId, PeriodId), Vec<&Opportunity>> = HashMap::new();
        for opportunity in &opportunities {
            if let Some(period) = sorted_periods.iter().find(|p| p.contains(opportunity.close_date))
            {
                buckets
                    .entry((opportunity.owner_id, period.id))
                    .or_default()
                    .push(opportunity);
            }
        }

        let needs_target = forecasts
            .iter()
            .filter(|f| f.target == 0.0)
            .collect::<Vec<_>>();
        let targets = if needs_target.is_empty() {
            HashMap::new()
        } else {
            let target_owners = needs_target
                .iter()
                .map(|f| f.owner_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>();
            let target_periods = needs_target
                .iter()
                .map(|f| f.period_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>();
            self.repo
                .list_forecast_targets(forecast_type.id, &target_owners, &target_periods)?
                .into_iter()
                .map(|t| ((t.assigned_to, t.period_id), t.target))
                .collect::<HashMap<_, _>>()
        };

        let mut updates = Vec::new();
        for forecast in forecasts {
            let key = (forecast.owner_id, forecast.period_id);
            let values = buckets
                .get(&key)
                .map(|items| calculate_values(items.iter().copied(), forecast_type))
                .unwrap_or_default();
            let target = if forecast.target == 0.0 {
                targets.get(&key).copied().unwrap_or(0.0)
            } else {
                forecast.target
            };

            if values.differs_from(&forecast.values) || target != forecast.target {
                updates.push(ForecastValuesUpdate {
                    id: forecast.id,
                    target,
                    values,
                });
            }
        }

        if updates.is_empty() {
            return Ok(0);
        }
        Ok(self.repo.update_forecast_values(&updates, self.batch_size)?)
    }

    /// Inserts buckets for the (owner, period) pairs that have none yet and
    /// computes their values. Returns the number of buckets created.
    pub fn bulk_create_missing_forecasts(
        &mut self,
        forecast_type: &ForecastType,
        owners: &[UserId],
        periods: &[Period],
    ) -> ServiceResult<usize> {
        if owners.is_empty() || periods.is_empty() {
            return Ok(0);
        }

        let period_ids = periods.iter().map(|p| p.id).collect::<Vec<_>>();
        let existing = self
            .repo
            .list_forecasts(
                ForecastListQuery::new()
                    .company(self.company_id)
                    .forecast_type(forecast_type.id)
                    .periods(period_ids.iter().copied()),
            )?
            .into_iter()
            .map(|f| (f.owner_id, f.period_id))
            .collect::<HashSet<_>>();

        let missing = owners
            .iter()
            .flat_map(|owner| periods.iter().map(move |period| (*owner, period)))
            .filter(|(owner, period)| !existing.contains(&(*owner, period.id)))
            .collect::<Vec<_>>();
        if missing.is_empty() {
            return Ok(0);
        }

        let targets = self
            .repo
            .list_forecast_targets(forecast_type.id, owners, &period_ids)?
            .into_iter()
            .map(|t| ((t.assigned_to, t.period_id), t.target))
            .collect::<HashMap<_, _>>();

        let new_forecasts = missing
            .iter()
            .map(|(owner, period)| NewForecast {
                company_id: self.company_id,
                owner_id: *owner,
                forecast_type_id: forecast_type.id,
                fiscal_year_id: period.fiscal_year_id,
                quarter_id: period.quarter_id,
                period_id: period.id,
                name: forecast_name(forecast_type, &period.name),
                target: targets.get(&(*owner, period.id)).copied().unwrap_or(0.0),
                values: ForecastValues::default(),
            })
            .collect::<Vec<_>>();
        let created = self.repo.create_forecasts(&new_forecasts, self.batch_size)?;

        let missing_keys = missing
            .iter()
            .map(|(owner, period)| (*owner, period.id))
            .collect::<HashSet<_>>();
        let fresh = self
            .repo
            .list_forecasts(
                ForecastListQuery::new()
                    .company(self.company_id)
                    .forecast_type(forecast_type.id)
                    .periods(period_ids),
            )?
            .into_iter()
            .filter(|f| missing_keys.contains(&(f.owner_id, f.period_id)))
            .collect::<Vec<_>>();
        self.bulk_calculate_forecast_values(&fresh, forecast_type, periods)?;

        Ok(created)
    }

    /// Creates missing buckets and refreshes existing ones for every active
    /// forecast type. `owners` defaults to the company's active users and
    /// `periods` to every period of the bound fiscal year.
    pub fn bulk_generate_forecasts(
        &mut self,
        owners: Option<Vec<UserId>>,
        periods: Option<Vec<Period>>,
    ) -> ServiceResult<BulkOutcome> {
        let periods = match periods {
            Some(periods) => periods,
            None => match &self.fiscal_year {
                Some(fiscal_year) => self.repo.list_periods(fiscal_year.id)?,
                None => {
                    log::warn!(
                        "No fiscal year bound for company {}; nothing to generate",
                        self.company_id
                    );
                    return Ok(BulkOutcome::default());
                }
            },
        };
        let owners = match owners {
            Some(owners) => owners,
            None => self
                .repo
                .list_active_users(self.company_id)?
                .into_iter()
                .map(|u| u.id)
                .collect(),
        };
        if owners.is_empty() || periods.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let owner_set = owners.iter().copied().collect::<HashSet<_>>();
        let mut outcome = BulkOutcome::default();
        for forecast_type in self.repo.list_forecast_types(self.company_id, true)? {
            let existing = self
                .repo
                .list_forecasts(
                    ForecastListQuery::new()
                        .company(self.company_id)
                        .forecast_type(forecast_type.id)
                        .periods(periods.iter().map(|p| p.id)),
                )?
                .into_iter()
                .filter(|f| owner_set.contains(&f.owner_id))
                .collect::<Vec<_>>();

            let step = BulkOutcome {
                updated: self.bulk_calculate_forecast_values(&existing, &forecast_type, &periods)?,
                created: self.bulk_create_missing_forecasts(&forecast_type, &owners, &periods)?,
            };
            log::info!(
                "Forecast type {}: {} created, {} updated",
                forecast_type.name,
                step.created,
                step.updated
            );
            outcome.absorb(step);
        }

        Ok(outcome)
    }

    /// Ensures every active user has a complete set of buckets for the
    /// bound fiscal year.
    pub fn ensure_company_forecasts(&mut self) -> ServiceResult<BulkOutcome> {
        self.bulk_generate_forecasts(None, None)
    }
}
