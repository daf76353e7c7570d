use chrono::NaiveDate;

use crate::db::{DbConnection, DbPool};
use crate::domain::{
    fiscal_year::{FiscalYear, FiscalYearConfig, NewFiscalYear, NewFiscalYearConfig, Period},
    forecast::{
        Forecast, ForecastCondition, ForecastTarget, ForecastType, ForecastValues, NewForecast,
        NewForecastCondition, NewForecastTarget, NewForecastType,
    },
    opportunity::{
        NewOpportunity, NewOpportunityStage, Opportunity, OpportunityStage, UpdateOpportunity,
    },
    opportunity_split::{NewOpportunitySplit, NewSplitType, OpportunitySplit, SplitType},
    shortcut_key::{NewShortcutKey, ShortcutKey},
    types::{
        CompanyId, FiscalYearConfigId, FiscalYearId, ForecastId, ForecastTypeId, OpportunityId,
        PageUrl, PeriodId, SplitTypeId, StageId, UserEmail, UserId,
    },
    user::{NewUser, User},
};
use crate::repository::errors::RepositoryResult;

pub mod errors;
pub mod fiscal_year;
pub mod forecast;
#[cfg(feature = "test-mocks")]
pub mod mock;
pub mod opportunity;
pub mod opportunity_split;
pub mod shortcut_key;
pub mod user;

/// Diesel-backed implementation of every repository trait.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}

/// Opportunities of some owners closing inside a date window.
#[derive(Debug, Clone)]
pub struct OpportunityListQuery {
    pub company_id: CompanyId,
    pub owner_ids: Option<Vec<UserId>>,
    pub close_from: Option<NaiveDate>,
    pub close_to: Option<NaiveDate>,
}

impl OpportunityListQuery {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            owner_ids: None,
            close_from: None,
            close_to: None,
        }
    }

    pub fn owners(mut self, owner_ids: impl IntoIterator<Item = UserId>) -> Self {
        self.owner_ids = Some(owner_ids.into_iter().collect());
        self
    }

    /// Inclusive on both ends.
    pub fn closing_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.close_from = Some(from);
        self.close_to = Some(to);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForecastListQuery {
    pub company_id: Option<CompanyId>,
    pub owner_id: Option<UserId>,
    pub fiscal_year_id: Option<FiscalYearId>,
    pub forecast_type_id: Option<ForecastTypeId>,
    pub period_ids: Option<Vec<PeriodId>>,
}

impl ForecastListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn owner(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn fiscal_year(mut self, fiscal_year_id: FiscalYearId) -> Self {
        self.fiscal_year_id = Some(fiscal_year_id);
        self
    }

    pub fn forecast_type(mut self, forecast_type_id: ForecastTypeId) -> Self {
        self.forecast_type_id = Some(forecast_type_id);
        self
    }

    pub fn periods(mut self, period_ids: impl IntoIterator<Item = PeriodId>) -> Self {
        self.period_ids = Some(period_ids.into_iter().collect());
        self
    }
}

/// New values for one stored forecast bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastValuesUpdate {
    pub id: ForecastId,
    pub target: f64,
    pub values: ForecastValues,
}

pub trait UserReader {
    fn get_user_by_id(&self, id: UserId, company_id: CompanyId) -> RepositoryResult<Option<User>>;
    fn get_user_by_email(
        &self,
        email: &UserEmail,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<User>>;
    fn list_active_users(&self, company_id: CompanyId) -> RepositoryResult<Vec<User>>;
}

pub trait UserWriter {
    fn create_or_update_user(&self, new_user: &NewUser) -> RepositoryResult<User>;
}

pub trait OpportunityReader {
    fn get_stage_by_id(
        &self,
        id: StageId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<OpportunityStage>>;
    fn get_opportunity_by_id(
        &self,
        id: OpportunityId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Opportunity>>;
    fn list_opportunities(&self, query: OpportunityListQuery) -> RepositoryResult<Vec<Opportunity>>;
}

pub trait OpportunityWriter {
    fn create_stage(&self, new_stage: &NewOpportunityStage) -> RepositoryResult<OpportunityStage>;
    fn create_opportunity(&self, new_opportunity: &NewOpportunity)
    -> RepositoryResult<Opportunity>;
    fn update_opportunity(
        &self,
        id: OpportunityId,
        company_id: CompanyId,
        updates: &UpdateOpportunity,
    ) -> RepositoryResult<Opportunity>;
    fn delete_opportunity(&self, id: OpportunityId, company_id: CompanyId) -> RepositoryResult<()>;
    /// Multiplies amounts by `rate` and re-derives expected revenue.
    fn scale_opportunity_amounts(
        &self,
        company_id: CompanyId,
        rate: f64,
        batch_size: usize,
    ) -> RepositoryResult<usize>;
}

pub trait FiscalYearReader {
    fn get_fiscal_year_config(
        &self,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<FiscalYearConfig>>;
    fn list_fiscal_year_configs(&self) -> RepositoryResult<Vec<FiscalYearConfig>>;
    fn get_fiscal_year_by_id(
        &self,
        id: FiscalYearId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<FiscalYear>>;
    fn get_current_fiscal_year(&self, company_id: CompanyId)
    -> RepositoryResult<Option<FiscalYear>>;
    /// Ordered by start date.
    fn list_fiscal_years(&self, config_id: FiscalYearConfigId) -> RepositoryResult<Vec<FiscalYear>>;
    /// Ordered by period number.
    fn list_periods(&self, fiscal_year_id: FiscalYearId) -> RepositoryResult<Vec<Period>>;
    fn get_period_by_id(
        &self,
        id: PeriodId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Period>>;
    fn find_period_by_date(
        &self,
        company_id: CompanyId,
        date: NaiveDate,
    ) -> RepositoryResult<Option<Period>>;
}

pub trait FiscalYearWriter {
    fn save_fiscal_year_config(
        &self,
        config: &NewFiscalYearConfig,
    ) -> RepositoryResult<FiscalYearConfig>;
    /// Inserts the year with all its quarters and periods atomically.
    fn create_fiscal_year(&self, fiscal_year: &NewFiscalYear) -> RepositoryResult<FiscalYear>;
    /// Flags `fiscal_year_id` as current and clears the flag on its siblings.
    fn set_current_fiscal_year(
        &self,
        config_id: FiscalYearConfigId,
        fiscal_year_id: FiscalYearId,
    ) -> RepositoryResult<()>;
}

pub trait ForecastReader {
    fn get_forecast_type_by_id(
        &self,
        id: ForecastTypeId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<ForecastType>>;
    fn list_forecast_types(&self, company_id: CompanyId, active_only: bool)
    -> RepositoryResult<Vec<ForecastType>>;
    /// Active conditions ordered by their `order` column.
    fn list_forecast_conditions(
        &self,
        forecast_type_id: ForecastTypeId,
    ) -> RepositoryResult<Vec<ForecastCondition>>;
    /// Active targets of one forecast type for the given owners and periods.
    fn list_forecast_targets(
        &self,
        forecast_type_id: ForecastTypeId,
        owner_ids: &[UserId],
        period_ids: &[PeriodId],
    ) -> RepositoryResult<Vec<ForecastTarget>>;
    fn get_forecast(
        &self,
        owner_id: UserId,
        forecast_type_id: ForecastTypeId,
        period_id: PeriodId,
    ) -> RepositoryResult<Option<Forecast>>;
    fn list_forecasts(&self, query: ForecastListQuery) -> RepositoryResult<Vec<Forecast>>;
}

pub trait ForecastWriter {
    fn create_forecast_type(
        &self,
        forecast_type: &NewForecastType,
        conditions: &[NewForecastCondition],
    ) -> RepositoryResult<ForecastType>;
    /// Inserts or replaces targets keyed by (assignee, period, forecast type).
    fn save_forecast_targets(&self, targets: &[NewForecastTarget]) -> RepositoryResult<usize>;
    fn create_forecast(&self, forecast: &NewForecast) -> RepositoryResult<Forecast>;
    /// Inserts buckets in chunks of `batch_size`, inside one transaction.
    fn create_forecasts(
        &self,
        forecasts: &[NewForecast],
        batch_size: usize,
    ) -> RepositoryResult<usize>;
    fn update_forecast_values(
        &self,
        updates: &[ForecastValuesUpdate],
        batch_size: usize,
    ) -> RepositoryResult<usize>;
    /// Multiplies target and value columns of monetary forecast types.
    fn scale_forecast_values(
        &self,
        company_id: CompanyId,
        rate: f64,
        batch_size: usize,
    ) -> RepositoryResult<usize>;
}

pub trait SplitReader {
    fn get_split_type_by_id(
        &self,
        id: SplitTypeId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<SplitType>>;
    fn list_split_types(&self, company_id: CompanyId, active_only: bool)
    -> RepositoryResult<Vec<SplitType>>;
    /// Splits of one opportunity, optionally narrowed to a split type.
    fn list_opportunity_splits(
        &self,
        opportunity_id: OpportunityId,
        split_type_id: Option<SplitTypeId>,
    ) -> RepositoryResult<Vec<OpportunitySplit>>;
}

pub trait SplitWriter {
    fn create_split_type(&self, split_type: &NewSplitType) -> RepositoryResult<SplitType>;
    fn create_opportunity_split(
        &self,
        split: &NewOpportunitySplit,
    ) -> RepositoryResult<OpportunitySplit>;
    /// Swaps every split of the opportunity under `split_type_id` for
    /// `splits` in one transaction.
    fn replace_opportunity_splits(
        &self,
        opportunity_id: OpportunityId,
        split_type_id: SplitTypeId,
        splits: &[NewOpportunitySplit],
    ) -> RepositoryResult<Vec<OpportunitySplit>>;
}

pub trait ShortcutKeyReader {
    fn list_shortcut_keys(&self, user_id: UserId) -> RepositoryResult<Vec<ShortcutKey>>;
    fn shortcut_key_exists(&self, user_id: UserId, page: &PageUrl) -> RepositoryResult<bool>;
}

pub trait ShortcutKeyWriter {
    /// Inserts or replaces the shortcut bound to (user, page).
    fn save_shortcut_key(&self, shortcut: &NewShortcutKey) -> RepositoryResult<ShortcutKey>;
}

/// Everything the forecast engine reads and writes.
pub trait ForecastStore:
    OpportunityReader + ForecastReader + ForecastWriter + FiscalYearReader + UserReader
{
}

impl<T> ForecastStore for T where
    T: OpportunityReader + ForecastReader + ForecastWriter + FiscalYearReader + UserReader + ?Sized
{
}
