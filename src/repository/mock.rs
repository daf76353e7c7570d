//! Mock repository implementations for isolating services in tests.

use chrono::NaiveDate;
use mockall::mock;

use crate::domain::fiscal_year::{
    FiscalYear, FiscalYearConfig, NewFiscalYear, NewFiscalYearConfig, Period,
};
use crate::domain::forecast::{
    Forecast, ForecastCondition, ForecastTarget, ForecastType, NewForecast, NewForecastCondition,
    NewForecastTarget, NewForecastType,
};
use crate::domain::opportunity::{
    NewOpportunity, NewOpportunityStage, Opportunity, OpportunityStage, UpdateOpportunity,
};
use crate::domain::opportunity_split::{
    NewOpportunitySplit, NewSplitType, OpportunitySplit, SplitType,
};
use crate::domain::shortcut_key::{NewShortcutKey, ShortcutKey};
use crate::domain::types::{
    CompanyId, FiscalYearConfigId, FiscalYearId, ForecastTypeId, OpportunityId, PageUrl,
    PeriodId, SplitTypeId, StageId, UserEmail, UserId,
};
use crate::domain::user::{NewUser, User};
use crate::repository::errors::RepositoryResult;
use crate::repository::{
    FiscalYearReader, FiscalYearWriter, ForecastListQuery, ForecastReader, ForecastValuesUpdate,
    ForecastWriter, OpportunityListQuery, OpportunityReader, OpportunityWriter,
    ShortcutKeyReader, ShortcutKeyWriter, SplitReader, SplitWriter, UserReader, UserWriter,
};

mock! {
    pub Repository {}

    impl UserReader for Repository {
        fn get_user_by_id(&self, id: UserId, company_id: CompanyId) -> RepositoryResult<Option<User>>;
        fn get_user_by_email(
            &self,
            email: &UserEmail,
            company_id: CompanyId,
        ) -> RepositoryResult<Option<User>>;
        fn list_active_users(&self, company_id: CompanyId) -> RepositoryResult<Vec<User>>;
    }

    impl UserWriter for Repository {
        fn create_or_update_user(&self, new_user: &NewUser) -> RepositoryResult<User>;
    }

    impl OpportunityReader for Repository {
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

    impl OpportunityWriter for Repository {
        fn create_stage(&self, new_stage: &NewOpportunityStage) -> RepositoryResult<OpportunityStage>;
        fn create_opportunity(&self, new_opportunity: &NewOpportunity) -> RepositoryResult<Opportunity>;
        fn update_opportunity(
            &self,
            id: OpportunityId,
            company_id: CompanyId,
            updates: &UpdateOpportunity,
        ) -> RepositoryResult<Opportunity>;
        fn delete_opportunity(&self, id: OpportunityId, company_id: CompanyId) -> RepositoryResult<()>;
        fn scale_opportunity_amounts(
            &self,
            company_id: CompanyId,
            rate: f64,
            batch_size: usize,
        ) -> RepositoryResult<usize>;
    }

    impl FiscalYearReader for Repository {
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
        fn get_current_fiscal_year(&self, company_id: CompanyId) -> RepositoryResult<Option<FiscalYear>>;
        fn list_fiscal_years(&self, config_id: FiscalYearConfigId) -> RepositoryResult<Vec<FiscalYear>>;
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

    impl FiscalYearWriter for Repository {
        fn save_fiscal_year_config(
            &self,
            config: &NewFiscalYearConfig,
        ) -> RepositoryResult<FiscalYearConfig>;
        fn create_fiscal_year(&self, fiscal_year: &NewFiscalYear) -> RepositoryResult<FiscalYear>;
        fn set_current_fiscal_year(
            &self,
            config_id: FiscalYearConfigId,
            fiscal_year_id: FiscalYearId,
        ) -> RepositoryResult<()>;
    }

    impl ForecastReader for Repository {
        fn get_forecast_type_by_id(
            &self,
            id: ForecastTypeId,
            company_id: CompanyId,
        ) -> RepositoryResult<Option<ForecastType>>;
        fn list_forecast_types(&self, company_id: CompanyId, active_only: bool) -> RepositoryResult<Vec<ForecastType>>;
        fn list_forecast_conditions(
            &self,
            forecast_type_id: ForecastTypeId,
        ) -> RepositoryResult<Vec<ForecastCondition>>;
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

    impl ForecastWriter for Repository {
        fn create_forecast_type(
            &self,
            forecast_type: &NewForecastType,
            conditions: &[NewForecastCondition],
        ) -> RepositoryResult<ForecastType>;
        fn save_forecast_targets(&self, targets: &[NewForecastTarget]) -> RepositoryResult<usize>;
        fn create_forecast(&self, forecast: &NewForecast) -> RepositoryResult<Forecast>;
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
        fn scale_forecast_values(
            &self,
            company_id: CompanyId,
            rate: f64,
            batch_size: usize,
        ) -> RepositoryResult<usize>;
    }

    impl SplitReader for Repository {
        fn get_split_type_by_id(
            &self,
            id: SplitTypeId,
            company_id: CompanyId,
        ) -> RepositoryResult<Option<SplitType>>;
        fn list_split_types(&self, company_id: CompanyId, active_only: bool) -> RepositoryResult<Vec<SplitType>>;
        fn list_opportunity_splits(
            &self,
            opportunity_id: OpportunityId,
            split_type_id: Option<SplitTypeId>,
        ) -> RepositoryResult<Vec<OpportunitySplit>>;
    }

    impl SplitWriter for Repository {
        fn create_split_type(&self, split_type: &NewSplitType) -> RepositoryResult<SplitType>;
        fn create_opportunity_split(
            &self,
            split: &NewOpportunitySplit,
        ) -> RepositoryResult<OpportunitySplit>;
        fn replace_opportunity_splits(
            &self,
            opportunity_id: OpportunityId,
            split_type_id: SplitTypeId,
            splits: &[NewOpportunitySplit],
        ) -> RepositoryResult<Vec<OpportunitySplit>>;
    }

    impl ShortcutKeyReader for Repository {
        fn list_shortcut_keys(&self, user_id: UserId) -> RepositoryResult<Vec<ShortcutKey>>;
        fn shortcut_key_exists(&self, user_id: UserId, page: &PageUrl) -> RepositoryResult<bool>;
    }

    impl ShortcutKeyWriter for Repository {
        fn save_shortcut_key(&self, shortcut: &NewShortcutKey) -> RepositoryResult<ShortcutKey>;
    }
}
