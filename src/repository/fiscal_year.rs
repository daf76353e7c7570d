//! Repository implementation for the fiscal calendar.

use chrono::NaiveDate;
use diesel::{Connection, prelude::*};

use crate::{
    domain::{
        fiscal_year::{FiscalYear, FiscalYearConfig, NewFiscalYear, NewFiscalYearConfig, Period},
        types::{CompanyId, FiscalYearConfigId, FiscalYearId, PeriodId},
    },
    models::fiscal_year::{
        FiscalYear as DbFiscalYear, FiscalYearConfig as DbFiscalYearConfig,
        NewFiscalYear as DbNewFiscalYear, NewFiscalYearConfig as DbNewFiscalYearConfig,
        NewPeriod as DbNewPeriod, NewQuarter as DbNewQuarter, Period as DbPeriod,
        Quarter as DbQuarter,
    },
    repository::{
        DieselRepository, FiscalYearReader, FiscalYearWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn year_into_domain(row: DbFiscalYear) -> RepositoryResult<FiscalYear> {
    FiscalYear::try_from(row).map_err(RepositoryError::from)
}

fn period_into_domain(row: DbPeriod) -> RepositoryResult<Period> {
    Period::try_from(row).map_err(RepositoryError::from)
}

impl FiscalYearReader for DieselRepository {
    fn get_fiscal_year_config(
        &self,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<FiscalYearConfig>> {
        use crate::schema::fiscal_year_configs;

        let mut conn = self.conn()?;
        fiscal_year_configs::table
            .filter(fiscal_year_configs::company_id.eq(company_id.get()))
            .first::<DbFiscalYearConfig>(&mut conn)
            .optional()?
            .map(|c| FiscalYearConfig::try_from(c).map_err(RepositoryError::from))
            .transpose()
    }

    fn list_fiscal_year_configs(&self) -> RepositoryResult<Vec<FiscalYearConfig>> {
        use crate::schema::fiscal_year_configs;

        let mut conn = self.conn()?;
        fiscal_year_configs::table
            .order(fiscal_year_configs::company_id.asc())
            .load::<DbFiscalYearConfig>(&mut conn)?
            .into_iter()
            .map(|c| FiscalYearConfig::try_from(c).map_err(RepositoryError::from))
            .collect()
    }

    fn get_fiscal_year_by_id(
        &self,
        id: FiscalYearId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<FiscalYear>> {
        use crate::schema::fiscal_years;

        let mut conn = self.conn()?;
        fiscal_years::table
            .filter(fiscal_years::id.eq(id.get()))
            .filter(fiscal_years::company_id.eq(company_id.get()))
            .first::<DbFiscalYear>(&mut conn)
            .optional()?
            .map(year_into_domain)
            .transpose()
    }

    fn get_current_fiscal_year(
        &self,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<FiscalYear>> {
        use crate::schema::fiscal_years;

        let mut conn = self.conn()?;
        fiscal_years::table
            .filter(fiscal_years::company_id.eq(company_id.get()))
            .filter(fiscal_years::is_current.eq(true))
            .order(fiscal_years::start_date.desc())
            .first::<DbFiscalYear>(&mut conn)
            .optional()?
            .map(year_into_domain)
            .transpose()
    }

    fn list_fiscal_years(&self, config_id: FiscalYearConfigId) -> RepositoryResult<Vec<FiscalYear>> {
        use crate::schema::fiscal_years;

        let mut conn = self.conn()?;
        fiscal_years::table
            .filter(fiscal_years::config_id.eq(config_id.get()))
            .order(fiscal_years::start_date.asc())
            .load::<DbFiscalYear>(&mut conn)?
            .into_iter()
            .map(year_into_domain)
            .collect()
    }

    fn list_periods(&self, fiscal_year_id: FiscalYearId) -> RepositoryResult<Vec<Period>> {
        use crate::schema::periods;

        let mut conn = self.conn()?;
        periods::table
            .filter(periods::fiscal_year_id.eq(fiscal_year_id.get()))
            .order(periods::period_number.asc())
            .load::<DbPeriod>(&mut conn)?
            .into_iter()
            .map(period_into_domain)
            .collect()
    }

    fn get_period_by_id(
        &self,
        id: PeriodId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Period>> {
        use crate::schema::periods;

        let mut conn = self.conn()?;
        periods::table
            .filter(periods::id.eq(id.get()))
            .filter(periods::company_id.eq(company_id.get()))
            .first::<DbPeriod>(&mut conn)
            .optional()?
            .map(period_into_domain)
            .transpose()
    }

    fn find_period_by_date(
        &self,
        company_id: CompanyId,
        date: NaiveDate,
    ) -> RepositoryResult<Option<Period>> {
        use crate::schema::periods;

        let mut conn = self.conn()?;
        periods::table
            .filter(periods::company_id.eq(company_id.get()))
            .filter(periods::start_date.le(date))
            .filter(periods::end_date.ge(date))
            .order(periods::start_date.desc())
            .first::<DbPeriod>(&mut conn)
            .optional()?
            .map(period_into_domain)
            .transpose()
    }
}

impl FiscalYearWriter for DieselRepository {
    fn save_fiscal_year_config(
        &self,
        config: &NewFiscalYearConfig,
    ) -> RepositoryResult<FiscalYearConfig> {
        use crate::schema::fiscal_year_configs;

        let mut conn = self.conn()?;
        let db_config = DbNewFiscalYearConfig::new(config.company_id, &config.settings);

        let row = diesel::insert_into(fiscal_year_configs::table)
            .values(&db_config)
            .on_conflict(fiscal_year_configs::company_id)
            .do_update()
            .set(&db_config)
            .get_result::<DbFiscalYearConfig>(&mut conn)?;

        FiscalYearConfig::try_from(row).map_err(RepositoryError::from)
    }

    fn create_fiscal_year(&self, fiscal_year: &NewFiscalYear) -> RepositoryResult<FiscalYear> {
        use crate::schema::{fiscal_years, periods, quarters};

        let mut conn = self.conn()?;
        let company_id = fiscal_year.company_id.get();

        let row = conn.transaction::<DbFiscalYear, RepositoryError, _>(|conn| {
            let year = diesel::insert_into(fiscal_years::table)
                .values(&DbNewFiscalYear {
                    company_id,
                    config_id: fiscal_year.config_id.get(),
                    name: &fiscal_year.name,
                    start_date: fiscal_year.start_date,
                    end_date: fiscal_year.end_date,
                    is_current: fiscal_year.is_current,
                })
                .get_result::<DbFiscalYear>(conn)?;

            for quarter in &fiscal_year.quarters {
                let db_quarter = diesel::insert_into(quarters::table)
                    .values(&DbNewQuarter {
                        company_id,
                        fiscal_year_id: year.id,
                        quarter_number: i32::from(quarter.quarter_number),
                        name: &quarter.name,
                        start_date: quarter.start_date,
                        end_date: quarter.end_date,
                    })
                    .get_result::<DbQuarter>(conn)?;

                let new_periods = quarter
                    .periods
                    .iter()
                    .map(|period| DbNewPeriod {
                        company_id,
                        fiscal_year_id: year.id,
                        quarter_id: db_quarter.id,
                        quarter_number: i32::from(period.quarter_number),
                        period_number: i32::from(period.period_number),
                        name: &period.name,
                        start_date: period.start_date,
                        end_date: period.end_date,
                    })
                    .collect::<Vec<_>>();

                diesel::insert_into(periods::table)
                    .values(&new_periods)
                    .execute(conn)?;
            }

            Ok(year)
        })?;

        year_into_domain(row)
    }

    fn set_current_fiscal_year(
        &self,
        config_id: FiscalYearConfigId,
        fiscal_year_id: FiscalYearId,
    ) -> RepositoryResult<()> {
        use crate::schema::fiscal_years;

        let mut conn = self.conn()?;
        conn.transaction::<(), RepositoryError, _>(|conn| {
            diesel::update(fiscal_years::table.filter(fiscal_years::config_id.eq(config_id.get())))
                .set(fiscal_years::is_current.eq(false))
                .execute(conn)?;
            let updated = diesel::update(
                fiscal_years::table
                    .filter(fiscal_years::id.eq(fiscal_year_id.get()))
                    .filter(fiscal_years::config_id.eq(config_id.get())),
            )
            .set(fiscal_years::is_current.eq(true))
            .execute(conn)?;
            if updated == 0 {
                return Err(RepositoryError::NotFound);
            }
            Ok(())
        })
    }
}
