//! Shared fixtures for integration tests.
#![allow(dead_code)]

use chrono::NaiveDate;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use genie_crm::db::{DbPool, establish_connection_pool};
use genie_crm::domain::fiscal_year::{CalendarSettings, FiscalYear, NewFiscalYearConfig};
use genie_crm::domain::forecast::{CategoryFlags, ForecastType, NewForecastCondition, NewForecastType};
use genie_crm::domain::opportunity::{NewOpportunityStage, OpportunityStage};
use genie_crm::domain::types::{
    CompanyId, ForecastMeasure, ForecastTypeName, Probability, StageName, StageType, UserEmail,
    UserName,
};
use genie_crm::domain::user::{NewUser, User};
use genie_crm::fiscal::generate_fiscal_year;
use genie_crm::repository::{
    DieselRepository, FiscalYearWriter, ForecastWriter, OpportunityWriter, UserWriter,
};
use tempfile::TempDir;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Migrated SQLite file living as long as the value.
pub struct TestDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn new(name: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join(name);
        let pool = establish_connection_pool(path.to_str().expect("utf-8 path"))
            .expect("create pool");
        let mut conn = pool.get().expect("get connection");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("run migrations");
        Self { _dir: dir, pool }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    pub fn repo(&self) -> DieselRepository {
        DieselRepository::new(self.pool())
    }
}

pub fn company() -> CompanyId {
    CompanyId::new(1).expect("valid company")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn user(repo: &DieselRepository, name: &str) -> User {
    repo.create_or_update_user(&NewUser::new(
        company(),
        UserName::new(name).expect("valid name"),
        UserEmail::new(format!("{}@example.com", name.to_lowercase())).expect("valid email"),
        true,
    ))
    .expect("user saved")
}

pub fn stage(
    repo: &DieselRepository,
    name: &str,
    stage_type: StageType,
    probability: i32,
) -> OpportunityStage {
    repo.create_stage(&NewOpportunityStage {
        company_id: company(),
        name: StageName::new(name).expect("valid name"),
        probability: Probability::new(probability).expect("valid probability"),
        stage_type,
        is_final: stage_type != StageType::Open,
        order: 0,
    })
    .expect("stage saved")
}

pub fn forecast_type(
    repo: &DieselRepository,
    name: &str,
    measure: ForecastMeasure,
    conditions: &[NewForecastCondition],
) -> ForecastType {
    repo.create_forecast_type(
        &NewForecastType {
            company_id: company(),
            name: ForecastTypeName::new(name).expect("valid name"),
            measure,
            include: CategoryFlags::default(),
            is_active: true,
            description: None,
        },
        conditions,
    )
    .expect("forecast type saved")
}

/// Standard calendar-year fiscal year starting in `year`, flagged current.
pub fn calendar_year(repo: &DieselRepository, year: i32) -> FiscalYear {
    let config = repo
        .save_fiscal_year_config(&NewFiscalYearConfig {
            company_id: company(),
            settings: CalendarSettings::default(),
        })
        .expect("config saved");
    repo.create_fiscal_year(
        &generate_fiscal_year(&config, date(year, 1, 1), true).expect("year generated"),
    )
    .expect("year saved")
}
