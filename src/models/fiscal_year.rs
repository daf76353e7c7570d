//! Diesel models for the fiscal calendar tables.

use chrono::NaiveDate;
use diesel::prelude::*;

use crate::domain::fiscal_year::{
    CalendarLayout, CalendarSettings, FiscalYear as DomainFiscalYear,
    FiscalYearConfig as DomainFiscalYearConfig, Period as DomainPeriod,
    Quarter as DomainQuarter,
};
use crate::domain::types::{
    CompanyId, FiscalYearConfigId, FiscalYearId, PeriodId, QuarterId, TypeConstraintError,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::fiscal_year_configs)]
pub struct FiscalYearConfig {
    pub id: i32,
    pub company_id: i32,
    pub fiscal_year_type: String,
    pub format_type: Option<String>,
    pub quarter_based_format: Option<String>,
    pub year_based_format: Option<String>,
    pub start_month: i32,
    pub start_day: i32,
    pub display_year_based_on: String,
    pub period_display: String,
}

#[derive(Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::fiscal_year_configs)]
#[diesel(treat_none_as_null = true)]
pub struct NewFiscalYearConfig {
    pub company_id: i32,
    pub fiscal_year_type: &'static str,
    pub format_type: Option<&'static str>,
    pub quarter_based_format: Option<&'static str>,
    pub year_based_format: Option<&'static str>,
    pub start_month: i32,
    pub start_day: i32,
    pub display_year_based_on: &'static str,
    pub period_display: &'static str,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::fiscal_years)]
pub struct FiscalYear {
    pub id: i32,
    pub company_id: i32,
    pub config_id: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::fiscal_years)]
pub struct NewFiscalYear<'a> {
    pub company_id: i32,
    pub config_id: i32,
    pub name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::quarters)]
pub struct Quarter {
    pub id: i32,
    pub company_id: i32,
    pub fiscal_year_id: i32,
    pub quarter_number: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::quarters)]
pub struct NewQuarter<'a> {
    pub company_id: i32,
    pub fiscal_year_id: i32,
    pub quarter_number: i32,
    pub name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::periods)]
pub struct Period {
    pub id: i32,
    pub company_id: i32,
    pub fiscal_year_id: i32,
    pub quarter_id: i32,
    pub quarter_number: i32,
    pub period_number: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::periods)]
pub struct NewPeriod<'a> {
    pub company_id: i32,
    pub fiscal_year_id: i32,
    pub quarter_id: i32,
    pub quarter_number: i32,
    pub period_number: i32,
    pub name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Parses an optional text code, treating blanks as absent.
fn parse_code<T>(value: Option<&str>) -> Result<Option<T>, TypeConstraintError>
where
    T: std::str::FromStr<Err = TypeConstraintError>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.parse().map(Some),
        None => Ok(None),
    }
}

fn small_number(value: i32, what: &str) -> Result<u8, TypeConstraintError> {
    u8::try_from(value)
        .map_err(|_| TypeConstraintError::OutOfRange(format!("{what} {value} is not a small number")))
}

impl TryFrom<FiscalYearConfig> for DomainFiscalYearConfig {
    type Error = TypeConstraintError;

    fn try_from(config: FiscalYearConfig) -> Result<Self, Self::Error> {
        let settings = CalendarSettings::try_from_parts(
            config.fiscal_year_type.parse()?,
            parse_code(config.format_type.as_deref())?,
            parse_code(config.quarter_based_format.as_deref())?,
            parse_code(config.year_based_format.as_deref())?,
            u32::try_from(config.start_month)
                .map_err(|_| TypeConstraintError::OutOfRange("start month".to_string()))?,
            u32::try_from(config.start_day)
                .map_err(|_| TypeConstraintError::OutOfRange("start day".to_string()))?,
            config.display_year_based_on.parse()?,
            config.period_display.parse()?,
        )?;
        Ok(Self {
            id: FiscalYearConfigId::new(config.id)?,
            company_id: CompanyId::new(config.company_id)?,
            settings,
        })
    }
}

impl NewFiscalYearConfig {
    pub fn new(company_id: CompanyId, settings: &CalendarSettings) -> Self {
        let (quarter_based_format, year_based_format) = match settings.layout {
            CalendarLayout::Standard => (None, None),
            CalendarLayout::QuarterBased(format) => (Some(format.code()), None),
            CalendarLayout::YearBased(format) => (None, Some(format.code())),
        };
        Self {
            company_id: company_id.get(),
            fiscal_year_type: settings.layout.fiscal_year_type().code(),
            format_type: settings.layout.format_type().map(|f| f.code()),
            quarter_based_format,
            year_based_format,
            start_month: settings.start_month as i32,
            start_day: settings.start_day as i32,
            display_year_based_on: settings.display_year_based_on.code(),
            period_display: settings.period_display.code(),
        }
    }
}

impl TryFrom<FiscalYear> for DomainFiscalYear {
    type Error = TypeConstraintError;

    fn try_from(year: FiscalYear) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FiscalYearId::new(year.id)?,
            company_id: CompanyId::new(year.company_id)?,
            config_id: FiscalYearConfigId::new(year.config_id)?,
            name: year.name,
            start_date: year.start_date,
            end_date: year.end_date,
            is_current: year.is_current,
        })
    }
}

impl TryFrom<Quarter> for DomainQuarter {
    type Error = TypeConstraintError;

    fn try_from(quarter: Quarter) -> Result<Self, Self::Error> {
        Ok(Self {
            id: QuarterId::new(quarter.id)?,
            company_id: CompanyId::new(quarter.company_id)?,
            fiscal_year_id: FiscalYearId::new(quarter.fiscal_year_id)?,
            quarter_number: small_number(quarter.quarter_number, "quarter number")?,
            name: quarter.name,
            start_date: quarter.start_date,
            end_date: quarter.end_date,
        })
    }
}

impl TryFrom<Period> for DomainPeriod {
    type Error = TypeConstraintError;

    fn try_from(period: Period) -> Result<Self, Self::Error> {
        Ok(Self {
            id: PeriodId::new(period.id)?,
            company_id: CompanyId::new(period.company_id)?,
            fiscal_year_id: FiscalYearId::new(period.fiscal_year_id)?,
            quarter_id: QuarterId::new(period.quarter_id)?,
            quarter_number: small_number(period.quarter_number, "quarter number")?,
            period_number: small_number(period.period_number, "period number")?,
            name: period.name,
            start_date: period.start_date,
            end_date: period.end_date,
        })
    }
}
