//! Fiscal calendar: company configuration, years, quarters and periods.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    CompanyId, DisplayYearBasedOn, FiscalYearConfigId, FiscalYearId, FiscalYearType, FormatType,
    PeriodDisplay, PeriodId, QuarterBasedFormat, QuarterId, TypeConstraintError, YearBasedFormat,
};

/// How quarters and periods are carved out of a fiscal year.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CalendarLayout {
    /// Calendar months, three per quarter.
    Standard,
    /// 13-week quarters split into periods of the given week counts.
    QuarterBased(QuarterBasedFormat),
    /// 28-day periods grouped into quarters of the given sizes.
    YearBased(YearBasedFormat),
}

impl CalendarLayout {
    pub fn fiscal_year_type(self) -> FiscalYearType {
        match self {
            CalendarLayout::Standard => FiscalYearType::Standard,
            _ => FiscalYearType::Custom,
        }
    }

    pub fn format_type(self) -> Option<FormatType> {
        match self {
            CalendarLayout::Standard => None,
            CalendarLayout::QuarterBased(_) => Some(FormatType::QuarterBased),
            CalendarLayout::YearBased(_) => Some(FormatType::YearBased),
        }
    }

    /// Number of periods in each quarter.
    pub fn periods_per_quarter(self) -> [u8; 4] {
        match self {
            CalendarLayout::Standard | CalendarLayout::QuarterBased(_) => [3; 4],
            CalendarLayout::YearBased(format) => format.periods(),
        }
    }
}

/// Validated calendar rules of one company.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarSettings {
    pub layout: CalendarLayout,
    pub start_month: u32,
    pub start_day: u32,
    pub display_year_based_on: DisplayYearBasedOn,
    pub period_display: PeriodDisplay,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            layout: CalendarLayout::Standard,
            start_month: 1,
            start_day: 1,
            display_year_based_on: DisplayYearBasedOn::StartingYear,
            period_display: PeriodDisplay::NumberByYear,
        }
    }
}

/// Longest day of each month in a non-leap year.
const fn days_in_month(month: u32) -> u32 {
    match month {
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl CalendarSettings {
    /// Builds settings from their stored columns.
    ///
    /// A custom year needs a format type and the format string matching it.
    /// The start day must exist in the start month of every year, so
    /// February 29 is rejected.
    #[allow(clippy::too_many_arguments)]
    pub fn try_from_parts(
        fiscal_year_type: FiscalYearType,
        format_type: Option<FormatType>,
        quarter_based_format: Option<QuarterBasedFormat>,
        year_based_format: Option<YearBasedFormat>,
        start_month: u32,
        start_day: u32,
        display_year_based_on: DisplayYearBasedOn,
        period_display: PeriodDisplay,
    ) -> Result<Self, TypeConstraintError> {
        if !(1..=12).contains(&start_month) {
            return Err(TypeConstraintError::OutOfRange(format!(
                "start month {start_month} not within 1..=12"
            )));
        }
        if start_day == 0 || start_day > days_in_month(start_month) {
            return Err(TypeConstraintError::OutOfRange(format!(
                "start day {start_day} does not exist in month {start_month}"
            )));
        }

        let layout = match fiscal_year_type {
            FiscalYearType::Standard => CalendarLayout::Standard,
            FiscalYearType::Custom => match format_type {
                Some(FormatType::QuarterBased) => {
                    CalendarLayout::QuarterBased(quarter_based_format.ok_or_else(|| {
                        TypeConstraintError::InvalidValue(
                            "quarter based format is required".to_string(),
                        )
                    })?)
                }
                Some(FormatType::YearBased) => {
                    CalendarLayout::YearBased(year_based_format.ok_or_else(|| {
                        TypeConstraintError::InvalidValue(
                            "year based format is required".to_string(),
                        )
                    })?)
                }
                None => {
                    return Err(TypeConstraintError::InvalidValue(
                        "custom fiscal years require a format type".to_string(),
                    ));
                }
            },
        };

        Ok(Self {
            layout,
            start_month,
            start_day,
            display_year_based_on,
            period_display,
        })
    }

    /// First day of the fiscal year that starts in `year`.
    pub fn start_in(&self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.start_month, self.start_day)
    }
}

/// Per-company fiscal calendar record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FiscalYearConfig {
    pub id: FiscalYearConfigId,
    pub company_id: CompanyId,
    pub settings: CalendarSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewFiscalYearConfig {
    pub company_id: CompanyId,
    pub settings: CalendarSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FiscalYear {
    pub id: FiscalYearId,
    pub company_id: CompanyId,
    pub config_id: FiscalYearConfigId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
}

impl FiscalYear {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Quarter {
    pub id: QuarterId,
    pub company_id: CompanyId,
    pub fiscal_year_id: FiscalYearId,
    pub quarter_number: u8,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Smallest forecasting bucket of the fiscal calendar.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Period {
    pub id: PeriodId,
    pub company_id: CompanyId,
    pub fiscal_year_id: FiscalYearId,
    pub quarter_id: QuarterId,
    pub quarter_number: u8,
    /// Position within the fiscal year, starting at 1.
    pub period_number: u8,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Period {
    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewPeriod {
    pub quarter_number: u8,
    pub period_number: u8,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewQuarter {
    pub quarter_number: u8,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub periods: Vec<NewPeriod>,
}

/// Fiscal year with its full quarter/period breakdown, ready to persist.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewFiscalYear {
    pub company_id: CompanyId,
    pub config_id: FiscalYearConfigId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
    pub quarters: Vec<NewQuarter>,
}

impl NewFiscalYear {
    pub fn periods(&self) -> impl Iterator<Item = &NewPeriod> {
        self.quarters.iter().flat_map(|q| q.periods.iter())
    }

    /// Calendar year used in names.
    pub fn display_year(&self, based_on: DisplayYearBasedOn) -> i32 {
        match based_on {
            DisplayYearBasedOn::StartingYear => self.start_date.year(),
            DisplayYearBasedOn::EndingYear => self.end_date.year(),
        }
    }
}
