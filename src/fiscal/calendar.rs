//! Carves fiscal years into quarters and periods.

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::domain::fiscal_year::{
    CalendarLayout, CalendarSettings, FiscalYear, FiscalYearConfig, NewFiscalYear, NewPeriod,
    NewQuarter,
};
use crate::domain::types::{DisplayYearBasedOn, PeriodDisplay, TypeConstraintError};

/// Length of a week-based fiscal year: 52 weeks.
const CUSTOM_YEAR_DAYS: u64 = 364;
const QUARTER_BASED_QUARTER_DAYS: u64 = 91;
const YEAR_BASED_PERIOD_DAYS: u64 = 28;

fn out_of_range(date: NaiveDate) -> TypeConstraintError {
    TypeConstraintError::OutOfRange(format!("fiscal calendar overflows after {date}"))
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate, TypeConstraintError> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| out_of_range(date))
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, TypeConstraintError> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| out_of_range(date))
}

fn day_before(date: NaiveDate) -> Result<NaiveDate, TypeConstraintError> {
    date.pred_opt().ok_or_else(|| out_of_range(date))
}

/// Last day of the fiscal year beginning on `start`.
pub fn fiscal_year_end(
    layout: CalendarLayout,
    start: NaiveDate,
) -> Result<NaiveDate, TypeConstraintError> {
    match layout {
        CalendarLayout::Standard => day_before(add_months(start, 12)?),
        _ => add_days(start, CUSTOM_YEAR_DAYS - 1),
    }
}

/// Splits `[start, end]` into pieces; every boundary but the last comes from
/// `next_start`, and the last piece always ends on `end`.
fn split(
    start: NaiveDate,
    end: NaiveDate,
    pieces: usize,
    mut next_start: impl FnMut(usize, NaiveDate) -> Result<NaiveDate, TypeConstraintError>,
) -> Result<Vec<(NaiveDate, NaiveDate)>, TypeConstraintError> {
    let mut ranges = Vec::with_capacity(pieces);
    let mut current = start;
    for index in 0..pieces {
        let piece_end = if index + 1 == pieces {
            end
        } else {
            day_before(next_start(index, current)?)?.min(end)
        };
        ranges.push((current, piece_end));
        current = add_days(piece_end, 1)?;
    }
    Ok(ranges)
}

fn quarter_ranges(
    layout: CalendarLayout,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(NaiveDate, NaiveDate)>, TypeConstraintError> {
    let sizes = layout.periods_per_quarter();
    split(start, end, 4, |index, current| match layout {
        // Offsets from the year start avoid month-end clamping drift.
        CalendarLayout::Standard => add_months(start, 3 * (index as u32 + 1)),
        CalendarLayout::QuarterBased(_) => add_days(current, QUARTER_BASED_QUARTER_DAYS),
        CalendarLayout::YearBased(_) => {
            add_days(current, YEAR_BASED_PERIOD_DAYS * u64::from(sizes[index]))
        }
    })
}

fn period_ranges(
    layout: CalendarLayout,
    quarter_index: usize,
    year_start: NaiveDate,
    quarter: (NaiveDate, NaiveDate),
) -> Result<Vec<(NaiveDate, NaiveDate)>, TypeConstraintError> {
    let count = usize::from(layout.periods_per_quarter()[quarter_index]);
    let (start, end) = quarter;
    split(start, end, count, |index, current| match layout {
        CalendarLayout::Standard => {
            add_months(year_start, (3 * quarter_index + index + 1) as u32)
        }
        CalendarLayout::QuarterBased(format) => {
            add_days(current, 7 * u64::from(format.weeks()[index]))
        }
        CalendarLayout::YearBased(_) => add_days(current, YEAR_BASED_PERIOD_DAYS),
    })
}

fn period_name(display: PeriodDisplay, quarter: u8, in_quarter: u8, in_year: u8, year: i32) -> String {
    match display {
        PeriodDisplay::NumberByYear => format!("P{in_year} {year}"),
        PeriodDisplay::NumberByQuarter => format!("Q{quarter}-P{in_quarter} {year}"),
    }
}

/// Builds one fiscal year starting on `start` with its quarters and periods.
pub fn generate_fiscal_year(
    config: &FiscalYearConfig,
    start: NaiveDate,
    is_current: bool,
) -> Result<NewFiscalYear, TypeConstraintError> {
    let settings: &CalendarSettings = &config.settings;
    let layout = settings.layout;
    let end = fiscal_year_end(layout, start)?;
    let display_year = match settings.display_year_based_on {
        DisplayYearBasedOn::StartingYear => start.year(),
        DisplayYearBasedOn::EndingYear => end.year(),
    };

    let mut quarters = Vec::with_capacity(4);
    let mut in_year = 0u8;
    for (index, range) in quarter_ranges(layout, start, end)?.into_iter().enumerate() {
        let quarter_number = index as u8 + 1;
        let periods = period_ranges(layout, index, start, range)?
            .into_iter()
            .enumerate()
            .map(|(offset, (period_start, period_end))| {
                in_year += 1;
                let in_quarter = offset as u8 + 1;
                NewPeriod {
                    quarter_number,
                    period_number: in_year,
                    name: period_name(
                        settings.period_display,
                        quarter_number,
                        in_quarter,
                        in_year,
                        display_year,
                    ),
                    start_date: period_start,
                    end_date: period_end,
                }
            })
            .collect();

        quarters.push(NewQuarter {
            quarter_number,
            name: format!("Q{quarter_number} {display_year}"),
            start_date: range.0,
            end_date: range.1,
            periods,
        });
    }

    Ok(NewFiscalYear {
        company_id: config.company_id,
        config_id: config.id,
        name: format!("FY {display_year}"),
        start_date: start,
        end_date: end,
        is_current,
        quarters,
    })
}

/// One slot of a generated sequence of fiscal years.
#[derive(Debug)]
pub enum PlannedYear<'a> {
    /// A year of the config that already covers the slot.
    Stored(&'a FiscalYear),
    New(NewFiscalYear),
}

impl PlannedYear<'_> {
    pub fn start_date(&self) -> NaiveDate {
        match self {
            PlannedYear::Stored(year) => year.start_date,
            PlannedYear::New(year) => year.start_date,
        }
    }

    pub fn end_date(&self) -> NaiveDate {
        match self {
            PlannedYear::Stored(year) => year.end_date,
            PlannedYear::New(year) => year.end_date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date() <= date && date <= self.end_date()
    }
}

/// `count` consecutive fiscal years from the configured start in
/// `first_year`, chained onto the `stored` years of the same config.
///
/// A slot whose range meets a stored year takes that year instead, and the
/// next slot starts the day after it, so planned years never overlap.
pub fn plan_fiscal_years<'a>(
    config: &FiscalYearConfig,
    first_year: i32,
    count: usize,
    stored: &'a [FiscalYear],
) -> Result<Vec<PlannedYear<'a>>, TypeConstraintError> {
    let mut start = config.settings.start_in(first_year).ok_or_else(|| {
        TypeConstraintError::OutOfRange(format!("no fiscal year start in {first_year}"))
    })?;

    let mut planned = Vec::with_capacity(count);
    for _ in 0..count {
        let end = fiscal_year_end(config.settings.layout, start)?;
        let clash = stored
            .iter()
            .filter(|y| y.start_date <= end && start <= y.end_date)
            .min_by_key(|y| y.start_date);

        let slot = match clash {
            Some(year) => PlannedYear::Stored(year),
            None => PlannedYear::New(generate_fiscal_year(config, start, false)?),
        };
        start = add_days(slot.end_date(), 1)?;
        planned.push(slot);
    }

    Ok(planned)
}

/// Index of the planned year containing `today`, or 0 when none does.
pub fn current_index(planned: &[PlannedYear<'_>], today: NaiveDate) -> usize {
    planned.iter().position(|y| y.contains(today)).unwrap_or(0)
}
