use serde::Deserialize;
use validator::Validate;

use crate::domain::fiscal_year::{CalendarSettings, NewFiscalYearConfig};
use crate::domain::types::{
    CompanyId, DisplayYearBasedOn, FiscalYearType, FormatType, PeriodDisplay, QuarterBasedFormat,
    YearBasedFormat,
};
use crate::forms::{FormError, non_blank, parse_choice};

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Accepts `4`, `04` or `april`.
fn parse_month(value: &str) -> Result<u32, FormError> {
    let value = value.trim().to_lowercase();
    if let Ok(number) = value.parse::<u32>() {
        return Ok(number);
    }
    MONTH_NAMES
        .iter()
        .position(|name| *name == value)
        .map(|index| index as u32 + 1)
        .ok_or_else(|| FormError::InvalidChoice {
            field: "start month",
            message: format!("unknown month `{value}`"),
        })
}

#[derive(Debug, Deserialize, Validate)]
pub struct FiscalYearConfigForm {
    pub fiscal_year_type: String,
    #[serde(default)]
    pub format_type: Option<String>,
    #[serde(default)]
    pub quarter_based_format: Option<String>,
    #[serde(default)]
    pub year_based_format: Option<String>,
    #[validate(length(min = 1))]
    pub start_month: String,
    #[validate(range(min = 1, max = 31))]
    pub start_day: u32,
    #[serde(default)]
    pub display_year_based_on: Option<String>,
    #[serde(default)]
    pub period_display: Option<String>,
}

pub struct FiscalYearConfigPayload {
    pub settings: CalendarSettings,
}

impl TryFrom<FiscalYearConfigForm> for FiscalYearConfigPayload {
    type Error = FormError;

    fn try_from(form: FiscalYearConfigForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let fiscal_year_type = parse_choice::<FiscalYearType>("fiscal year type", &form.fiscal_year_type)?;
        let format_type = non_blank(form.format_type)
            .map(|v| parse_choice::<FormatType>("format type", &v))
            .transpose()?;
        let quarter_based_format = non_blank(form.quarter_based_format)
            .map(|v| parse_choice::<QuarterBasedFormat>("quarter based format", &v))
            .transpose()?;
        let year_based_format = non_blank(form.year_based_format)
            .map(|v| parse_choice::<YearBasedFormat>("year based format", &v))
            .transpose()?;
        let display_year_based_on = non_blank(form.display_year_based_on)
            .map(|v| parse_choice::<DisplayYearBasedOn>("display year", &v))
            .transpose()?
            .unwrap_or(DisplayYearBasedOn::StartingYear);
        let period_display = non_blank(form.period_display)
            .map(|v| parse_choice::<PeriodDisplay>("period display", &v))
            .transpose()?
            .unwrap_or(PeriodDisplay::NumberByYear);

        let settings = CalendarSettings::try_from_parts(
            fiscal_year_type,
            format_type,
            quarter_based_format,
            year_based_format,
            parse_month(&form.start_month)?,
            form.start_day,
            display_year_based_on,
            period_display,
        )
        .map_err(|e| FormError::InvalidCalendar(e.to_string()))?;

        Ok(Self { settings })
    }
}

impl FiscalYearConfigPayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewFiscalYearConfig {
        NewFiscalYearConfig {
            company_id,
            settings: self.settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fiscal_year::CalendarLayout;

    fn form(fiscal_year_type: &str, format_type: Option<&str>) -> FiscalYearConfigForm {
        FiscalYearConfigForm {
            fiscal_year_type: fiscal_year_type.into(),
            format_type: format_type.map(Into::into),
            quarter_based_format: Some("5-4-4".into()),
            year_based_format: None,
            start_month: "April".into(),
            start_day: 1,
            display_year_based_on: None,
            period_display: Some("".into()),
        }
    }

    #[test]
    fn month_names_and_defaults_are_accepted() {
        let payload = FiscalYearConfigPayload::try_from(form("custom", Some("quarter_based")))
            .expect("valid form");
        assert_eq!(payload.settings.start_month, 4);
        assert_eq!(
            payload.settings.layout,
            CalendarLayout::QuarterBased(QuarterBasedFormat::FiveFourFour)
        );
        assert_eq!(payload.settings.period_display, PeriodDisplay::NumberByYear);
    }

    #[test]
    fn custom_year_needs_its_format() {
        let result = FiscalYearConfigPayload::try_from(form("custom", Some("year_based")));
        assert!(matches!(result, Err(FormError::InvalidCalendar(_))));
    }

    #[test]
    fn unknown_month_is_rejected() {
        let mut bad = form("standard", None);
        bad.start_month = "smarch".into();
        assert!(matches!(
            FiscalYearConfigPayload::try_from(bad),
            Err(FormError::InvalidChoice { field: "start month", .. })
        ));
    }
}
