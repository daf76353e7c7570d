use genie_crm::forms::fiscal_year::FiscalYearConfigForm;
use genie_crm::repository::FiscalYearReader;
use genie_crm::services::ServiceError;
use genie_crm::services::fiscal_year::{
    generate_fiscal_years, save_fiscal_year_config, update_fiscal_years,
};

mod common;

use common::{company, date};

fn retail_calendar() -> FiscalYearConfigForm {
    FiscalYearConfigForm {
        fiscal_year_type: "custom".into(),
        format_type: Some("quarter_based".into()),
        quarter_based_format: Some("4-4-5".into()),
        year_based_format: None,
        start_month: "february".into(),
        start_day: 1,
        display_year_based_on: Some("ending_year".into()),
        period_display: Some("number_by_quarter".into()),
    }
}

#[test]
fn test_generate_custom_fiscal_years() {
    let test_db = common::TestDb::new("test_generate_custom_fiscal_years.db");
    let repo = test_db.repo();
    save_fiscal_year_config(&repo, company(), retail_calendar()).unwrap();

    let created = generate_fiscal_years(&repo, company(), 2025, 2, date(2025, 6, 1)).unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[0].start_date, date(2025, 2, 1));
    assert_eq!(created[0].end_date, date(2026, 1, 30));
    assert_eq!(created[1].start_date, date(2026, 1, 31));
    assert_eq!(created[0].name, "FY 2026");

    let current = repo.get_current_fiscal_year(company()).unwrap().unwrap();
    assert_eq!(current.id, created[0].id);

    let periods = repo.list_periods(current.id).unwrap();
    assert_eq!(periods.len(), 12);
    assert_eq!(periods[2].name, "Q1-P3 2026");
    assert_eq!(periods[2].end_date, date(2025, 5, 2));

    // Running again keeps what exists.
    let again = generate_fiscal_years(&repo, company(), 2025, 3, date(2025, 6, 1)).unwrap();
    assert_eq!(again.len(), 1);
}

#[test]
fn test_later_generation_never_overlaps_stored_years() {
    let test_db = common::TestDb::new("test_later_generation_never_overlaps_stored_years.db");
    let repo = test_db.repo();
    save_fiscal_year_config(&repo, company(), retail_calendar()).unwrap();

    generate_fiscal_years(&repo, company(), 2025, 2, date(2025, 6, 1)).unwrap();
    let created = generate_fiscal_years(&repo, company(), 2026, 2, date(2026, 6, 1)).unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].start_date, date(2027, 1, 30));

    let config = repo.get_fiscal_year_config(company()).unwrap().unwrap();
    let years = repo.list_fiscal_years(config.id).unwrap();
    assert_eq!(years.len(), 3);
    for pair in years.windows(2) {
        assert_eq!(pair[0].end_date.succ_opt().unwrap(), pair[1].start_date);
    }
    assert_eq!(years.iter().filter(|y| y.is_current).count(), 1);

    // Every day maps to exactly one period.
    let period = repo.find_period_by_date(company(), date(2026, 2, 1)).unwrap().unwrap();
    assert_eq!(period.fiscal_year_id, years[1].id);
}

#[test]
fn test_invalid_calendar_is_rejected() {
    let test_db = common::TestDb::new("test_invalid_calendar_is_rejected.db");
    let repo = test_db.repo();
    let mut form = retail_calendar();
    form.quarter_based_format = None;

    let result = save_fiscal_year_config(&repo, company(), form);
    assert!(matches!(result, Err(ServiceError::Form(_))));
}

#[test]
fn test_rollover_moves_current_year_forward() {
    let test_db = common::TestDb::new("test_rollover_moves_current_year_forward.db");
    let repo = test_db.repo();
    let created = generate_fiscal_years(&repo, company(), 2025, 1, date(2025, 6, 1)).unwrap();
    assert_eq!(created.len(), 1);

    // Still inside FY 2025: only the following year is created.
    let report = update_fiscal_years(&repo, date(2025, 12, 1)).unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcomes[0].promoted.is_none());
    let next = report.outcomes[0].created.expect("next year created");

    // Past the end: the next year becomes current and another is prepared.
    let report = update_fiscal_years(&repo, date(2026, 1, 3)).unwrap();
    assert_eq!(report.outcomes[0].promoted, Some(next));
    assert!(report.outcomes[0].created.is_some());

    let current = repo.get_current_fiscal_year(company()).unwrap().unwrap();
    assert_eq!(current.id, next);
    assert_eq!(current.name, "FY 2026");

    // Nothing left to do on a second run the same day.
    let report = update_fiscal_years(&repo, date(2026, 1, 3)).unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(report.failed, 0);
}
