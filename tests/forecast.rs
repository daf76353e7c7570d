use std::collections::BTreeMap;

use genie_crm::domain::forecast::{ForecastValues, LogicalOperator, NewForecastCondition};
use genie_crm::domain::types::{ForecastMeasure, StageType};
use genie_crm::forecast::ForecastCalculator;
use genie_crm::forms::forecast_target::ForecastTargetForm;
use genie_crm::forms::forecast_type::ForecastTypeForm;
use genie_crm::forms::opportunity::OpportunityForm;
use genie_crm::repository::{
    FiscalYearReader, ForecastListQuery, ForecastReader, ForecastValuesUpdate, ForecastWriter,
    OpportunityReader,
};
use genie_crm::services::ServiceError;
use genie_crm::services::currency::convert_company_currency;
use genie_crm::services::forecast::{
    RecalculationFilter, create_forecast_targets, create_forecast_type, generate_forecasts,
    recalculate_forecasts,
};
use genie_crm::services::opportunity::{
    change_stage, create_opportunity, delete_opportunity, update_opportunity,
};

mod common;

use common::{calendar_year, company, forecast_type, stage, user};

fn opportunity_form(owner_id: i32, stage_id: i32, amount: f64, close_date: &str) -> OpportunityForm {
    OpportunityForm {
        owner_id,
        stage_id,
        name: "Deal".into(),
        account_name: None,
        amount: Some(amount),
        probability: None,
        quantity: None,
        close_date: close_date.into(),
        forecast_category: Some("commit".into()),
        lead_source: None,
        opportunity_type: None,
        next_step: None,
        description: None,
    }
}

#[test]
fn test_opportunity_writes_keep_buckets_in_step() {
    let test_db = common::TestDb::new("test_opportunity_writes_keep_buckets_in_step.db");
    let repo = test_db.repo();
    let owner = user(&repo, "Ada");
    let open = stage(&repo, "Negotiation", StageType::Open, 50);
    let won = stage(&repo, "Closed Won", StageType::Won, 100);
    let year = calendar_year(&repo, 2025);
    let revenue = forecast_type(&repo, "Revenue", ForecastMeasure::Amount, &[]);
    let periods = repo.list_periods(year.id).unwrap();
    let (march, june) = (&periods[2], &periods[5]);

    let created = create_opportunity(
        &repo,
        company(),
        opportunity_form(owner.id.get(), open.id.get(), 1000.0, "2025-03-10"),
    )
    .unwrap();
    let bucket = repo
        .get_forecast(owner.id, revenue.id, march.id)
        .unwrap()
        .expect("bucket created");
    assert_eq!(bucket.name, "Revenue - P3 2025");
    assert_eq!(bucket.values.commit, 1000.0);
    assert_eq!(bucket.values.actual, 0.0);

    update_opportunity(
        &repo,
        company(),
        created.id,
        opportunity_form(owner.id.get(), open.id.get(), 1000.0, "2025-06-20"),
    )
    .unwrap();
    let old = repo.get_forecast(owner.id, revenue.id, march.id).unwrap().unwrap();
    let new = repo.get_forecast(owner.id, revenue.id, june.id).unwrap().unwrap();
    assert_eq!(old.values, ForecastValues::default());
    assert_eq!(new.values.commit, 1000.0);

    let closed = change_stage(&repo, company(), created.id, won.id).unwrap();
    assert_eq!(closed.probability.get(), 100);
    let new = repo.get_forecast(owner.id, revenue.id, june.id).unwrap().unwrap();
    assert_eq!(new.values.commit, 0.0);
    assert_eq!(new.values.closed, 1000.0);
    assert_eq!(new.values.actual, 1000.0);

    delete_opportunity(&repo, company(), created.id).unwrap();
    let new = repo.get_forecast(owner.id, revenue.id, june.id).unwrap().unwrap();
    assert_eq!(new.values, ForecastValues::default());
}

#[test]
fn test_close_date_outside_calendar_is_skipped() {
    let test_db = common::TestDb::new("test_close_date_outside_calendar_is_skipped.db");
    let repo = test_db.repo();
    let owner = user(&repo, "Ada");
    let open = stage(&repo, "Negotiation", StageType::Open, 50);
    calendar_year(&repo, 2025);
    forecast_type(&repo, "Revenue", ForecastMeasure::Amount, &[]);

    create_opportunity(
        &repo,
        company(),
        opportunity_form(owner.id.get(), open.id.get(), 10.0, "2030-01-01"),
    )
    .unwrap();
    assert!(repo.list_forecasts(ForecastListQuery::new()).unwrap().is_empty());
}

#[test]
fn test_conditions_narrow_the_counted_opportunities() {
    let test_db = common::TestDb::new("test_conditions_narrow_the_counted.db");
    let repo = test_db.repo();
    let owner = user(&repo, "Ada");
    let open = stage(&repo, "Negotiation", StageType::Open, 50);
    let year = calendar_year(&repo, 2025);
    let large = forecast_type(
        &repo,
        "Large deals",
        ForecastMeasure::ExpectedRevenue,
        &[NewForecastCondition {
            field: "amount".into(),
            operator: "greater_than_equal".into(),
            value: "500".into(),
            logical_operator: LogicalOperator::And,
            order: 0,
            is_active: true,
        }],
    );

    for amount in [100.0, 600.0, 800.0] {
        create_opportunity(
            &repo,
            company(),
            opportunity_form(owner.id.get(), open.id.get(), amount, "2025-01-15"),
        )
        .unwrap();
    }

    let january = repo.list_periods(year.id).unwrap().remove(0);
    let mut calculator = ForecastCalculator::new(&repo, company()).with_fiscal_year(year);
    let values = calculator
        .calculate_forecast_values(owner.id, &january, &large)
        .unwrap();
    assert_eq!(values.commit, 700.0);
}

#[test]
fn test_generate_forecasts_creates_then_refreshes() {
    let test_db = common::TestDb::new("test_generate_forecasts_creates_then_refreshes.db");
    let repo = test_db.repo();
    let ada = user(&repo, "Ada");
    user(&repo, "Grace");
    let open = stage(&repo, "Negotiation", StageType::Open, 50);
    calendar_year(&repo, 2025);
    let revenue = forecast_type(&repo, "Revenue", ForecastMeasure::Amount, &[]);
    forecast_type(&repo, "Units", ForecastMeasure::Quantity, &[]);

    let outcome = generate_forecasts(&repo, company(), None, 7).unwrap();
    assert_eq!(outcome.created, 2 * 2 * 12);
    assert_eq!(outcome.updated, 0);

    create_opportunity(
        &repo,
        company(),
        opportunity_form(ada.id.get(), open.id.get(), 250.0, "2025-02-02"),
    )
    .unwrap();
    // Stale values written behind the engine's back.
    let stored = repo
        .list_forecasts(ForecastListQuery::new().owner(ada.id).forecast_type(revenue.id))
        .unwrap();
    repo.update_forecast_values(
        &[ForecastValuesUpdate {
            id: stored[1].id,
            target: 0.0,
            values: ForecastValues::default(),
        }],
        7,
    )
    .unwrap();

    let outcome = generate_forecasts(&repo, company(), None, 7).unwrap();
    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.updated, 1);
}

#[test]
fn test_recalculation_reports_and_fixes_drift() {
    let test_db = common::TestDb::new("test_recalculation_reports_and_fixes_drift.db");
    let repo = test_db.repo();
    let ada = user(&repo, "Ada");
    let open = stage(&repo, "Negotiation", StageType::Open, 50);
    calendar_year(&repo, 2025);
    let revenue = forecast_type(&repo, "Revenue", ForecastMeasure::Amount, &[]);
    generate_forecasts(&repo, company(), None, 500).unwrap();

    create_opportunity(
        &repo,
        company(),
        opportunity_form(ada.id.get(), open.id.get(), 300.0, "2025-04-04"),
    )
    .unwrap();
    let april = repo
        .list_forecasts(ForecastListQuery::new().owner(ada.id).forecast_type(revenue.id))
        .unwrap()
        .remove(3);
    repo.update_forecast_values(
        &[ForecastValuesUpdate {
            id: april.id,
            target: 0.0,
            values: ForecastValues {
                commit: 1.0,
                ..ForecastValues::default()
            },
        }],
        500,
    )
    .unwrap();

    let filter = RecalculationFilter {
        owner_id: Some(ada.id),
        ..RecalculationFilter::default()
    };
    let dry = recalculate_forecasts(&repo, &filter, true, 500).unwrap();
    assert_eq!(dry.processed, 12);
    assert_eq!(dry.changed, 1);
    assert_eq!(dry.changes[0].changed_columns(), vec![("commit", 1.0, 300.0)]);
    let untouched = repo.get_forecast(ada.id, revenue.id, april.period_id).unwrap().unwrap();
    assert_eq!(untouched.values.commit, 1.0);

    let applied = recalculate_forecasts(&repo, &filter, false, 500).unwrap();
    assert_eq!(applied.changed, 1);
    let fixed = repo.get_forecast(ada.id, revenue.id, april.period_id).unwrap().unwrap();
    assert_eq!(fixed.values.commit, 300.0);

    let again = recalculate_forecasts(&repo, &filter, false, 500).unwrap();
    assert_eq!(again.changed, 0);
}

#[test]
fn test_forecast_type_form_with_conditions() {
    let test_db = common::TestDb::new("test_forecast_type_form_with_conditions.db");
    let repo = test_db.repo();

    let mut rows = BTreeMap::new();
    rows.insert("field_2".to_string(), "stage__stage_type".to_string());
    rows.insert("operator_2".to_string(), "not_equals".to_string());
    rows.insert("value_2".to_string(), "lost".to_string());
    rows.insert("field_1".to_string(), "amount".to_string());
    rows.insert("operator_1".to_string(), "greater_than".to_string());
    rows.insert("value_1".to_string(), "0".to_string());
    let created = create_forecast_type(
        &repo,
        company(),
        ForecastTypeForm {
            name: "Qualified".into(),
            measure: "amount".into(),
            include_pipeline: false,
            include_best_case: true,
            include_commit: true,
            include_closed: true,
            is_active: true,
            description: None,
            rows,
        },
    )
    .unwrap();
    assert!(!created.include.pipeline);

    let conditions = repo.list_forecast_conditions(created.id).unwrap();
    assert_eq!(conditions.len(), 2);
    assert_eq!(conditions[0].field, "amount");
    assert_eq!(conditions[1].order, 2);

    let mut bad = BTreeMap::new();
    bad.insert("field".to_string(), "colour".to_string());
    bad.insert("operator".to_string(), "equals".to_string());
    let result = create_forecast_type(
        &repo,
        company(),
        ForecastTypeForm {
            name: "Broken".into(),
            measure: "amount".into(),
            include_pipeline: true,
            include_best_case: true,
            include_commit: true,
            include_closed: true,
            is_active: true,
            description: None,
            rows: bad,
        },
    );
    assert!(matches!(result, Err(ServiceError::Form(_))));
}

#[test]
fn test_targets_flow_into_existing_buckets() {
    let test_db = common::TestDb::new("test_targets_flow_into_existing_buckets.db");
    let repo = test_db.repo();
    let ada = user(&repo, "Ada");
    let year = calendar_year(&repo, 2025);
    let revenue = forecast_type(&repo, "Revenue", ForecastMeasure::Amount, &[]);
    generate_forecasts(&repo, company(), None, 500).unwrap();
    let january = repo.list_periods(year.id).unwrap().remove(0);

    let saved = create_forecast_targets(
        &repo,
        company(),
        ForecastTargetForm {
            forecast_type_id: revenue.id.get(),
            period_id: january.id.get(),
            user_ids: vec![ada.id.get(), ada.id.get()],
            target: 5000.0,
        },
    )
    .unwrap();
    assert_eq!(saved, 1);

    let bucket = repo.get_forecast(ada.id, revenue.id, january.id).unwrap().unwrap();
    assert_eq!(bucket.target, 5000.0);
    assert_eq!(bucket.gap(), 5000.0);
    assert_eq!(bucket.attainment(), Some(0.0));
}

#[test]
fn test_currency_conversion_skips_quantity_forecasts() {
    let test_db = common::TestDb::new("test_currency_conversion_skips_quantity.db");
    let repo = test_db.repo();
    let ada = user(&repo, "Ada");
    let open = stage(&repo, "Negotiation", StageType::Open, 50);
    let year = calendar_year(&repo, 2025);
    let revenue = forecast_type(&repo, "Revenue", ForecastMeasure::Amount, &[]);
    let units = forecast_type(&repo, "Units", ForecastMeasure::Quantity, &[]);
    let january = repo.list_periods(year.id).unwrap().remove(0);

    let deal = create_opportunity(
        &repo,
        company(),
        opportunity_form(ada.id.get(), open.id.get(), 100.0, "2025-01-05"),
    )
    .unwrap();

    let outcome = convert_company_currency(&repo, company(), 2.5, 500).unwrap();
    assert_eq!(outcome.opportunities, 1);

    let converted = repo.get_opportunity_by_id(deal.id, company()).unwrap().unwrap();
    assert_eq!(converted.amount, Some(250.0));
    assert_eq!(converted.expected_revenue, Some(125.0));

    let money = repo.get_forecast(ada.id, revenue.id, january.id).unwrap().unwrap();
    let count = repo.get_forecast(ada.id, units.id, january.id).unwrap().unwrap();
    assert_eq!(money.values.commit, 250.0);
    assert_eq!(count.values.commit, 1.0);
}
