use genie_crm::domain::forecast::{ForecastValues, NewForecast, NewForecastTarget, forecast_name};
use genie_crm::domain::opportunity::{NewOpportunity, OpportunityFields};
use genie_crm::domain::shortcut_key::NewShortcutKey;
use genie_crm::domain::types::{
    ForecastCategory, ForecastMeasure, OpportunityName, PageUrl, Probability, ShortcutChar,
    ShortcutCommand, StageType,
};
use genie_crm::repository::errors::RepositoryError;
use genie_crm::repository::{
    FiscalYearReader, ForecastListQuery, ForecastReader, ForecastValuesUpdate, ForecastWriter,
    OpportunityListQuery, OpportunityReader, OpportunityWriter, ShortcutKeyReader,
    ShortcutKeyWriter, UserReader,
};

mod common;

use common::{calendar_year, company, date, forecast_type, stage, user};

#[test]
fn test_opportunity_crud_and_window_query() {
    let test_db = common::TestDb::new("test_opportunity_crud_and_window_query.db");
    let repo = test_db.repo();
    let owner = user(&repo, "Ada");
    let open = stage(&repo, "Prospecting", StageType::Open, 20);

    let mut fields = OpportunityFields::new(
        owner.id,
        open.id,
        OpportunityName::new("Renewal").unwrap(),
        Some(1000.0),
        Probability::new(20).unwrap(),
        None,
        date(2025, 3, 15),
        ForecastCategory::Pipeline,
    )
    .with_details(
        Some("Acme".into()),
        None,
        None,
        None,
        Some("<script>x</script><b>bold</b>".into()),
    );
    let created = repo
        .create_opportunity(&NewOpportunity {
            company_id: company(),
            fields: fields.clone(),
        })
        .unwrap();
    assert_eq!(created.expected_revenue, Some(200.0));
    assert_eq!(created.stage.name.as_str(), "Prospecting");
    assert_eq!(created.description.as_deref(), Some("<b>bold</b>"));

    fields.close_date = date(2025, 5, 1);
    fields.amount = Some(500.0);
    let updated = repo.update_opportunity(created.id, company(), &fields).unwrap();
    assert_eq!(updated.expected_revenue, Some(100.0));

    let march = repo
        .list_opportunities(
            OpportunityListQuery::new(company())
                .owners([owner.id])
                .closing_between(date(2025, 3, 1), date(2025, 3, 31)),
        )
        .unwrap();
    assert!(march.is_empty());
    let may = repo
        .list_opportunities(
            OpportunityListQuery::new(company()).closing_between(date(2025, 5, 1), date(2025, 5, 1)),
        )
        .unwrap();
    assert_eq!(may.len(), 1);

    repo.delete_opportunity(created.id, company()).unwrap();
    assert!(repo.get_opportunity_by_id(created.id, company()).unwrap().is_none());
}

#[test]
fn test_period_lookup_by_date() {
    let test_db = common::TestDb::new("test_period_lookup_by_date.db");
    let repo = test_db.repo();
    let year = calendar_year(&repo, 2025);

    let periods = repo.list_periods(year.id).unwrap();
    assert_eq!(periods.len(), 12);
    assert_eq!(periods[1].name, "P2 2025");

    let found = repo
        .find_period_by_date(company(), date(2025, 2, 28))
        .unwrap()
        .expect("period found");
    assert_eq!(found.id, periods[1].id);
    assert!(repo.find_period_by_date(company(), date(2026, 1, 1)).unwrap().is_none());

    let current = repo.get_current_fiscal_year(company()).unwrap().expect("current year");
    assert_eq!(current.id, year.id);
}

#[test]
fn test_forecast_bucket_is_unique_per_owner_type_period() {
    let test_db = common::TestDb::new("test_forecast_bucket_is_unique.db");
    let repo = test_db.repo();
    let owner = user(&repo, "Ada");
    let year = calendar_year(&repo, 2025);
    let revenue = forecast_type(&repo, "Revenue", ForecastMeasure::Amount, &[]);
    let period = repo.list_periods(year.id).unwrap().remove(0);

    let new_forecast = NewForecast {
        company_id: company(),
        owner_id: owner.id,
        forecast_type_id: revenue.id,
        fiscal_year_id: year.id,
        quarter_id: period.quarter_id,
        period_id: period.id,
        name: forecast_name(&revenue, &period.name),
        target: 0.0,
        values: ForecastValues::default(),
    };
    let created = repo.create_forecast(&new_forecast).unwrap();
    assert_eq!(created.name, "Revenue - P1 2025");

    let duplicate = repo.create_forecast(&new_forecast);
    assert!(matches!(
        duplicate,
        Err(RepositoryError::ConstraintViolation(_))
    ));

    let values = ForecastValues {
        pipeline: 10.0,
        commit: 5.0,
        ..ForecastValues::default()
    };
    repo.update_forecast_values(
        &[ForecastValuesUpdate {
            id: created.id,
            target: 50.0,
            values,
        }],
        500,
    )
    .unwrap();
    let stored = repo
        .get_forecast(owner.id, revenue.id, period.id)
        .unwrap()
        .expect("bucket stored");
    assert_eq!(stored.values, values);
    assert_eq!(stored.target, 50.0);
}

#[test]
fn test_bulk_forecast_writes_are_batched() {
    let test_db = common::TestDb::new("test_bulk_forecast_writes_are_batched.db");
    let repo = test_db.repo();
    let owner = user(&repo, "Ada");
    let year = calendar_year(&repo, 2025);
    let revenue = forecast_type(&repo, "Revenue", ForecastMeasure::Amount, &[]);
    let periods = repo.list_periods(year.id).unwrap();

    let rows = periods
        .iter()
        .map(|p| NewForecast {
            company_id: company(),
            owner_id: owner.id,
            forecast_type_id: revenue.id,
            fiscal_year_id: year.id,
            quarter_id: p.quarter_id,
            period_id: p.id,
            name: forecast_name(&revenue, &p.name),
            target: 0.0,
            values: ForecastValues::default(),
        })
        .collect::<Vec<_>>();
    assert_eq!(repo.create_forecasts(&rows, 5).unwrap(), 12);

    let stored = repo
        .list_forecasts(ForecastListQuery::new().company(company()).fiscal_year(year.id))
        .unwrap();
    assert_eq!(stored.len(), 12);
    assert_eq!(stored[0].period_id, periods[0].id);

    let updates = stored
        .iter()
        .map(|f| ForecastValuesUpdate {
            id: f.id,
            target: 100.0,
            values: ForecastValues {
                closed: 40.0,
                ..ForecastValues::default()
            },
        })
        .collect::<Vec<_>>();
    assert_eq!(repo.update_forecast_values(&updates, 5).unwrap(), 12);

    assert_eq!(repo.scale_forecast_values(company(), 2.0, 5).unwrap(), 12);
    let scaled = repo
        .list_forecasts(ForecastListQuery::new().owner(owner.id))
        .unwrap();
    assert!(scaled.iter().all(|f| f.target == 200.0 && f.values.closed == 80.0));
}

#[test]
fn test_forecast_targets_are_replaced_per_key() {
    let test_db = common::TestDb::new("test_forecast_targets_are_replaced.db");
    let repo = test_db.repo();
    let owner = user(&repo, "Ada");
    let year = calendar_year(&repo, 2025);
    let revenue = forecast_type(&repo, "Revenue", ForecastMeasure::Amount, &[]);
    let period = repo.list_periods(year.id).unwrap().remove(0);

    let target = |value| NewForecastTarget {
        company_id: company(),
        assigned_to: owner.id,
        period_id: period.id,
        forecast_type_id: revenue.id,
        target: value,
    };
    repo.save_forecast_targets(&[target(100.0)]).unwrap();
    repo.save_forecast_targets(&[target(250.0)]).unwrap();

    let targets = repo
        .list_forecast_targets(revenue.id, &[owner.id], &[period.id])
        .unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].target, 250.0);
}

#[test]
fn test_shortcut_key_is_unique_per_page() {
    let test_db = common::TestDb::new("test_shortcut_key_is_unique_per_page.db");
    let repo = test_db.repo();
    let owner = user(&repo, "Ada");
    let page = PageUrl::new("/forecast/forecast-view/").unwrap();

    for key in ["F", "G"] {
        repo.save_shortcut_key(&NewShortcutKey::new(
            company(),
            owner.id,
            page.clone(),
            ShortcutChar::new(key).unwrap(),
            ShortcutCommand::Alt,
        ))
        .unwrap();
    }

    assert!(repo.shortcut_key_exists(owner.id, &page).unwrap());
    let keys = repo.list_shortcut_keys(owner.id).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].key.get(), 'G');
}

#[test]
fn test_user_upsert_by_email() {
    let test_db = common::TestDb::new("test_user_upsert_by_email.db");
    let repo = test_db.repo();
    let first = user(&repo, "Ada");
    let again = user(&repo, "Ada");
    assert_eq!(first.id, again.id);
    assert_eq!(repo.list_active_users(company()).unwrap().len(), 1);
    assert!(repo.get_user_by_email(&first.email, company()).unwrap().is_some());
}
