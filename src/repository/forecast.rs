//! Repository implementation for forecast types, targets and buckets.

use chrono::Utc;
use diesel::{Connection, prelude::*};

use crate::{
    domain::{
        forecast::{
            Forecast, ForecastCondition, ForecastTarget, ForecastType, NewForecast,
            NewForecastCondition, NewForecastTarget, NewForecastType,
        },
        types::{CompanyId, ForecastMeasure, ForecastTypeId, PeriodId, UserId},
    },
    models::forecast::{
        Forecast as DbForecast, ForecastCondition as DbForecastCondition,
        ForecastTarget as DbForecastTarget, ForecastType as DbForecastType,
        ForecastValuesChangeset, NewForecast as DbNewForecast,
        NewForecastCondition as DbNewForecastCondition, NewForecastTarget as DbNewForecastTarget,
        NewForecastType as DbNewForecastType,
    },
    repository::{
        DieselRepository, ForecastListQuery, ForecastReader, ForecastValuesUpdate, ForecastWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn forecast_into_domain(row: DbForecast) -> RepositoryResult<Forecast> {
    Forecast::try_from(row).map_err(RepositoryError::from)
}

impl ForecastReader for DieselRepository {
    fn get_forecast_type_by_id(
        &self,
        id: ForecastTypeId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<ForecastType>> {
        use crate::schema::forecast_types;

        let mut conn = self.conn()?;
        forecast_types::table
            .filter(forecast_types::id.eq(id.get()))
            .filter(forecast_types::company_id.eq(company_id.get()))
            .first::<DbForecastType>(&mut conn)
            .optional()?
            .map(|t| ForecastType::try_from(t).map_err(RepositoryError::from))
            .transpose()
    }

    fn list_forecast_types(
        &self,
        company_id: CompanyId,
        active_only: bool,
    ) -> RepositoryResult<Vec<ForecastType>> {
        use crate::schema::forecast_types;

        let mut conn = self.conn()?;
        let mut query = forecast_types::table
            .filter(forecast_types::company_id.eq(company_id.get()))
            .into_boxed();
        if active_only {
            query = query.filter(forecast_types::is_active.eq(true));
        }

        query
            .order(forecast_types::id.asc())
            .load::<DbForecastType>(&mut conn)?
            .into_iter()
            .map(|t| ForecastType::try_from(t).map_err(RepositoryError::from))
            .collect()
    }

    fn list_forecast_conditions(
        &self,
        forecast_type_id: ForecastTypeId,
    ) -> RepositoryResult<Vec<ForecastCondition>> {
        use crate::schema::forecast_conditions;

        let mut conn = self.conn()?;
        forecast_conditions::table
            .filter(forecast_conditions::forecast_type_id.eq(forecast_type_id.get()))
            .filter(forecast_conditions::is_active.eq(true))
            .order((
                forecast_conditions::condition_order.asc(),
                forecast_conditions::id.asc(),
            ))
            .load::<DbForecastCondition>(&mut conn)?
            .into_iter()
            .map(|c| ForecastCondition::try_from(c).map_err(RepositoryError::from))
            .collect()
    }

    fn list_forecast_targets(
        &self,
        forecast_type_id: ForecastTypeId,
        owner_ids: &[UserId],
        period_ids: &[PeriodId],
    ) -> RepositoryResult<Vec<ForecastTarget>> {
        use crate::schema::forecast_targets;

        let mut conn = self.conn()?;
        let owners = owner_ids.iter().map(|id| id.get()).collect::<Vec<i32>>();
        let periods = period_ids.iter().map(|id| id.get()).collect::<Vec<i32>>();

        forecast_targets::table
            .filter(forecast_targets::forecast_type_id.eq(forecast_type_id.get()))
            .filter(forecast_targets::is_active.eq(true))
            .filter(forecast_targets::assigned_to.eq_any(owners))
            .filter(forecast_targets::period_id.eq_any(periods))
            .load::<DbForecastTarget>(&mut conn)?
            .into_iter()
            .map(|t| ForecastTarget::try_from(t).map_err(RepositoryError::from))
            .collect()
    }

    fn get_forecast(
        &self,
        owner_id: UserId,
        forecast_type_id: ForecastTypeId,
        period_id: PeriodId,
    ) -> RepositoryResult<Option<Forecast>> {
        use crate::schema::forecasts;

        let mut conn = self.conn()?;
        forecasts::table
            .filter(forecasts::owner_id.eq(owner_id.get()))
            .filter(forecasts::forecast_type_id.eq(forecast_type_id.get()))
            .filter(forecasts::period_id.eq(period_id.get()))
            .first::<DbForecast>(&mut conn)
            .optional()?
            .map(forecast_into_domain)
            .transpose()
    }

    fn list_forecasts(&self, query: ForecastListQuery) -> RepositoryResult<Vec<Forecast>> {
        use crate::schema::{forecasts, periods};

        let mut conn = self.conn()?;
        let mut items = forecasts::table
            .inner_join(periods::table)
            .select(DbForecast::as_select())
            .into_boxed();

        if let Some(company_id) = query.company_id {
            items = items.filter(forecasts::company_id.eq(company_id.get()));
        }
        if let Some(owner_id) = query.owner_id {
            items = items.filter(forecasts::owner_id.eq(owner_id.get()));
        }
        if let Some(fiscal_year_id) = query.fiscal_year_id {
            items = items.filter(forecasts::fiscal_year_id.eq(fiscal_year_id.get()));
        }
        if let Some(forecast_type_id) = query.forecast_type_id {
            items = items.filter(forecasts::forecast_type_id.eq(forecast_type_id.get()));
        }
        if let Some(period_ids) = &query.period_ids {
            let ids = period_ids.iter().map(|id| id.get()).collect::<Vec<i32>>();
            items = items.filter(forecasts::period_id.eq_any(ids));
        }

        items
            .order((
                forecasts::owner_id.asc(),
                periods::start_date.asc(),
                forecasts::forecast_type_id.asc(),
            ))
            .load::<DbForecast>(&mut conn)?
            .into_iter()
            .map(forecast_into_domain)
            .collect()
    }
}

impl ForecastWriter for DieselRepository {
    fn create_forecast_type(
        &self,
        forecast_type: &NewForecastType,
        conditions: &[NewForecastCondition],
    ) -> RepositoryResult<ForecastType> {
        use crate::schema::{forecast_conditions, forecast_types};

        let mut conn = self.conn()?;
        let db_type: DbNewForecastType = forecast_type.into();

        let row = conn.transaction::<DbForecastType, RepositoryError, _>(|conn| {
            let row = diesel::insert_into(forecast_types::table)
                .values(&db_type)
                .get_result::<DbForecastType>(conn)?;

            let type_id = ForecastTypeId::new(row.id)?;
            let db_conditions = conditions
                .iter()
                .map(|c| DbNewForecastCondition::new(type_id, c))
                .collect::<Vec<_>>();
            if !db_conditions.is_empty() {
                diesel::insert_into(forecast_conditions::table)
                    .values(&db_conditions)
                    .execute(conn)?;
            }
            Ok(row)
        })?;

        ForecastType::try_from(row).map_err(RepositoryError::from)
    }

    fn save_forecast_targets(&self, targets: &[NewForecastTarget]) -> RepositoryResult<usize> {
        use crate::schema::forecast_targets;

        let mut conn = self.conn()?;
        conn.transaction::<usize, RepositoryError, _>(|conn| {
            let mut saved = 0;
            for target in targets {
                let db_target: DbNewForecastTarget = target.into();
                saved += diesel::insert_into(forecast_targets::table)
                    .values(&db_target)
                    .on_conflict((
                        forecast_targets::assigned_to,
                        forecast_targets::period_id,
                        forecast_targets::forecast_type_id,
                    ))
                    .do_update()
                    .set((
                        forecast_targets::target.eq(db_target.target),
                        forecast_targets::is_active.eq(true),
                    ))
                    .execute(conn)?;
            }
            Ok(saved)
        })
    }

    fn create_forecast(&self, forecast: &NewForecast) -> RepositoryResult<Forecast> {
        use crate::schema::forecasts;

        let mut conn = self.conn()?;
        let db_forecast: DbNewForecast = forecast.into();

        let row = diesel::insert_into(forecasts::table)
            .values(&db_forecast)
            .get_result::<DbForecast>(&mut conn)?;

        forecast_into_domain(row)
    }

    fn create_forecasts(
        &self,
        forecasts: &[NewForecast],
        batch_size: usize,
    ) -> RepositoryResult<usize> {
        use crate::schema::forecasts as forecasts_table;

        let mut conn = self.conn()?;
        conn.transaction::<usize, RepositoryError, _>(|conn| {
            let mut inserted = 0;
            for chunk in forecasts.chunks(batch_size.max(1)) {
                let rows = chunk.iter().map(DbNewForecast::from).collect::<Vec<_>>();
                inserted += diesel::insert_into(forecasts_table::table)
                    .values(&rows)
                    .execute(conn)?;
            }
            Ok(inserted)
        })
    }

    fn update_forecast_values(
        &self,
        updates: &[ForecastValuesUpdate],
        batch_size: usize,
    ) -> RepositoryResult<usize> {
        use crate::schema::forecasts;

        let mut conn = self.conn()?;
        let now = Utc::now().naive_utc();
        let mut updated = 0;

        for chunk in updates.chunks(batch_size.max(1)) {
            updated += conn.transaction::<usize, RepositoryError, _>(|conn| {
                let mut count = 0;
                for update in chunk {
                    let changeset = ForecastValuesChangeset::new(update.target, &update.values, now);
                    count += diesel::update(forecasts::table.find(update.id.get()))
                        .set(&changeset)
                        .execute(conn)?;
                }
                Ok(count)
            })?;
        }

        Ok(updated)
    }

    fn scale_forecast_values(
        &self,
        company_id: CompanyId,
        rate: f64,
        batch_size: usize,
    ) -> RepositoryResult<usize> {
        use crate::schema::{forecast_targets, forecast_types, forecasts};

        let mut conn = self.conn()?;
        let ids = forecasts::table
            .inner_join(forecast_types::table)
            .filter(forecasts::company_id.eq(company_id.get()))
            .filter(forecast_types::measure.ne(ForecastMeasure::Quantity.code()))
            .select(forecasts::id)
            .load::<i32>(&mut conn)?;
        let target_ids = forecast_targets::table
            .inner_join(forecast_types::table)
            .filter(forecast_targets::company_id.eq(company_id.get()))
            .filter(forecast_types::measure.ne(ForecastMeasure::Quantity.code()))
            .select(forecast_targets::id)
            .load::<i32>(&mut conn)?;

        conn.transaction::<usize, RepositoryError, _>(|conn| {
            let mut updated = 0;
            for chunk in target_ids.chunks(batch_size.max(1)) {
                let targets =
                    forecast_targets::table.filter(forecast_targets::id.eq_any(chunk.to_vec()));
                updated += diesel::update(targets)
                    .set(forecast_targets::target.eq(forecast_targets::target * rate))
                    .execute(conn)?;
            }
            for chunk in ids.chunks(batch_size.max(1)) {
                let targets = forecasts::table.filter(forecasts::id.eq_any(chunk.to_vec()));
                updated += diesel::update(targets)
                    .set((
                        forecasts::target.eq(forecasts::target * rate),
                        forecasts::pipeline.eq(forecasts::pipeline * rate),
                        forecasts::best_case.eq(forecasts::best_case * rate),
                        forecasts::commit_value.eq(forecasts::commit_value * rate),
                        forecasts::closed.eq(forecasts::closed * rate),
                        forecasts::actual.eq(forecasts::actual * rate),
                    ))
                    .execute(conn)?;
            }
            Ok(updated)
        })
    }
}
