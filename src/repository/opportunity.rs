//! Repository implementation for opportunities and pipeline stages.

use chrono::Utc;
use diesel::{Connection, prelude::*};

use crate::{
    domain::{
        opportunity::{
            NewOpportunity, NewOpportunityStage, Opportunity, OpportunityStage, UpdateOpportunity,
        },
        types::{CompanyId, OpportunityId, StageId},
    },
    models::opportunity::{
        NewOpportunity as DbNewOpportunity, NewOpportunityStage as DbNewOpportunityStage,
        Opportunity as DbOpportunity, OpportunityStage as DbOpportunityStage,
        UpdateOpportunity as DbUpdateOpportunity,
    },
    repository::{
        DieselRepository, OpportunityListQuery, OpportunityReader, OpportunityWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn into_domain(row: DbOpportunity, stage: DbOpportunityStage) -> RepositoryResult<Opportunity> {
    Opportunity::try_from((row, stage)).map_err(RepositoryError::from)
}

impl OpportunityReader for DieselRepository {
    fn get_stage_by_id(
        &self,
        id: StageId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<OpportunityStage>> {
        use crate::schema::opportunity_stages;

        let mut conn = self.conn()?;
        let stage = opportunity_stages::table
            .filter(opportunity_stages::id.eq(id.get()))
            .filter(opportunity_stages::company_id.eq(company_id.get()))
            .first::<DbOpportunityStage>(&mut conn)
            .optional()?;

        stage
            .map(|s| OpportunityStage::try_from(s).map_err(RepositoryError::from))
            .transpose()
    }

    fn get_opportunity_by_id(
        &self,
        id: OpportunityId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<Opportunity>> {
        use crate::schema::{opportunities, opportunity_stages};

        let mut conn = self.conn()?;
        let row = opportunities::table
            .inner_join(opportunity_stages::table)
            .filter(opportunities::id.eq(id.get()))
            .filter(opportunities::company_id.eq(company_id.get()))
            .select((DbOpportunity::as_select(), DbOpportunityStage::as_select()))
            .first::<(DbOpportunity, DbOpportunityStage)>(&mut conn)
            .optional()?;

        row.map(|(row, stage)| into_domain(row, stage)).transpose()
    }

    fn list_opportunities(&self, query: OpportunityListQuery) -> RepositoryResult<Vec<Opportunity>> {
        use crate::schema::{opportunities, opportunity_stages};

        let mut conn = self.conn()?;

        let mut items = opportunities::table
            .inner_join(opportunity_stages::table)
            .filter(opportunities::company_id.eq(query.company_id.get()))
            .select((DbOpportunity::as_select(), DbOpportunityStage::as_select()))
            .into_boxed();

        if let Some(owner_ids) = &query.owner_ids {
            let ids = owner_ids.iter().map(|id| id.get()).collect::<Vec<i32>>();
            items = items.filter(opportunities::owner_id.eq_any(ids));
        }
        if let Some(from) = query.close_from {
            items = items.filter(opportunities::close_date.ge(from));
        }
        if let Some(to) = query.close_to {
            items = items.filter(opportunities::close_date.le(to));
        }

        items
            .order(opportunities::id.asc())
            .load::<(DbOpportunity, DbOpportunityStage)>(&mut conn)?
            .into_iter()
            .map(|(row, stage)| into_domain(row, stage))
            .collect()
    }
}

impl OpportunityWriter for DieselRepository {
    fn create_stage(&self, new_stage: &NewOpportunityStage) -> RepositoryResult<OpportunityStage> {
        use crate::schema::opportunity_stages;

        let mut conn = self.conn()?;
        let db_new_stage: DbNewOpportunityStage = new_stage.into();

        let stage = diesel::insert_into(opportunity_stages::table)
            .values(&db_new_stage)
            .get_result::<DbOpportunityStage>(&mut conn)?;

        OpportunityStage::try_from(stage).map_err(RepositoryError::from)
    }

    fn create_opportunity(
        &self,
        new_opportunity: &NewOpportunity,
    ) -> RepositoryResult<Opportunity> {
        use crate::schema::{opportunities, opportunity_stages};

        let mut conn = self.conn()?;
        let db_new: DbNewOpportunity = new_opportunity.into();

        let (row, stage) = conn.transaction::<_, RepositoryError, _>(|conn| {
            let row = diesel::insert_into(opportunities::table)
                .values(&db_new)
                .get_result::<DbOpportunity>(conn)?;
            let stage = opportunity_stages::table
                .find(row.stage_id)
                .first::<DbOpportunityStage>(conn)?;
            Ok((row, stage))
        })?;

        into_domain(row, stage)
    }

    fn update_opportunity(
        &self,
        id: OpportunityId,
        company_id: CompanyId,
        updates: &UpdateOpportunity,
    ) -> RepositoryResult<Opportunity> {
        use crate::schema::{opportunities, opportunity_stages};

        let mut conn = self.conn()?;
        let changeset = DbUpdateOpportunity::new(updates, Utc::now().naive_utc());

        let (row, stage) = conn.transaction::<_, RepositoryError, _>(|conn| {
            let row = diesel::update(
                opportunities::table
                    .filter(opportunities::id.eq(id.get()))
                    .filter(opportunities::company_id.eq(company_id.get())),
            )
            .set(&changeset)
            .get_result::<DbOpportunity>(conn)?;
            let stage = opportunity_stages::table
                .find(row.stage_id)
                .first::<DbOpportunityStage>(conn)?;
            Ok((row, stage))
        })?;

        into_domain(row, stage)
    }

    fn delete_opportunity(&self, id: OpportunityId, company_id: CompanyId) -> RepositoryResult<()> {
        use crate::schema::opportunities;

        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            opportunities::table
                .filter(opportunities::id.eq(id.get()))
                .filter(opportunities::company_id.eq(company_id.get())),
        )
        .execute(&mut conn)?;

        if deleted == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    fn scale_opportunity_amounts(
        &self,
        company_id: CompanyId,
        rate: f64,
        batch_size: usize,
    ) -> RepositoryResult<usize> {
        use crate::schema::opportunities;

        let mut conn = self.conn()?;

        let ids = opportunities::table
            .filter(opportunities::company_id.eq(company_id.get()))
            .filter(opportunities::amount.is_not_null())
            .select(opportunities::id)
            .load::<i32>(&mut conn)?;

        conn.transaction::<usize, RepositoryError, _>(|conn| {
            let mut updated = 0;
            for chunk in ids.chunks(batch_size.max(1)) {
                let targets = opportunities::table.filter(opportunities::id.eq_any(chunk.to_vec()));
                updated += diesel::update(targets)
                    .set((
                        opportunities::amount.eq(opportunities::amount * rate),
                        opportunities::expected_revenue.eq(opportunities::expected_revenue * rate),
                    ))
                    .execute(conn)?;
            }
            Ok(updated)
        })
    }
}
