//! Repository implementation for opportunity split types and splits.

use diesel::{Connection, prelude::*};

use crate::{
    domain::{
        opportunity_split::{NewOpportunitySplit, NewSplitType, OpportunitySplit, SplitType},
        types::{CompanyId, OpportunityId, SplitTypeId},
    },
    models::opportunity_split::{
        NewOpportunitySplit as DbNewOpportunitySplit, NewSplitType as DbNewSplitType,
        OpportunitySplit as DbOpportunitySplit, SplitType as DbSplitType,
    },
    repository::{
        DieselRepository, SplitReader, SplitWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

fn split_into_domain(row: DbOpportunitySplit) -> RepositoryResult<OpportunitySplit> {
    OpportunitySplit::try_from(row).map_err(RepositoryError::from)
}

impl SplitReader for DieselRepository {
    fn get_split_type_by_id(
        &self,
        id: SplitTypeId,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<SplitType>> {
        use crate::schema::opportunity_split_types;

        let mut conn = self.conn()?;
        opportunity_split_types::table
            .filter(opportunity_split_types::id.eq(id.get()))
            .filter(opportunity_split_types::company_id.eq(company_id.get()))
            .first::<DbSplitType>(&mut conn)
            .optional()?
            .map(|t| SplitType::try_from(t).map_err(RepositoryError::from))
            .transpose()
    }

    fn list_split_types(
        &self,
        company_id: CompanyId,
        active_only: bool,
    ) -> RepositoryResult<Vec<SplitType>> {
        use crate::schema::opportunity_split_types;

        let mut conn = self.conn()?;
        let mut query = opportunity_split_types::table
            .filter(opportunity_split_types::company_id.eq(company_id.get()))
            .into_boxed();
        if active_only {
            query = query.filter(opportunity_split_types::is_active.eq(true));
        }

        query
            .order(opportunity_split_types::id.asc())
            .load::<DbSplitType>(&mut conn)?
            .into_iter()
            .map(|t| SplitType::try_from(t).map_err(RepositoryError::from))
            .collect()
    }

    fn list_opportunity_splits(
        &self,
        opportunity_id: OpportunityId,
        split_type_id: Option<SplitTypeId>,
    ) -> RepositoryResult<Vec<OpportunitySplit>> {
        use crate::schema::opportunity_splits;

        let mut conn = self.conn()?;
        let mut query = opportunity_splits::table
            .filter(opportunity_splits::opportunity_id.eq(opportunity_id.get()))
            .into_boxed();
        if let Some(split_type_id) = split_type_id {
            query = query.filter(opportunity_splits::split_type_id.eq(split_type_id.get()));
        }

        query
            .order((
                opportunity_splits::split_type_id.asc(),
                opportunity_splits::id.asc(),
            ))
            .load::<DbOpportunitySplit>(&mut conn)?
            .into_iter()
            .map(split_into_domain)
            .collect()
    }
}

impl SplitWriter for DieselRepository {
    fn create_split_type(&self, split_type: &NewSplitType) -> RepositoryResult<SplitType> {
        use crate::schema::opportunity_split_types;

        let mut conn = self.conn()?;
        let db_new: DbNewSplitType = split_type.into();

        let row = diesel::insert_into(opportunity_split_types::table)
            .values(&db_new)
            .get_result::<DbSplitType>(&mut conn)?;

        SplitType::try_from(row).map_err(RepositoryError::from)
    }

    fn create_opportunity_split(
        &self,
        split: &NewOpportunitySplit,
    ) -> RepositoryResult<OpportunitySplit> {
        use crate::schema::opportunity_splits;

        let mut conn = self.conn()?;
        let db_new: DbNewOpportunitySplit = split.into();

        let row = diesel::insert_into(opportunity_splits::table)
            .values(&db_new)
            .get_result::<DbOpportunitySplit>(&mut conn)?;

        split_into_domain(row)
    }

    fn replace_opportunity_splits(
        &self,
        opportunity_id: OpportunityId,
        split_type_id: SplitTypeId,
        splits: &[NewOpportunitySplit],
    ) -> RepositoryResult<Vec<OpportunitySplit>> {
        use crate::schema::opportunity_splits;

        let mut conn = self.conn()?;
        let rows = conn.transaction::<Vec<DbOpportunitySplit>, RepositoryError, _>(|conn| {
            diesel::delete(
                opportunity_splits::table
                    .filter(opportunity_splits::opportunity_id.eq(opportunity_id.get()))
                    .filter(opportunity_splits::split_type_id.eq(split_type_id.get())),
            )
            .execute(conn)?;

            let mut rows = Vec::with_capacity(splits.len());
            for split in splits {
                let db_new: DbNewOpportunitySplit = split.into();
                rows.push(
                    diesel::insert_into(opportunity_splits::table)
                        .values(&db_new)
                        .get_result::<DbOpportunitySplit>(conn)?,
                );
            }
            Ok(rows)
        })?;

        rows.into_iter().map(split_into_domain).collect()
    }
}
