//! Diesel models for opportunity split types and split rows.

use diesel::prelude::*;

use crate::domain::opportunity_split::{
    NewOpportunitySplit as DomainNewOpportunitySplit, NewSplitType as DomainNewSplitType,
    OpportunitySplit as DomainOpportunitySplit, SplitType as DomainSplitType,
};
use crate::domain::types::{
    CompanyId, OpportunityId, OpportunitySplitId, SplitLabel, SplitTypeId, TypeConstraintError,
    UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::opportunity_split_types)]
pub struct SplitType {
    pub id: i32,
    pub company_id: i32,
    pub label: String,
    pub split_field: String,
    pub totals_100_percent: bool,
    pub is_active: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::opportunity_split_types)]
pub struct NewSplitType<'a> {
    pub company_id: i32,
    pub label: &'a str,
    pub split_field: &'a str,
    pub totals_100_percent: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::opportunity_splits)]
pub struct OpportunitySplit {
    pub id: i32,
    pub company_id: i32,
    pub opportunity_id: i32,
    pub user_id: i32,
    pub split_type_id: i32,
    pub split_percentage: f64,
    pub split_amount: f64,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::opportunity_splits)]
pub struct NewOpportunitySplit {
    pub company_id: i32,
    pub opportunity_id: i32,
    pub user_id: i32,
    pub split_type_id: i32,
    pub split_percentage: f64,
    pub split_amount: f64,
}

impl TryFrom<SplitType> for DomainSplitType {
    type Error = TypeConstraintError;

    fn try_from(row: SplitType) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SplitTypeId::new(row.id)?,
            company_id: CompanyId::new(row.company_id)?,
            label: SplitLabel::new(row.label)?,
            split_field: row.split_field.parse()?,
            totals_100_percent: row.totals_100_percent,
            is_active: row.is_active,
        })
    }
}

impl<'a> From<&'a DomainNewSplitType> for NewSplitType<'a> {
    fn from(split_type: &'a DomainNewSplitType) -> Self {
        Self {
            company_id: split_type.company_id.get(),
            label: split_type.label.as_str(),
            split_field: split_type.split_field.code(),
            totals_100_percent: split_type.totals_100_percent,
            is_active: split_type.is_active,
        }
    }
}

impl TryFrom<OpportunitySplit> for DomainOpportunitySplit {
    type Error = TypeConstraintError;

    fn try_from(row: OpportunitySplit) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OpportunitySplitId::new(row.id)?,
            company_id: CompanyId::new(row.company_id)?,
            opportunity_id: OpportunityId::new(row.opportunity_id)?,
            user_id: UserId::new(row.user_id)?,
            split_type_id: SplitTypeId::new(row.split_type_id)?,
            percentage: row.split_percentage,
            amount: row.split_amount,
        })
    }
}

impl From<&DomainNewOpportunitySplit> for NewOpportunitySplit {
    fn from(split: &DomainNewOpportunitySplit) -> Self {
        Self {
            company_id: split.company_id.get(),
            opportunity_id: split.opportunity_id.get(),
            user_id: split.user_id.get(),
            split_type_id: split.split_type_id.get(),
            split_percentage: split.percentage,
            split_amount: split.amount,
        }
    }
}
