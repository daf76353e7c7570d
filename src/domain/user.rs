use serde::{Deserialize, Serialize};

use crate::domain::types::{CompanyId, TypeConstraintError, UserEmail, UserId, UserName};

/// Person owning opportunities and forecast buckets inside a company.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub company_id: CompanyId,
    pub name: UserName,
    pub email: UserEmail,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewUser {
    pub company_id: CompanyId,
    pub name: UserName,
    pub email: UserEmail,
    pub is_active: bool,
}

impl User {
    /// Validates raw values coming from storage or transport.
    pub fn try_new(
        id: i32,
        company_id: i32,
        name: String,
        email: String,
        is_active: bool,
    ) -> Result<Self, TypeConstraintError> {
        Ok(Self {
            id: UserId::new(id)?,
            company_id: CompanyId::new(company_id)?,
            name: UserName::new(name)?,
            email: UserEmail::new(email)?,
            is_active,
        })
    }
}

impl NewUser {
    #[must_use]
    pub fn new(company_id: CompanyId, name: UserName, email: UserEmail, is_active: bool) -> Self {
        Self {
            company_id,
            name,
            email,
            is_active,
        }
    }

    pub fn try_new(
        company_id: i32,
        name: String,
        email: String,
        is_active: bool,
    ) -> Result<Self, TypeConstraintError> {
        Ok(Self::new(
            CompanyId::new(company_id)?,
            UserName::new(name)?,
            UserEmail::new(email)?,
            is_active,
        ))
    }
}
