//! Diesel models representing users.

use diesel::prelude::*;

use crate::domain::types::TypeConstraintError;
use crate::domain::user::{NewUser as DomainNewUser, User as DomainUser};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
/// Diesel model for [`crate::domain::user::User`].
pub struct User {
    pub id: i32,
    pub company_id: i32,
    pub name: String,
    pub email: String,
    pub is_active: bool,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
/// Insertable form of [`User`].
pub struct NewUser<'a> {
    pub company_id: i32,
    pub name: &'a str,
    pub email: &'a str,
    pub is_active: bool,
}

impl TryFrom<User> for DomainUser {
    type Error = TypeConstraintError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        DomainUser::try_new(user.id, user.company_id, user.name, user.email, user.is_active)
    }
}

impl<'a> From<&'a DomainNewUser> for NewUser<'a> {
    fn from(user: &'a DomainNewUser) -> Self {
        Self {
            company_id: user.company_id.get(),
            name: user.name.as_str(),
            email: user.email.as_str(),
            is_active: user.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_domain_new_user() {
        let domain = DomainNewUser::try_new(3, "Alice".into(), "Alice@Example.com".into(), true)
            .expect("valid user");
        let new: NewUser = (&domain).into();
        assert_eq!(new.company_id, 3);
        assert_eq!(new.name, "Alice");
        assert_eq!(new.email, "alice@example.com");
    }

    #[test]
    fn rejects_invalid_rows() {
        let db = User {
            id: 0,
            company_id: 1,
            name: "Bob".into(),
            email: "bob@example.com".into(),
            is_active: true,
        };
        assert!(DomainUser::try_from(db).is_err());
    }
}
