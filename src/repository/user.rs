//! Repository implementation for users.

use diesel::{prelude::*, upsert::excluded};

use crate::{
    domain::{
        types::{CompanyId, UserEmail, UserId},
        user::{NewUser, User},
    },
    models::user::{NewUser as DbNewUser, User as DbUser},
    repository::{
        DieselRepository, UserReader, UserWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

impl UserWriter for DieselRepository {
    fn create_or_update_user(&self, new_user: &NewUser) -> RepositoryResult<User> {
        use crate::schema::users;

        let mut conn = self.conn()?;

        let db_new_user: DbNewUser = new_user.into();

        let db_user = diesel::insert_into(users::table)
            .values(&db_new_user)
            .on_conflict((users::company_id, users::email))
            .do_update()
            .set((
                users::name.eq(excluded(users::name)),
                users::is_active.eq(excluded(users::is_active)),
            ))
            .get_result::<DbUser>(&mut conn)?;

        User::try_from(db_user).map_err(RepositoryError::from)
    }
}

impl UserReader for DieselRepository {
    fn get_user_by_id(&self, id: UserId, company_id: CompanyId) -> RepositoryResult<Option<User>> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_user = users::table
            .filter(users::id.eq(id.get()))
            .filter(users::company_id.eq(company_id.get()))
            .first::<DbUser>(&mut conn)
            .optional()?;

        db_user
            .map(|u| User::try_from(u).map_err(RepositoryError::from))
            .transpose()
    }

    fn get_user_by_email(
        &self,
        email: &UserEmail,
        company_id: CompanyId,
    ) -> RepositoryResult<Option<User>> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        let db_user = users::table
            .filter(users::email.eq(email.as_str()))
            .filter(users::company_id.eq(company_id.get()))
            .first::<DbUser>(&mut conn)
            .optional()?;

        match db_user {
            Some(db_user) => Ok(Some(User::try_from(db_user).map_err(RepositoryError::from)?)),
            None => Ok(None),
        }
    }

    fn list_active_users(&self, company_id: CompanyId) -> RepositoryResult<Vec<User>> {
        use crate::schema::users;

        let mut conn = self.conn()?;
        users::table
            .filter(users::company_id.eq(company_id.get()))
            .filter(users::is_active.eq(true))
            .order(users::id.asc())
            .load::<DbUser>(&mut conn)?
            .into_iter()
            .map(|u| User::try_from(u).map_err(RepositoryError::from))
            .collect()
    }
}
