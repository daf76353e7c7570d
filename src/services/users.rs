use crate::domain::types::CompanyId;
use crate::domain::user::User;
use crate::forms::user::{UserForm, UserPayload};
use crate::repository::{ShortcutKeyReader, ShortcutKeyWriter, UserReader, UserWriter};
use crate::services::ServiceResult;
use crate::services::shortcut_keys::ensure_default_shortcuts;

/// Creates the user or updates the one sharing the email, then makes sure
/// the default shortcuts exist.
pub fn create_or_update_user<R>(repo: &R, company_id: CompanyId, form: UserForm) -> ServiceResult<User>
where
    R: UserWriter + ShortcutKeyReader + ShortcutKeyWriter + ?Sized,
{
    let payload = UserPayload::try_from(form)?;
    let user = repo
        .create_or_update_user(&payload.into_domain(company_id))
        .map_err(|e| {
            log::error!("Failed to save user: {e}");
            e
        })?;

    ensure_default_shortcuts(repo, company_id, user.id)?;
    Ok(user)
}

pub fn list_active_users<R>(repo: &R, company_id: CompanyId) -> ServiceResult<Vec<User>>
where
    R: UserReader + ?Sized,
{
    Ok(repo.list_active_users(company_id)?)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::types::UserId;
    use crate::repository::mock::MockRepository;
    use crate::services::ServiceError;

    #[test]
    fn new_user_gets_default_shortcuts() {
        let mut repo = MockRepository::new();
        repo.expect_create_or_update_user().returning(|new_user| {
            Ok(User {
                id: UserId::new(7).expect("valid id"),
                company_id: new_user.company_id,
                name: new_user.name.clone(),
                email: new_user.email.clone(),
                is_active: new_user.is_active,
            })
        });
        repo.expect_shortcut_key_exists().returning(|_, _| Ok(true));
        repo.expect_save_shortcut_key().never();

        let user = create_or_update_user(
            &repo,
            CompanyId::new(1).expect("valid company"),
            UserForm {
                name: "Ada".into(),
                email: " Ada@Example.com ".into(),
                is_active: true,
            },
        )
        .expect("user saved");
        assert_eq!(user.email.as_str(), "ada@example.com");
    }

    #[test]
    fn invalid_email_is_a_form_error() {
        let mut repo = MockRepository::new();
        repo.expect_create_or_update_user().never();

        let result = create_or_update_user(
            &repo,
            CompanyId::new(1).expect("valid company"),
            UserForm {
                name: "Ada".into(),
                email: "not-an-email".into(),
                is_active: true,
            },
        );
        assert!(matches!(result, Err(ServiceError::Form(_))));
    }
}
