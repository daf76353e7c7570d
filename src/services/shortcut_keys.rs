//! Per-user keyboard shortcuts.

use crate::domain::shortcut_key::{NewShortcutKey, ShortcutKey};
use crate::domain::types::{CompanyId, PageUrl, ShortcutChar, ShortcutCommand, UserId};
use crate::forms::shortcut_key::{ShortcutKeyForm, ShortcutKeyPayload};
use crate::repository::{ShortcutKeyReader, ShortcutKeyWriter};
use crate::services::ServiceResult;

/// Pages every new user gets a shortcut for, with the key bound to it.
pub const DEFAULT_SHORTCUTS: &[(&str, &str)] = &[
    ("/forecast/forecast-view/", "F"),
    ("/opportunities/opportunities-view/", "O"),
];

/// Inserts the default shortcuts the user does not have yet. Existing
/// bindings are left untouched. Returns how many were added.
pub fn ensure_default_shortcuts<R>(
    repo: &R,
    company_id: CompanyId,
    user_id: UserId,
) -> ServiceResult<usize>
where
    R: ShortcutKeyReader + ShortcutKeyWriter + ?Sized,
{
    let mut added = 0;
    for (page, key) in DEFAULT_SHORTCUTS {
        let page = PageUrl::new(*page)?;
        if repo.shortcut_key_exists(user_id, &page)? {
            continue;
        }
        repo.save_shortcut_key(&NewShortcutKey::new(
            company_id,
            user_id,
            page,
            ShortcutChar::new(key)?,
            ShortcutCommand::Alt,
        ))?;
        added += 1;
    }
    if added > 0 {
        log::info!("Added {added} default shortcuts for user {user_id}");
    }
    Ok(added)
}

pub fn save_shortcut<R>(
    repo: &R,
    company_id: CompanyId,
    form: ShortcutKeyForm,
) -> ServiceResult<ShortcutKey>
where
    R: ShortcutKeyWriter + ?Sized,
{
    let payload = ShortcutKeyPayload::try_from(form)?;
    Ok(repo.save_shortcut_key(&payload.into_domain(company_id))?)
}

pub fn list_shortcuts<R>(repo: &R, user_id: UserId) -> ServiceResult<Vec<ShortcutKey>>
where
    R: ShortcutKeyReader + ?Sized,
{
    Ok(repo.list_shortcut_keys(user_id)?)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::types::ShortcutKeyId;
    use crate::repository::mock::MockRepository;

    #[test]
    fn only_missing_defaults_are_inserted() {
        let mut repo = MockRepository::new();
        repo.expect_shortcut_key_exists()
            .returning(|_, page| Ok(page.starts_with("/forecast")));
        repo.expect_save_shortcut_key()
            .withf(|s| {
                &*s.page == "/opportunities/opportunities-view/"
                    && s.key.get() == 'O'
                    && s.command == ShortcutCommand::Alt
            })
            .times(1)
            .returning(|s| {
                Ok(ShortcutKey {
                    id: ShortcutKeyId::new(1).expect("valid id"),
                    company_id: s.company_id,
                    user_id: s.user_id,
                    page: s.page.clone(),
                    key: s.key,
                    command: s.command,
                })
            });

        let added = ensure_default_shortcuts(
            &repo,
            CompanyId::new(1).expect("valid company"),
            UserId::new(2).expect("valid user"),
        )
        .expect("defaults ensured");
        assert_eq!(added, 1);
    }
}
