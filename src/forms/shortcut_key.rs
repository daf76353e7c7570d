use serde::Deserialize;
use validator::Validate;

use crate::domain::shortcut_key::NewShortcutKey;
use crate::domain::types::{CompanyId, PageUrl, ShortcutChar, ShortcutCommand, UserId};
use crate::forms::{FormError, parse_choice};

#[derive(Debug, Deserialize, Validate)]
pub struct ShortcutKeyForm {
    pub user_id: i32,
    #[validate(length(min = 1, max = 255))]
    pub page: String,
    pub key: String,
    pub command: String,
}

pub struct ShortcutKeyPayload {
    pub user_id: UserId,
    pub page: PageUrl,
    pub key: ShortcutChar,
    pub command: ShortcutCommand,
}

impl TryFrom<ShortcutKeyForm> for ShortcutKeyPayload {
    type Error = FormError;

    fn try_from(form: ShortcutKeyForm) -> Result<Self, Self::Error> {
        form.validate()?;

        let page = PageUrl::new(form.page).map_err(|_| FormError::InvalidPage)?;
        if !page.starts_with('/') {
            return Err(FormError::InvalidPage);
        }

        Ok(Self {
            user_id: UserId::new(form.user_id).map_err(|_| FormError::InvalidId("user"))?,
            page,
            key: ShortcutChar::new(&form.key)
                .map_err(|e| FormError::InvalidShortcut(e.to_string()))?,
            command: parse_choice::<ShortcutCommand>("command", &form.command.to_lowercase())?,
        })
    }
}

impl ShortcutKeyPayload {
    pub fn into_domain(self, company_id: CompanyId) -> NewShortcutKey {
        NewShortcutKey::new(company_id, self.user_id, self.page, self.key, self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(page: &str, key: &str, command: &str) -> ShortcutKeyForm {
        ShortcutKeyForm {
            user_id: 1,
            page: page.into(),
            key: key.into(),
            command: command.into(),
        }
    }

    #[test]
    fn key_is_upper_cased() {
        let payload =
            ShortcutKeyPayload::try_from(form("/leads/leads-view/", "l", "Alt")).expect("valid");
        assert_eq!(payload.key.get(), 'L');
        assert_eq!(payload.command, ShortcutCommand::Alt);
    }

    #[test]
    fn multi_character_key_is_rejected() {
        assert!(matches!(
            ShortcutKeyPayload::try_from(form("/leads/", "ab", "alt")),
            Err(FormError::InvalidShortcut(_))
        ));
    }

    #[test]
    fn relative_page_is_rejected() {
        assert!(matches!(
            ShortcutKeyPayload::try_from(form("leads/", "a", "alt")),
            Err(FormError::InvalidPage)
        ));
    }
}
