use serde::{Deserialize, Serialize};

use crate::domain::types::{
    CompanyId, PageUrl, ShortcutChar, ShortcutCommand, ShortcutKeyId, UserId,
};

/// Keyboard shortcut a user has bound to an application page.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShortcutKey {
    pub id: ShortcutKeyId,
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub page: PageUrl,
    pub key: ShortcutChar,
    pub command: ShortcutCommand,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewShortcutKey {
    pub company_id: CompanyId,
    pub user_id: UserId,
    pub page: PageUrl,
    pub key: ShortcutChar,
    pub command: ShortcutCommand,
}

impl NewShortcutKey {
    #[must_use]
    pub fn new(
        company_id: CompanyId,
        user_id: UserId,
        page: PageUrl,
        key: ShortcutChar,
        command: ShortcutCommand,
    ) -> Self {
        Self {
            company_id,
            user_id,
            page,
            key,
            command,
        }
    }
}
