//! Diesel models for user shortcut keys.

use diesel::prelude::*;

use crate::domain::shortcut_key::{
    NewShortcutKey as DomainNewShortcutKey, ShortcutKey as DomainShortcutKey,
};
use crate::domain::types::{
    CompanyId, PageUrl, ShortcutChar, ShortcutKeyId, TypeConstraintError, UserId,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::shortcut_keys)]
pub struct ShortcutKey {
    pub id: i32,
    pub company_id: i32,
    pub user_id: i32,
    pub page: String,
    pub key_char: String,
    pub command: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::shortcut_keys)]
pub struct NewShortcutKey<'a> {
    pub company_id: i32,
    pub user_id: i32,
    pub page: &'a str,
    pub key_char: String,
    pub command: &'a str,
}

impl TryFrom<ShortcutKey> for DomainShortcutKey {
    type Error = TypeConstraintError;

    fn try_from(row: ShortcutKey) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ShortcutKeyId::new(row.id)?,
            company_id: CompanyId::new(row.company_id)?,
            user_id: UserId::new(row.user_id)?,
            page: PageUrl::new(row.page)?,
            key: ShortcutChar::new(&row.key_char)?,
            command: row.command.parse()?,
        })
    }
}

impl<'a> From<&'a DomainNewShortcutKey> for NewShortcutKey<'a> {
    fn from(shortcut: &'a DomainNewShortcutKey) -> Self {
        Self {
            company_id: shortcut.company_id.get(),
            user_id: shortcut.user_id.get(),
            page: shortcut.page.as_str(),
            key_char: shortcut.key.to_string(),
            command: shortcut.command.code(),
        }
    }
}
