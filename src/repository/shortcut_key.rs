//! Repository implementation for shortcut keys.

use diesel::{prelude::*, upsert::excluded};

use crate::{
    domain::{
        shortcut_key::{NewShortcutKey, ShortcutKey},
        types::{PageUrl, UserId},
    },
    models::shortcut_key::{NewShortcutKey as DbNewShortcutKey, ShortcutKey as DbShortcutKey},
    repository::{
        DieselRepository, ShortcutKeyReader, ShortcutKeyWriter,
        errors::{RepositoryError, RepositoryResult},
    },
};

impl ShortcutKeyReader for DieselRepository {
    fn list_shortcut_keys(&self, user_id: UserId) -> RepositoryResult<Vec<ShortcutKey>> {
        use crate::schema::shortcut_keys;

        let mut conn = self.conn()?;
        shortcut_keys::table
            .filter(shortcut_keys::user_id.eq(user_id.get()))
            .order(shortcut_keys::page.asc())
            .load::<DbShortcutKey>(&mut conn)?
            .into_iter()
            .map(|s| ShortcutKey::try_from(s).map_err(RepositoryError::from))
            .collect()
    }

    fn shortcut_key_exists(&self, user_id: UserId, page: &PageUrl) -> RepositoryResult<bool> {
        use crate::schema::shortcut_keys;

        let mut conn = self.conn()?;
        let exists = diesel::select(diesel::dsl::exists(
            shortcut_keys::table
                .filter(shortcut_keys::user_id.eq(user_id.get()))
                .filter(shortcut_keys::page.eq(page.as_str())),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(exists)
    }
}

impl ShortcutKeyWriter for DieselRepository {
    fn save_shortcut_key(&self, shortcut: &NewShortcutKey) -> RepositoryResult<ShortcutKey> {
        use crate::schema::shortcut_keys;

        let mut conn = self.conn()?;
        let db_new: DbNewShortcutKey = shortcut.into();

        let row = diesel::insert_into(shortcut_keys::table)
            .values(&db_new)
            .on_conflict((shortcut_keys::user_id, shortcut_keys::page))
            .do_update()
            .set((
                shortcut_keys::key_char.eq(excluded(shortcut_keys::key_char)),
                shortcut_keys::command.eq(excluded(shortcut_keys::command)),
            ))
            .get_result::<DbShortcutKey>(&mut conn)?;

        ShortcutKey::try_from(row).map_err(RepositoryError::from)
    }
}
