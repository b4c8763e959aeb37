//! Diesel-backed [`SessionStore`].

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::db::models::SessionRow;
use crate::db::{StoreError, schema};
use crate::store::{SessionRecord, SessionStore};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Session records in a SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteSessionStore {
    db_path: String,
}

impl SqliteSessionStore {
    /// Opens the database at `db_path`, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, StoreError> {
        info!(path = %db_path, "Opening session store");
        let store = Self { db_path };
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::new(format!("Migrations failed: {}", e)))?;
        info!(applied = applied.len(), "Session store ready");
        Ok(store)
    }

    /// Path of the database file.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| StoreError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }
}

impl SessionStore for SqliteSessionStore {
    #[instrument(skip(self, record), fields(session_id = %record.session_id()))]
    fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let row = SessionRow::try_from(record)?;
        let mut conn = self.connection()?;
        diesel::replace_into(schema::session_records::table)
            .values(&row)
            .execute(&mut conn)?;
        debug!(status = %record.status(), "Session record saved");
        Ok(())
    }

    #[instrument(skip(self))]
    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let mut conn = self.connection()?;
        let row = schema::session_records::table
            .find(session_id)
            .select(SessionRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(SessionRecord::try_from).transpose()
    }

    #[instrument(skip(self))]
    fn list(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut conn = self.connection()?;
        let rows = schema::session_records::table
            .order((
                schema::session_records::created_at.asc(),
                schema::session_records::session_id.asc(),
            ))
            .select(SessionRow::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "Session records loaded");
        rows.into_iter().map(SessionRecord::try_from).collect()
    }
}
