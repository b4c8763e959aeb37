//! Session records and the stores that keep them.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::db::StoreError;
use crate::games::ludo::{
    EndReason, HistoryEntry, MatchSnapshot, PlayerId, SessionId, SessionStatus,
    SettlementResult, Variant,
};

/// Durable record of one session: who played what, how it went, how it settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct SessionRecord {
    /// Session identifier.
    session_id: SessionId,
    /// Game type played.
    game_type: String,
    /// Rule variant.
    variant: Variant,
    /// Player ids in seat order.
    roster: Vec<PlayerId>,
    /// Lifecycle status when written.
    status: SessionStatus,
    /// Why the session ended, once terminal.
    end_reason: Option<EndReason>,
    /// Session state when the record was written.
    snapshot: MatchSnapshot,
    /// Settlement, once terminal.
    settlement: Option<SettlementResult>,
    /// When the session was created.
    created_at: DateTime<Utc>,
    /// When the record was last written.
    updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Builds a record from a snapshot.
    pub fn from_snapshot(
        snapshot: &MatchSnapshot,
        settlement: Option<SettlementResult>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: snapshot.session_id().clone(),
            game_type: snapshot.game_type().clone(),
            variant: *snapshot.variant(),
            roster: snapshot.players().iter().map(|p| p.id().clone()).collect(),
            status: *snapshot.status(),
            end_reason: snapshot.outcome().as_ref().map(|o| o.reason.clone()),
            snapshot: snapshot.clone(),
            settlement,
            created_at,
            updated_at: Utc::now(),
        }
    }

    /// Turn history at the time of writing.
    pub fn history(&self) -> &[HistoryEntry] {
        self.snapshot.history()
    }

    /// Reassembles a record from stored parts.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        session_id: SessionId,
        game_type: String,
        variant: Variant,
        roster: Vec<PlayerId>,
        status: SessionStatus,
        end_reason: Option<EndReason>,
        snapshot: MatchSnapshot,
        settlement: Option<SettlementResult>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            game_type,
            variant,
            roster,
            status,
            end_reason,
            snapshot,
            settlement,
            created_at,
            updated_at,
        }
    }
}

/// Persistence for session records. One record per session id; saving
/// again replaces it.
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Inserts or replaces a record.
    fn save(&self, record: &SessionRecord) -> Result<(), StoreError>;

    /// Loads a record by session id.
    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Every record, oldest first.
    fn list(&self) -> Result<Vec<SessionRecord>, StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<SessionId, SessionRecord>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    #[instrument(skip(self, record), fields(session_id = %record.session_id))]
    fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        debug!(status = %record.status, "Saving session record");
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    fn load(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut records: Vec<SessionRecord> = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(records)
    }
}
