//! Row types and conversions to and from [`SessionRecord`].

use chrono::NaiveDateTime;
use diesel::prelude::*;
use tracing::instrument;

use crate::db::{StoreError, schema};
use crate::games::ludo::{EndReason, SessionStatus, SettlementResult, Variant};
use crate::store::SessionRecord;

/// One row of `session_records`. Structured columns hold JSON.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::session_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct SessionRow {
    session_id: String,
    game_type: String,
    variant: String,
    status: String,
    end_reason: Option<String>,
    roster: String,
    snapshot: String,
    settlement: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl TryFrom<&SessionRecord> for SessionRow {
    type Error = StoreError;

    #[instrument(skip(record), fields(session_id = %record.session_id()))]
    fn try_from(record: &SessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            session_id: record.session_id().clone(),
            game_type: record.game_type().clone(),
            variant: record.variant().to_string(),
            status: record.status().to_string(),
            end_reason: record
                .end_reason()
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            roster: serde_json::to_string(record.roster())?,
            snapshot: serde_json::to_string(record.snapshot())?,
            settlement: record
                .settlement()
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
            created_at: record.created_at().naive_utc(),
            updated_at: record.updated_at().naive_utc(),
        })
    }
}

impl TryFrom<SessionRow> for SessionRecord {
    type Error = StoreError;

    #[instrument(skip(row), fields(session_id = %row.session_id))]
    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let variant: Variant = row
            .variant
            .parse()
            .map_err(|_| StoreError::new(format!("Unknown variant: {}", row.variant)))?;
        let status: SessionStatus = row
            .status
            .parse()
            .map_err(|_| StoreError::new(format!("Unknown status: {}", row.status)))?;
        Ok(SessionRecord::from_parts(
            row.session_id,
            row.game_type,
            variant,
            serde_json::from_str(&row.roster)?,
            status,
            row.end_reason
                .as_deref()
                .map(serde_json::from_str::<EndReason>)
                .transpose()?,
            serde_json::from_str(&row.snapshot)?,
            row.settlement
                .as_deref()
                .map(serde_json::from_str::<SettlementResult>)
                .transpose()?,
            row.created_at.and_utc(),
            row.updated_at.and_utc(),
        ))
    }
}
