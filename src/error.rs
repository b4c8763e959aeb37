//! Engine error taxonomy.

use crate::db::StoreError;
use crate::games::ludo::{MoveError, SessionId};

/// Errors surfaced by the engine to callers.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum EngineError {
    /// Roster size out of bounds, empty or duplicate player ids.
    #[display("Invalid roster: {}", _0)]
    InvalidRoster(String),
    /// A move or turn request was rejected.
    #[display("{}", _0)]
    Move(MoveError),
    /// No session with this id.
    #[display("Session not found: {}", _0)]
    SessionNotFound(SessionId),
    /// The session already ended.
    #[display("Session {} has ended", _0)]
    SessionTerminal(SessionId),
    /// Settlement was requested twice.
    #[display("Session {} was already settled", _0)]
    DuplicateSettlement(SessionId),
    /// Settlement requested for a live session.
    #[display("Session {} has not ended", _0)]
    NotTerminal(SessionId),
    /// No game type with this id is loaded.
    #[display("Unknown game type: {}", _0)]
    UnknownGameType(String),
    /// Persistence failed.
    #[display("{}", _0)]
    Storage(StoreError),
}

impl EngineError {
    /// Taxonomy name, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidRoster(_) => "InvalidRoster",
            EngineError::Move(err) => err.kind(),
            EngineError::SessionNotFound(_) => "SessionNotFound",
            EngineError::SessionTerminal(_) => "SessionTerminal",
            EngineError::DuplicateSettlement(_) => "DuplicateSettlement",
            EngineError::NotTerminal(_) => "NotTerminal",
            EngineError::UnknownGameType(_) => "UnknownGameType",
            EngineError::Storage(_) => "Storage",
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Move(err) => Some(err),
            EngineError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MoveError> for EngineError {
    fn from(err: MoveError) -> Self {
        EngineError::Move(err)
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::ludo::IllegalReason;

    #[test]
    fn move_errors_keep_their_taxonomy_name() {
        let err: EngineError = MoveError::NoEntryRoll { roll: 2, required: 6 }.into();
        assert_eq!(err.kind(), "NoEntryRoll");
        let err: EngineError = MoveError::illegal(IllegalReason::NotYourTurn).into();
        assert_eq!(err.kind(), "IllegalMove");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn lookup_errors_name_the_session() {
        let err = EngineError::SessionNotFound("abc".into());
        assert_eq!(err.to_string(), "Session not found: abc");
        assert_eq!(err.kind(), "SessionNotFound");
    }
}
