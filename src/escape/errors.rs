use thiserror::Error;

/// Errors that can arise while loading content or persisting escape-room state.
///
/// Gameplay outcomes (wrong answers, rejected moves, expiry) are not errors; they
/// are reported through [`crate::escape::SolveOutcome`] and session events.
#[derive(Debug, Error)]
pub enum EscapeError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around JSON errors from catalog files and snapshot exports.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, seed files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Catalog content failed validation.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    /// A saved snapshot does not fit the catalog it is being restored against.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Lifecycle operation requested from a state that does not allow it.
    #[error("cannot {action} while session is {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    /// The session runner is gone (channel closed).
    #[error("session runner stopped")]
    RunnerStopped,
}
