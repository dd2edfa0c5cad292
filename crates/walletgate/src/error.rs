use thiserror::Error;

/// Errors surfaced by the credential exchange pipeline.
///
/// Each variant corresponds to exactly one stage, so callers can map an
/// error to an HTTP status and a stable machine-readable code without
/// inspecting message text.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required request field is absent or empty.
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),

    /// The wallet address fails the base58 length/alphabet rule.
    #[error("malformed wallet address: {0}")]
    MalformedAddress(String),

    /// The signature does not prove control of the claimed wallet. This
    /// variant deliberately carries no detail: which check failed is logged
    /// server-side, never returned to the caller.
    #[error("signature verification failed")]
    VerificationFailed,

    /// The identity store could not be read or written.
    #[error("identity store: {0}")]
    Store(#[from] StoreError),

    /// A session token could not be issued.
    #[error("token minting failed: {0}")]
    Minting(String),

    /// A token handed to the inspector does not have the compact
    /// three-segment layout.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// The claims segment decoded but is not base64-wrapped JSON.
    #[error("undecodable claims: {0}")]
    UndecodableClaims(String),
}

/// Errors from identity storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the insert: another caller created
    /// the row first. Resolvers treat this as "re-read", not as a failure.
    #[error("wallet address already registered")]
    Conflict,

    /// The backend itself failed.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref err, _) = e {
            // SQLITE_CONSTRAINT_UNIQUE
            if err.extended_code == 2067 {
                return StoreError::Conflict;
            }
        }
        StoreError::Unavailable(e.to_string())
    }
}
