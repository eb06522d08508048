use thiserror::Error;

/// Identity-layer errors. Kept separate from gateway/provider errors so each
/// layer maps its own failures to HTTP responses without cross-coupling.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("identity not found for fingerprint {0}")]
    NotFound(String),

    #[error("corrupt record for fingerprint {0}: {1}")]
    Corrupt(String, serde_json::Error),
}

impl IdentityError {
    /// Coarse classification used by the gateway to pick an HTTP status.
    pub fn code(&self) -> &'static str {
        match self {
            IdentityError::Storage(_) => "storage_error",
            IdentityError::NotFound(_) => "not_found",
            IdentityError::Corrupt(_, _) => "storage_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
