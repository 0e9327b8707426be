use thiserror::Error;

/// Error taxonomy shared by the ETL pipeline and the query API (spec §7).
///
/// `Transient` is what the backoff driver retries on; everything else is
/// terminal and propagates straight to the caller. Splitting `Invalid`
/// out from `NotFound` resolves spec §9 Open Question 4: a malformed
/// search query is a client error, not an absent result.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("transient I/O error: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Whether the backoff driver should retry the operation that
    /// produced this error. Today every transport-layer failure is
    /// mapped to `Transient` at the call site, so this is effectively
    /// always true for the variant backoff ever sees; kept as an
    /// explicit predicate so a future revision can narrow it without
    /// touching callers (spec §4.2).
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
