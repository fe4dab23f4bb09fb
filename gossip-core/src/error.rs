use thiserror::Error;

/// Errors raised by the membership data model.
///
/// Steady-state variants (`Empty`, `Stale`) are expected outcomes the
/// gossip loop routes around, not failures to surface to a caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed wire record: {0}")]
    Malformed(String),

    #[error("pub_id {0} already present in table")]
    Duplicate(String),

    #[error("active subset is empty")]
    Empty,

    #[error("peer {0} exceeded the staleness horizon")]
    Stale(String),
}
