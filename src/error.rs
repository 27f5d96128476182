//! Defines the crate level error type.

use time::Date;

use crate::record::RecordId;

/// The errors that may occur while operating on the local replica.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A write operation was attempted while no tenant was active.
    ///
    /// Writing into an unscoped namespace could leak rows across tenants, so
    /// the store refuses instead of falling back. Read queries do not raise
    /// this error; they return empty results.
    #[error("no active tenant to scope the write to")]
    NoActiveTenant,

    /// The storage backend failed to read or write a snapshot.
    ///
    /// On a write failure the in-memory table has already been mutated, so
    /// the change is visible to subsequent reads but may not survive a
    /// process restart. The store does not retry; that decision belongs to
    /// the caller.
    #[error("storage backend failure: {0}")]
    Persistence(String),

    /// A local insert reused an identifier that is already in the replica.
    ///
    /// Ids are immutable and globally unique. Merging by id is reserved for
    /// the remote-origin upsert path.
    #[error("a record with the id \"{0}\" already exists in the replica")]
    DuplicateId(RecordId),

    /// A range query was given a start date after its end date.
    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// The requested start of the range.
        start: Date,
        /// The requested end of the range.
        end: Date,
    },

    /// A persisted snapshot could not be deserialized.
    ///
    /// The blob is left untouched in storage so no staged local edits are
    /// lost; the caller decides whether to repair or discard it.
    #[error("persisted snapshot is corrupt: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Corrupt(error.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        Error::Persistence(error.to_string())
    }
}
