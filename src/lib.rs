//! Tallybook keeps a local-first, tenant-scoped replica of a remote
//! `transactions` table.
//!
//! The replica works while offline: local inserts and edits land in an
//! in-memory table that is serialized to a durable [StorageBackend] on every
//! mutation, each edit bumping an optimistic version counter and flagging
//! the row dirty. An external sync driver later pushes dirty rows to the
//! remote store (acknowledging each with [Ledger::mark_synced]) and pulls
//! remote changes back in through [Ledger::upsert_remote], advancing the
//! tenant-scoped [sync cursor](Ledger::write_cursor) as it goes.
//!
//! All state is partitioned by the active tenant reported by a
//! [TenantResolver]; switching tenants discards the in-memory table and
//! re-hydrates from storage under the new scope, so rows never leak across
//! accounts.
//!
//! ```
//! use tallybook::{
//!     Ledger, LedgerConfig, MemoryStorage, RecordPatch, SessionTenant, TenantId,
//!     TransactionKind, TransactionRecord,
//! };
//! use time::macros::date;
//!
//! let session = SessionTenant::with_active(TenantId::new("acme"));
//! let mut ledger = Ledger::new(MemoryStorage::new(), session, LedgerConfig::default());
//!
//! let draft = TransactionRecord::draft("t1", TransactionKind::Income, date!(2024 - 05 - 01), 1000);
//! ledger.insert_local(draft).unwrap();
//! ledger
//!     .update_local("t1", RecordPatch::new().amount_cents(2000))
//!     .unwrap();
//!
//! let today = ledger.rows_on(date!(2024 - 05 - 01)).unwrap();
//! assert_eq!(today[0].amount_cents, 2000);
//! assert_eq!(today[0].version, 2);
//! ```

#![warn(missing_docs)]

mod config;
mod cursor;
mod error;
mod ledger;
mod record;
mod replica;
mod storage;
mod tenant;

#[cfg(test)]
mod test_utils;

pub use config::LedgerConfig;
pub use cursor::SyncCursor;
pub use error::Error;
pub use ledger::{Ledger, Operation, Query, QueryOutput};
pub use record::{
    DEFAULT_EXPENSE_TYPE, RecordDraft, RecordId, RecordPatch, TransactionKind, TransactionRecord,
};
pub use replica::ReplicaStore;
pub use storage::{MemoryStorage, SqliteStorage, StorageBackend, namespace_key};
pub use tenant::{SessionTenant, TenantId, TenantResolver};
