//! The query façade consumed by the application and the sync driver.

use std::path::Path;

use time::Date;

use crate::{
    config::LedgerConfig,
    cursor::SyncCursor,
    error::Error,
    record::{RecordDraft, RecordId, RecordPatch, TransactionKind, TransactionRecord},
    replica::ReplicaStore,
    storage::{SqliteStorage, StorageBackend},
    tenant::{TenantId, TenantResolver},
};

/// The closed set of mutations the ledger accepts.
///
/// One variant per write operation, each carrying strongly-typed
/// parameters; there is no string-shaped dispatch to parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Stage a locally created record.
    InsertLocal(RecordDraft),
    /// Merge a server-origin row; the remote copy wins and arrives clean.
    UpsertRemote(TransactionRecord),
    /// Apply a partial edit to an existing row.
    UpdateLocal {
        /// The id of the row to edit.
        id: RecordId,
        /// The fields to change.
        patch: RecordPatch,
    },
    /// Acknowledge a successful push of the row.
    MarkSynced {
        /// The id of the pushed row.
        id: RecordId,
    },
    /// Record the cursor of the last confirmed pull.
    WriteCursor {
        /// The new cursor token.
        token: String,
    },
    /// Forget the pull cursor.
    ClearCursor,
}

/// The closed set of reads the ledger accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Live rows dated exactly `date`, most recent first.
    RowsOn {
        /// The calendar date to match.
        date: Date,
    },
    /// Live rows dated within `[start, end]` inclusive, most recent first.
    RowsInRange {
        /// Start of the range.
        start: Date,
        /// End of the range.
        end: Date,
        /// Explicit tenant override for administrative queries.
        tenant: Option<TenantId>,
    },
    /// Point lookup by id.
    Row {
        /// The id to look up.
        id: RecordId,
    },
    /// Rows with unacknowledged local changes; the push feed.
    DirtyRows {
        /// Explicit tenant override for administrative queries.
        tenant: Option<TenantId>,
    },
    /// Sum of amounts over live rows matching `date` and `kind`.
    SumOn {
        /// The calendar date to match.
        date: Date,
        /// The transaction kind to match.
        kind: TransactionKind,
    },
    /// The number of live rows for the active tenant.
    Count,
    /// The cursor of the last confirmed pull.
    ReadCursor,
}

/// The result of a [Query].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// Rows returned by a date, range, or dirty-row query.
    Rows(Vec<TransactionRecord>),
    /// The result of a point lookup.
    Row(Option<TransactionRecord>),
    /// An aggregate sum in minor units.
    Sum(i64),
    /// A row count.
    Count(usize),
    /// The sync cursor token.
    Cursor(Option<String>),
}

/// The operations surface over the local replica and sync cursor.
///
/// A `Ledger` is an explicit session object: construct one per storage
/// backend and tenant session and pass it by reference to callers. It
/// validates operation preconditions and delegates; all replication
/// semantics live in [ReplicaStore] and [SyncCursor].
#[derive(Debug)]
pub struct Ledger<S, R> {
    replica: ReplicaStore<S, R>,
    cursor: SyncCursor<S, R>,
}

impl<R> Ledger<SqliteStorage, R>
where
    R: TenantResolver + Clone,
{
    /// Open a ledger over a SQLite snapshot database at `path` with the
    /// default configuration.
    ///
    /// # Errors
    /// Returns [Error::Persistence] if the database cannot be opened.
    pub fn open_sqlite(path: impl AsRef<Path>, resolver: R) -> Result<Self, Error> {
        let storage = SqliteStorage::open(path)?;

        Ok(Self::new(storage, resolver, LedgerConfig::default()))
    }
}

impl<S, R> Ledger<S, R>
where
    S: StorageBackend + Clone,
    R: TenantResolver + Clone,
{
    /// Create a ledger over `storage`, scoping all state through `resolver`.
    pub fn new(storage: S, resolver: R, config: LedgerConfig) -> Self {
        Self {
            replica: ReplicaStore::new(storage.clone(), resolver.clone(), &config.namespace),
            cursor: SyncCursor::new(storage, resolver, &config.namespace),
        }
    }

    /// Execute a mutation.
    ///
    /// # Errors
    /// Propagates the underlying store errors; see the typed methods for
    /// the per-operation error contracts.
    pub fn apply(&mut self, operation: Operation) -> Result<(), Error> {
        match operation {
            Operation::InsertLocal(draft) => self.insert_local(draft).map(|_| ()),
            Operation::UpsertRemote(record) => self.upsert_remote(record),
            Operation::UpdateLocal { id, patch } => self.update_local(&id, patch).map(|_| ()),
            Operation::MarkSynced { id } => self.mark_synced(&id).map(|_| ()),
            Operation::WriteCursor { token } => self.write_cursor(&token),
            Operation::ClearCursor => self.clear_cursor(),
        }
    }

    /// Execute a read.
    ///
    /// # Errors
    /// Returns [Error::InvalidDateRange] for an inverted range before any
    /// delegation; otherwise propagates the underlying store errors.
    pub fn fetch(&mut self, query: Query) -> Result<QueryOutput, Error> {
        match query {
            Query::RowsOn { date } => self.rows_on(date).map(QueryOutput::Rows),
            Query::RowsInRange { start, end, tenant } => self
                .rows_in_range(start, end, tenant.as_ref())
                .map(QueryOutput::Rows),
            Query::Row { id } => self.row(&id).map(QueryOutput::Row),
            Query::DirtyRows { tenant } => {
                self.dirty_rows(tenant.as_ref()).map(QueryOutput::Rows)
            }
            Query::SumOn { date, kind } => self.sum_on(date, kind).map(QueryOutput::Sum),
            Query::Count => self.count().map(QueryOutput::Count),
            Query::ReadCursor => self.read_cursor().map(QueryOutput::Cursor),
        }
    }

    /// Stage a locally created record. See [ReplicaStore::insert_local].
    ///
    /// # Errors
    /// See [ReplicaStore::insert_local].
    pub fn insert_local(&mut self, draft: RecordDraft) -> Result<TransactionRecord, Error> {
        self.replica.insert_local(draft)
    }

    /// Merge a server-origin row. See [ReplicaStore::upsert_remote].
    ///
    /// # Errors
    /// See [ReplicaStore::upsert_remote].
    pub fn upsert_remote(&mut self, record: TransactionRecord) -> Result<(), Error> {
        self.replica.upsert_remote(record)
    }

    /// Apply a partial edit. See [ReplicaStore::update_local].
    ///
    /// # Errors
    /// See [ReplicaStore::update_local].
    pub fn update_local(
        &mut self,
        id: &str,
        patch: RecordPatch,
    ) -> Result<Option<TransactionRecord>, Error> {
        self.replica.update_local(id, patch)
    }

    /// Acknowledge a successful push. See [ReplicaStore::mark_synced].
    ///
    /// # Errors
    /// See [ReplicaStore::mark_synced].
    pub fn mark_synced(&mut self, id: &str) -> Result<bool, Error> {
        self.replica.mark_synced(id)
    }

    /// Live rows dated `date`, most recent first.
    ///
    /// # Errors
    /// See [ReplicaStore::rows_on].
    pub fn rows_on(&mut self, date: Date) -> Result<Vec<TransactionRecord>, Error> {
        self.replica.rows_on(date)
    }

    /// Live rows within `[start, end]` inclusive, most recent first.
    ///
    /// # Errors
    /// Returns [Error::InvalidDateRange] if `start` is after `end`;
    /// otherwise see [ReplicaStore::rows_in_range].
    pub fn rows_in_range(
        &mut self,
        start: Date,
        end: Date,
        tenant: Option<&TenantId>,
    ) -> Result<Vec<TransactionRecord>, Error> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }

        self.replica.rows_in_range(start, end, tenant)
    }

    /// Point lookup by id. See [ReplicaStore::row].
    ///
    /// # Errors
    /// See [ReplicaStore::row].
    pub fn row(&mut self, id: &str) -> Result<Option<TransactionRecord>, Error> {
        self.replica.row(id)
    }

    /// The push feed. See [ReplicaStore::dirty_rows].
    ///
    /// # Errors
    /// See [ReplicaStore::dirty_rows].
    pub fn dirty_rows(
        &mut self,
        tenant: Option<&TenantId>,
    ) -> Result<Vec<TransactionRecord>, Error> {
        self.replica.dirty_rows(tenant)
    }

    /// Daily total for `kind`. See [ReplicaStore::sum_on].
    ///
    /// # Errors
    /// See [ReplicaStore::sum_on].
    pub fn sum_on(&mut self, date: Date, kind: TransactionKind) -> Result<i64, Error> {
        self.replica.sum_on(date, kind)
    }

    /// The number of live rows. See [ReplicaStore::count].
    ///
    /// # Errors
    /// See [ReplicaStore::count].
    pub fn count(&mut self) -> Result<usize, Error> {
        self.replica.count()
    }

    /// The cursor of the last confirmed pull. See [SyncCursor::read_token].
    ///
    /// # Errors
    /// See [SyncCursor::read_token].
    pub fn read_cursor(&mut self) -> Result<Option<String>, Error> {
        self.cursor.read_token()
    }

    /// Record a new pull cursor. See [SyncCursor::write_token].
    ///
    /// # Errors
    /// See [SyncCursor::write_token].
    pub fn write_cursor(&mut self, token: &str) -> Result<(), Error> {
        self.cursor.write_token(token)
    }

    /// Forget the pull cursor. See [SyncCursor::clear_token].
    ///
    /// # Errors
    /// See [SyncCursor::clear_token].
    pub fn clear_cursor(&mut self) -> Result<(), Error> {
        self.cursor.clear_token()
    }
}
