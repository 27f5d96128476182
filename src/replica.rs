//! The local replica store: hydration, mutation, and row queries.

use time::{Date, OffsetDateTime};

use crate::{
    error::Error,
    record::{RecordDraft, RecordPatch, TransactionKind, TransactionRecord},
    storage::{StorageBackend, namespace_key},
    tenant::{TenantId, TenantResolver},
};

/// Storage record name under which row snapshots are persisted.
const ROWS_RECORD: &str = "transactions";

/// The in-memory table hydrated for one tenant.
#[derive(Debug)]
struct Table {
    tenant: TenantId,
    rows: Vec<TransactionRecord>,
}

/// The authoritative in-memory copy of a tenant's transaction rows.
///
/// The table is hydrated lazily from the storage backend on first use and
/// serialized back in full on every mutation, so a mutation is visible to
/// subsequent reads immediately and durability is attempted before the call
/// returns. When the resolver reports a different tenant than the one the
/// table was hydrated for, all in-memory state is discarded and the next
/// access re-hydrates under the new scope.
///
/// Queries take `&mut self` because any access may need to (re-)hydrate;
/// the store assumes the single-threaded cooperative model of its host and
/// holds no lock of its own.
#[derive(Debug)]
pub struct ReplicaStore<S, R> {
    storage: S,
    resolver: R,
    namespace: String,
    table: Option<Table>,
}

impl<S, R> ReplicaStore<S, R>
where
    S: StorageBackend,
    R: TenantResolver,
{
    /// Create an unhydrated store persisting under `namespace`.
    pub fn new(storage: S, resolver: R, namespace: &str) -> Self {
        Self {
            storage,
            resolver,
            namespace: namespace.to_owned(),
            table: None,
        }
    }

    /// Insert a locally created record.
    ///
    /// The new row starts dirty and is persisted before this returns. Reads
    /// issued afterwards see it immediately; there is no network involved.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NoActiveTenant] if no tenant can be resolved,
    /// - [Error::DuplicateId] if the replica already holds the draft's id,
    /// - or [Error::Persistence] if the snapshot could not be written (the
    ///   row is still present in memory).
    pub fn insert_local(&mut self, draft: RecordDraft) -> Result<TransactionRecord, Error> {
        let tenant = self.resolver.current_tenant().ok_or(Error::NoActiveTenant)?;
        let table = self.hydrate(&tenant)?;

        if table.rows.iter().any(|row| row.id == draft.id) {
            return Err(Error::DuplicateId(draft.id));
        }

        let record = draft.into_record(tenant, OffsetDateTime::now_utc());
        table.rows.push(record.clone());

        self.persist()?;

        Ok(record)
    }

    /// Merge a server-origin row into the replica.
    ///
    /// An existing row with the same id is replaced wholesale and a missing
    /// one is inserted; either way the row ends up clean. The pull path only
    /// sees rows the sync driver has already reconciled server-side, so the
    /// remote copy always wins here. Safe to retry with an identical payload.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NoActiveTenant] if no tenant can be resolved,
    /// - or [Error::Persistence] if the snapshot could not be written.
    pub fn upsert_remote(&mut self, mut record: TransactionRecord) -> Result<(), Error> {
        let tenant = self.resolver.current_tenant().ok_or(Error::NoActiveTenant)?;

        // The pull is tenant-filtered upstream; scope the row to the table
        // it lands in.
        record.company_id = tenant.clone();
        record.dirty = false;

        let table = self.hydrate(&tenant)?;
        match table.rows.iter_mut().find(|row| row.id == record.id) {
            Some(existing) => *existing = record,
            None => table.rows.push(record),
        }

        self.persist()
    }

    /// Apply a partial edit to the row with `id`.
    ///
    /// Only the fields present in the patch change; the version counter is
    /// incremented by exactly 1 and the row is flagged dirty regardless of
    /// the patch's contents. A missing id is a no-op returning `None`, not
    /// an error, so callers must not assume update implies existence.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NoActiveTenant] if no tenant can be resolved,
    /// - or [Error::Persistence] if the snapshot could not be written.
    pub fn update_local(
        &mut self,
        id: &str,
        patch: RecordPatch,
    ) -> Result<Option<TransactionRecord>, Error> {
        let tenant = self.resolver.current_tenant().ok_or(Error::NoActiveTenant)?;
        let table = self.hydrate(&tenant)?;

        let Some(row) = table.rows.iter_mut().find(|row| row.id == id) else {
            return Ok(None);
        };

        patch.apply_to(row);
        row.version += 1;
        row.dirty = true;
        row.updated_at = OffsetDateTime::now_utc();
        let updated = row.clone();

        self.persist()?;

        Ok(Some(updated))
    }

    /// Clear the dirty flag of the row with `id` after a successful push.
    ///
    /// Returns whether a row was found. A missing id is a no-op so the sync
    /// driver can retry acknowledgments freely.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NoActiveTenant] if no tenant can be resolved,
    /// - or [Error::Persistence] if the snapshot could not be written.
    pub fn mark_synced(&mut self, id: &str) -> Result<bool, Error> {
        let tenant = self.resolver.current_tenant().ok_or(Error::NoActiveTenant)?;
        let table = self.hydrate(&tenant)?;

        let Some(row) = table.rows.iter_mut().find(|row| row.id == id) else {
            return Ok(false);
        };

        row.dirty = false;

        self.persist()?;

        Ok(true)
    }

    /// All live rows of the active tenant dated `date`, most recent first.
    ///
    /// # Errors
    /// Returns [Error::Persistence] or [Error::Corrupt] if hydration fails.
    pub fn rows_on(&mut self, date: Date) -> Result<Vec<TransactionRecord>, Error> {
        let Some(tenant) = self.resolver.current_tenant() else {
            return Ok(Vec::new());
        };
        let table = self.hydrate(&tenant)?;

        let mut rows: Vec<TransactionRecord> = table
            .rows
            .iter()
            .filter(|row| !row.is_deleted() && row.date == date)
            .cloned()
            .collect();
        sort_recent_first(&mut rows);

        Ok(rows)
    }

    /// All live rows with `date` in `[start, end]` inclusive, most recent
    /// first.
    ///
    /// An explicit `tenant` override takes precedence over the active tenant
    /// to support cross-tenant administrative queries; it reads storage
    /// directly and leaves the active session's cache untouched.
    ///
    /// # Errors
    /// Returns [Error::Persistence] or [Error::Corrupt] if hydration fails.
    pub fn rows_in_range(
        &mut self,
        start: Date,
        end: Date,
        tenant: Option<&TenantId>,
    ) -> Result<Vec<TransactionRecord>, Error> {
        let mut rows: Vec<TransactionRecord> = self
            .scoped_rows(tenant)?
            .into_iter()
            .filter(|row| !row.is_deleted() && row.date >= start && row.date <= end)
            .collect();
        sort_recent_first(&mut rows);

        Ok(rows)
    }

    /// The row with `id`, or `None` when absent or soft deleted.
    ///
    /// # Errors
    /// Returns [Error::Persistence] or [Error::Corrupt] if hydration fails.
    pub fn row(&mut self, id: &str) -> Result<Option<TransactionRecord>, Error> {
        let Some(tenant) = self.resolver.current_tenant() else {
            return Ok(None);
        };
        let table = self.hydrate(&tenant)?;

        Ok(table
            .rows
            .iter()
            .find(|row| !row.is_deleted() && row.id == id)
            .cloned())
    }

    /// All rows carrying unacknowledged local changes, in arbitrary order.
    ///
    /// This is the feed consumed by the push half of synchronization, so it
    /// includes soft-deleted rows: a staged deletion is still an edit the
    /// remote store has not seen.
    ///
    /// # Errors
    /// Returns [Error::Persistence] or [Error::Corrupt] if hydration fails.
    pub fn dirty_rows(
        &mut self,
        tenant: Option<&TenantId>,
    ) -> Result<Vec<TransactionRecord>, Error> {
        Ok(self
            .scoped_rows(tenant)?
            .into_iter()
            .filter(|row| row.dirty)
            .collect())
    }

    /// Sum of `amount_cents` over live rows dated `date` with `kind`.
    ///
    /// Equals the sum over the matching rows of a range query collapsed to
    /// one day.
    ///
    /// # Errors
    /// Returns [Error::Persistence] or [Error::Corrupt] if hydration fails.
    pub fn sum_on(&mut self, date: Date, kind: TransactionKind) -> Result<i64, Error> {
        let Some(tenant) = self.resolver.current_tenant() else {
            return Ok(0);
        };
        let table = self.hydrate(&tenant)?;

        Ok(table
            .rows
            .iter()
            .filter(|row| !row.is_deleted() && row.date == date && row.kind == kind)
            .map(|row| row.amount_cents)
            .sum())
    }

    /// The number of live rows for the active tenant.
    ///
    /// # Errors
    /// Returns [Error::Persistence] or [Error::Corrupt] if hydration fails.
    pub fn count(&mut self) -> Result<usize, Error> {
        let Some(tenant) = self.resolver.current_tenant() else {
            return Ok(0);
        };
        let table = self.hydrate(&tenant)?;

        Ok(table.rows.iter().filter(|row| !row.is_deleted()).count())
    }

    /// Ensure the cache holds `tenant`'s rows, discarding any stale state.
    fn hydrate(&mut self, tenant: &TenantId) -> Result<&mut Table, Error> {
        let table = match self.table.take() {
            Some(table) if &table.tenant == tenant => table,
            Some(stale) => {
                tracing::debug!(
                    previous = %stale.tenant,
                    current = %tenant,
                    "active tenant changed, discarding in-memory replica"
                );
                self.load_table(tenant)?
            }
            None => self.load_table(tenant)?,
        };

        Ok(self.table.insert(table))
    }

    /// Load `tenant`'s snapshot from the storage backend.
    fn load_table(&self, tenant: &TenantId) -> Result<Table, Error> {
        let key = namespace_key(&self.namespace, ROWS_RECORD, Some(tenant));
        let rows: Vec<TransactionRecord> = match self.storage.get(&key)? {
            Some(blob) => serde_json::from_str(&blob).map_err(|error| {
                tracing::warn!(%tenant, %error, "persisted replica snapshot is corrupt");
                Error::Corrupt(error.to_string())
            })?,
            None => Vec::new(),
        };
        tracing::debug!(%tenant, rows = rows.len(), "hydrated replica from storage");

        Ok(Table {
            tenant: tenant.clone(),
            rows,
        })
    }

    /// Serialize the hydrated table back to the storage backend.
    fn persist(&self) -> Result<(), Error> {
        let Some(table) = &self.table else {
            return Ok(());
        };

        let key = namespace_key(&self.namespace, ROWS_RECORD, Some(&table.tenant));
        let blob =
            serde_json::to_string(&table.rows).map_err(|error| Error::Persistence(error.to_string()))?;
        self.storage.set(&key, &blob)?;
        tracing::debug!(tenant = %table.tenant, rows = table.rows.len(), "persisted replica snapshot");

        Ok(())
    }

    /// The rows visible to a query scoped by `overriding` (or the active
    /// tenant when `None`). Empty when neither yields a tenant.
    fn scoped_rows(
        &mut self,
        overriding: Option<&TenantId>,
    ) -> Result<Vec<TransactionRecord>, Error> {
        let Some(tenant) = overriding
            .cloned()
            .or_else(|| self.resolver.current_tenant())
        else {
            return Ok(Vec::new());
        };

        if self.resolver.current_tenant().as_ref() == Some(&tenant) {
            Ok(self.hydrate(&tenant)?.rows.clone())
        } else {
            Ok(self.load_table(&tenant)?.rows)
        }
    }
}

/// Order rows by `datetime` descending; the stable sort keeps insertion
/// order for equal timestamps.
fn sort_recent_first(rows: &mut [TransactionRecord]) {
    rows.sort_by(|a, b| b.datetime.cmp(&a.datetime));
}
