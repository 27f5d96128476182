//! Shared fixtures for store and façade tests.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use time::Date;

use crate::{
    config::LedgerConfig,
    error::Error,
    ledger::Ledger,
    record::{RecordDraft, TransactionKind, TransactionRecord},
    storage::{MemoryStorage, StorageBackend},
    tenant::{SessionTenant, TenantId},
};

/// A ledger over in-memory storage with tenant "acme" active, plus the
/// session handle for switching tenants mid-test.
pub fn get_test_ledger() -> (Ledger<MemoryStorage, SessionTenant>, SessionTenant) {
    let session = SessionTenant::with_active(TenantId::new("acme"));
    let ledger = Ledger::new(
        MemoryStorage::new(),
        session.clone(),
        LedgerConfig::default(),
    );

    (ledger, session)
}

/// An income draft with the given id, date, and amount.
pub fn draft(id: &str, date: Date, amount_cents: i64) -> RecordDraft {
    TransactionRecord::draft(id, TransactionKind::Income, date, amount_cents)
}

/// A storage backend whose writes can be made to fail on demand, for
/// exercising the persistence-failure contract.
#[derive(Debug, Clone, Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    failing: Arc<AtomicBool>,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl StorageBackend for FlakyStorage {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Persistence("quota exceeded".to_owned()));
        }

        self.inner.set(key, value)
    }
}
