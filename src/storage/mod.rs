//! Contains the storage backend trait and its implementations.

mod memory;
mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use crate::{error::Error, tenant::TenantId};

/// Durable key/value persistence for JSON snapshots.
///
/// The replica treats values as opaque text; all query semantics live in the
/// replica itself. Implementations are shared by cloning (the SQLite backend
/// clones an `Arc` around its connection), so the replica store and the sync
/// cursor can persist through the same backend instance.
pub trait StorageBackend {
    /// Read the blob stored under `key`, or `None` if the key has never been
    /// written.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Durably store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;
}

/// Derive the storage key for a logical `record` scoped to `tenant`.
///
/// The same tenant always maps to the same key across restarts and two
/// tenants never collide. `None` yields the unscoped namespace, a degraded
/// default for single-tenant environments; the replica itself never writes
/// under it.
pub fn namespace_key(prefix: &str, record: &str, tenant: Option<&TenantId>) -> String {
    match tenant {
        Some(tenant) => format!("{prefix}/{record}/{}", tenant.as_str()),
        None => format!("{prefix}/{record}"),
    }
}

#[cfg(test)]
mod namespace_key_tests {
    use super::namespace_key;
    use crate::tenant::TenantId;

    #[test]
    fn scoped_keys_differ_per_tenant() {
        let acme = TenantId::new("acme");
        let globex = TenantId::new("globex");

        let acme_key = namespace_key("ledger", "transactions", Some(&acme));
        let globex_key = namespace_key("ledger", "transactions", Some(&globex));

        assert_ne!(acme_key, globex_key);
        assert_eq!(acme_key, "ledger/transactions/acme");
    }

    #[test]
    fn derivation_is_deterministic() {
        let tenant = TenantId::new("acme");

        assert_eq!(
            namespace_key("ledger", "sync-token", Some(&tenant)),
            namespace_key("ledger", "sync-token", Some(&tenant)),
        );
    }

    #[test]
    fn unscoped_key_drops_the_tenant_segment() {
        assert_eq!(
            namespace_key("ledger", "transactions", None),
            "ledger/transactions"
        );
    }
}
