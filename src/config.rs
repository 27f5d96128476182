//! Configuration for how the ledger derives its storage namespaces.

/// Controls the namespace prefix under which snapshots are persisted.
///
/// Two ledgers sharing one storage backend stay independent as long as
/// their namespaces differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// The prefix of every storage key the ledger writes.
    pub namespace: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            namespace: "ledger".to_owned(),
        }
    }
}

impl LedgerConfig {
    /// A configuration persisting under `namespace` instead of the default.
    pub fn with_namespace(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_owned(),
        }
    }
}
