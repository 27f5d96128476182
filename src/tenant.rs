//! Tenant identity and resolution of the active tenant.

use std::{
    fmt::{self, Display},
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};

/// Identifies an isolated customer account (a company).
///
/// Every row and every persisted snapshot is partitioned by this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Create a tenant id from its opaque string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The opaque string form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Resolves the identifier of the currently active tenant.
///
/// Implementations must be synchronous and side-effect free. `None` means no
/// tenant is selected: the replica refuses writes and returns empty reads in
/// that state rather than touching an unscoped namespace.
pub trait TenantResolver {
    /// The tenant the session is currently acting for, if any.
    fn current_tenant(&self) -> Option<TenantId>;
}

/// Process-wide session state holding the active tenant.
///
/// Clones share the same underlying state, so the handle given to the ledger
/// and the handle kept by the login/account-switch flow observe each other's
/// changes. Switching tenants through [SessionTenant::switch] is what causes
/// the replica to discard its in-memory table on the next access.
#[derive(Debug, Clone, Default)]
pub struct SessionTenant {
    active: Arc<Mutex<Option<TenantId>>>,
}

impl SessionTenant {
    /// Create session state with no active tenant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create session state with `tenant` already active.
    pub fn with_active(tenant: TenantId) -> Self {
        Self {
            active: Arc::new(Mutex::new(Some(tenant))),
        }
    }

    /// Change the active tenant. `None` deselects any tenant.
    pub fn switch(&self, tenant: Option<TenantId>) {
        *self.active.lock().unwrap() = tenant;
    }
}

impl TenantResolver for SessionTenant {
    fn current_tenant(&self) -> Option<TenantId> {
        self.active.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod session_tenant_tests {
    use super::{SessionTenant, TenantId, TenantResolver};

    #[test]
    fn starts_without_tenant() {
        let session = SessionTenant::new();

        assert_eq!(session.current_tenant(), None);
    }

    #[test]
    fn switch_is_visible_to_clones() {
        let session = SessionTenant::new();
        let handle = session.clone();

        session.switch(Some(TenantId::new("acme")));

        assert_eq!(handle.current_tenant(), Some(TenantId::new("acme")));
    }

    #[test]
    fn switch_to_none_deselects() {
        let session = SessionTenant::with_active(TenantId::new("acme"));

        session.switch(None);

        assert_eq!(session.current_tenant(), None);
    }
}
