//! Persistence of the last-successful-sync token.

use crate::{
    error::Error,
    storage::{StorageBackend, namespace_key},
    tenant::{TenantId, TenantResolver},
};

/// Storage record name under which the token is persisted.
const TOKEN_RECORD: &str = "sync-token";

/// The cached token hydrated for one tenant.
#[derive(Debug)]
struct Cached {
    tenant: TenantId,
    token: Option<String>,
}

/// A single tenant-scoped token marking the last confirmed exchange with the
/// remote store.
///
/// Follows the same scoping and hydration rules as the replica: the token is
/// cached in memory per tenant, durably flushed on every write, and the
/// cache is discarded when the active tenant changes.
#[derive(Debug)]
pub struct SyncCursor<S, R> {
    storage: S,
    resolver: R,
    namespace: String,
    cached: Option<Cached>,
}

impl<S, R> SyncCursor<S, R>
where
    S: StorageBackend,
    R: TenantResolver,
{
    /// Create an unhydrated cursor persisting under `namespace`.
    pub fn new(storage: S, resolver: R, namespace: &str) -> Self {
        Self {
            storage,
            resolver,
            namespace: namespace.to_owned(),
            cached: None,
        }
    }

    /// The token of the last confirmed exchange, or `None` when no sync has
    /// completed yet or no tenant is active.
    ///
    /// # Errors
    /// Returns [Error::Persistence] or [Error::Corrupt] if hydration fails.
    pub fn read_token(&mut self) -> Result<Option<String>, Error> {
        let Some(tenant) = self.resolver.current_tenant() else {
            return Ok(None);
        };

        Ok(self.hydrate(&tenant)?.token.clone())
    }

    /// Record `token` as the cursor of the last confirmed exchange.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NoActiveTenant] if no tenant can be resolved,
    /// - or [Error::Persistence] if the token could not be written.
    pub fn write_token(&mut self, token: &str) -> Result<(), Error> {
        self.store_token(Some(token.to_owned()))
    }

    /// Forget the cursor, forcing the next pull to start from scratch.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NoActiveTenant] if no tenant can be resolved,
    /// - or [Error::Persistence] if the token could not be written.
    pub fn clear_token(&mut self) -> Result<(), Error> {
        self.store_token(None)
    }

    fn store_token(&mut self, token: Option<String>) -> Result<(), Error> {
        let tenant = self.resolver.current_tenant().ok_or(Error::NoActiveTenant)?;

        let key = namespace_key(&self.namespace, TOKEN_RECORD, Some(&tenant));
        let blob =
            serde_json::to_string(&token).map_err(|error| Error::Persistence(error.to_string()))?;
        self.storage.set(&key, &blob)?;
        tracing::debug!(%tenant, "persisted sync cursor");

        self.cached = Some(Cached { tenant, token });

        Ok(())
    }

    /// Ensure the cache holds `tenant`'s token, discarding any stale state.
    fn hydrate(&mut self, tenant: &TenantId) -> Result<&mut Cached, Error> {
        let cached = match self.cached.take() {
            Some(cached) if &cached.tenant == tenant => cached,
            _ => {
                let key = namespace_key(&self.namespace, TOKEN_RECORD, Some(tenant));
                let token = match self.storage.get(&key)? {
                    Some(blob) => serde_json::from_str(&blob)?,
                    None => None,
                };

                Cached {
                    tenant: tenant.clone(),
                    token,
                }
            }
        };

        Ok(self.cached.insert(cached))
    }
}

#[cfg(test)]
mod sync_cursor_tests {
    use crate::{
        error::Error,
        storage::MemoryStorage,
        tenant::{SessionTenant, TenantId},
    };

    use super::SyncCursor;

    fn get_test_cursor() -> (SyncCursor<MemoryStorage, SessionTenant>, SessionTenant) {
        let session = SessionTenant::with_active(TenantId::new("acme"));
        let cursor = SyncCursor::new(MemoryStorage::new(), session.clone(), "ledger");

        (cursor, session)
    }

    #[test]
    fn reads_none_before_any_sync() {
        let (mut cursor, _session) = get_test_cursor();

        assert_eq!(cursor.read_token(), Ok(None));
    }

    #[test]
    fn write_then_read_roundtrips() {
        let (mut cursor, _session) = get_test_cursor();

        cursor.write_token("2024-05-01T12:00:00Z").unwrap();

        assert_eq!(
            cursor.read_token(),
            Ok(Some("2024-05-01T12:00:00Z".to_owned()))
        );
    }

    #[test]
    fn clear_forgets_the_token() {
        let (mut cursor, _session) = get_test_cursor();
        cursor.write_token("token-1").unwrap();

        cursor.clear_token().unwrap();

        assert_eq!(cursor.read_token(), Ok(None));
    }

    #[test]
    fn write_without_tenant_fails() {
        let (mut cursor, session) = get_test_cursor();
        session.switch(None);

        assert_eq!(cursor.write_token("token-1"), Err(Error::NoActiveTenant));
    }

    #[test]
    fn read_without_tenant_yields_none() {
        let (mut cursor, session) = get_test_cursor();
        cursor.write_token("token-1").unwrap();
        session.switch(None);

        assert_eq!(cursor.read_token(), Ok(None));
    }

    #[test]
    fn tokens_are_scoped_per_tenant() {
        let (mut cursor, session) = get_test_cursor();
        cursor.write_token("acme-token").unwrap();

        session.switch(Some(TenantId::new("globex")));
        assert_eq!(cursor.read_token(), Ok(None));
        cursor.write_token("globex-token").unwrap();

        session.switch(Some(TenantId::new("acme")));
        assert_eq!(cursor.read_token(), Ok(Some("acme-token".to_owned())));
    }

    #[test]
    fn token_survives_a_process_restart() {
        let storage = MemoryStorage::new();
        let session = SessionTenant::with_active(TenantId::new("acme"));
        {
            let mut cursor = SyncCursor::new(storage.clone(), session.clone(), "ledger");
            cursor.write_token("token-1").unwrap();
        }

        let mut reopened = SyncCursor::new(storage, session, "ledger");

        assert_eq!(reopened.read_token(), Ok(Some("token-1".to_owned())));
    }
}
