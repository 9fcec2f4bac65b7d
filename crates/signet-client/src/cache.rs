//! One service handle per (vault, identity) pair

use crate::service::{ServiceResult, VaultService};
use signet_types::SignerId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Opens a fresh handle to the vault service at `address` acting as `identity`
pub trait Connector {
    fn connect(&self, address: &str, identity: &SignerId) -> ServiceResult<Arc<dyn VaultService>>;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub service_address: String,
    pub identity: SignerId,
}

impl CacheKey {
    pub fn new(service_address: &str, identity: &SignerId) -> Self {
        Self {
            service_address: service_address.to_string(),
            identity: identity.clone(),
        }
    }
}

/// Handles live as long as the cache; there is no eviction.
pub struct ClientCache<C> {
    connector: C,
    clients: HashMap<CacheKey, Arc<dyn VaultService>>,
}

impl<C: Connector> ClientCache<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            clients: HashMap::new(),
        }
    }

    /// Return the cached handle for the pair, connecting on first use.
    ///
    /// A failed connect leaves nothing behind, so the next call retries.
    pub fn get_client(
        &mut self,
        service_address: &str,
        identity: &SignerId,
    ) -> ServiceResult<Arc<dyn VaultService>> {
        let key = CacheKey::new(service_address, identity);
        if let Some(client) = self.clients.get(&key) {
            return Ok(Arc::clone(client));
        }

        debug!(vault = %service_address, identity = %identity, "connecting to vault service");
        let client = self.connector.connect(service_address, identity)?;
        self.clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    pub fn contains(&self, service_address: &str, identity: &SignerId) -> bool {
        self.clients
            .contains_key(&CacheKey::new(service_address, identity))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
