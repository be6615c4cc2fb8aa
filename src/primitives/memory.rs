//! A simple, in-memory storage backend.
//!
//! Records live in hash maps guarded by mutexes. This is enough for tests, examples and single
//! process deployments where losing all codes and tokens on restart is acceptable.
use std::collections::HashMap;
use std::iter::{Extend, FromIterator};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::grant::{AccessData, AuthorizationData, ClientData, RefreshTokenData};
use super::storage::{Context, Storage, StorageError};

/// Keeps all records in hash maps keyed by their id, code or token.
///
/// Deletion removes the record under the lock of its map, which makes the consumption of codes and
/// refresh tokens atomic.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    clients: Mutex<HashMap<String, ClientData>>,
    authorize: Mutex<HashMap<String, AuthorizationData>>,
    access: Mutex<HashMap<String, AccessData>>,
    refresh: Mutex<HashMap<String, RefreshTokenData>>,
}

/// Every critical section is a single map operation, so a map behind a poisoned lock is intact.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("Recovering memory storage lock poisoned by a panic");
        PoisonError::into_inner(poisoned)
    })
}

impl MemoryStorage {
    /// Create an empty store without any clients in it.
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Insert or update the client record.
    pub fn register_client(&self, client: ClientData) {
        lock(&self.clients).insert(client.client_id.clone(), client);
    }

    /// Look up an issued access token.
    ///
    /// The engine itself never reads access tokens back, this is meant for the resource server
    /// side of a host application.
    pub fn access_data(&self, token: &str) -> Option<AccessData> {
        lock(&self.access).get(token).cloned()
    }

    /// The number of outstanding authorization codes.
    pub fn authorization_count(&self) -> usize {
        lock(&self.authorize).len()
    }
}

impl Extend<ClientData> for MemoryStorage {
    fn extend<I: IntoIterator<Item = ClientData>>(&mut self, iter: I) {
        iter.into_iter().for_each(|client| self.register_client(client))
    }
}

impl FromIterator<ClientData> for MemoryStorage {
    fn from_iter<I: IntoIterator<Item = ClientData>>(iter: I) -> Self {
        let mut into = MemoryStorage::new();
        into.extend(iter);
        into
    }
}

impl Storage for MemoryStorage {
    fn get_client_data(&self, ctx: &Context, client_id: &str) -> Result<ClientData, StorageError> {
        ctx.check()?;
        lock(&self.clients)
            .get(client_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn save_authorize_data(&self, ctx: &Context, data: &AuthorizationData) -> Result<(), StorageError> {
        ctx.check()?;
        lock(&self.authorize).insert(data.code.clone(), data.clone());
        Ok(())
    }

    fn get_authorize_data(&self, ctx: &Context, code: &str) -> Result<AuthorizationData, StorageError> {
        ctx.check()?;
        lock(&self.authorize)
            .get(code)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn delete_authorize_data(&self, ctx: &Context, code: &str) -> Result<bool, StorageError> {
        ctx.check()?;
        Ok(lock(&self.authorize).remove(code).is_some())
    }

    fn save_access_data(&self, ctx: &Context, data: &AccessData) -> Result<(), StorageError> {
        ctx.check()?;
        lock(&self.access).insert(data.access_token.clone(), data.clone());
        Ok(())
    }

    fn get_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<RefreshTokenData, StorageError> {
        ctx.check()?;
        lock(&self.refresh)
            .get(token)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn save_refresh_token_data(&self, ctx: &Context, data: &RefreshTokenData) -> Result<(), StorageError> {
        ctx.check()?;
        lock(&self.refresh).insert(data.refresh_token.clone(), data.clone());
        Ok(())
    }

    fn delete_refresh_token_data(&self, ctx: &Context, token: &str) -> Result<bool, StorageError> {
        ctx.check()?;
        Ok(lock(&self.refresh).remove(token).is_some())
    }
}
