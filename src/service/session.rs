//! Resolving session credentials to a signed-in user
use crate::bidding::{Credentials, UserId};
use crate::persistence::{InMemoryConnection, InMemoryPersistence, Persistence};
use anyhow::Result;
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};

mod postgres;

pub use self::postgres::*;

/// A store of issued sessions
///
/// Issuing sessions is somebody else's job; this only answers who, if
/// anyone, a set of credentials belongs to.
pub trait SessionStore<P: Persistence>: Send + Sync {
    fn authenticate(
        &self,
        conn: &mut P::Connection,
        credentials: &Credentials,
    ) -> Result<Option<UserId>>;
}

pub type SharedSessionStore<P> = Arc<dyn SessionStore<P> + Send + Sync>;

#[derive(Default)]
pub struct InMemorySessionStore(Mutex<BTreeMap<(String, String), (String, UserId)>>);

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a session for `user`, replacing any previous one for the same uid and client
    pub fn insert(&self, credentials: Credentials, user: UserId) {
        self.0.lock().insert(
            (credentials.uid, credentials.client),
            (credentials.access_token, user),
        );
    }
}

impl SessionStore<InMemoryPersistence> for InMemorySessionStore {
    fn authenticate(
        &self,
        _conn: &mut InMemoryConnection,
        credentials: &Credentials,
    ) -> Result<Option<UserId>> {
        Ok(self
            .0
            .lock()
            .get(&(credentials.uid.clone(), credentials.client.clone()))
            .filter(|(access_token, _)| *access_token == credentials.access_token)
            .map(|(_, user)| *user))
    }
}
