use super::*;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::sync::Arc;

/// Fake in-memory persistence.
///
/// Useful for unit-tests and for running the service without a
/// database. A transaction holds a process-wide write lock for its
/// whole lifetime, so transactions never interleave.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    lock: Arc<RwLock<()>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    type Connection = InMemoryConnection;
    type Transaction<'a> = InMemoryTransaction<'a>;

    fn get_connection(&self) -> Result<Self::Connection> {
        Ok(InMemoryConnection {
            lock: self.lock.clone(),
        })
    }
}

#[derive(Default, Debug)]
pub struct InMemoryConnection {
    lock: Arc<RwLock<()>>,
}

impl Connection<InMemoryPersistence> for InMemoryConnection {
    fn start_transaction<'a>(&'a mut self) -> Result<InMemoryTransaction<'a>> {
        Ok(InMemoryTransaction {
            lock_guard: self.lock.write(),
        })
    }
}

#[derive(Debug)]
pub struct InMemoryTransaction<'a> {
    #[allow(unused)] // used only by Drop
    lock_guard: RwLockWriteGuard<'a, ()>,
}

// In-memory stores apply writes immediately, so there is nothing to
// flush here. Rejected admissions never write before they bail out.
impl<'a> Transaction for InMemoryTransaction<'a> {
    fn commit(self) -> Result<()> {
        Ok(())
    }
}
