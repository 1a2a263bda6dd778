//! Database persistence traits
//!
//! Expressing atomic transactions spanning multiple stores in a
//! hexagonal architecture is not a simple thing. Stores are generic
//! over a [`Persistence`] and take its connection or transaction type
//! as an argument, so that one admission decision can read a listing
//! and write a bid under a single transaction, whatever the backend.
//!
//! Some discussion:
//!
//! * https://www.reddit.com/r/rust/comments/p9amqt/hexagonal_architecture_in_rust_1/h9ypjoo
//! * https://www.reddit.com/r/golang/comments/i1vy4s/ddd_vs_db_transactions_how_to_reconcile/
mod in_memory;
mod postgres;

pub use self::{in_memory::*, postgres::*};

use anyhow::Result;

/// An instance of a persistence (store) that can hold data
///
/// Must be cloneable and thread-safe.
pub trait Persistence: Send + Sync + Clone + 'static {
    type Connection: Connection<Self> + Send;
    type Transaction<'a>: Transaction;

    /// Get a connection to a store
    fn get_connection(&self) -> Result<Self::Connection>;
}

/// A connection to a database/persistence
pub trait Connection<P: Persistence> {
    fn start_transaction<'a>(&'a mut self) -> Result<P::Transaction<'a>>;
}

/// A database transaction to a database/persistence
///
/// Dropping a transaction without committing it discards it.
pub trait Transaction {
    fn commit(self) -> Result<()>;
}
