use super::*;
use anyhow::Context;
use r2d2_postgres::PostgresConnectionManager;

type Manager = PostgresConnectionManager<::postgres::NoTls>;

#[derive(Debug, Clone)]
pub struct PostgresPersistence {
    pool: r2d2::Pool<Manager>,
}

impl PostgresPersistence {
    /// Build a connection pool
    ///
    /// Blocks until the pool has its initial connections, so it must
    /// not be called from within an async context.
    pub fn connect(database_url: &str, pool_size: u32) -> Result<Self> {
        let config = database_url
            .parse::<::postgres::Config>()
            .context("invalid database url")?;
        let pool = r2d2::Pool::builder()
            .max_size(pool_size)
            .build(PostgresConnectionManager::new(config, ::postgres::NoTls))
            .context("failed to build database connection pool")?;
        Ok(Self { pool })
    }
}

impl Persistence for PostgresPersistence {
    type Connection = PostgresConnection;
    type Transaction<'a> = PostgresTransaction<'a>;

    fn get_connection(&self) -> Result<Self::Connection> {
        Ok(self.pool.get()?)
    }
}

pub type PostgresConnection = r2d2::PooledConnection<Manager>;

impl Connection<PostgresPersistence> for PostgresConnection {
    fn start_transaction<'a>(&'a mut self) -> Result<PostgresTransaction<'a>> {
        Ok(self.transaction()?)
    }
}

pub type PostgresTransaction<'a> = ::postgres::Transaction<'a>;

impl<'a> Transaction for PostgresTransaction<'a> {
    fn commit(self) -> Result<()> {
        Ok(::postgres::Transaction::commit(self)?)
    }
}
