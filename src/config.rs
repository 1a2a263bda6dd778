use clap::{crate_authors, crate_description, crate_name, crate_version, Args, Parser};
use std::net::SocketAddr;

// Command-line arguments, each with an environment variable fallback.
#[derive(Parser, Debug)]
#[command(name = crate_name!())]
#[command(author = crate_authors!())]
#[command(about = crate_description!())]
#[command(version = crate_version!())]
pub enum Options {
    /// Run the bidding service.
    Run(RunOptions),
}

#[derive(Args, Clone, Debug)]
pub struct RunOptions {
    #[command(flatten)]
    pub server: ServerOptions,

    #[command(flatten)]
    pub database: DatabaseOptions,
}

#[derive(Args, Clone, Debug)]
#[command(next_help_heading = "Server Options")]
#[group(id = "Server")]
pub struct ServerOptions {
    /// Address and port the HTTP API binds to.
    #[arg(long = "listen-addr")]
    #[arg(env = "LISTEN_ADDR")]
    #[arg(default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,
}

#[derive(Args, Clone, Debug)]
#[command(next_help_heading = "Database Options")]
#[group(id = "Database")]
pub struct DatabaseOptions {
    /// Postgres connection string. Without it, data is kept in memory
    /// and seeded with demo records.
    #[arg(long = "database-url")]
    #[arg(env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum number of pooled database connections.
    #[arg(long = "db-pool-size")]
    #[arg(env = "DB_POOL_SIZE")]
    #[arg(default_value_t = 8)]
    pub pool_size: u32,
}
