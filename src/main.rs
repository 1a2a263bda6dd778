mod bidding;
mod config;
mod persistence;
mod service;

use anyhow::Result;
use clap::Parser;
use std::{io::IsTerminal, sync::Arc};
use tokio::{runtime::Runtime, sync::Notify};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use crate::{
    bidding::{Credentials, Listing},
    config::{Options, RunOptions},
    persistence::{InMemoryPersistence, PostgresPersistence},
    service::{
        ApiState, BidAdmission, InMemoryBidStore, InMemoryListingStore, InMemorySessionStore,
        PostgresBidStore, PostgresListingStore, PostgresSessionStore,
    },
};

fn main() -> Result<()> {
    let fmt_builder = tracing_subscriber::fmt()
        .with_file(false)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stderr().is_terminal());

    // Compact output on a terminal, JSON lines otherwise
    if std::io::stderr().is_terminal() {
        tracing::subscriber::set_global_default(fmt_builder.compact().finish())?;
    } else {
        tracing::subscriber::set_global_default(fmt_builder.json().finish())?;
    }

    match Options::parse() {
        Options::Run(opts) => run(opts),
    }
}

fn run(opts: RunOptions) -> Result<()> {
    // Store backends are blocking, so they are set up before the runtime starts.
    match &opts.database.database_url {
        Some(database_url) => {
            let persistence = PostgresPersistence::connect(database_url, opts.database.pool_size)?;
            info!("using postgres persistence");
            let admission = BidAdmission::new(
                persistence.clone(),
                Arc::new(PostgresListingStore),
                Arc::new(PostgresBidStore),
            );
            serve(
                &opts,
                ApiState::new(persistence, Arc::new(PostgresSessionStore), admission),
            )
        }
        None => {
            let persistence = InMemoryPersistence::new();
            let listings = InMemoryListingStore::new_shared();
            let sessions = InMemorySessionStore::new_shared();
            seed_demo(&listings, &sessions);
            info!("using in-memory persistence");
            let admission = BidAdmission::new(
                persistence.clone(),
                listings,
                InMemoryBidStore::new_shared(),
            );
            serve(&opts, ApiState::new(persistence, sessions, admission))
        }
    }
}

fn serve<P: persistence::Persistence>(opts: &RunOptions, state: ApiState<P>) -> Result<()> {
    let shutdown = Arc::new(Notify::new());
    ctrlc::set_handler({
        let shutdown = shutdown.clone();
        move || {
            info!("Stopping all services...");
            shutdown.notify_one();
        }
    })?;

    let runtime = Runtime::new()?;
    runtime.block_on(service::run_http_server(
        Arc::new(state),
        opts.server.listen_addr,
        async move { shutdown.notified().await },
    ))
}

/// A landlord (1) with one vacant listing (1), and a registered user (2)
/// who can bid on it
fn seed_demo(listings: &InMemoryListingStore, sessions: &InMemorySessionStore) {
    listings.insert(Listing {
        id: 1,
        landlord_id: 1,
        tenant_id: None,
    });
    for (user, uid) in [(1, "landlord@example.com"), (2, "bidder@example.com")] {
        let credentials = Credentials {
            uid: uid.to_owned(),
            client: "demo".to_owned(),
            access_token: format!("demo-token-{user}"),
        };
        info!(
            user,
            uid = %credentials.uid,
            client = %credentials.client,
            access_token = %credentials.access_token,
            "demo session"
        );
        sessions.insert(credentials, user);
    }
}
