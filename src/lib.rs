//! Requester-side implementation of a federated NSI-CS v2 circuit
//! reservation agent: outbound protocol engine, inbound callback handling,
//! topology ingestion, and the job dispatcher that drives it all, wired
//! together behind one explicit [`context::AppState`].

pub mod api;
pub mod config;
pub mod context;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod nsi;
pub mod topology;

use std::sync::Arc;

use context::AppState;

/// Connect to the database, bring up the job dispatcher and topology
/// poller, and serve the HTTP API until the process is killed.
pub async fn run(config: config::Config) -> anyhow::Result<()> {
    let config = Arc::new(config);

    let database = db::Database::connect(&config.database_uri).await?;
    database.init_schema().await?;
    let pool = database.pool().clone();

    let nsi_client = Arc::new(nsi::NsiClient::new(&config)?);

    let dispatcher = dispatcher::spawn(pool.clone(), nsi_client.clone(), None);
    topology::spawn(config.clone(), pool.clone());

    let state = AppState {
        config,
        pool,
        nsi: nsi_client,
        dispatcher,
    };

    api::serve(state).await
}
