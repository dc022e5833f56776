//! Marketplace listener - replays decoded marketplace logs through the indexer.
//!
//! Listing and offer details are served from a snapshots file; projections are written
//! to SQLite and, when enabled, Elasticsearch. Growth entries go to the same SQLite
//! database.
//!
//! # Usage
//!
//! ```bash
//! # Index a capture into ./marketplace.db
//! marketplace-listener --logs logs.json --listings listings.json
//!
//! # Also project into Elasticsearch and record growth events
//! marketplace-listener --logs logs.json --listings listings.json --elasticsearch --growth
//! ```

mod config;
mod replay;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use config::Config;
use marketplace_indexer::MarketplaceEventHandler;
use marketplace_search::ElasticsearchIndex;
use marketplace_source_json::JsonDetailSource;
use marketplace_sqlite::SqliteStore;

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let handler_config = config.handler_config()?;

    tracing::info!("Starting marketplace listener");
    tracing::info!("Logs: {}", config.logs.display());
    tracing::info!("Listings: {}", config.listings.display());
    tracing::info!("Database: {}", config.database_url);
    tracing::info!("Marketplace: {}", enabled(handler_config.marketplace));
    tracing::info!("Elasticsearch: {}", enabled(handler_config.elasticsearch));
    tracing::info!("Growth: {}", enabled(handler_config.growth));

    let details = Arc::new(JsonDetailSource::from_path(&config.listings)?);
    let store = Arc::new(SqliteStore::connect(&config.database_url).await?);
    tracing::info!("Database initialized");

    let mut handler = MarketplaceEventHandler::new(handler_config, details, store.clone())
        .with_growth_ledger(store.clone());
    if handler_config.elasticsearch {
        tracing::info!(
            "Search index: {}/{}",
            config.elasticsearch_url,
            config.elasticsearch_index
        );
        let search = ElasticsearchIndex::new(
            config.elasticsearch_url.clone(),
            config.elasticsearch_index.clone(),
        )?;
        handler = handler.with_search_index(Arc::new(search));
    }

    let logs = replay::load_logs(&config.logs)?;
    tracing::info!("Loaded {} logs", logs.len());

    let summary = replay::replay(&handler, &logs, config.continue_on_error).await?;

    tracing::info!("Final Statistics:");
    tracing::info!("  Processed: {}", summary.processed);
    tracing::info!("  Skipped: {}", summary.skipped);
    tracing::info!("  Failed: {}", summary.failed);
    if let Ok(count) = store.listing_count().await {
        tracing::info!("  Listings stored: {}", count);
    }
    if let Ok(count) = store.offer_count().await {
        tracing::info!("  Offers stored: {}", count);
    }

    Ok(())
}
