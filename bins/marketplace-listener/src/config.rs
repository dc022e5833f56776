//! Configuration for the marketplace listener

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use marketplace_indexer::HandlerConfig;

/// Marketplace listener
///
/// Replays decoded marketplace logs, in order, into the relational store, the search
/// index and the growth ledger.
#[derive(Parser, Debug)]
#[command(name = "marketplace-listener")]
#[command(about = "Index marketplace listing and offer events", long_about = None)]
pub struct Config {
    /// JSON file of decoded logs (array, or object with a `logs` field)
    #[arg(long)]
    pub logs: PathBuf,

    /// JSON file of listing and offer snapshots served as the detail source
    #[arg(long)]
    pub listings: PathBuf,

    /// Database path or sqlite URL for listings, offers and growth events
    #[arg(long, env = "DATABASE_URL", default_value = "./marketplace.db")]
    pub database_url: String,

    /// Elasticsearch base URL
    #[arg(long, env = "ELASTICSEARCH_HOST", default_value = "http://localhost:9200")]
    pub elasticsearch_url: String,

    /// Elasticsearch index for listing documents
    #[arg(long, default_value = marketplace_search::DEFAULT_INDEX)]
    pub elasticsearch_index: String,

    /// Handler config file (TOML, JSON or YAML). Flags below override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Acknowledge logs without indexing them
    #[arg(long)]
    pub no_marketplace: bool,

    /// Project listings into Elasticsearch
    #[arg(long)]
    pub elasticsearch: bool,

    /// Record growth ledger entries
    #[arg(long)]
    pub growth: bool,

    /// Keep going after a log fails instead of stopping
    #[arg(long)]
    pub continue_on_error: bool,
}

impl Config {
    /// Handler switches: the config file (or defaults), then CLI flags.
    pub fn handler_config(&self) -> Result<HandlerConfig> {
        let mut handler = match &self.config {
            Some(path) => HandlerConfig::from_file(path)?,
            None => HandlerConfig::default(),
        };
        if self.no_marketplace {
            handler.marketplace = false;
        }
        if self.elasticsearch {
            handler.elasticsearch = true;
        }
        if self.growth {
            handler.growth = true;
        }
        Ok(handler)
    }
}
