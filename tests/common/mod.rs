#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use marketplace_indexer::memory::{
    InMemoryDetailSource, InMemoryGrowthLedger, InMemorySearchIndex, InMemoryStore,
};
use marketplace_indexer::{
    DecodedFields, DecodedLog, HandlerConfig, HistoryEvent, Identity, MarketplaceEventHandler,
    ResolvedListing, ResolvedOffer,
};
use serde_json::json;

pub const SELLER: &str = "0xA";
pub const BUYER: &str = "0xB";

pub struct Harness {
    pub source: Arc<InMemoryDetailSource>,
    pub store: Arc<InMemoryStore>,
    pub search: Arc<InMemorySearchIndex>,
    pub ledger: Arc<InMemoryGrowthLedger>,
    pub handler: MarketplaceEventHandler,
}

impl Harness {
    pub fn new(config: HandlerConfig, source: InMemoryDetailSource) -> Self {
        let source = Arc::new(source);
        let store = Arc::new(InMemoryStore::new());
        let search = Arc::new(InMemorySearchIndex::new());
        let ledger = Arc::new(InMemoryGrowthLedger::new());
        let handler = MarketplaceEventHandler::new(config, source.clone(), store.clone())
            .with_search_index(search.clone())
            .with_growth_ledger(ledger.clone());
        Self {
            source,
            store,
            search,
            ledger,
            handler,
        }
    }

    pub fn all_enabled(source: InMemoryDetailSource) -> Self {
        Self::new(
            HandlerConfig {
                marketplace: true,
                elasticsearch: true,
                growth: true,
            },
            source,
        )
    }
}

pub fn date() -> DateTime<Utc> {
    DateTime::from_timestamp(1_551_441_600, 0).unwrap()
}

pub fn history(event: &str, block_number: u64, log_index: u64) -> HistoryEvent {
    HistoryEvent {
        event: event.to_string(),
        block_number,
        log_index,
        transaction_hash: Some(format!("0x{block_number:x}{log_index:x}")),
    }
}

pub fn listing(id: &str, events: Vec<HistoryEvent>) -> ResolvedListing {
    let content = json!({
        "title": "Vintage road bike",
        "category": "schema.forSale",
        "price": { "amount": "0.5", "currency": "ETH" }
    });
    ResolvedListing {
        id: id.to_string(),
        status: "active".to_string(),
        seller: Identity::new(SELLER),
        events,
        content: content.as_object().cloned().unwrap(),
    }
}

pub fn offer(id: &str, listing_id: &str, events: Vec<HistoryEvent>) -> ResolvedOffer {
    ResolvedOffer {
        id: id.to_string(),
        listing_id: listing_id.to_string(),
        status: "finalized".to_string(),
        buyer: Identity::new(BUYER),
        events,
        content: serde_json::Map::new(),
    }
}

pub fn log(event_name: &str, listing_id: &str, offer_id: Option<&str>, block: u64, index: u64) -> DecodedLog {
    DecodedLog {
        event_name: event_name.to_string(),
        decoded: DecodedFields {
            listing_id: listing_id.to_string(),
            offer_id: offer_id.map(ToString::to_string),
            party: SELLER.to_string(),
            ipfs_hash: Some("0x1220abcd".to_string()),
        },
        block_number: block,
        log_index: index,
        date: date(),
    }
}
