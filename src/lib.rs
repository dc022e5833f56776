//! Marketplace indexer - projects marketplace contract events into durable state.
//!
//! Each decoded listing/offer log is resolved into full records through a
//! content-addressed [`DetailSource`], checked for freshness against the log's
//! block position, and written to a relational [`RelationalStore`] (the source of
//! truth), optionally a [`SearchIndex`], and a [`GrowthLedger`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marketplace_indexer::{HandlerConfig, MarketplaceEventHandler, NotificationGate};
//!
//! let handler = MarketplaceEventHandler::new(config, detail_source, store.clone())
//!     .with_search_index(search)
//!     .with_growth_ledger(store);
//!
//! if let Some(details) = handler.process(&log).await? {
//!     if handler.webhook_enabled() {
//!         notifier.send(&details).await?;
//!     }
//! }
//! ```

pub mod chain_log;
pub mod classify;
pub mod config;
pub mod error;
pub mod growth;
pub mod handler;
pub mod indexer;
pub mod locks;
pub mod memory;
pub mod model;
pub mod ports;
pub mod resolver;

pub use async_trait::async_trait;

pub use chain_log::{BlockPosition, DecodedFields, DecodedLog};
pub use classify::{ListingEvent, MarketplaceEvent, OfferEvent};
pub use config::HandlerConfig;
pub use error::{GrowthRecordFailure, MarketplaceError};
pub use growth::GrowthRecorder;
pub use handler::{MarketplaceEventHandler, NotificationGate};
pub use indexer::ConsistencyIndexer;
pub use locks::EntityLocks;
pub use model::{
    GrowthContext, GrowthEventEntry, GrowthEventType, HistoryEvent, Identity,
    IndexedListingRecord, IndexedOfferRecord, ListingId, MarketplaceDetails, OfferId,
    RecordTimestamp, ResolvedListing, ResolvedOffer,
};
pub use ports::{DetailSource, GrowthLedger, RelationalStore, SearchIndex};
pub use resolver::{check_events_freshness, DetailResolver};
