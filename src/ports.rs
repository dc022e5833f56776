//! Collaborator contracts consumed by the pipeline.
//!
//! Each collaborator is injected into [`crate::MarketplaceEventHandler`] as an
//! `Arc<dyn Trait>`. Implementations own their timeouts and retry policy; the
//! pipeline calls each of them once per log.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{
    GrowthEventEntry, IndexedListingRecord, IndexedOfferRecord, ResolvedListing, ResolvedOffer,
};

/// Content-addressed source of canonical listings and offers.
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Resolve a listing as of `block_number`.
    ///
    /// `listing_id` is the contract-level id decoded from the log, not the composite id.
    async fn get_listing(&self, listing_id: &str, block_number: u64) -> Result<ResolvedListing>;

    /// Resolve an offer on a listing as of `block_number`.
    async fn get_offer(
        &self,
        listing_id: &str,
        offer_id: &str,
        block_number: u64,
    ) -> Result<ResolvedOffer>;
}

/// System-of-record store. Both writes are upserts keyed by record id.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn upsert_listing(&self, record: &IndexedListingRecord) -> Result<()>;

    async fn upsert_offer(&self, record: &IndexedOfferRecord) -> Result<()>;
}

/// Full-text search projection of listings.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn index(
        &self,
        id: &str,
        owner_address: &str,
        content_ref: Option<&str>,
        listing: &ResolvedListing,
    ) -> Result<()>;
}

/// Append-only growth accounting ledger.
#[async_trait]
pub trait GrowthLedger: Send + Sync {
    async fn insert(&self, entry: &GrowthEventEntry) -> Result<()>;
}
