//! In-memory collaborators.
//!
//! Designed for tests and dry runs: every implementation records what it was asked
//! to do and can be switched into a failing mode to exercise error paths.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::model::{
    GrowthEventEntry, GrowthEventType, IndexedListingRecord, IndexedOfferRecord, ResolvedListing,
    ResolvedOffer,
};
use crate::ports::{DetailSource, GrowthLedger, RelationalStore, SearchIndex};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A call made to [`InMemoryDetailSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Listing {
        listing_id: String,
        block_number: u64,
    },
    Offer {
        listing_id: String,
        offer_id: String,
        block_number: u64,
    },
}

/// Detail source serving fixed records regardless of the requested block.
#[derive(Default)]
pub struct InMemoryDetailSource {
    listings: Mutex<HashMap<String, ResolvedListing>>,
    offers: Mutex<HashMap<(String, String), ResolvedOffer>>,
    calls: Mutex<Vec<SourceCall>>,
    failing: AtomicBool,
}

impl InMemoryDetailSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `listing` for the contract-level `listing_id`.
    pub fn with_listing(self, listing_id: impl Into<String>, listing: ResolvedListing) -> Self {
        self.set_listing(listing_id, listing);
        self
    }

    pub fn with_offer(
        self,
        listing_id: impl Into<String>,
        offer_id: impl Into<String>,
        offer: ResolvedOffer,
    ) -> Self {
        lock(&self.offers).insert((listing_id.into(), offer_id.into()), offer);
        self
    }

    pub fn set_listing(&self, listing_id: impl Into<String>, listing: ResolvedListing) {
        lock(&self.listings).insert(listing_id.into(), listing);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl DetailSource for InMemoryDetailSource {
    async fn get_listing(&self, listing_id: &str, block_number: u64) -> Result<ResolvedListing> {
        lock(&self.calls).push(SourceCall::Listing {
            listing_id: listing_id.to_string(),
            block_number,
        });
        if self.failing.load(Ordering::SeqCst) {
            bail!("detail source unavailable");
        }
        lock(&self.listings)
            .get(listing_id)
            .cloned()
            .ok_or_else(|| anyhow!("listing {listing_id} not found"))
    }

    async fn get_offer(
        &self,
        listing_id: &str,
        offer_id: &str,
        block_number: u64,
    ) -> Result<ResolvedOffer> {
        lock(&self.calls).push(SourceCall::Offer {
            listing_id: listing_id.to_string(),
            offer_id: offer_id.to_string(),
            block_number,
        });
        if self.failing.load(Ordering::SeqCst) {
            bail!("detail source unavailable");
        }
        lock(&self.offers)
            .get(&(listing_id.to_string(), offer_id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("offer {listing_id}-{offer_id} not found"))
    }
}

/// Relational store keeping the latest record per id.
#[derive(Default)]
pub struct InMemoryStore {
    listings: Mutex<BTreeMap<String, IndexedListingRecord>>,
    offers: Mutex<BTreeMap<String, IndexedOfferRecord>>,
    writes: Mutex<usize>,
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn listings(&self) -> Vec<IndexedListingRecord> {
        lock(&self.listings).values().cloned().collect()
    }

    pub fn offers(&self) -> Vec<IndexedOfferRecord> {
        lock(&self.offers).values().cloned().collect()
    }

    pub fn listing(&self, id: &str) -> Option<IndexedListingRecord> {
        lock(&self.listings).get(id).cloned()
    }

    pub fn offer(&self, id: &str) -> Option<IndexedOfferRecord> {
        lock(&self.offers).get(id).cloned()
    }

    /// Number of successful upserts, listings and offers combined.
    pub fn write_count(&self) -> usize {
        *lock(&self.writes)
    }
}

#[async_trait]
impl RelationalStore for InMemoryStore {
    async fn upsert_listing(&self, record: &IndexedListingRecord) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("relational store unavailable");
        }
        lock(&self.listings).insert(record.id.clone(), record.clone());
        *lock(&self.writes) += 1;
        Ok(())
    }

    async fn upsert_offer(&self, record: &IndexedOfferRecord) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("relational store unavailable");
        }
        lock(&self.offers).insert(record.id.clone(), record.clone());
        *lock(&self.writes) += 1;
        Ok(())
    }
}

/// A document accepted by [`InMemorySearchIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub id: String,
    pub owner_address: String,
    pub content_ref: Option<String>,
    pub listing: ResolvedListing,
}

#[derive(Default)]
pub struct InMemorySearchIndex {
    documents: Mutex<Vec<IndexedDocument>>,
    failing: AtomicBool,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn documents(&self) -> Vec<IndexedDocument> {
        lock(&self.documents).clone()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn index(
        &self,
        id: &str,
        owner_address: &str,
        content_ref: Option<&str>,
        listing: &ResolvedListing,
    ) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("search cluster unavailable");
        }
        lock(&self.documents).push(IndexedDocument {
            id: id.to_string(),
            owner_address: owner_address.to_string(),
            content_ref: content_ref.map(ToString::to_string),
            listing: listing.clone(),
        });
        Ok(())
    }
}

/// Growth ledger appending to a vector. Insertions of the types in the failing set
/// are rejected.
#[derive(Default)]
pub struct InMemoryGrowthLedger {
    entries: Mutex<Vec<GrowthEventEntry>>,
    failing_types: Mutex<HashSet<GrowthEventType>>,
}

impl InMemoryGrowthLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, event_type: GrowthEventType) {
        lock(&self.failing_types).insert(event_type);
    }

    pub fn entries(&self) -> Vec<GrowthEventEntry> {
        lock(&self.entries).clone()
    }
}

#[async_trait]
impl GrowthLedger for InMemoryGrowthLedger {
    async fn insert(&self, entry: &GrowthEventEntry) -> Result<()> {
        if lock(&self.failing_types).contains(&entry.event_type) {
            bail!("growth ledger rejected {}", entry.event_type);
        }
        lock(&self.entries).push(entry.clone());
        Ok(())
    }
}
