//! JSON file-backed detail source.
//!
//! Serves listing and offer snapshots captured from a content store, so logs can be
//! replayed without a live backend. The file holds any number of snapshots per id:
//!
//! ```json
//! {
//!   "listings": [{ "id": "1-000-42", "status": "active", "seller": { "id": "0xA" }, "events": [...] }],
//!   "offers":   [{ "id": "1-000-42-0", "listingId": "1-000-42", "status": "created", "buyer": { "id": "0xB" }, "events": [...] }]
//! }
//! ```
//!
//! A request for block `n` returns the newest snapshot whose history has no event
//! after block `n`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use marketplace_indexer::{
    BlockPosition, DetailSource, HistoryEvent, ListingId, OfferId, ResolvedListing, ResolvedOffer,
};
use serde::Deserialize;
use tracing::{info, trace};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SnapshotsFile {
    listings: Vec<ResolvedListing>,
    offers: Vec<ResolvedOffer>,
}

fn latest_position(events: &[HistoryEvent]) -> Option<BlockPosition> {
    events.iter().map(HistoryEvent::position).max()
}

/// Picks the newest snapshot whose history ends at or before `block_number`.
fn select<'a, T>(
    snapshots: &'a [T],
    block_number: u64,
    events: impl Fn(&T) -> &[HistoryEvent],
) -> Option<&'a T> {
    snapshots
        .iter()
        .filter(|snapshot| {
            latest_position(events(snapshot)).map_or(true, |p| p.block_number <= block_number)
        })
        .max_by_key(|snapshot| latest_position(events(snapshot)))
}

pub struct JsonDetailSource {
    /// Listing snapshots keyed by contract-level listing id.
    listings: HashMap<String, Vec<ResolvedListing>>,
    /// Offer snapshots keyed by (contract-level listing id, offer id).
    offers: HashMap<(String, String), Vec<ResolvedOffer>>,
}

impl JsonDetailSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(
            target: "marketplace_source_json",
            path = %path.display(),
            "loading detail snapshots from JSON file"
        );

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read file: {}", path.display()))?;
        let file: SnapshotsFile =
            serde_json::from_str(&contents).context("failed to parse snapshots file")?;

        Ok(Self::from_snapshots(file.listings, file.offers))
    }

    pub fn from_snapshots(listings: Vec<ResolvedListing>, offers: Vec<ResolvedOffer>) -> Self {
        let mut by_listing: HashMap<String, Vec<ResolvedListing>> = HashMap::new();
        for listing in listings {
            let key = ListingId::parse(&listing.id).map_or_else(|| listing.id.clone(), |id| id.listing);
            by_listing.entry(key).or_default().push(listing);
        }

        let mut by_offer: HashMap<(String, String), Vec<ResolvedOffer>> = HashMap::new();
        for offer in offers {
            match OfferId::parse(&offer.id) {
                Some(id) => by_offer
                    .entry((id.listing.listing, id.offer))
                    .or_default()
                    .push(offer),
                None => tracing::warn!(
                    target: "marketplace_source_json",
                    id = %offer.id,
                    "skipping offer snapshot with malformed id"
                ),
            }
        }

        info!(
            target: "marketplace_source_json",
            listings = by_listing.len(),
            offers = by_offer.len(),
            "loaded detail snapshots"
        );

        Self {
            listings: by_listing,
            offers: by_offer,
        }
    }

    pub fn listing_count(&self) -> usize {
        self.listings.len()
    }

    pub fn offer_count(&self) -> usize {
        self.offers.len()
    }
}

#[async_trait]
impl DetailSource for JsonDetailSource {
    async fn get_listing(&self, listing_id: &str, block_number: u64) -> Result<ResolvedListing> {
        let snapshots = self
            .listings
            .get(listing_id)
            .ok_or_else(|| anyhow!("listing {listing_id} not found"))?;
        let listing = select(snapshots, block_number, |l: &ResolvedListing| l.events.as_slice())
            .ok_or_else(|| anyhow!("no snapshot of listing {listing_id} at block {block_number}"))?;

        trace!(
            target: "marketplace_source_json",
            listing = %listing.id,
            block_number,
            "served listing snapshot"
        );
        Ok(listing.clone())
    }

    async fn get_offer(
        &self,
        listing_id: &str,
        offer_id: &str,
        block_number: u64,
    ) -> Result<ResolvedOffer> {
        let snapshots = self
            .offers
            .get(&(listing_id.to_string(), offer_id.to_string()))
            .ok_or_else(|| anyhow!("offer {listing_id}-{offer_id} not found"))?;
        let offer = select(snapshots, block_number, |o: &ResolvedOffer| o.events.as_slice()).ok_or_else(
            || anyhow!("no snapshot of offer {listing_id}-{offer_id} at block {block_number}"),
        )?;

        trace!(
            target: "marketplace_source_json",
            offer = %offer.id,
            block_number,
            "served offer snapshot"
        );
        Ok(offer.clone())
    }
}
