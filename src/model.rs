//! Domain records flowing through the pipeline.
//!
//! [`ResolvedListing`] and [`ResolvedOffer`] are produced by the detail source and
//! treated as read-only input. The `Indexed*` records and [`GrowthEventEntry`] are
//! what the pipeline writes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chain_log::BlockPosition;

/// A marketplace participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account address, as returned by the detail source (case not normalized).
    pub id: String,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Lower-cased address used for every persisted projection.
    pub fn address(&self) -> String {
        self.id.to_lowercase()
    }
}

/// One on-chain event folded into a listing or offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub event: String,
    pub block_number: u64,
    pub log_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

impl HistoryEvent {
    pub fn position(&self) -> BlockPosition {
        BlockPosition::new(self.block_number, self.log_index)
    }
}

/// Canonical listing as of a given block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedListing {
    /// Composite identifier `network-contract-listingID`.
    pub id: String,
    pub status: String,
    pub seller: Identity,
    #[serde(default)]
    pub events: Vec<HistoryEvent>,
    /// Off-chain content (title, description, price, media...).
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

/// Canonical offer as of a given block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOffer {
    /// Composite identifier `network-contract-listingID-offerID`.
    pub id: String,
    pub listing_id: String,
    pub status: String,
    pub buyer: Identity,
    #[serde(default)]
    pub events: Vec<HistoryEvent>,
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

/// Parsed form of a composite listing identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingId {
    pub network: String,
    pub contract: String,
    pub listing: String,
}

impl ListingId {
    /// Parses `network-contract-listing`. Trailing components (as found in offer ids)
    /// are ignored. Returns `None` when fewer than three components are present.
    pub fn parse(id: &str) -> Option<Self> {
        let mut parts = id.split('-');
        let network = parts.next()?;
        let contract = parts.next()?;
        let listing = parts.next()?;
        Some(Self {
            network: network.to_string(),
            contract: contract.to_string(),
            listing: listing.to_string(),
        })
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.network, self.contract, self.listing)
    }
}

/// Parsed form of a composite offer identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OfferId {
    pub listing: ListingId,
    pub offer: String,
}

impl OfferId {
    /// Parses `network-contract-listing-offer`.
    pub fn parse(id: &str) -> Option<Self> {
        let listing = ListingId::parse(id)?;
        let offer = id.split('-').nth(3)?;
        Some(Self {
            listing,
            offer: offer.to_string(),
        })
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.listing, self.offer)
    }
}

/// Details resolved for one log and handed back to the caller.
///
/// Serializes to `{ "listing": ... }` or `{ "listing": ..., "offer": ... }`, the shape
/// notification payloads are built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MarketplaceDetails {
    Listing {
        listing: ResolvedListing,
    },
    Offer {
        listing: ResolvedListing,
        offer: ResolvedOffer,
    },
}

impl MarketplaceDetails {
    pub fn listing(&self) -> &ResolvedListing {
        match self {
            MarketplaceDetails::Listing { listing } | MarketplaceDetails::Offer { listing, .. } => {
                listing
            }
        }
    }

    pub fn offer(&self) -> Option<&ResolvedOffer> {
        match self {
            MarketplaceDetails::Listing { .. } => None,
            MarketplaceDetails::Offer { offer, .. } => Some(offer),
        }
    }
}

/// Which of `created_at` / `updated_at` a projection carries. Exactly one is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTimestamp {
    Created(DateTime<Utc>),
    Updated(DateTime<Utc>),
}

impl RecordTimestamp {
    pub fn created_at(self) -> Option<DateTime<Utc>> {
        match self {
            RecordTimestamp::Created(at) => Some(at),
            RecordTimestamp::Updated(_) => None,
        }
    }

    pub fn updated_at(self) -> Option<DateTime<Utc>> {
        match self {
            RecordTimestamp::Created(_) => None,
            RecordTimestamp::Updated(at) => Some(at),
        }
    }
}

/// Relational projection of a listing, keyed by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedListingRecord {
    pub id: String,
    pub block_number: u64,
    pub log_index: u64,
    pub status: String,
    /// Lower-cased seller address.
    pub seller_address: String,
    /// Full resolved listing.
    pub data: Value,
    pub timestamp: RecordTimestamp,
}

/// Relational projection of an offer, keyed by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedOfferRecord {
    pub id: String,
    pub listing_id: String,
    pub status: String,
    pub seller_address: String,
    pub buyer_address: String,
    /// Full resolved offer.
    pub data: Value,
    pub timestamp: RecordTimestamp,
}

/// Growth ledger event types produced by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrowthEventType {
    ListingCreated,
    ListingPurchased,
    ListingSold,
}

impl GrowthEventType {
    pub const fn as_str(self) -> &'static str {
        match self {
            GrowthEventType::ListingCreated => "ListingCreated",
            GrowthEventType::ListingPurchased => "ListingPurchased",
            GrowthEventType::ListingSold => "ListingSold",
        }
    }
}

impl fmt::Display for GrowthEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthContext {
    #[serde(rename = "blockInfo")]
    pub block_info: BlockPosition,
}

/// Append-only growth ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthEventEntry {
    /// Lower-cased account address.
    pub actor_address: String,
    #[serde(rename = "type")]
    pub event_type: GrowthEventType,
    pub subject_id: String,
    pub context: GrowthContext,
    pub timestamp: DateTime<Utc>,
}
