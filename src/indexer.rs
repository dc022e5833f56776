//! Projection of resolved listings and offers into the stores.
//!
//! The relational store is the source of truth and every write to it must succeed.
//! The search index is a secondary view: failures there are logged and counted,
//! the relational write is kept, and processing continues.

use std::sync::Arc;

use crate::chain_log::DecodedLog;
use crate::classify::{ListingEvent, MarketplaceEvent, OfferEvent};
use crate::error::{MarketplaceError, Result};
use crate::model::{
    IndexedListingRecord, IndexedOfferRecord, ListingId, RecordTimestamp, ResolvedListing,
    ResolvedOffer,
};
use crate::ports::{RelationalStore, SearchIndex};

/// Verifies that the listing id embedded in off-chain content matches the on-chain id.
pub fn check_listing_id(log: &DecodedLog, listing: &ResolvedListing) -> Result<()> {
    let found = ListingId::parse(&listing.id).map(|id| id.listing);
    match found {
        Some(found) if found == log.decoded.listing_id => Ok(()),
        found => Err(MarketplaceError::ListingIdMismatch {
            expected: log.decoded.listing_id.clone(),
            found: found.unwrap_or_else(|| listing.id.clone()),
        }),
    }
}

pub struct ConsistencyIndexer {
    store: Arc<dyn RelationalStore>,
    search: Option<Arc<dyn SearchIndex>>,
}

impl ConsistencyIndexer {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self {
            store,
            search: None,
        }
    }

    /// Also project listings into `search`.
    pub fn with_search_index(mut self, search: Arc<dyn SearchIndex>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn search_enabled(&self) -> bool {
        self.search.is_some()
    }

    pub fn listing_record(log: &DecodedLog, listing: &ResolvedListing) -> Result<IndexedListingRecord> {
        let data = serde_json::to_value(listing).map_err(|e| MarketplaceError::Persistence {
            entity: format!("listing {}", listing.id),
            source: e.into(),
        })?;
        let timestamp = if log.event() == MarketplaceEvent::Listing(ListingEvent::Created) {
            RecordTimestamp::Created(log.date)
        } else {
            RecordTimestamp::Updated(log.date)
        };

        Ok(IndexedListingRecord {
            id: listing.id.clone(),
            block_number: log.block_number,
            log_index: log.log_index,
            status: listing.status.clone(),
            seller_address: listing.seller.address(),
            data,
            timestamp,
        })
    }

    pub fn offer_record(
        log: &DecodedLog,
        listing: &ResolvedListing,
        offer: &ResolvedOffer,
    ) -> Result<IndexedOfferRecord> {
        let data = serde_json::to_value(offer).map_err(|e| MarketplaceError::Persistence {
            entity: format!("offer {}", offer.id),
            source: e.into(),
        })?;
        let timestamp = if log.event() == MarketplaceEvent::Offer(OfferEvent::Created) {
            RecordTimestamp::Created(log.date)
        } else {
            RecordTimestamp::Updated(log.date)
        };

        Ok(IndexedOfferRecord {
            id: offer.id.clone(),
            listing_id: listing.id.clone(),
            status: offer.status.clone(),
            seller_address: listing.seller.address(),
            buyer_address: offer.buyer.address(),
            data,
            timestamp,
        })
    }

    pub async fn index_listing(
        &self,
        log: &DecodedLog,
        listing: &ResolvedListing,
    ) -> Result<IndexedListingRecord> {
        check_listing_id(log, listing)?;

        let record = Self::listing_record(log, listing)?;
        tracing::info!(
            target: "marketplace_indexer::indexer",
            id = %record.id,
            block = record.block_number,
            log_index = record.log_index,
            "Indexing listing in DB"
        );
        self.store
            .upsert_listing(&record)
            .await
            .map_err(|source| MarketplaceError::Persistence {
                entity: format!("listing {}", record.id),
                source,
            })?;

        if let Some(search) = &self.search {
            tracing::info!(
                target: "marketplace_indexer::indexer",
                id = %listing.id,
                "Indexing listing in search"
            );
            let indexed = search
                .index(
                    &listing.id,
                    &log.decoded.party,
                    log.decoded.ipfs_hash.as_deref(),
                    listing,
                )
                .await;
            if let Err(source) = indexed {
                let err = MarketplaceError::SearchIndex {
                    id: listing.id.clone(),
                    source,
                };
                metrics::counter!("marketplace_search_index_failures_total").increment(1);
                tracing::error!(
                    target: "marketplace_indexer::indexer",
                    error = %err,
                    "Search projection failed, relational record kept"
                );
            }
        }

        Ok(record)
    }

    pub async fn index_offer(
        &self,
        log: &DecodedLog,
        listing: &ResolvedListing,
        offer: &ResolvedOffer,
    ) -> Result<IndexedOfferRecord> {
        let record = Self::offer_record(log, listing, offer)?;
        tracing::info!(
            target: "marketplace_indexer::indexer",
            id = %record.id,
            listing = %record.listing_id,
            "Indexing offer in DB"
        );
        self.store
            .upsert_offer(&record)
            .await
            .map_err(|source| MarketplaceError::Persistence {
                entity: format!("offer {}", record.id),
                source,
            })?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_log::DecodedFields;
    use crate::memory::{InMemorySearchIndex, InMemoryStore};
    use crate::model::Identity;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn date() -> DateTime<Utc> {
        DateTime::from_timestamp(1_551_441_600, 0).unwrap()
    }

    fn log(event_name: &str, listing_id: &str) -> DecodedLog {
        DecodedLog {
            event_name: event_name.to_string(),
            decoded: DecodedFields {
                listing_id: listing_id.to_string(),
                offer_id: Some("1".to_string()),
                party: "0xParty".to_string(),
                ipfs_hash: Some("0xipfs".to_string()),
            },
            block_number: 100,
            log_index: 7,
            date: date(),
        }
    }

    fn listing(id: &str) -> ResolvedListing {
        let mut content = serde_json::Map::new();
        content.insert("title".to_string(), json!("Road bike"));
        ResolvedListing {
            id: id.to_string(),
            status: "active".to_string(),
            seller: Identity::new("0xSELLER"),
            events: vec![],
            content,
        }
    }

    fn offer() -> ResolvedOffer {
        ResolvedOffer {
            id: "1-000-42-1".to_string(),
            listing_id: "1-000-42".to_string(),
            status: "accepted".to_string(),
            buyer: Identity::new("0xBUYER"),
            events: vec![],
            content: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_check_listing_id() {
        assert!(check_listing_id(&log("ListingCreated", "42"), &listing("1-000-42")).is_ok());

        let err = check_listing_id(&log("ListingCreated", "42"), &listing("1-000-7")).unwrap_err();
        assert!(matches!(
            err,
            MarketplaceError::ListingIdMismatch { ref expected, ref found } if expected == "42" && found == "7"
        ));

        // Malformed ids never match.
        assert!(check_listing_id(&log("ListingCreated", "42"), &listing("42")).is_err());
    }

    #[test]
    fn test_listing_record_timestamps() {
        let created =
            ConsistencyIndexer::listing_record(&log("ListingCreated", "42"), &listing("1-000-42"))
                .unwrap();
        assert_eq!(created.timestamp.created_at(), Some(date()));
        assert_eq!(created.timestamp.updated_at(), None);
        assert_eq!(created.seller_address, "0xseller");
        assert_eq!(created.data["title"], "Road bike");

        let updated =
            ConsistencyIndexer::listing_record(&log("ListingUpdated", "42"), &listing("1-000-42"))
                .unwrap();
        assert_eq!(updated.timestamp, RecordTimestamp::Updated(date()));

        // Offer events re-index the listing as an update.
        let on_offer =
            ConsistencyIndexer::listing_record(&log("OfferCreated", "42"), &listing("1-000-42"))
                .unwrap();
        assert_eq!(on_offer.timestamp, RecordTimestamp::Updated(date()));
    }

    #[test]
    fn test_offer_record() {
        let record =
            ConsistencyIndexer::offer_record(&log("OfferCreated", "42"), &listing("1-000-42"), &offer())
                .unwrap();
        assert_eq!(record.id, "1-000-42-1");
        assert_eq!(record.listing_id, "1-000-42");
        assert_eq!(record.seller_address, "0xseller");
        assert_eq!(record.buyer_address, "0xbuyer");
        assert_eq!(record.timestamp, RecordTimestamp::Created(date()));

        let record = ConsistencyIndexer::offer_record(
            &log("OfferFinalized", "42"),
            &listing("1-000-42"),
            &offer(),
        )
        .unwrap();
        assert_eq!(record.timestamp, RecordTimestamp::Updated(date()));
    }

    #[tokio::test]
    async fn test_index_listing_writes_store_and_search() {
        let store = Arc::new(InMemoryStore::new());
        let search = Arc::new(InMemorySearchIndex::new());
        let indexer = ConsistencyIndexer::new(store.clone()).with_search_index(search.clone());

        indexer
            .index_listing(&log("ListingCreated", "42"), &listing("1-000-42"))
            .await
            .unwrap();

        assert_eq!(store.listings().len(), 1);
        let documents = search.documents();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "1-000-42");
        assert_eq!(documents[0].owner_address, "0xParty");
        assert_eq!(documents[0].content_ref.as_deref(), Some("0xipfs"));
    }

    #[tokio::test]
    async fn test_search_failure_keeps_relational_write() {
        let store = Arc::new(InMemoryStore::new());
        let search = Arc::new(InMemorySearchIndex::new());
        search.set_failing(true);
        let indexer = ConsistencyIndexer::new(store.clone()).with_search_index(search.clone());

        let record = indexer
            .index_listing(&log("ListingUpdated", "42"), &listing("1-000-42"))
            .await
            .unwrap();

        assert_eq!(store.listing("1-000-42"), Some(record));
        assert!(search.documents().is_empty());
    }

    #[tokio::test]
    async fn test_mismatch_writes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let search = Arc::new(InMemorySearchIndex::new());
        let indexer = ConsistencyIndexer::new(store.clone()).with_search_index(search.clone());

        let err = indexer
            .index_listing(&log("ListingCreated", "42"), &listing("1-000-7"))
            .await
            .unwrap_err();

        assert!(matches!(err, MarketplaceError::ListingIdMismatch { .. }));
        assert_eq!(store.write_count(), 0);
        assert!(search.documents().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence_error() {
        let store = Arc::new(InMemoryStore::new());
        store.set_failing(true);
        let search = Arc::new(InMemorySearchIndex::new());
        let indexer = ConsistencyIndexer::new(store).with_search_index(search.clone());

        let err = indexer
            .index_listing(&log("ListingCreated", "42"), &listing("1-000-42"))
            .await
            .unwrap_err();

        assert!(matches!(err, MarketplaceError::Persistence { .. }));
        // Search is only written after the relational store accepted the record.
        assert!(search.documents().is_empty());
    }
}
