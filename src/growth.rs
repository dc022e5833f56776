//! Growth ledger recording.
//!
//! Only two transitions are tracked: listing creation and completed sales.

use std::sync::Arc;

use crate::chain_log::{BlockPosition, DecodedLog};
use crate::classify::{ListingEvent, MarketplaceEvent, OfferEvent};
use crate::error::{GrowthRecordFailure, MarketplaceError, Result};
use crate::model::{GrowthContext, GrowthEventEntry, GrowthEventType, MarketplaceDetails};
use crate::ports::GrowthLedger;

pub struct GrowthRecorder {
    ledger: Arc<dyn GrowthLedger>,
}

impl GrowthRecorder {
    pub fn new(ledger: Arc<dyn GrowthLedger>) -> Self {
        Self { ledger }
    }

    /// Ledger entries produced by `log`. Empty for every event other than
    /// ListingCreated and OfferFinalized.
    pub fn entries_for(
        log: &DecodedLog,
        details: &MarketplaceDetails,
        position: BlockPosition,
    ) -> Vec<GrowthEventEntry> {
        let entry = |actor: String, event_type: GrowthEventType, subject_id: &str| GrowthEventEntry {
            actor_address: actor,
            event_type,
            subject_id: subject_id.to_string(),
            context: GrowthContext {
                block_info: position,
            },
            timestamp: log.date,
        };

        let listing = details.listing();
        match (log.event(), details.offer()) {
            (MarketplaceEvent::Listing(ListingEvent::Created), _) => vec![entry(
                listing.seller.address(),
                GrowthEventType::ListingCreated,
                &listing.id,
            )],
            (MarketplaceEvent::Offer(OfferEvent::Finalized), Some(offer)) => vec![
                entry(
                    offer.buyer.address(),
                    GrowthEventType::ListingPurchased,
                    &offer.id,
                ),
                entry(
                    listing.seller.address(),
                    GrowthEventType::ListingSold,
                    &offer.id,
                ),
            ],
            _ => Vec::new(),
        }
    }

    /// Inserts the entries for `log`. Every insertion is attempted; failures are
    /// returned together as [`MarketplaceError::GrowthRecord`].
    pub async fn record(
        &self,
        log: &DecodedLog,
        details: &MarketplaceDetails,
        position: BlockPosition,
    ) -> Result<usize> {
        let entries = Self::entries_for(log, details, position);
        let mut failures = Vec::new();

        for entry in &entries {
            match self.ledger.insert(entry).await {
                Ok(()) => tracing::debug!(
                    target: "marketplace_indexer::growth",
                    actor = %entry.actor_address,
                    event_type = %entry.event_type,
                    subject = %entry.subject_id,
                    "recorded growth event"
                ),
                Err(source) => {
                    tracing::error!(
                        target: "marketplace_indexer::growth",
                        actor = %entry.actor_address,
                        event_type = %entry.event_type,
                        error = %source,
                        "failed to record growth event"
                    );
                    failures.push(GrowthRecordFailure {
                        actor_address: entry.actor_address.clone(),
                        event_type: entry.event_type,
                        source,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(entries.len())
        } else {
            Err(MarketplaceError::GrowthRecord(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_log::DecodedFields;
    use crate::memory::InMemoryGrowthLedger;
    use crate::model::{Identity, ResolvedListing, ResolvedOffer};
    use chrono::Utc;

    fn log(event_name: &str) -> DecodedLog {
        DecodedLog {
            event_name: event_name.to_string(),
            decoded: DecodedFields {
                listing_id: "3".to_string(),
                offer_id: Some("0".to_string()),
                party: "0xB".to_string(),
                ipfs_hash: None,
            },
            block_number: 50,
            log_index: 2,
            date: Utc::now(),
        }
    }

    fn offer_details() -> MarketplaceDetails {
        MarketplaceDetails::Offer {
            listing: ResolvedListing {
                id: "1-000-3".to_string(),
                status: "sold".to_string(),
                seller: Identity::new("0xA"),
                events: vec![],
                content: serde_json::Map::new(),
            },
            offer: ResolvedOffer {
                id: "1-000-3-0".to_string(),
                listing_id: "1-000-3".to_string(),
                status: "finalized".to_string(),
                buyer: Identity::new("0xB"),
                events: vec![],
                content: serde_json::Map::new(),
            },
        }
    }

    fn listing_details() -> MarketplaceDetails {
        MarketplaceDetails::Listing {
            listing: offer_details().listing().clone(),
        }
    }

    #[test]
    fn test_listing_created_entry() {
        let log = log("ListingCreated");
        let entries = GrowthRecorder::entries_for(&log, &listing_details(), log.position());

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor_address, "0xa");
        assert_eq!(entries[0].event_type, GrowthEventType::ListingCreated);
        assert_eq!(entries[0].subject_id, "1-000-3");
        assert_eq!(entries[0].context.block_info, BlockPosition::new(50, 2));
        assert_eq!(entries[0].timestamp, log.date);
    }

    #[test]
    fn test_offer_finalized_entries() {
        let log = log("OfferFinalized");
        let entries = GrowthRecorder::entries_for(&log, &offer_details(), log.position());

        let summary: Vec<_> = entries
            .iter()
            .map(|e| (e.actor_address.as_str(), e.event_type, e.subject_id.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("0xb", GrowthEventType::ListingPurchased, "1-000-3-0"),
                ("0xa", GrowthEventType::ListingSold, "1-000-3-0"),
            ]
        );
    }

    #[test]
    fn test_other_events_produce_nothing() {
        for name in [
            "ListingUpdated",
            "ListingWithdrawn",
            "ListingData",
            "ListingArbitrated",
        ] {
            let log = log(name);
            assert!(GrowthRecorder::entries_for(&log, &listing_details(), log.position()).is_empty());
        }
        for name in [
            "OfferCreated",
            "OfferWithdrawn",
            "OfferAccepted",
            "OfferDisputed",
            "OfferRuling",
            "OfferData",
        ] {
            let log = log(name);
            assert!(GrowthRecorder::entries_for(&log, &offer_details(), log.position()).is_empty());
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_suppress_the_other() {
        let ledger = Arc::new(InMemoryGrowthLedger::new());
        ledger.fail_on(GrowthEventType::ListingPurchased);
        let recorder = GrowthRecorder::new(ledger.clone());

        let log = log("OfferFinalized");
        let err = recorder
            .record(&log, &offer_details(), log.position())
            .await
            .unwrap_err();

        match err {
            MarketplaceError::GrowthRecord(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].event_type, GrowthEventType::ListingPurchased);
            }
            other => panic!("unexpected error: {other}"),
        }
        let entries = ledger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_type, GrowthEventType::ListingSold);
    }

    #[tokio::test]
    async fn test_both_failures_are_collected() {
        let ledger = Arc::new(InMemoryGrowthLedger::new());
        ledger.fail_on(GrowthEventType::ListingPurchased);
        ledger.fail_on(GrowthEventType::ListingSold);
        let recorder = GrowthRecorder::new(ledger.clone());

        let log = log("OfferFinalized");
        let err = recorder
            .record(&log, &offer_details(), log.position())
            .await
            .unwrap_err();

        assert!(matches!(err, MarketplaceError::GrowthRecord(ref failures) if failures.len() == 2));
        assert!(ledger.entries().is_empty());
    }
}
