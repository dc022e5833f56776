//! Detail resolution and freshness checks.
//!
//! Listings and offers are always resolved as of the log's block number. When the
//! listener re-indexes from an older block this rebuilds each historical version
//! instead of writing the latest state under every version.

use std::sync::Arc;

use crate::chain_log::{BlockPosition, DecodedLog};
use crate::classify::MarketplaceEvent;
use crate::error::{MarketplaceError, Result};
use crate::model::{HistoryEvent, MarketplaceDetails, ResolvedListing, ResolvedOffer};
use crate::ports::DetailSource;

/// Fails with [`MarketplaceError::StaleData`] when `events` holds an event positioned
/// after `position`.
pub fn check_events_freshness(
    entity: &str,
    events: &[HistoryEvent],
    position: BlockPosition,
) -> Result<()> {
    let latest = events.iter().map(HistoryEvent::position).max();
    match latest {
        Some(found) if found > position => Err(MarketplaceError::StaleData {
            entity: entity.to_string(),
            found,
            position,
        }),
        _ => Ok(()),
    }
}

pub struct DetailResolver {
    source: Arc<dyn DetailSource>,
}

impl DetailResolver {
    pub fn new(source: Arc<dyn DetailSource>) -> Self {
        Self { source }
    }

    pub async fn resolve_listing(
        &self,
        log: &DecodedLog,
        position: BlockPosition,
    ) -> Result<ResolvedListing> {
        let listing_id = &log.decoded.listing_id;
        let listing = self
            .source
            .get_listing(listing_id, position.block_number)
            .await
            .map_err(|source| MarketplaceError::Resolution {
                entity: format!("listing {listing_id}"),
                source,
            })?;

        check_events_freshness(&format!("listing {}", listing.id), &listing.events, position)?;

        tracing::debug!(
            target: "marketplace_indexer::resolver",
            id = %listing.id,
            events = listing.events.len(),
            block = position.block_number,
            "resolved listing"
        );
        Ok(listing)
    }

    /// Resolves the parent listing first, then the offer. Both histories are checked.
    pub async fn resolve_offer(
        &self,
        log: &DecodedLog,
        position: BlockPosition,
    ) -> Result<(ResolvedListing, ResolvedOffer)> {
        let listing = self.resolve_listing(log, position).await?;

        let listing_id = &log.decoded.listing_id;
        let offer_id =
            log.decoded
                .offer_id
                .as_deref()
                .ok_or_else(|| MarketplaceError::Resolution {
                    entity: format!("offer on listing {listing_id}"),
                    source: anyhow::anyhow!("{} log carries no offerID", log.event_name),
                })?;

        let offer = self
            .source
            .get_offer(listing_id, offer_id, position.block_number)
            .await
            .map_err(|source| MarketplaceError::Resolution {
                entity: format!("offer {listing_id}-{offer_id}"),
                source,
            })?;

        check_events_freshness(&format!("offer {}", offer.id), &offer.events, position)?;

        tracing::debug!(
            target: "marketplace_indexer::resolver",
            id = %offer.id,
            listing = %listing.id,
            events = offer.events.len(),
            block = position.block_number,
            "resolved offer"
        );
        Ok((listing, offer))
    }

    pub async fn resolve_details(
        &self,
        log: &DecodedLog,
        position: BlockPosition,
    ) -> Result<MarketplaceDetails> {
        match log.event() {
            MarketplaceEvent::Listing(_) => {
                let listing = self.resolve_listing(log, position).await?;
                Ok(MarketplaceDetails::Listing { listing })
            }
            MarketplaceEvent::Offer(_) => {
                let (listing, offer) = self.resolve_offer(log, position).await?;
                Ok(MarketplaceDetails::Offer { listing, offer })
            }
            MarketplaceEvent::Unknown(name) => Err(MarketplaceError::UnexpectedEvent(name)),
        }
    }
}
