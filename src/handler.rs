//! Marketplace event handler.
//!
//! Entry point of the pipeline. For each decoded log the handler:
//! 1. Returns `None` right away when the marketplace is disabled.
//! 2. Resolves the listing (and the offer, for offer events) as of the log's block.
//! 3. Re-indexes the listing. Offer events change the listing's history too, so this
//!    happens for every event.
//! 4. Indexes the offer for offer events.
//! 5. Records growth ledger entries when growth accounting is enabled.
//!
//! The resolved details are returned so the caller can decide which notifications
//! to send; see [`NotificationGate`].

use std::sync::Arc;

use crate::chain_log::{BlockPosition, DecodedLog};
use crate::config::HandlerConfig;
use crate::error::{MarketplaceError, Result};
use crate::growth::GrowthRecorder;
use crate::indexer::ConsistencyIndexer;
use crate::locks::EntityLocks;
use crate::model::MarketplaceDetails;
use crate::ports::{DetailSource, GrowthLedger, RelationalStore, SearchIndex};
use crate::resolver::DetailResolver;

/// Notification channels that apply to the events a handler processes.
pub trait NotificationGate {
    fn webhook_enabled(&self) -> bool;

    fn discord_webhook_enabled(&self) -> bool;

    fn email_webhook_enabled(&self) -> bool;

    fn gcloud_pubsub_enabled(&self) -> bool;
}

pub struct MarketplaceEventHandler {
    config: HandlerConfig,
    resolver: DetailResolver,
    indexer: ConsistencyIndexer,
    growth: Option<GrowthRecorder>,
    locks: EntityLocks,
}

impl MarketplaceEventHandler {
    pub fn new(
        config: HandlerConfig,
        details: Arc<dyn DetailSource>,
        store: Arc<dyn RelationalStore>,
    ) -> Self {
        Self {
            config,
            resolver: DetailResolver::new(details),
            indexer: ConsistencyIndexer::new(store),
            growth: None,
            locks: EntityLocks::new(),
        }
    }

    /// Attach the search index. Ignored unless `elasticsearch` is enabled.
    pub fn with_search_index(mut self, search: Arc<dyn SearchIndex>) -> Self {
        if self.config.elasticsearch {
            self.indexer = self.indexer.with_search_index(search);
        } else {
            tracing::debug!(
                target: "marketplace_indexer::handler",
                "Search indexing disabled, search index not attached"
            );
        }
        self
    }

    /// Attach the growth ledger. Ignored unless `growth` is enabled.
    pub fn with_growth_ledger(mut self, ledger: Arc<dyn GrowthLedger>) -> Self {
        if self.config.growth {
            self.growth = Some(GrowthRecorder::new(ledger));
        } else {
            tracing::debug!(
                target: "marketplace_indexer::handler",
                "Growth accounting disabled, growth ledger not attached"
            );
        }
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Process one decoded log.
    ///
    /// Returns `Ok(None)` when the marketplace is disabled. Any error means the log was
    /// not durably indexed and the caller owns redelivery. Enabling `elasticsearch` or
    /// `growth` without attaching the matching collaborator fails every log with
    /// [`MarketplaceError::MissingCollaborator`] before anything is resolved.
    pub async fn process(&self, log: &DecodedLog) -> Result<Option<MarketplaceDetails>> {
        if !self.config.marketplace {
            return Ok(None);
        }

        let event = log.event();
        let position = log.position();

        // Offers are children of their listing, so one key covers both.
        let _guard = self.locks.lock(&log.decoded.listing_id).await;

        match self.run(log, position).await {
            Ok(details) => {
                metrics::counter!(
                    "marketplace_events_processed_total",
                    "event" => event.as_str().to_string()
                )
                .increment(1);
                Ok(Some(details))
            }
            Err(err) => {
                metrics::counter!(
                    "marketplace_events_failed_total",
                    "event" => event.as_str().to_string(),
                    "kind" => err.kind()
                )
                .increment(1);
                tracing::warn!(
                    target: "marketplace_indexer::handler",
                    event = %event,
                    listing = %log.decoded.listing_id,
                    position = %position,
                    kind = err.kind(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "Failed to process marketplace log"
                );
                Err(err)
            }
        }
    }

    /// Fails when an enabled feature has no collaborator to write to.
    fn check_collaborators(&self) -> Result<()> {
        if self.config.elasticsearch && !self.indexer.search_enabled() {
            return Err(MarketplaceError::MissingCollaborator {
                feature: "elasticsearch",
                collaborator: "search index",
            });
        }
        if self.config.growth && self.growth.is_none() {
            return Err(MarketplaceError::MissingCollaborator {
                feature: "growth",
                collaborator: "growth ledger",
            });
        }
        Ok(())
    }

    async fn run(&self, log: &DecodedLog, position: BlockPosition) -> Result<MarketplaceDetails> {
        self.check_collaborators()?;

        let details = self.resolver.resolve_details(log, position).await?;

        self.indexer.index_listing(log, details.listing()).await?;

        if let MarketplaceDetails::Offer { listing, offer } = &details {
            self.indexer.index_offer(log, listing, offer).await?;
        }

        if let Some(recorder) = &self.growth {
            recorder.record(log, &details, position).await?;
        }

        tracing::info!(
            target: "marketplace_indexer::handler",
            event = %log.event_name,
            listing = %details.listing().id,
            position = %position,
            "Processed marketplace log"
        );
        Ok(details)
    }
}

impl NotificationGate for MarketplaceEventHandler {
    fn webhook_enabled(&self) -> bool {
        self.config.marketplace
    }

    fn discord_webhook_enabled(&self) -> bool {
        self.config.marketplace
    }

    fn email_webhook_enabled(&self) -> bool {
        false
    }

    fn gcloud_pubsub_enabled(&self) -> bool {
        self.config.marketplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryDetailSource, InMemoryStore};

    fn handler(config: HandlerConfig) -> MarketplaceEventHandler {
        MarketplaceEventHandler::new(
            config,
            Arc::new(InMemoryDetailSource::new()),
            Arc::new(InMemoryStore::new()),
        )
    }

    #[test]
    fn test_capabilities_follow_marketplace_flag() {
        for marketplace in [true, false] {
            let handler = handler(HandlerConfig {
                marketplace,
                elasticsearch: true,
                growth: true,
            });
            assert_eq!(handler.webhook_enabled(), marketplace);
            assert_eq!(handler.discord_webhook_enabled(), marketplace);
            assert_eq!(handler.gcloud_pubsub_enabled(), marketplace);
            assert!(!handler.email_webhook_enabled());
        }
    }

    #[test]
    fn test_enabled_features_need_collaborators() {
        let err = handler(HandlerConfig {
            marketplace: true,
            elasticsearch: false,
            growth: true,
        })
        .check_collaborators()
        .unwrap_err();
        assert!(matches!(
            err,
            MarketplaceError::MissingCollaborator { feature: "growth", .. }
        ));

        let err = handler(HandlerConfig {
            marketplace: true,
            elasticsearch: true,
            growth: false,
        })
        .check_collaborators()
        .unwrap_err();
        assert!(matches!(
            err,
            MarketplaceError::MissingCollaborator { feature: "elasticsearch", .. }
        ));

        assert!(handler(HandlerConfig::default()).check_collaborators().is_ok());
    }
}
