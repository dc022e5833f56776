//! Error types for the marketplace pipeline.
//!
//! Collaborators (detail source, stores, ledger) report failures as
//! [`anyhow::Error`]; the pipeline wraps them into the [`MarketplaceError`] variant
//! matching the stage that failed so callers can decide on redelivery.

use thiserror::Error;

use crate::chain_log::BlockPosition;
use crate::model::GrowthEventType;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// Event name outside the listing and offer sets.
    #[error("Unexpected event {0}")]
    UnexpectedEvent(String),

    /// The detail source returned history past the log being processed.
    #[error("Stale data for {entity}: history has an event at {found}, log is at {position}")]
    StaleData {
        entity: String,
        found: BlockPosition,
        position: BlockPosition,
    },

    /// Listing id in the off-chain content does not match the on-chain listing id.
    #[error("ListingId mismatch: {found} !== {expected}")]
    ListingIdMismatch { expected: String, found: String },

    #[error("Failed to resolve {entity}: {source}")]
    Resolution {
        entity: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to persist {entity}: {source}")]
    Persistence {
        entity: String,
        #[source]
        source: anyhow::Error,
    },

    /// Search projection failure. Logged by the indexer, never returned from `process`.
    #[error("Failed to index {id} in search: {source}")]
    SearchIndex {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{} growth event insertion(s) failed: {}", .0.len(), describe_failures(.0))]
    GrowthRecord(Vec<GrowthRecordFailure>),

    /// A feature is enabled in the handler config but its collaborator was never attached.
    #[error("{feature} is enabled but no {collaborator} is attached")]
    MissingCollaborator {
        feature: &'static str,
        collaborator: &'static str,
    },
}

impl MarketplaceError {
    /// Whether redelivering the same log later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            MarketplaceError::StaleData { .. }
            | MarketplaceError::Resolution { .. }
            | MarketplaceError::Persistence { .. }
            | MarketplaceError::SearchIndex { .. } => true,
            MarketplaceError::UnexpectedEvent(_)
            | MarketplaceError::ListingIdMismatch { .. }
            | MarketplaceError::MissingCollaborator { .. } => false,
            // Growth entries are not idempotent: a retry re-inserts the ones that succeeded.
            MarketplaceError::GrowthRecord(_) => false,
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MarketplaceError::UnexpectedEvent(_) => "unexpected_event",
            MarketplaceError::StaleData { .. } => "stale_data",
            MarketplaceError::ListingIdMismatch { .. } => "listing_id_mismatch",
            MarketplaceError::Resolution { .. } => "resolution",
            MarketplaceError::Persistence { .. } => "persistence",
            MarketplaceError::SearchIndex { .. } => "search_index",
            MarketplaceError::GrowthRecord(_) => "growth_record",
            MarketplaceError::MissingCollaborator { .. } => "missing_collaborator",
        }
    }
}

/// A single failed growth ledger insertion.
#[derive(Debug, Error)]
#[error("{event_type} for {actor_address}: {source}")]
pub struct GrowthRecordFailure {
    pub actor_address: String,
    pub event_type: GrowthEventType,
    #[source]
    pub source: anyhow::Error,
}

fn describe_failures(failures: &[GrowthRecordFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;
