//! Decoded marketplace logs as delivered by the chain listener.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::MarketplaceEvent;

/// Position of a log in the chain.
///
/// Ordered by block number, then log index, which is a total order within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPosition {
    pub block_number: u64,
    pub log_index: u64,
}

impl BlockPosition {
    pub const fn new(block_number: u64, log_index: u64) -> Self {
        Self {
            block_number,
            log_index,
        }
    }
}

impl fmt::Display for BlockPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_number, self.log_index)
    }
}

/// Event arguments decoded from the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedFields {
    #[serde(rename = "listingID")]
    pub listing_id: String,
    #[serde(rename = "offerID", default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,
    /// Address of the account that triggered the event.
    pub party: String,
    /// Off-chain content reference attached to the event, if any.
    #[serde(rename = "ipfsHash", default, skip_serializing_if = "Option::is_none")]
    pub ipfs_hash: Option<String>,
}

/// One decoded on-chain marketplace log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedLog {
    pub event_name: String,
    pub decoded: DecodedFields,
    pub block_number: u64,
    pub log_index: u64,
    /// Timestamp of the block containing the log.
    pub date: DateTime<Utc>,
}

impl DecodedLog {
    pub fn position(&self) -> BlockPosition {
        BlockPosition::new(self.block_number, self.log_index)
    }

    pub fn event(&self) -> MarketplaceEvent {
        MarketplaceEvent::classify(&self.event_name)
    }
}
