//! Classification of marketplace contract events.
//!
//! The marketplace contract emits two families of events: listing lifecycle events
//! and offer lifecycle events. [`MarketplaceEvent::classify`] maps a decoded event
//! name onto a closed enumeration so the handler can match exhaustively on it.
//!
//! Names that belong to neither family are kept as [`MarketplaceEvent::Unknown`]
//! rather than dropped, and the handler surfaces them as errors.

use std::fmt;

/// Listing lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingEvent {
    Created,
    Updated,
    Withdrawn,
    Data,
    Arbitrated,
}

impl ListingEvent {
    pub const ALL: [ListingEvent; 5] = [
        ListingEvent::Created,
        ListingEvent::Updated,
        ListingEvent::Withdrawn,
        ListingEvent::Data,
        ListingEvent::Arbitrated,
    ];

    /// Event name as emitted by the contract.
    pub const fn as_str(self) -> &'static str {
        match self {
            ListingEvent::Created => "ListingCreated",
            ListingEvent::Updated => "ListingUpdated",
            ListingEvent::Withdrawn => "ListingWithdrawn",
            ListingEvent::Data => "ListingData",
            ListingEvent::Arbitrated => "ListingArbitrated",
        }
    }
}

/// Offer lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfferEvent {
    Created,
    Withdrawn,
    Accepted,
    Disputed,
    Ruling,
    Finalized,
    Data,
}

impl OfferEvent {
    pub const ALL: [OfferEvent; 7] = [
        OfferEvent::Created,
        OfferEvent::Withdrawn,
        OfferEvent::Accepted,
        OfferEvent::Disputed,
        OfferEvent::Ruling,
        OfferEvent::Finalized,
        OfferEvent::Data,
    ];

    /// Event name as emitted by the contract.
    pub const fn as_str(self) -> &'static str {
        match self {
            OfferEvent::Created => "OfferCreated",
            OfferEvent::Withdrawn => "OfferWithdrawn",
            OfferEvent::Accepted => "OfferAccepted",
            OfferEvent::Disputed => "OfferDisputed",
            OfferEvent::Ruling => "OfferRuling",
            OfferEvent::Finalized => "OfferFinalized",
            OfferEvent::Data => "OfferData",
        }
    }
}

/// A classified marketplace event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarketplaceEvent {
    Listing(ListingEvent),
    Offer(OfferEvent),
    /// Event name outside both known sets. Carries the original name.
    Unknown(String),
}

impl MarketplaceEvent {
    /// Classify a decoded event name. Total: every input maps to a variant.
    pub fn classify(event_name: &str) -> Self {
        if let Some(event) = ListingEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == event_name)
        {
            return MarketplaceEvent::Listing(event);
        }
        if let Some(event) = OfferEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == event_name)
        {
            return MarketplaceEvent::Offer(event);
        }
        MarketplaceEvent::Unknown(event_name.to_string())
    }

    pub fn is_listing(&self) -> bool {
        matches!(self, MarketplaceEvent::Listing(_))
    }

    pub fn is_offer(&self) -> bool {
        matches!(self, MarketplaceEvent::Offer(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            MarketplaceEvent::Listing(event) => event.as_str(),
            MarketplaceEvent::Offer(event) => event.as_str(),
            MarketplaceEvent::Unknown(name) => name,
        }
    }
}

impl fmt::Display for MarketplaceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
