//! SQLite persistence for the marketplace indexer.
//!
//! [`SqliteStore`] is both the relational system of record (listings and offers)
//! and the growth ledger.

mod store;

pub use store::{ListingRow, OfferRow, SqliteStore};
