//! Query-and-render pipeline for the local vendor directory.
//!
//! A [`Catalog`] is loaded and validated once, then shared read-only. Each render call
//! resolves a [`QueryContext`] from explicit [`QueryOptions`] and ambient
//! [`RequestParams`], filters and sorts the catalog, and turns every surviving record
//! into a [`CardView`] carrying the referral-specific note and a staleness label.

mod annotation;
mod card;
mod catalog;
mod context;
mod model;
mod pipeline;
mod staleness;

pub use annotation::{resolve_note, NoteSource, ResolvedNote};
pub use card::{build_card, profile_href, vendor_profile, CardView, VendorProfile};
pub use catalog::{Catalog, LocalityPartition};
pub use context::{Filter, QueryContext, QueryOptions, RequestParams, ALL_FILTER};
pub use model::{Badge, BadgeKind, Locality, VendorId, VendorRecord, VendorType};
pub use pipeline::{matches, render, render_cards, select, CardListing, Selection};
pub use staleness::{
    age_in_days, classify, evaluate, format_verified_date, parse_verified_date, review_queue,
    ReviewItem, Staleness, VerifiedLabel, FRESHNESS_WINDOW_DAYS,
};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum DirectoryError {
    #[error("vendor `{id}`: field `{field}` MUST be non-empty")]
    EmptyField { id: String, field: String },
    #[error("vendor `{id}`: default note MUST be provided")]
    MissingNote { id: String },
    #[error("vendor id `{id}` is declared more than once")]
    DuplicateId { id: String },
    #[error("vendor `{id}`: verified date `{value}` is not a valid YYYY-MM-DD date: {reason}")]
    InvalidVerifiedDate { id: String, value: String, reason: String },
    #[error("vendor `{id}`: score {score} is outside 1..=5")]
    ScoreOutOfRange { id: String, score: i64 },
    #[error("vendor `{id}`: city `{city}` does not match locality `{locality}`")]
    LocalityMismatch { id: String, city: String, locality: String },
    #[error("locality `{locality}` is declared more than once")]
    DuplicateLocality { locality: String },
    #[error("locality `{locality}` MUST contain at least one vendor")]
    EmptyLocality { locality: String },
    #[error("unknown vendor id `{0}`")]
    UnknownVendor(String),
    #[error("catalog parse error: {0}")]
    Parse(String),
    #[error("failed to read catalog {path}: {message}")]
    Io { path: String, message: String },
}
