use serde::Serialize;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::{Catalog, Locality, VendorId};

/// Verification older than this many whole days is flagged for editorial review.
pub const FRESHNESS_WINDOW_DAYS: i64 = 180;

#[derive(Debug, Clone, Copy, Serialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Staleness {
    Current,
    Stale,
}

impl Staleness {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Stale => "stale",
        }
    }

    #[must_use]
    pub fn is_stale(self) -> bool {
        self == Self::Stale
    }
}

/// Raw verification date plus its classification. Renderers pick the visual treatment.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct VerifiedLabel {
    pub date: String,
    pub status: Staleness,
    pub age_days: i64,
}

#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct ReviewItem {
    pub id: VendorId,
    pub name: String,
    pub city: Locality,
    pub verified: String,
    pub age_days: i64,
}

/// Parse a verification date. Only the zero-padded `YYYY-MM-DD` form is accepted.
///
/// # Errors
/// Returns the underlying parse error for any other shape or an impossible calendar date.
pub fn parse_verified_date(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
}

#[must_use]
pub fn format_verified_date(value: Date) -> String {
    // `[year]-[month]-[day]` cannot fail for dates inside the default year range.
    value
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| value.to_string())
}

/// Whole days between `verified` and the UTC calendar day of `now`. Future dates are negative.
#[must_use]
pub fn age_in_days(verified: Date, now: OffsetDateTime) -> i64 {
    let today = now.to_offset(UtcOffset::UTC).date();
    (today - verified).whole_days()
}

/// Exactly [`FRESHNESS_WINDOW_DAYS`] old is still current.
#[must_use]
pub fn classify(verified: Date, now: OffsetDateTime) -> Staleness {
    if age_in_days(verified, now) > FRESHNESS_WINDOW_DAYS {
        Staleness::Stale
    } else {
        Staleness::Current
    }
}

#[must_use]
pub fn evaluate(verified: Date, now: OffsetDateTime) -> VerifiedLabel {
    let age_days = age_in_days(verified, now);
    VerifiedLabel {
        date: format_verified_date(verified),
        status: if age_days > FRESHNESS_WINDOW_DAYS { Staleness::Stale } else { Staleness::Current },
        age_days,
    }
}

/// Stale records, oldest verification first; ties keep canonical catalog order.
#[must_use]
pub fn review_queue(catalog: &Catalog, now: OffsetDateTime) -> Vec<ReviewItem> {
    let mut items = catalog
        .records()
        .filter(|record| classify(record.verified, now).is_stale())
        .map(|record| ReviewItem {
            id: record.id.clone(),
            name: record.name.clone(),
            city: record.city.clone(),
            verified: format_verified_date(record.verified),
            age_days: age_in_days(record.verified, now),
        })
        .collect::<Vec<_>>();
    items.sort_by(|lhs, rhs| rhs.age_days.cmp(&lhs.age_days));
    tracing::debug!(stale = items.len(), "built review queue");
    items
}
