use serde::Serialize;
use time::OffsetDateTime;

use crate::staleness::evaluate;
use crate::{
    build_card, resolve_note, CardView, Catalog, Filter, QueryContext, QueryOptions,
    RequestParams, VendorRecord,
};

/// Records that survived filtering, sorting and truncation, in render order.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub records: Vec<&'a VendorRecord>,
    /// Match count before truncation.
    pub matched: usize,
}

/// Result of a render call. `NoMatches` is only produced when the filters match nothing;
/// a `max_cards` of zero over a non-empty match yields `Cards` with no cards.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CardListing {
    Cards { matched: usize, cards: Vec<CardView> },
    NoMatches { city: Filter, category: Filter },
}

impl CardListing {
    #[must_use]
    pub fn cards(&self) -> &[CardView] {
        match self {
            Self::Cards { cards, .. } => cards,
            Self::NoMatches { .. } => &[],
        }
    }

    #[must_use]
    pub fn is_no_matches(&self) -> bool {
        matches!(self, Self::NoMatches { .. })
    }
}

/// Locality clause and category clause; the category clause also accepts a tag match.
#[must_use]
pub fn matches(record: &VendorRecord, context: &QueryContext) -> bool {
    let locality_ok = match &context.city {
        Filter::All => true,
        Filter::Only(city) => record.city.as_str() == city,
    };
    let category_ok = match &context.category {
        Filter::All => true,
        Filter::Only(category) => record.in_category(category),
    };
    locality_ok && category_ok
}

/// Filter in canonical order, stable-sort by score descending, then truncate.
#[must_use]
pub fn select<'a>(catalog: &'a Catalog, context: &QueryContext) -> Selection<'a> {
    let mut records =
        catalog.records().filter(|record| matches(record, context)).collect::<Vec<_>>();
    let matched = records.len();

    // `sort_by` is stable; equal scores keep catalog order.
    records.sort_by(|lhs, rhs| rhs.score.cmp(&lhs.score));

    if let Some(max_cards) = context.max_cards {
        records.truncate(max_cards);
    }

    Selection { records, matched }
}

/// Render a resolved context against the catalog. `now` is sampled by the caller once.
#[must_use]
pub fn render_cards(catalog: &Catalog, context: &QueryContext, now: OffsetDateTime) -> CardListing {
    let selection = select(catalog, context);
    if selection.matched == 0 {
        tracing::debug!(city = %context.city, category = %context.category, "no vendors matched");
        return CardListing::NoMatches {
            city: context.city.clone(),
            category: context.category.clone(),
        };
    }

    let cards = selection
        .records
        .into_iter()
        .map(|record| {
            build_card(
                record,
                resolve_note(record, &context.from_slug),
                evaluate(record.verified, now),
                &context.from_slug,
            )
        })
        .collect::<Vec<_>>();
    tracing::debug!(matched = selection.matched, rendered = cards.len(), "rendered vendor cards");

    CardListing::Cards { matched: selection.matched, cards }
}

/// Resolve the context from options and request parameters, then render.
#[must_use]
pub fn render(
    catalog: &Catalog,
    options: &QueryOptions,
    params: &RequestParams,
    now: OffsetDateTime,
) -> CardListing {
    render_cards(catalog, &QueryContext::resolve(options, params), now)
}
