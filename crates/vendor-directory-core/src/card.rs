use serde::Serialize;
use time::OffsetDateTime;

use crate::staleness::evaluate;
use crate::{
    resolve_note, Badge, Catalog, DirectoryError, Locality, NoteSource, ResolvedNote,
    VendorId, VendorRecord, VendorType, VerifiedLabel,
};

/// Per-record view model handed to the rendering collaborator.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct CardView {
    pub id: VendorId,
    pub name: String,
    pub city: Locality,
    #[serde(rename = "type")]
    pub vendor_type: VendorType,
    pub distance: String,
    pub address: String,
    pub hours: String,
    pub badges: Vec<Badge>,
    pub resolved_note: String,
    pub note_source: NoteSource,
    pub profile_href: String,
    pub verified: VerifiedLabel,
}

/// Full vendor page: the card plus the fields only the profile shows.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct VendorProfile {
    #[serde(flatten)]
    pub card: CardView,
    pub meta: String,
    pub tags: Vec<String>,
    pub referral_slugs: Vec<String>,
}

/// Append `from=<slug>` so the profile page resolves the same note. Empty slugs add nothing.
#[must_use]
pub fn profile_href(profile_url: &str, from_slug: &str) -> String {
    if from_slug.is_empty() {
        return profile_url.to_string();
    }
    let separator = if profile_url.contains('?') { '&' } else { '?' };
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("from", from_slug)
        .finish();
    format!("{profile_url}{separator}{query}")
}

#[must_use]
pub fn build_card(
    record: &VendorRecord,
    note: ResolvedNote<'_>,
    verified: VerifiedLabel,
    from_slug: &str,
) -> CardView {
    CardView {
        id: record.id.clone(),
        name: record.name.clone(),
        city: record.city.clone(),
        vendor_type: record.vendor_type,
        distance: record.distance.clone(),
        address: record.address.clone(),
        hours: record.hours.clone(),
        badges: record.badges.clone(),
        resolved_note: note.text.to_string(),
        note_source: note.source,
        profile_href: profile_href(&record.profile_url, from_slug),
        verified,
    }
}

/// Profile view for one vendor, resolving the note for the forwarded referral slug.
///
/// # Errors
/// Returns [`DirectoryError::UnknownVendor`] when `id` is not in the catalog.
pub fn vendor_profile(
    catalog: &Catalog,
    id: &str,
    from_slug: &str,
    now: OffsetDateTime,
) -> Result<VendorProfile, DirectoryError> {
    let record = catalog.get(id).ok_or_else(|| DirectoryError::UnknownVendor(id.to_string()))?;
    let card = build_card(
        record,
        resolve_note(record, from_slug),
        evaluate(record.verified, now),
        from_slug,
    );
    Ok(VendorProfile {
        card,
        meta: record.meta.clone(),
        tags: record.tags.clone(),
        referral_slugs: record.notes.keys().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::model::fixtures::vendor;
    use crate::Staleness;

    fn builtin() -> Catalog {
        match Catalog::builtin() {
            Ok(catalog) => catalog,
            Err(err) => panic!("bundled catalog should be valid: {err}"),
        }
    }

    #[test]
    fn href_forwards_slug_only_when_present() {
        assert_eq!(profile_href("vendor-birite.html", ""), "vendor-birite.html");
        assert_eq!(profile_href("vendor-birite.html", "halotop"), "vendor-birite.html?from=halotop");
    }

    #[test]
    fn href_appends_to_existing_query() {
        assert_eq!(
            profile_href("vendor.html?id=birite", "annies"),
            "vendor.html?id=birite&from=annies"
        );
    }

    #[test]
    fn href_encodes_slug() {
        assert_eq!(profile_href("vendor.html", "a b&c"), "vendor.html?from=a+b%26c");
    }

    #[test]
    fn card_passes_display_fields_through() {
        let record = vendor("pasta", "sf", VendorType::Maker, 4);
        let label = VerifiedLabel {
            date: "2026-02-01".to_string(),
            status: Staleness::Current,
            age_days: 3,
        };
        let card = build_card(&record, resolve_note(&record, ""), label.clone(), "");

        assert_eq!(card.id, record.id);
        assert_eq!(card.badges, record.badges);
        assert_eq!(card.resolved_note, record.note);
        assert_eq!(card.note_source, NoteSource::Default);
        assert_eq!(card.profile_href, "vendor-pasta.html");
        assert_eq!(card.verified, label);
    }

    #[test]
    fn profile_resolves_forwarded_note() {
        let catalog = builtin();
        let profile =
            match vendor_profile(&catalog, "rainbow", "rxbar", datetime!(2026-03-01 12:00 UTC)) {
                Ok(profile) => profile,
                Err(err) => panic!("rainbow profile should resolve: {err}"),
            };
        assert_eq!(profile.card.note_source, NoteSource::Referral);
        assert!(profile.card.resolved_note.starts_with("Kellogg"));
        assert_eq!(profile.card.profile_href, "vendor-rainbow.html?from=rxbar");
        assert_eq!(profile.card.verified.status, Staleness::Current);
        assert_eq!(
            profile.referral_slugs,
            vec!["annies", "halotop", "rxbar", "vital-proteins"]
        );
    }

    #[test]
    fn profile_of_unknown_vendor_is_an_error() {
        let catalog = builtin();
        assert_eq!(
            vendor_profile(&catalog, "nope", "", datetime!(2026-03-01 12:00 UTC)),
            Err(DirectoryError::UnknownVendor("nope".to_string()))
        );
    }
}
