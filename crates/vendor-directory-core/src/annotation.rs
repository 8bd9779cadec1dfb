use serde::Serialize;

use crate::VendorRecord;

#[derive(Debug, Clone, Copy, Serialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NoteSource {
    Referral,
    Default,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ResolvedNote<'a> {
    pub text: &'a str,
    pub source: NoteSource,
}

/// Referral-specific note when `from_slug` is an exact key of `record.notes`, else the
/// default note.
#[must_use]
pub fn resolve_note<'a>(record: &'a VendorRecord, from_slug: &str) -> ResolvedNote<'a> {
    if !from_slug.is_empty() {
        if let Some(text) = record.notes.get(from_slug) {
            return ResolvedNote { text, source: NoteSource::Referral };
        }
    }
    ResolvedNote { text: &record.note, source: NoteSource::Default }
}
