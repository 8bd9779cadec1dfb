use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize, Serializer};
use time::Date;

use crate::staleness::format_verified_date;
use crate::DirectoryError;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct VendorId(pub String);

impl VendorId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VendorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geographic partition key. The set is open; any non-empty code is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct Locality(pub String);

impl Locality {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Locality {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VendorType {
    Maker,
    Market,
    Shop,
    Csa,
}

impl VendorType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Maker => "maker",
            Self::Market => "market",
            Self::Shop => "shop",
            Self::Csa => "csa",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "maker" => Some(Self::Maker),
            "market" => Some(Self::Market),
            "shop" => Some(Self::Shop),
            "csa" => Some(Self::Csa),
            _ => None,
        }
    }
}

/// Presentational emphasis for a badge. The short codes are the legacy catalog spelling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
pub enum BadgeKind {
    #[serde(rename = "emphasis-a", alias = "a")]
    EmphasisA,
    #[serde(rename = "emphasis-b", alias = "g")]
    EmphasisB,
    #[default]
    #[serde(rename = "default", alias = "")]
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Badge {
    pub text: String,
    #[serde(default, alias = "type")]
    pub kind: BadgeKind,
}

#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VendorRecord {
    pub id: VendorId,
    pub name: String,
    #[serde(rename = "type")]
    pub vendor_type: VendorType,
    pub city: Locality,
    pub distance: String,
    pub address: String,
    pub hours: String,
    pub meta: String,
    pub profile_url: String,
    pub note: String,
    pub notes: BTreeMap<String, String>,
    pub badges: Vec<Badge>,
    pub tags: Vec<String>,
    #[serde(serialize_with = "serialize_verified")]
    pub verified: Date,
    pub score: u8,
}

fn serialize_verified<S>(value: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_verified_date(*value))
}

impl VendorRecord {
    /// Check the per-record invariants a catalog relies on.
    ///
    /// # Errors
    /// Returns [`DirectoryError::EmptyField`] for blank display fields or blank contextual
    /// notes, [`DirectoryError::MissingNote`] for a blank default note, and
    /// [`DirectoryError::ScoreOutOfRange`] when the sort weight is outside `1..=5`.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DirectoryError::EmptyField {
                id: self.name.clone(),
                field: "id".to_string(),
            });
        }

        for (field, value) in [
            ("name", &self.name),
            ("city", &self.city.0),
            ("distance", &self.distance),
            ("address", &self.address),
            ("hours", &self.hours),
            ("meta", &self.meta),
            ("profileUrl", &self.profile_url),
        ] {
            if value.trim().is_empty() {
                return Err(DirectoryError::EmptyField {
                    id: self.id.to_string(),
                    field: field.to_string(),
                });
            }
        }

        if self.note.trim().is_empty() {
            return Err(DirectoryError::MissingNote { id: self.id.to_string() });
        }

        for (slug, text) in &self.notes {
            if slug.is_empty() || text.trim().is_empty() {
                return Err(DirectoryError::EmptyField {
                    id: self.id.to_string(),
                    field: format!("notes.{slug}"),
                });
            }
        }

        if !(1..=5).contains(&self.score) {
            return Err(DirectoryError::ScoreOutOfRange {
                id: self.id.to_string(),
                score: i64::from(self.score),
            });
        }

        Ok(())
    }

    /// True when `category` names this record's type or one of its tags.
    #[must_use]
    pub fn in_category(&self, category: &str) -> bool {
        self.vendor_type.as_str() == category || self.tags.iter().any(|tag| tag == category)
    }
}
