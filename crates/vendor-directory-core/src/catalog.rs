use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Formatter;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::staleness::parse_verified_date;
use crate::{Badge, DirectoryError, Locality, VendorId, VendorRecord, VendorType};

const BUILTIN_CATALOG_JSON: &str = include_str!("../data/catalog.json");

#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct LocalityPartition {
    pub locality: Locality,
    pub records: Vec<VendorRecord>,
}

/// Validated, immutable vendor catalog.
///
/// Iteration order is partition order, then declaration order within a partition.
/// Sorting uses this order to break score ties.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Catalog {
    partitions: Vec<LocalityPartition>,
    index: BTreeMap<VendorId, (usize, usize)>,
}

impl Catalog {
    /// Build a catalog from partitions in their canonical order.
    ///
    /// # Errors
    /// Returns a [`DirectoryError`] when a record fails [`VendorRecord::validate`], a record's
    /// city differs from its partition, a partition is empty or repeated, or an id repeats.
    pub fn new(partitions: Vec<LocalityPartition>) -> Result<Self, DirectoryError> {
        let mut seen_localities = BTreeSet::new();
        let mut index = BTreeMap::new();

        for (partition_index, partition) in partitions.iter().enumerate() {
            if partition.locality.as_str().trim().is_empty() {
                return Err(DirectoryError::EmptyField {
                    id: format!("locality[{partition_index}]"),
                    field: "locality".to_string(),
                });
            }
            if !seen_localities.insert(partition.locality.clone()) {
                return Err(DirectoryError::DuplicateLocality {
                    locality: partition.locality.to_string(),
                });
            }
            if partition.records.is_empty() {
                return Err(DirectoryError::EmptyLocality {
                    locality: partition.locality.to_string(),
                });
            }

            for (record_index, record) in partition.records.iter().enumerate() {
                record.validate()?;
                if record.city != partition.locality {
                    return Err(DirectoryError::LocalityMismatch {
                        id: record.id.to_string(),
                        city: record.city.to_string(),
                        locality: partition.locality.to_string(),
                    });
                }
                if index.insert(record.id.clone(), (partition_index, record_index)).is_some() {
                    return Err(DirectoryError::DuplicateId { id: record.id.to_string() });
                }
            }
        }

        let catalog = Self { partitions, index };
        tracing::info!(
            localities = catalog.partitions.len(),
            records = catalog.len(),
            "vendor catalog loaded"
        );
        Ok(catalog)
    }

    /// The editorial catalog bundled with this crate.
    ///
    /// # Errors
    /// Returns a [`DirectoryError`] only if the bundled document is itself invalid.
    pub fn builtin() -> Result<Self, DirectoryError> {
        Self::from_json_str(BUILTIN_CATALOG_JSON)
    }

    /// Parse a JSON catalog document: an object of locality → vendor array.
    ///
    /// # Errors
    /// Returns [`DirectoryError::Parse`] for malformed JSON and any validation error from
    /// [`Catalog::new`] or the per-entry checks.
    pub fn from_json_str(input: &str) -> Result<Self, DirectoryError> {
        let document: CatalogDocument =
            serde_json::from_str(input).map_err(|err| DirectoryError::Parse(err.to_string()))?;
        document.into_catalog()
    }

    /// Parse a YAML catalog document with the same shape as the JSON form.
    ///
    /// # Errors
    /// Same as [`Catalog::from_json_str`].
    pub fn from_yaml_str(input: &str) -> Result<Self, DirectoryError> {
        let document: CatalogDocument =
            serde_yaml::from_str(input).map_err(|err| DirectoryError::Parse(err.to_string()))?;
        document.into_catalog()
    }

    /// Load a catalog file; `.yaml`/`.yml` are parsed as YAML, everything else as JSON.
    ///
    /// # Errors
    /// Returns [`DirectoryError::Io`] when the file cannot be read, otherwise the errors of
    /// the matching parser.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let body = std::fs::read_to_string(path).map_err(|err| DirectoryError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml_str(&body)
        } else {
            Self::from_json_str(&body)
        }
    }

    /// All records in canonical order.
    pub fn records(&self) -> impl Iterator<Item = &VendorRecord> + '_ {
        self.partitions.iter().flat_map(|partition| partition.records.iter())
    }

    pub fn localities(&self) -> impl Iterator<Item = &Locality> + '_ {
        self.partitions.iter().map(|partition| &partition.locality)
    }

    #[must_use]
    pub fn partitions(&self) -> &[LocalityPartition] {
        &self.partitions
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&VendorRecord> {
        let (partition_index, record_index) = self.index.get(&VendorId::new(id))?;
        self.partitions.get(*partition_index)?.records.get(*record_index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Locality keys in document order. JSON objects and YAML mappings both land here.
struct CatalogDocument(Vec<(String, Vec<VendorEntry>)>);

impl<'de> Deserialize<'de> for CatalogDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DocumentVisitor;

        impl<'de> Visitor<'de> for DocumentVisitor {
            type Value = CatalogDocument;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a mapping of locality to a list of vendors")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut partitions = Vec::new();
                while let Some((locality, entries)) = map.next_entry::<String, Vec<VendorEntry>>()? {
                    partitions.push((locality, entries));
                }
                Ok(CatalogDocument(partitions))
            }
        }

        deserializer.deserialize_map(DocumentVisitor)
    }
}

impl CatalogDocument {
    fn into_catalog(self) -> Result<Catalog, DirectoryError> {
        let partitions = self
            .0
            .into_iter()
            .map(|(locality, entries)| {
                let records = entries
                    .into_iter()
                    .enumerate()
                    .map(|(position, entry)| entry.into_record(&locality, position))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(LocalityPartition { locality: Locality(locality), records })
            })
            .collect::<Result<Vec<_>, DirectoryError>>()?;
        Catalog::new(partitions)
    }
}

/// Wire shape of one vendor. Fields that need an id in their error stay loosely typed here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct VendorEntry {
    id: String,
    name: String,
    #[serde(rename = "type")]
    vendor_type: VendorType,
    city: String,
    distance: String,
    address: String,
    hours: String,
    meta: String,
    profile_url: String,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    notes: BTreeMap<String, String>,
    #[serde(default)]
    badges: Vec<Badge>,
    #[serde(default)]
    tags: Vec<String>,
    verified: String,
    score: i64,
}

impl VendorEntry {
    fn into_record(self, locality: &str, position: usize) -> Result<VendorRecord, DirectoryError> {
        if self.id.trim().is_empty() {
            return Err(DirectoryError::EmptyField {
                id: format!("{locality}[{position}]"),
                field: "id".to_string(),
            });
        }
        let id = self.id;

        let Some(note) = self.note else {
            return Err(DirectoryError::MissingNote { id });
        };

        let verified =
            parse_verified_date(&self.verified).map_err(|err| DirectoryError::InvalidVerifiedDate {
                id: id.clone(),
                value: self.verified.clone(),
                reason: err.to_string(),
            })?;

        let score = u8::try_from(self.score)
            .map_err(|_| DirectoryError::ScoreOutOfRange { id: id.clone(), score: self.score })?;

        Ok(VendorRecord {
            id: VendorId(id),
            name: self.name,
            vendor_type: self.vendor_type,
            city: Locality(self.city),
            distance: self.distance,
            address: self.address,
            hours: self.hours,
            meta: self.meta,
            profile_url: self.profile_url,
            note,
            notes: self.notes,
            badges: self.badges,
            tags: self.tags,
            verified,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::vendor;
    use crate::BadgeKind;

    fn builtin() -> Catalog {
        match Catalog::builtin() {
            Ok(catalog) => catalog,
            Err(err) => panic!("bundled catalog should be valid: {err}"),
        }
    }

    fn entry_json(id: &str, city: &str, extra: &str) -> String {
        format!(
            r#"{{"id":"{id}","name":"Name {id}","type":"maker","city":"{city}","distance":"1 mi",
            "address":"1 Main St","hours":"Daily","meta":"meta","profileUrl":"vendor-{id}.html",
            "verified":"2026-01-01","score":3{extra}}}"#
        )
    }

    fn assert_parse_error(input: &str, expected: &DirectoryError) {
        match Catalog::from_json_str(input) {
            Ok(_) => panic!("expected catalog error {expected:?}"),
            Err(err) => assert_eq!(&err, expected),
        }
    }

    #[test]
    fn builtin_catalog_ids_are_unique() {
        let catalog = builtin();
        let ids = catalog.records().map(|record| record.id.clone()).collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), catalog.len());
        assert_eq!(catalog.len(), 7);
    }

    #[test]
    fn builtin_catalog_keeps_document_order() {
        let catalog = builtin();
        let localities = catalog.localities().map(Locality::as_str).collect::<Vec<_>>();
        assert_eq!(localities, vec!["sf", "oc"]);

        let ids = catalog.records().map(|record| record.id.as_str()).collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec![
                "dandelion",
                "birite",
                "pasta-supply",
                "ferry-plaza",
                "rainbow",
                "oc-farmers-market",
                "oc-chocolate-grove",
            ]
        );
    }

    #[test]
    fn builtin_catalog_carries_contextual_notes_and_badges() {
        let catalog = builtin();
        let Some(birite) = catalog.get("birite") else {
            panic!("birite should be in the bundled catalog");
        };
        assert!(birite.notes.contains_key("halotop"));
        assert_eq!(birite.badges[0].kind, BadgeKind::EmphasisA);
        assert_eq!(birite.badges[1].kind, BadgeKind::EmphasisB);
        assert_eq!(birite.score, 4);
    }

    #[test]
    fn locality_order_follows_document_not_alphabet() {
        let input = format!(
            r#"{{"zz":[{}],"aa":[{}]}}"#,
            entry_json("first", "zz", ""),
            entry_json("second", "aa", "")
        );
        let catalog = match Catalog::from_json_str(&input) {
            Ok(catalog) => catalog,
            Err(err) => panic!("catalog should parse: {err}"),
        };
        let localities = catalog.localities().map(Locality::as_str).collect::<Vec<_>>();
        assert_eq!(localities, vec!["zz", "aa"]);
    }

    #[test]
    fn duplicate_id_across_localities_is_rejected() {
        let input = format!(
            r#"{{"sf":[{}],"oc":[{}]}}"#,
            entry_json("twin", "sf", ""),
            entry_json("twin", "oc", "")
        );
        assert_parse_error(&input, &DirectoryError::DuplicateId { id: "twin".to_string() });
    }

    #[test]
    fn missing_default_note_is_rejected() {
        let input = format!(r#"{{"sf":[{}]}}"#, entry_json("quiet", "sf", ""));
        assert_parse_error(&input, &DirectoryError::MissingNote { id: "quiet".to_string() });
    }

    #[test]
    fn malformed_verified_date_is_rejected_at_load() {
        let input = format!(
            r#"{{"sf":[{}]}}"#,
            entry_json("undated", "sf", r#","note":"n""#).replace("2026-01-01", "2026-13-01")
        );
        match Catalog::from_json_str(&input) {
            Err(DirectoryError::InvalidVerifiedDate { id, value, .. }) => {
                assert_eq!(id, "undated");
                assert_eq!(value, "2026-13-01");
            }
            other => panic!("expected invalid verified date, got {other:?}"),
        }
    }

    #[test]
    fn negative_score_is_rejected() {
        let input = format!(
            r#"{{"sf":[{}]}}"#,
            entry_json("sunk", "sf", r#","note":"n""#).replace("\"score\":3", "\"score\":-1")
        );
        assert_parse_error(
            &input,
            &DirectoryError::ScoreOutOfRange { id: "sunk".to_string(), score: -1 },
        );
    }

    #[test]
    fn city_must_match_partition() {
        let input = format!(r#"{{"sf":[{}]}}"#, entry_json("stray", "oc", r#","note":"n""#));
        assert_parse_error(
            &input,
            &DirectoryError::LocalityMismatch {
                id: "stray".to_string(),
                city: "oc".to_string(),
                locality: "sf".to_string(),
            },
        );
    }

    #[test]
    fn empty_locality_is_rejected() {
        assert_parse_error(
            r#"{"sf":[]}"#,
            &DirectoryError::EmptyLocality { locality: "sf".to_string() },
        );
    }

    #[test]
    fn unknown_vendor_type_is_a_parse_error() {
        let input = format!(r#"{{"sf":[{}]}}"#, entry_json("baker", "sf", r#","note":"n""#))
            .replace("\"maker\"", "\"bakery\"");
        assert!(matches!(Catalog::from_json_str(&input), Err(DirectoryError::Parse(_))));
    }

    #[test]
    fn yaml_documents_parse_with_the_same_shape() {
        let input = r#"
oc:
  - id: grove
    name: Chocolate Grove
    type: maker
    city: oc
    distance: 3.4 mi
    address: Laguna Beach
    hours: Wed-Sun
    meta: bean-to-bar
    profileUrl: vendor-grove.html
    note: default
    notes:
      reeses-hershey: contextual
    badges:
      - text: Bean-to-bar
        type: g
    tags: [chocolate, maker]
    verified: "2026-01-18"
    score: 4
sf:
  - id: market
    name: Ferry Plaza
    type: market
    city: sf
    distance: 0.8 mi
    address: Embarcadero
    hours: Sat
    meta: market
    profileUrl: vendor-market.html
    note: default
    verified: "2026-01-15"
    score: 5
"#;
        let catalog = match Catalog::from_yaml_str(input) {
            Ok(catalog) => catalog,
            Err(err) => panic!("yaml catalog should parse: {err}"),
        };
        let localities = catalog.localities().map(Locality::as_str).collect::<Vec<_>>();
        assert_eq!(localities, vec!["oc", "sf"]);
        let Some(grove) = catalog.get("grove") else {
            panic!("grove should be present");
        };
        assert_eq!(grove.badges[0].kind, BadgeKind::EmphasisB);
        assert_eq!(grove.notes.get("reeses-hershey").map(String::as_str), Some("contextual"));
    }

    #[test]
    fn new_rejects_duplicate_locality() {
        let partitions = vec![
            LocalityPartition {
                locality: Locality::new("sf"),
                records: vec![vendor("a", "sf", VendorType::Maker, 3)],
            },
            LocalityPartition {
                locality: Locality::new("sf"),
                records: vec![vendor("b", "sf", VendorType::Maker, 3)],
            },
        ];
        assert_eq!(
            Catalog::new(partitions),
            Err(DirectoryError::DuplicateLocality { locality: "sf".to_string() })
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let path = std::env::temp_dir().join("vendor-directory-does-not-exist.json");
        assert!(matches!(Catalog::load(&path), Err(DirectoryError::Io { .. })));
    }
}
