use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize, Serializer};

/// Filter value that disables a filter.
pub const ALL_FILTER: &str = "all";

/// Caller-supplied options. Any field left `None` or empty falls back to the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct QueryOptions {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub max_cards: Option<usize>,
}

/// Ambient request parameters, read once per call.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RequestParams {
    pub from: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
}

impl RequestParams {
    /// Parse a URL query string (with or without the leading `?`). The first occurrence
    /// of a key wins; unrelated keys are ignored.
    #[must_use]
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }

    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "from" => &mut params.from,
                "city" => &mut params.city,
                "category" => &mut params.category,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Filter {
    All,
    Only(String),
}

impl Filter {
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        if raw == ALL_FILTER {
            Self::All
        } else {
            Self::Only(raw.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_FILTER,
            Self::Only(value) => value,
        }
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Filter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Fully resolved inputs of one render call.
#[derive(Debug, Clone, Serialize, Eq, PartialEq)]
pub struct QueryContext {
    pub from_slug: String,
    pub city: Filter,
    pub category: Filter,
    pub max_cards: Option<usize>,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self { from_slug: String::new(), city: Filter::All, category: Filter::All, max_cards: None }
    }
}

impl QueryContext {
    /// Per field, the first non-empty of: explicit option, request parameter, default.
    /// Values are not checked against known localities or types.
    #[must_use]
    pub fn resolve(options: &QueryOptions, params: &RequestParams) -> Self {
        let from_slug = first_non_empty(options.from.as_deref(), params.from.as_deref())
            .unwrap_or_default()
            .to_string();
        let city = first_non_empty(options.city.as_deref(), params.city.as_deref())
            .map_or(Filter::All, Filter::from_raw);
        let category = first_non_empty(options.category.as_deref(), params.category.as_deref())
            .map_or(Filter::All, Filter::from_raw);

        let context = Self { from_slug, city, category, max_cards: options.max_cards };
        tracing::debug!(
            from = %context.from_slug,
            city = %context.city,
            category = %context.category,
            max_cards = ?context.max_cards,
            "resolved query context"
        );
        context
    }

    #[must_use]
    pub fn has_referral(&self) -> bool {
        !self.from_slug.is_empty()
    }
}

fn first_non_empty<'a>(explicit: Option<&'a str>, ambient: Option<&'a str>) -> Option<&'a str> {
    explicit.filter(|value| !value.is_empty()).or(ambient.filter(|value| !value.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_supplied() {
        let context = QueryContext::resolve(&QueryOptions::default(), &RequestParams::default());
        assert_eq!(context, QueryContext::default());
        assert!(!context.has_referral());
    }

    #[test]
    fn explicit_options_override_request_params() {
        let options = QueryOptions {
            from: Some("annies".to_string()),
            city: Some("oc".to_string()),
            category: None,
            max_cards: Some(2),
        };
        let params = RequestParams::from_query_string("?from=halotop&city=sf&category=maker");
        let context = QueryContext::resolve(&options, &params);

        assert_eq!(context.from_slug, "annies");
        assert_eq!(context.city, Filter::Only("oc".to_string()));
        assert_eq!(context.category, Filter::Only("maker".to_string()));
        assert_eq!(context.max_cards, Some(2));
    }

    #[test]
    fn empty_option_falls_through_to_request() {
        let options = QueryOptions { from: Some(String::new()), ..QueryOptions::default() };
        let params = RequestParams::from_query_string("from=rxbar");
        assert_eq!(QueryContext::resolve(&options, &params).from_slug, "rxbar");
    }

    #[test]
    fn empty_request_value_falls_back_to_default() {
        let params = RequestParams::from_query_string("city=&category=");
        let context = QueryContext::resolve(&QueryOptions::default(), &params);
        assert!(context.city.is_all());
        assert!(context.category.is_all());
    }

    #[test]
    fn first_query_occurrence_wins_and_values_are_decoded() {
        let params =
            RequestParams::from_query_string("category=ice+cream&category=maker&from=reeses%2Dhershey&utm=x");
        assert_eq!(params.category.as_deref(), Some("ice cream"));
        assert_eq!(params.from.as_deref(), Some("reeses-hershey"));
        assert_eq!(params.city, None);
    }

    #[test]
    fn unknown_values_are_kept_verbatim() {
        let params = RequestParams::from_query_string("city=nyc&category=Bakery");
        let context = QueryContext::resolve(&QueryOptions::default(), &params);
        assert_eq!(context.city, Filter::Only("nyc".to_string()));
        assert_eq!(context.category, Filter::Only("Bakery".to_string()));
    }

    #[test]
    fn all_is_case_sensitive() {
        assert!(Filter::from_raw("all").is_all());
        assert_eq!(Filter::from_raw("ALL"), Filter::Only("ALL".to_string()));
    }
}
