use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use utoipa::ToSchema;

use crate::Record;

/// Record attributes that can be used as equality filters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    EndYear,
    Topic,
    Sector,
    Region,
    Pestle,
    Source,
    Swot,
    Country,
    City,
}

impl FilterField {
    pub const ALL: [FilterField; 9] = [
        FilterField::EndYear,
        FilterField::Topic,
        FilterField::Sector,
        FilterField::Region,
        FilterField::Pestle,
        FilterField::Source,
        FilterField::Swot,
        FilterField::Country,
        FilterField::City,
    ];

    /// Fields offered in the filter catalog. `swot` is query-only.
    pub const CATALOG: [FilterField; 8] = [
        FilterField::EndYear,
        FilterField::Topic,
        FilterField::Sector,
        FilterField::Region,
        FilterField::Pestle,
        FilterField::Source,
        FilterField::Country,
        FilterField::City,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterField::EndYear => "end_year",
            FilterField::Topic => "topic",
            FilterField::Sector => "sector",
            FilterField::Region => "region",
            FilterField::Pestle => "pestle",
            FilterField::Source => "source",
            FilterField::Swot => "swot",
            FilterField::Country => "country",
            FilterField::City => "city",
        }
    }

    /// JSON path of the attribute inside a stored record document.
    pub fn json_path(self) -> String {
        format!("$.{}", self.as_str())
    }

    /// Human label for selection controls ("end_year" -> "end year").
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown filter field: {}", self.0)
    }
}

impl std::error::Error for UnknownField {}

impl FromStr for FilterField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// The user's current selection: at most one value per field.
///
/// An empty value is the same as no entry, so `set(field, "")` clears the
/// field rather than filtering for empty attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedFilters(BTreeMap<FilterField, String>);

impl SelectedFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.0.remove(&field);
        } else {
            self.0.insert(field, value);
        }
    }

    pub fn clear(&mut self, field: FilterField) -> Option<String> {
        self.0.remove(&field)
    }

    pub fn clear_all(&mut self) {
        self.0.clear();
    }

    pub fn get(&self, field: FilterField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterField, &str)> + '_ {
        self.0.iter().map(|(field, value)| (*field, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exact-text conjunction over every selected field.
    pub fn matches(&self, record: &Record) -> bool {
        self.iter()
            .all(|(field, value)| record.text(field.as_str()).as_deref() == Some(value))
    }

    /// Build a selection from raw query-string pairs.
    ///
    /// Unknown keys and empty values are dropped; they never constrain.
    /// A repeated key keeps its last value.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut selected = Self::new();
        for (key, value) in pairs {
            if let Ok(field) = key.as_ref().parse::<FilterField>() {
                selected.set(field, value.as_ref());
            }
        }
        selected
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        self.iter()
            .map(|(field, value)| (field.as_str(), value))
            .collect()
    }
}

/// Distinct values available for each catalog field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCatalog {
    fields: BTreeMap<FilterField, Vec<String>>,
}

impl FilterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: FilterField, values: Vec<String>) {
        self.fields.insert(field, values);
    }

    pub fn values(&self, field: FilterField) -> &[String] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = (FilterField, &[String])> + '_ {
        self.fields
            .iter()
            .map(|(field, values)| (*field, values.as_slice()))
    }

    /// True when no field offers a single value.
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(Vec::is_empty)
    }

    /// Values ready for a selection control: empties dropped, sorted, deduplicated.
    pub fn options(&self, field: FilterField) -> Vec<&str> {
        let mut options: Vec<&str> = self
            .values(field)
            .iter()
            .map(String::as_str)
            .filter(|value| !value.is_empty())
            .collect();
        options.sort_unstable();
        options.dedup();
        options
    }
}

impl Serialize for FilterCatalog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, values) in &self.fields {
            map.serialize_entry(field.as_str(), values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FilterCatalog {
    /// Lenient decode: unknown fields are skipped and numeric values (years
    /// from older backends) are read as text.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<Value>>::deserialize(deserializer)?;
        let mut catalog = FilterCatalog::new();
        for (key, values) in raw {
            let Ok(field) = key.parse::<FilterField>() else {
                continue;
            };
            let texts = values
                .into_iter()
                .filter_map(|value| match value {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            catalog.insert(field, texts);
        }
        Ok(catalog)
    }
}
