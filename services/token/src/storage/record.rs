//! Record addressing and field values.

use std::collections::HashMap;
use std::fmt;

/// Address of one record: namespace, set and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    namespace: String,
    set: String,
    id: String,
}

impl RecordKey {
    /// Create a record key.
    #[must_use]
    pub fn new(namespace: impl Into<String>, set: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            set: set.into(),
            id: id.into(),
        }
    }

    /// Namespace component.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Set component.
    #[must_use]
    pub fn set(&self) -> &str {
        &self.set
    }

    /// Id component.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.set, self.id)
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinValue {
    /// Text value
    Str(String),
    /// Integer value
    Int(i64),
    /// Boolean value
    Bool(bool),
}

impl BinValue {
    /// Text form used by string-only backends.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

impl From<String> for BinValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for BinValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for BinValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for BinValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Named field written to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bin {
    /// Field name
    pub name: String,
    /// Field value
    pub value: BinValue,
}

impl Bin {
    /// Create a bin.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<BinValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Fields of one stored record.
///
/// Typed getters coerce text values, since some backends only keep strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    bins: HashMap<String, BinValue>,
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<BinValue>) {
        self.bins.insert(name.into(), value.into());
    }

    /// Write every bin into this record.
    pub fn merge(&mut self, bins: impl IntoIterator<Item = Bin>) {
        for bin in bins {
            self.bins.insert(bin.name, bin.value);
        }
    }

    /// Copy of this record restricted to the named fields.
    #[must_use]
    pub fn project(&self, fields: &[&str]) -> Self {
        let bins = fields
            .iter()
            .filter_map(|f| self.bins.get(*f).map(|v| ((*f).to_string(), v.clone())))
            .collect();
        Self { bins }
    }

    /// Raw value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BinValue> {
        self.bins.get(name)
    }

    /// Text value of a field.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.bins.get(name)? {
            BinValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value of a field.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.bins.get(name)? {
            BinValue::Int(i) => Some(*i),
            BinValue::Str(s) => s.parse().ok(),
            BinValue::Bool(_) => None,
        }
    }

    /// Boolean value of a field.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.bins.get(name)? {
            BinValue::Bool(b) => Some(*b),
            BinValue::Int(i) => Some(*i != 0),
            BinValue::Str(s) => match s.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
        }
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

impl FromIterator<Bin> for Record {
    fn from_iter<I: IntoIterator<Item = Bin>>(iter: I) -> Self {
        let mut record = Self::new();
        record.merge(iter);
        record
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let bins = iter.into_iter().map(|(k, v)| (k, BinValue::Str(v))).collect();
        Self { bins }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = RecordKey::new("primer", "billing_tokens", "svc-1");
        assert_eq!(key.to_string(), "primer:billing_tokens:svc-1");
        assert_eq!(key.set(), "billing_tokens");
    }

    #[test]
    fn test_typed_getters_coerce_text() {
        let record: Record = vec![
            ("issued_at".to_string(), "1700000000".to_string()),
            ("enabled".to_string(), "false".to_string()),
            ("token".to_string(), "abc".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(record.get_i64("issued_at"), Some(1_700_000_000));
        assert_eq!(record.get_bool("enabled"), Some(false));
        assert_eq!(record.get_str("token"), Some("abc"));
        assert_eq!(record.get_i64("token"), None);
        assert_eq!(record.get_str("missing"), None);
    }

    #[test]
    fn test_merge_and_project() {
        let mut record: Record = vec![Bin::new("token", "a"), Bin::new("enabled", true)]
            .into_iter()
            .collect();
        record.merge(vec![Bin::new("enabled", false), Bin::new("expires_at", 10_i64)]);

        assert_eq!(record.len(), 3);
        assert_eq!(record.get_bool("enabled"), Some(false));

        let projected = record.project(&["token", "nope"]);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected.get_str("token"), Some("a"));
    }
}
