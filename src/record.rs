use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

/// One resolved registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameRecord {
    pub name: String,
    pub count: u64,
    pub explanation: Option<String>,
}

impl NameRecord {
    /// Collection key: the canonical name, case-folded.
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// A single query drawn from the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub query_name: String,
}

impl LookupRequest {
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
        }
    }
}

/// Relative reference from a list row to its detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLink {
    pub target: String,
}

/// Records keyed by lowercase canonical name. Same-key inserts overwrite.
#[derive(Debug, Default)]
pub struct ResultCollection {
    records: HashMap<String, NameRecord>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite; returns true when the key was already present.
    pub fn insert(&mut self, record: NameRecord) -> bool {
        self.records.insert(record.key(), record).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&NameRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted view by key, ascending.
    pub fn sorted(&self) -> BTreeMap<&str, &NameRecord> {
        self.records
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
