use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Handle → value mapping filled by `Store` commands.
#[derive(Debug, Default, Clone)]
pub struct BufferStore {
    buffers: HashMap<i64, Value>,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `handle`. Handles ≤ 0 are ignored; returns whether
    /// the store changed.
    pub fn store(&mut self, handle: i64, value: Value) -> bool {
        if handle <= 0 {
            return false;
        }
        self.buffers.insert(handle, value);
        true
    }

    pub fn get(&self, handle: i64) -> Option<&Value> {
        self.buffers.get(&handle)
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// Keyword-style styling options applied to every Plot/Scatter until reset.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OptionTable {
    entries: BTreeMap<String, Value>,
}

impl OptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for OptionTable {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut table = OptionTable::new();
        for (key, value) in iter {
            table.insert(key, value);
        }
        table
    }
}
