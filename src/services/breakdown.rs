use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// String-keyed grouping that remembers the order keys were first seen in.
///
/// Serializes as a JSON object whose members follow that order, so repeated
/// aggregations over the same input render identically.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown<T> {
    entries: Vec<(String, T)>,
    index: HashMap<String, usize>,
}

impl<T> Default for Breakdown<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Default> Breakdown<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, inserting `T::default()` on first sight.
    pub fn entry(&mut self, key: &str) -> &mut T {
        let position = match self.index.get(key) {
            Some(&position) => position,
            None => {
                self.entries.push((key.to_string(), T::default()));
                let position = self.entries.len() - 1;
                self.index.insert(key.to_string(), position);
                position
            }
        };
        &mut self.entries[position].1
    }
}

#[cfg(test)]
impl<T> Breakdown<T> {
    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Breakdown<usize> {
    pub fn increment(&mut self, key: &str) {
        *self.entry(key) += 1;
    }
}

impl<T: Serialize> Serialize for Breakdown<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
