//! Deterministic variation selection
//!
//! The phrase shown for a (vehicle, family) pair must be identical on every
//! request and across restarts, otherwise crawlers see the page text change
//! between visits. Selection is plain modulo arithmetic over the ids.

use crate::error::{Error, Result};

/// `(type_id + pg_id + offset) mod len`, never negative
pub fn variation_index(len: usize, type_id: i64, pg_id: i64, offset: i64) -> usize {
    let sum = type_id as i128 + pg_id as i128 + offset as i128;
    sum.rem_euclid(len as i128) as usize
}

/// Pick one variant for the pair
pub fn select_variation<T>(variations: &[T], type_id: i64, pg_id: i64, offset: i64) -> Result<&T> {
    select_variation_with_index(variations, type_id, pg_id, offset).map(|(_, v)| v)
}

/// Pick one variant and report the index used
pub fn select_variation_with_index<T>(
    variations: &[T],
    type_id: i64,
    pg_id: i64,
    offset: i64,
) -> Result<(usize, &T)> {
    if variations.is_empty() {
        return Err(Error::EmptyRotationTable("<anonymous>".to_string()));
    }
    let index = variation_index(variations.len(), type_id, pg_id, offset);
    Ok((index, &variations[index]))
}

/// Ordered, non-empty list of candidate phrases for one semantic slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationTable {
    name: &'static str,
    entries: Vec<String>,
}

impl RotationTable {
    pub fn new<I, S>(name: &'static str, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<String> = entries.into_iter().map(Into::into).collect();
        if entries.is_empty() {
            return Err(Error::EmptyRotationTable(name.to_string()));
        }
        Ok(Self { name, entries })
    }

    pub(crate) fn from_static(name: &'static str, entries: &[&str]) -> Self {
        debug_assert!(!entries.is_empty(), "built-in rotation table {name} is empty");
        Self {
            name,
            entries: entries.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn select(&self, type_id: i64, pg_id: i64, offset: i64) -> &str {
        self.select_with_index(type_id, pg_id, offset).1
    }

    pub fn select_with_index(&self, type_id: i64, pg_id: i64, offset: i64) -> (usize, &str) {
        let index = variation_index(self.entries.len(), type_id, pg_id, offset);
        (index, &self.entries[index])
    }
}
