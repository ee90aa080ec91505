//! Immutable filter state: OR within a dimension, AND across dimensions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::corpus::Photo;
use crate::error::{EngineError, EngineResult};

use super::dimension::Dimension;
use super::values::{canonical_value, photo_label};

/// Selected values per dimension. A dimension without selected values is
/// absent from the map, so an empty state matches every photo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterState {
    constraints: BTreeMap<Dimension, BTreeSet<String>>,
}

/// Result of building a filter from untrusted input.
#[derive(Debug, Clone, Default)]
pub struct ParsedFilter {
    pub state: FilterState,
    /// Values that were skipped because they did not parse.
    pub rejected: Vec<EngineError>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `dimension → values` input.
    ///
    /// Unknown dimensions always fail. Unparsable values are skipped and
    /// reported, or fail the whole filter when `strict` is set.
    pub fn from_raw<I, K, V>(raw: I, strict: bool) -> EngineResult<ParsedFilter>
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parsed = ParsedFilter::default();

        for (key, values) in raw {
            let dimension: Dimension = key.as_ref().parse()?;
            for value in values {
                match canonical_value(dimension, value.as_ref()) {
                    Ok(label) => {
                        parsed
                            .state
                            .constraints
                            .entry(dimension)
                            .or_default()
                            .insert(label);
                    }
                    Err(e) if strict => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping filter value");
                        parsed.rejected.push(e);
                    }
                }
            }
        }

        Ok(parsed)
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn contains(&self, dimension: Dimension) -> bool {
        self.constraints.contains_key(&dimension)
    }

    pub fn get(&self, dimension: Dimension) -> Option<&BTreeSet<String>> {
        self.constraints.get(&dimension)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.constraints.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &BTreeSet<String>)> + '_ {
        self.constraints.iter().map(|(d, v)| (*d, v))
    }

    /// Replace the selection for `dimension` with exactly `value`.
    pub fn set_single(&self, dimension: Dimension, value: &str) -> EngineResult<Self> {
        let label = canonical_value(dimension, value)?;
        let mut next = self.clone();
        next.constraints.insert(dimension, BTreeSet::from([label]));
        Ok(next)
    }

    /// Add `value` to the selection for `dimension`, or remove it if present.
    pub fn toggle_in_set(&self, dimension: Dimension, value: &str) -> EngineResult<Self> {
        let label = canonical_value(dimension, value)?;
        let mut next = self.clone();
        let values = next.constraints.entry(dimension).or_default();
        if !values.remove(&label) {
            values.insert(label);
        }
        if values.is_empty() {
            next.constraints.remove(&dimension);
        }
        Ok(next)
    }

    pub fn clear(&self, dimension: Dimension) -> Self {
        self.without(&[dimension])
    }

    pub fn without(&self, dimensions: &[Dimension]) -> Self {
        let mut next = self.clone();
        next.constraints.retain(|d, _| !dimensions.contains(d));
        next
    }

    pub fn retain<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(Dimension) -> bool,
    {
        let mut next = self.clone();
        next.constraints.retain(|d, _| keep(*d));
        next
    }

    /// Whether every constrained dimension of `photo` holds a selected value.
    /// A photo missing the attribute never matches a constraint on it.
    pub fn matches(&self, photo: &Photo) -> bool {
        self.constraints.iter().all(|(dimension, values)| {
            photo_label(photo, *dimension).is_some_and(|label| values.contains(&label))
        })
    }

    /// Whether every constraint of `self` also appears, at least as narrow,
    /// in `other`.
    pub fn is_subset_of(&self, other: &FilterState) -> bool {
        self.constraints.iter().all(|(dimension, values)| {
            other
                .constraints
                .get(dimension)
                .is_some_and(|narrower| narrower.is_subset(values))
        })
    }

    /// Deterministic key for deduplication and caching.
    pub fn signature(&self) -> String {
        if self.constraints.is_empty() {
            return "*".to_string();
        }
        self.constraints
            .iter()
            .map(|(dimension, values)| format!("{}={:?}", dimension, values))
            .collect::<Vec<_>>()
            .join(";")
    }
}
