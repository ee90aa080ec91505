//! Value → count maps in axis order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::dimension::AxisOrder;
use super::values::parse_shutter_duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution {
    entries: Vec<FrequencyEntry>,
}

fn compare_numeric(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_labels(order: AxisOrder, a: &FrequencyEntry, b: &FrequencyEntry) -> Ordering {
    let primary = match order {
        AxisOrder::ByCount => b.count.cmp(&a.count),
        AxisOrder::Numeric => compare_numeric(a.value.parse().ok(), b.value.parse().ok()),
        AxisOrder::Duration => {
            compare_numeric(parse_shutter_duration(&a.value), parse_shutter_duration(&b.value))
        }
        AxisOrder::Fixed(sequence) => {
            let rank = |v: &str| sequence.iter().position(|s| *s == v).unwrap_or(sequence.len());
            rank(&a.value).cmp(&rank(&b.value))
        }
    };
    primary.then_with(|| a.value.cmp(&b.value))
}

impl Distribution {
    pub fn from_counts(order: AxisOrder, counts: HashMap<String, u64>) -> Self {
        let mut entries: Vec<FrequencyEntry> = counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(value, count)| FrequencyEntry { value, count })
            .collect();
        entries.sort_by(|a, b| compare_labels(order, a, b));
        Self { entries }
    }

    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.entries
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.value.as_str())
    }

    pub fn get(&self, value: &str) -> u64 {
        self.entries
            .iter()
            .find(|e| e.value == value)
            .map(|e| e.count)
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-key onto `axis`, keeping its order and zero counts. Values missing
    /// from `axis` are appended in their current order.
    pub fn aligned_to(&self, axis: &[String]) -> Self {
        let mut entries: Vec<FrequencyEntry> = axis
            .iter()
            .map(|label| FrequencyEntry {
                value: label.clone(),
                count: self.get(label),
            })
            .collect();
        entries.extend(
            self.entries
                .iter()
                .filter(|e| !axis.contains(&e.value))
                .cloned(),
        );
        Self { entries }
    }
}
