//! Photo corpus records and the accessor boundary the engine reads through.
//!
//! Records are produced by an external extraction step and never mutated by
//! the engine. Accessors may push filters down to the store; the aggregator
//! re-checks every returned record, so an accessor is free to return a
//! superset of the matching photos.

pub mod memory;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::EngineResult;
use crate::facets::{CancelToken, FilterState};

pub use memory::MemoryCorpus;

/// Coarse time-of-day bucket derived from the capture hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Night,
    Unknown,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            4..=11 => TimeOfDay::Morning,
            12..=18 => TimeOfDay::Afternoon,
            0..=3 | 19..=23 => TimeOfDay::Night,
            _ => TimeOfDay::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Night => "Night",
            TimeOfDay::Unknown => "Unknown",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "morning" => Some(TimeOfDay::Morning),
            "afternoon" => Some(TimeOfDay::Afternoon),
            "night" => Some(TimeOfDay::Night),
            "unknown" => Some(TimeOfDay::Unknown),
            _ => None,
        }
    }
}

/// A single edited photo as recorded at extraction time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub session_id: i64,
    #[serde(default)]
    pub camera: Option<String>,
    #[serde(default)]
    pub lens: Option<String>,
    #[serde(default)]
    pub aperture: Option<f64>,
    #[serde(default)]
    pub shutter_speed: Option<String>,
    #[serde(default)]
    pub iso: Option<i64>,
    #[serde(default)]
    pub focal_length: Option<f64>,
    #[serde(default)]
    pub date_taken: Option<NaiveDateTime>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub group: String,
}

impl Photo {
    pub fn time_of_day(&self) -> TimeOfDay {
        self.date_taken
            .map(|dt| TimeOfDay::from_hour(dt.hour()))
            .unwrap_or(TimeOfDay::Unknown)
    }

    /// English weekday name, e.g. "Saturday".
    pub fn day_of_week(&self) -> Option<String> {
        self.date_taken
            .map(|dt| WEEKDAYS[dt.weekday().num_days_from_monday() as usize].to_string())
    }
}

/// Weekday names, Monday first.
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// A shoot: the photos kept from one RAW folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub group: String,
    pub total_photos: i64,
    /// `None` when no RAW folder was found.
    pub total_raw_photos: Option<i64>,
}

impl Session {
    /// Kept/RAW as a percentage, undefined without a positive RAW count.
    pub fn hit_rate(&self) -> Option<f64> {
        match self.total_raw_photos {
            Some(raw) if raw > 0 => Some(self.total_photos as f64 / raw as f64 * 100.0),
            _ => None,
        }
    }
}

/// Read access to the photo store.
///
/// Implementations block on I/O; the orchestrator calls them from blocking
/// worker threads.
pub trait CorpusAccessor: Send + Sync {
    /// Photos that may match `filter`. Must include every matching photo.
    fn query(&self, filter: &FilterState, cancel: &CancelToken) -> EngineResult<Vec<Photo>>;

    fn sessions(&self) -> EngineResult<Vec<Session>>;

    /// Changes whenever photos or sessions change.
    fn dataset_version(&self) -> EngineResult<u64>;

    /// Parent category of every group. Groups seen under several categories
    /// keep the first one in session order.
    fn group_to_category(&self) -> EngineResult<BTreeMap<String, String>> {
        let mut map = BTreeMap::new();
        for session in self.sessions()? {
            match map.get(&session.group) {
                Some(existing) if existing != &session.category => {
                    tracing::warn!(
                        group = %session.group,
                        kept = %existing,
                        ignored = %session.category,
                        "Group belongs to more than one category"
                    );
                }
                Some(_) => {}
                None => {
                    map.insert(session.group.clone(), session.category.clone());
                }
            }
        }
        Ok(map)
    }
}
