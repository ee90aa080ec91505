//! Prime/zoom classification and focal-length bucketing.
//!
//! Both rely on a fixed registry of common prime focal lengths rather than on
//! lens metadata. A zoom shot at 24mm is therefore reported as a prime value;
//! the heuristic is kept as-is.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::values::format_focal_length;

/// Focal lengths (mm) treated as prime.
pub const PRIME_FOCAL_LENGTHS: [u32; 17] = [
    14, 16, 20, 24, 28, 35, 40, 50, 85, 100, 105, 135, 200, 300, 400, 500, 600,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensType {
    Prime,
    Zoom,
    Unknown,
}

impl LensType {
    pub fn label(&self) -> &'static str {
        match self {
            LensType::Prime => "prime",
            LensType::Zoom => "zoom",
            LensType::Unknown => "unknown",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "prime" => Some(LensType::Prime),
            "zoom" => Some(LensType::Zoom),
            "unknown" => Some(LensType::Unknown),
            _ => None,
        }
    }
}

pub fn is_prime_focal_length(focal_length: f64) -> bool {
    focal_length.fract() == 0.0
        && focal_length >= 0.0
        && PRIME_FOCAL_LENGTHS.contains(&(focal_length as u32))
}

/// Lower bound of the 10mm zoom bucket holding `focal_length`.
pub fn zoom_bucket_start(focal_length: f64) -> u32 {
    ((focal_length / 10.0).floor() * 10.0).max(0.0) as u32
}

pub fn zoom_bucket_label(focal_length: f64) -> String {
    let start = zoom_bucket_start(focal_length);
    format!("{}-{}", start, start + 9)
}

fn zoom_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*-\s*(\d+(?:\.\d+)?)\s*mm").expect("valid regex"))
}

fn prime_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*mm").expect("valid regex"))
}

/// Classify a lens by the focal length(s) in its name.
pub fn classify_lens(name: Option<&str>) -> LensType {
    let Some(name) = name else {
        return LensType::Unknown;
    };
    if zoom_pattern().is_match(name) {
        return LensType::Zoom;
    }
    match prime_pattern()
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        Some(focal) if is_prime_focal_length(focal) => LensType::Prime,
        Some(_) => LensType::Zoom,
        None => LensType::Unknown,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FocalLengthReport {
    /// Registry focal lengths, ascending.
    pub primes: Vec<(String, u64)>,
    /// Non-registry focal lengths grouped into `"N0-N9"` ranges, ascending.
    pub zoom_ranges: Vec<(String, u64)>,
}

impl FocalLengthReport {
    /// Build from `(focal_length, count)` pairs of one aggregate.
    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (f64, u64)>,
    {
        let mut primes: BTreeMap<u32, u64> = BTreeMap::new();
        let mut zooms: BTreeMap<u32, u64> = BTreeMap::new();

        for (focal, count) in counts {
            if count == 0 || !focal.is_finite() {
                continue;
            }
            if is_prime_focal_length(focal) {
                *primes.entry(focal as u32).or_default() += count;
            } else {
                *zooms.entry(zoom_bucket_start(focal)).or_default() += count;
            }
        }

        Self {
            primes: primes
                .into_iter()
                .map(|(f, c)| (format_focal_length(f as f64), c))
                .collect(),
            zoom_ranges: zooms
                .into_iter()
                .map(|(start, c)| (zoom_bucket_label(start as f64), c))
                .collect(),
        }
    }

    pub fn prime_total(&self) -> u64 {
        self.primes.iter().map(|(_, c)| c).sum()
    }

    pub fn zoom_total(&self) -> u64 {
        self.zoom_ranges.iter().map(|(_, c)| c).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prime_registry() {
        assert!(is_prime_focal_length(50.0));
        assert!(is_prime_focal_length(600.0));
        assert!(!is_prime_focal_length(50.5));
        assert!(!is_prime_focal_length(70.0));
    }

    #[test]
    fn test_zoom_buckets() {
        assert_eq!(zoom_bucket_label(70.0), "70-79");
        assert_eq!(zoom_bucket_label(79.9), "70-79");
        assert_eq!(zoom_bucket_label(8.0), "0-9");
    }

    #[test]
    fn test_classify_lens() {
        assert_eq!(classify_lens(Some("FE 85mm F1.4 GM II")), LensType::Prime);
        assert_eq!(classify_lens(Some("24-70mm F2.8 DG DN | Art 019")), LensType::Zoom);
        assert_eq!(classify_lens(Some("FE 90mm F2.8 Macro G OSS")), LensType::Zoom);
        assert_eq!(classify_lens(Some("Manual lens")), LensType::Unknown);
        assert_eq!(classify_lens(None), LensType::Unknown);
    }

    #[test]
    fn test_focal_report_splits_primes_and_ranges() {
        let report = FocalLengthReport::from_counts(vec![(50.0, 3), (72.0, 2), (75.0, 1), (35.0, 4), (0.0, 0)]);
        assert_eq!(report.primes, vec![("35".to_string(), 4), ("50".to_string(), 3)]);
        assert_eq!(report.zoom_ranges, vec![("70-79".to_string(), 3)]);
        assert_eq!(report.prime_total(), 7);
        assert_eq!(report.zoom_total(), 3);
    }
}
