//! Canonical value labels.
//!
//! Filters and frequency maps both key values by the same label string, so a
//! selected value matches a photo exactly when the photo's label for that
//! dimension equals it.

use crate::corpus::{Photo, TimeOfDay};
use crate::error::{EngineError, EngineResult};

use super::dimension::Dimension;
use super::lens::{classify_lens, LensType};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn trim_decimal(value: f64) -> String {
    let s = format!("{:.2}", round2(value));
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `1.8 → "1.8"`, `2.0 → "2.0"`, `1.25 → "1.25"`.
pub fn format_aperture(aperture: f64) -> String {
    let rounded = round2(aperture);
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        trim_decimal(rounded)
    }
}

/// `50.0 → "50"`, `50.5 → "50.5"`.
pub fn format_focal_length(focal_length: f64) -> String {
    trim_decimal(focal_length)
}

/// Exposure duration in seconds from `"N/D"` or a decimal string.
pub fn parse_shutter_duration(shutter_speed: &str) -> Option<f64> {
    let s = shutter_speed.trim().trim_end_matches('s').trim();
    let duration = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => s.parse().ok()?,
    };
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

fn parse_positive(raw: &str, unit_prefixes: &[&str], unit_suffixes: &[&str]) -> Option<f64> {
    let mut s = raw.trim();
    for prefix in unit_prefixes {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim_start();
        }
    }
    for suffix in unit_suffixes {
        if let Some(rest) = s.strip_suffix(suffix) {
            s = rest.trim_end();
        }
    }
    let value: f64 = s.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

fn invalid(dimension: Dimension, value: &str, reason: &str) -> EngineError {
    EngineError::InvalidValue {
        dimension: dimension.name().to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a user-supplied value into the label used for `dimension`.
pub fn canonical_value(dimension: Dimension, raw: &str) -> EngineResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid(dimension, raw, "empty value"));
    }

    match dimension {
        Dimension::Category | Dimension::Group | Dimension::Camera | Dimension::Lens => {
            Ok(trimmed.to_string())
        }
        Dimension::LensType => LensType::from_label(trimmed)
            .map(|t| t.label().to_string())
            .ok_or_else(|| invalid(dimension, raw, "expected prime, zoom or unknown")),
        Dimension::Aperture => parse_positive(trimmed, &["f/", "F/", "f", "F"], &[])
            .map(format_aperture)
            .ok_or_else(|| invalid(dimension, raw, "not a positive f-number")),
        Dimension::ShutterSpeed => parse_shutter_duration(trimmed)
            .map(|_| trimmed.to_string())
            .ok_or_else(|| invalid(dimension, raw, "not an exposure time")),
        Dimension::Iso => trimmed
            .parse::<i64>()
            .ok()
            .filter(|iso| *iso > 0)
            .map(|iso| iso.to_string())
            .ok_or_else(|| invalid(dimension, raw, "not a positive integer")),
        Dimension::FocalLength => parse_positive(trimmed, &[], &["mm"])
            .map(format_focal_length)
            .ok_or_else(|| invalid(dimension, raw, "not a positive focal length")),
        Dimension::TimeOfDay => TimeOfDay::from_label(trimmed)
            .map(|t| t.label().to_string())
            .ok_or_else(|| invalid(dimension, raw, "expected Morning, Afternoon, Night or Unknown")),
    }
}

/// The photo's label for `dimension`, or `None` when the attribute is missing.
pub fn photo_label(photo: &Photo, dimension: Dimension) -> Option<String> {
    match dimension {
        Dimension::Category => Some(photo.category.clone()),
        Dimension::Group => Some(photo.group.clone()),
        Dimension::Camera => photo.camera.clone(),
        Dimension::Lens => photo.lens.clone(),
        Dimension::LensType => Some(classify_lens(photo.lens.as_deref()).label().to_string()),
        Dimension::Aperture => photo.aperture.map(format_aperture),
        Dimension::ShutterSpeed => photo
            .shutter_speed
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        Dimension::Iso => photo.iso.map(|iso| iso.to_string()),
        Dimension::FocalLength => photo.focal_length.map(format_focal_length),
        Dimension::TimeOfDay => Some(photo.time_of_day().label().to_string()),
    }
}
