//! Filterable photo attributes and their place in the selection hierarchy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Category,
    Group,
    Camera,
    Lens,
    LensType,
    Aperture,
    ShutterSpeed,
    Iso,
    FocalLength,
    TimeOfDay,
}

/// How labels of a dimension are ordered on its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// Most frequent first, ties broken by label.
    ByCount,
    /// Ascending by parsed decimal value.
    Numeric,
    /// Ascending by exposure duration.
    Duration,
    /// A fixed, dimension-specific sequence.
    Fixed(&'static [&'static str]),
}

impl Dimension {
    pub const ALL: [Dimension; 10] = [
        Dimension::Category,
        Dimension::Group,
        Dimension::Camera,
        Dimension::Lens,
        Dimension::LensType,
        Dimension::Aperture,
        Dimension::ShutterSpeed,
        Dimension::Iso,
        Dimension::FocalLength,
        Dimension::TimeOfDay,
    ];

    /// Dimensions that get their own facet. `LensType` is folded into the
    /// lens facet.
    pub const FACETED: [Dimension; 9] = [
        Dimension::Category,
        Dimension::Group,
        Dimension::Camera,
        Dimension::Lens,
        Dimension::Aperture,
        Dimension::ShutterSpeed,
        Dimension::Iso,
        Dimension::FocalLength,
        Dimension::TimeOfDay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Category => "category",
            Dimension::Group => "group",
            Dimension::Camera => "camera",
            Dimension::Lens => "lens",
            Dimension::LensType => "lens_type",
            Dimension::Aperture => "aperture",
            Dimension::ShutterSpeed => "shutter_speed",
            Dimension::Iso => "iso",
            Dimension::FocalLength => "focal_length",
            Dimension::TimeOfDay => "time_of_day",
        }
    }

    /// Position in the `category → group → camera → lens → leaves` chain.
    /// Dimensions sharing a level are siblings.
    pub fn level(&self) -> u8 {
        match self {
            Dimension::Category => 0,
            Dimension::Group => 1,
            Dimension::Camera => 2,
            Dimension::Lens | Dimension::LensType => 3,
            Dimension::Aperture
            | Dimension::ShutterSpeed
            | Dimension::Iso
            | Dimension::FocalLength
            | Dimension::TimeOfDay => 4,
        }
    }

    pub fn is_downstream_of(&self, other: Dimension) -> bool {
        self.level() > other.level()
    }

    /// The facet whose computation drops this dimension's constraint.
    pub fn facet(&self) -> Dimension {
        match self {
            Dimension::LensType => Dimension::Lens,
            other => *other,
        }
    }

    /// Whether the value is a stored column rather than derived per photo.
    pub fn is_stored(&self) -> bool {
        !matches!(self, Dimension::LensType | Dimension::TimeOfDay)
    }

    pub fn axis_order(&self) -> AxisOrder {
        match self {
            Dimension::Aperture | Dimension::Iso | Dimension::FocalLength => AxisOrder::Numeric,
            Dimension::ShutterSpeed => AxisOrder::Duration,
            Dimension::TimeOfDay => AxisOrder::Fixed(&["Morning", "Afternoon", "Night", "Unknown"]),
            Dimension::LensType => AxisOrder::Fixed(&["prime", "zoom", "unknown"]),
            Dimension::Category | Dimension::Group | Dimension::Camera | Dimension::Lens => {
                AxisOrder::ByCount
            }
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.name() == key)
            .ok_or_else(|| EngineError::InvalidDimension(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimension_names() {
        assert_eq!("camera".parse::<Dimension>().unwrap(), Dimension::Camera);
        assert_eq!("Shutter-Speed".parse::<Dimension>().unwrap(), Dimension::ShutterSpeed);
        assert_eq!(
            "colour".parse::<Dimension>(),
            Err(EngineError::InvalidDimension("colour".to_string()))
        );
    }

    #[test]
    fn test_names_round_trip() {
        for dim in Dimension::ALL {
            assert_eq!(dim.name().parse::<Dimension>().unwrap(), dim);
        }
    }

    #[test]
    fn test_hierarchy_levels() {
        assert!(Dimension::Group.is_downstream_of(Dimension::Category));
        assert!(Dimension::Iso.is_downstream_of(Dimension::Camera));
        assert!(!Dimension::Iso.is_downstream_of(Dimension::TimeOfDay));
        assert!(!Dimension::Category.is_downstream_of(Dimension::Group));
        assert!(!Dimension::LensType.is_downstream_of(Dimension::Lens));
    }

    #[test]
    fn test_lens_type_folds_into_lens_facet() {
        assert_eq!(Dimension::LensType.facet(), Dimension::Lens);
        assert!(!Dimension::FACETED.contains(&Dimension::LensType));
    }
}
