//! Downstream invalidation along `category → group → camera → lens → leaves`.

use crate::error::EngineResult;

use super::dimension::Dimension;
use super::filter::FilterState;

/// Drop every constraint strictly downstream of `changed`. Siblings and
/// upstream dimensions are kept. Applying it twice changes nothing further.
pub fn invalidate_downstream(filter: &FilterState, changed: Dimension) -> FilterState {
    filter.retain(|d| !d.is_downstream_of(changed))
}

/// A presentation-level edit expressed in engine terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    /// Make `value` the only selected value.
    Single(Dimension, &'a str),
    /// Add or remove `value` from the current selection.
    Toggle(Dimension, &'a str),
    /// Drop every selected value.
    Clear(Dimension),
}

impl Selection<'_> {
    pub fn dimension(&self) -> Dimension {
        match self {
            Selection::Single(d, _) | Selection::Toggle(d, _) | Selection::Clear(d) => *d,
        }
    }
}

/// Apply `selection`, then clear downstream filters when `invalidate` is set.
pub fn apply_selection(
    filter: &FilterState,
    selection: Selection<'_>,
    invalidate: bool,
) -> EngineResult<FilterState> {
    let next = match selection {
        Selection::Single(dimension, value) => filter.set_single(dimension, value)?,
        Selection::Toggle(dimension, value) => filter.toggle_in_set(dimension, value)?,
        Selection::Clear(dimension) => filter.clear(dimension),
    };

    if invalidate && next != *filter {
        Ok(invalidate_downstream(&next, selection.dimension()))
    } else {
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_filter() -> FilterState {
        let mut filter = FilterState::new();
        for (dimension, value) in [
            (Dimension::Category, "Sport"),
            (Dimension::Group, "Run"),
            (Dimension::Camera, "A"),
            (Dimension::Lens, "L1"),
            (Dimension::LensType, "prime"),
            (Dimension::Aperture, "1.8"),
            (Dimension::ShutterSpeed, "1/200"),
            (Dimension::Iso, "100"),
            (Dimension::FocalLength, "50"),
            (Dimension::TimeOfDay, "Morning"),
        ] {
            filter = filter.set_single(dimension, value).unwrap();
        }
        filter
    }

    #[test]
    fn test_category_change_clears_everything_below() {
        let result = invalidate_downstream(&full_filter(), Dimension::Category);
        assert_eq!(result.dimensions().collect::<Vec<_>>(), vec![Dimension::Category]);
    }

    #[test]
    fn test_camera_change_keeps_upstream() {
        let result = invalidate_downstream(&full_filter(), Dimension::Camera);
        assert_eq!(
            result.dimensions().collect::<Vec<_>>(),
            vec![Dimension::Category, Dimension::Group, Dimension::Camera]
        );
    }

    #[test]
    fn test_lens_change_keeps_lens_type_sibling() {
        let result = invalidate_downstream(&full_filter(), Dimension::Lens);
        assert!(result.contains(Dimension::LensType));
        assert!(!result.contains(Dimension::Aperture));
        assert!(!result.contains(Dimension::TimeOfDay));
    }

    #[test]
    fn test_leaf_siblings_do_not_invalidate_each_other() {
        let filter = full_filter();
        for leaf in [
            Dimension::Aperture,
            Dimension::ShutterSpeed,
            Dimension::Iso,
            Dimension::FocalLength,
            Dimension::TimeOfDay,
        ] {
            assert_eq!(invalidate_downstream(&filter, leaf), filter);
        }
    }

    #[test]
    fn test_idempotent_for_every_dimension() {
        let filter = full_filter();
        for dimension in Dimension::ALL {
            let once = invalidate_downstream(&filter, dimension);
            let twice = invalidate_downstream(&once, dimension);
            assert_eq!(once, twice, "not idempotent for {}", dimension);
        }
    }

    #[test]
    fn test_group_selection_without_invalidation_keeps_category() {
        let filter = FilterState::new().set_single(Dimension::Category, "Sport").unwrap();
        let next = apply_selection(&filter, Selection::Single(Dimension::Group, "Run"), false).unwrap();
        assert!(next.contains(Dimension::Category));
        assert!(next.contains(Dimension::Group));
    }

    #[test]
    fn test_apply_selection_with_invalidation() {
        let next = apply_selection(&full_filter(), Selection::Toggle(Dimension::Camera, "B"), true).unwrap();
        assert_eq!(next.get(Dimension::Camera).unwrap().len(), 2);
        assert!(!next.contains(Dimension::Lens));
        assert!(next.contains(Dimension::Group));
    }
}
