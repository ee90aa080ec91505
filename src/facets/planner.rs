//! Derives the applied filter and one facet filter per faceted dimension.

use std::collections::{BTreeMap, BTreeSet};

use super::dimension::Dimension;
use super::filter::FilterState;

#[derive(Debug, Clone, PartialEq)]
pub struct FacetPlan {
    pub applied: FilterState,
    pub facets: BTreeMap<Dimension, FilterState>,
    /// Parent categories of the selected groups.
    pub implied_categories: BTreeSet<String>,
}

/// Constraints dropped when computing the facet for `dimension`.
///
/// The lens facet also drops `lens_type`. The category facet also drops the
/// group selection so picking a group never hides sibling categories; the
/// group facet keeps the category selection since groups nest under it.
pub fn excluded_dimensions(dimension: Dimension) -> &'static [Dimension] {
    match dimension {
        Dimension::Category => &[Dimension::Category, Dimension::Group],
        Dimension::Lens | Dimension::LensType => &[Dimension::Lens, Dimension::LensType],
        Dimension::Group => &[Dimension::Group],
        Dimension::Camera => &[Dimension::Camera],
        Dimension::Aperture => &[Dimension::Aperture],
        Dimension::ShutterSpeed => &[Dimension::ShutterSpeed],
        Dimension::Iso => &[Dimension::Iso],
        Dimension::FocalLength => &[Dimension::FocalLength],
        Dimension::TimeOfDay => &[Dimension::TimeOfDay],
    }
}

pub fn plan(filter: &FilterState, group_to_category: &BTreeMap<String, String>) -> FacetPlan {
    let facets = Dimension::FACETED
        .iter()
        .map(|dimension| (*dimension, filter.without(excluded_dimensions(*dimension))))
        .collect();

    let implied_categories = filter
        .get(Dimension::Group)
        .into_iter()
        .flatten()
        .filter_map(|group| group_to_category.get(group).cloned())
        .collect();

    FacetPlan {
        applied: filter.clone(),
        facets,
        implied_categories,
    }
}

impl FacetPlan {
    /// Distinct filters to aggregate, keyed by signature. The applied filter
    /// is always present; facets whose dimension was unconstrained share it.
    pub fn unique_filters(&self) -> BTreeMap<String, FilterState> {
        let mut unique = BTreeMap::new();
        unique.insert(self.applied.signature(), self.applied.clone());
        for filter in self.facets.values() {
            unique
                .entry(filter.signature())
                .or_insert_with(|| filter.clone());
        }
        unique
    }
}
