//! Frequency distributions and weighted hit rate for one effective filter.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::corpus::{CorpusAccessor, Photo, Session, WEEKDAYS};
use crate::error::{EngineError, EngineResult};

use super::dimension::{AxisOrder, Dimension};
use super::distribution::Distribution;
use super::filter::FilterState;
use super::lens::FocalLengthReport;
use super::tracker::CancelToken;
use super::values::photo_label;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub total_photos: u64,
    /// Sessions with at least one matching photo.
    pub total_sessions: u64,
    pub distributions: BTreeMap<Dimension, Distribution>,
    /// Report-only weekday histogram, Monday first.
    pub day_of_week: Distribution,
    /// Prime values and zoom ranges derived from this result's own
    /// focal-length distribution.
    pub focal_lengths: FocalLengthReport,
    /// `None` when no matching session has a RAW count.
    pub hit_rate: Option<f64>,
    pub hit_rate_numerator: i64,
    pub hit_rate_denominator: i64,
}

impl AggregateResult {
    pub fn distribution(&self, dimension: Dimension) -> Option<&Distribution> {
        self.distributions.get(&dimension)
    }

    /// Re-key every distribution onto the given axis labels.
    pub fn align_to(&mut self, axes: &BTreeMap<Dimension, Vec<String>>) {
        for (dimension, distribution) in self.distributions.iter_mut() {
            if let Some(axis) = axes.get(dimension) {
                *distribution = distribution.aligned_to(axis);
            }
        }
    }
}

#[derive(Default)]
struct Tally {
    total: u64,
    counts: HashMap<Dimension, HashMap<String, u64>>,
    weekdays: HashMap<String, u64>,
    sessions: BTreeSet<i64>,
}

impl Tally {
    fn add(mut self, photo: &Photo) -> Self {
        self.total += 1;
        self.sessions.insert(photo.session_id);
        for dimension in Dimension::ALL {
            if let Some(label) = photo_label(photo, dimension) {
                *self
                    .counts
                    .entry(dimension)
                    .or_default()
                    .entry(label)
                    .or_default() += 1;
            }
        }
        if let Some(day) = photo.day_of_week() {
            *self.weekdays.entry(day).or_default() += 1;
        }
        self
    }

    fn merge(mut self, other: Tally) -> Self {
        self.total += other.total;
        self.sessions.extend(other.sessions);
        for (dimension, counts) in other.counts {
            let target = self.counts.entry(dimension).or_default();
            for (label, count) in counts {
                *target.entry(label).or_default() += count;
            }
        }
        for (day, count) in other.weekdays {
            *self.weekdays.entry(day).or_default() += count;
        }
        self
    }
}

/// Sum kept and RAW counts over sessions that have a RAW count, then divide.
///
/// Returns `(numerator, denominator, rate)`. Sessions without a positive RAW
/// count contribute to neither sum.
pub fn weighted_hit_rate<'a, I>(sessions: I) -> (i64, i64, Option<f64>)
where
    I: IntoIterator<Item = &'a Session>,
{
    let (numerator, denominator) = sessions
        .into_iter()
        .filter_map(|s| {
            s.total_raw_photos
                .filter(|raw| *raw > 0)
                .map(|raw| (s.total_photos, raw))
        })
        .fold((0i64, 0i64), |(n, d), (photos, raw)| (n + photos, d + raw));

    let rate = (denominator > 0).then(|| numerator as f64 / denominator as f64 * 100.0);
    (numerator, denominator, rate)
}

/// Aggregate every photo matching `filter`.
///
/// The accessor may return a superset of the matching photos; each record is
/// checked against the filter again before it is counted.
pub fn aggregate<C>(
    corpus: &C,
    filter: &FilterState,
    cancel: &CancelToken,
    parallel: bool,
) -> EngineResult<AggregateResult>
where
    C: CorpusAccessor + ?Sized,
{
    let photos = corpus.query(filter, cancel)?;
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let tally = if parallel {
        photos
            .par_iter()
            .filter(|photo| filter.matches(photo))
            .fold(Tally::default, |tally, photo| tally.add(photo))
            .reduce(Tally::default, Tally::merge)
    } else {
        photos
            .iter()
            .filter(|photo| filter.matches(photo))
            .fold(Tally::default(), |tally, photo| tally.add(photo))
    };
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    let sessions = corpus.sessions()?;
    let matched_sessions: Vec<&Session> = sessions
        .iter()
        .filter(|s| tally.sessions.contains(&s.id))
        .collect();
    let (hit_rate_numerator, hit_rate_denominator, hit_rate) =
        weighted_hit_rate(matched_sessions.iter().copied());

    let mut counts = tally.counts;
    let distributions: BTreeMap<Dimension, Distribution> = Dimension::ALL
        .iter()
        .map(|dimension| {
            let values = counts.remove(dimension).unwrap_or_default();
            (*dimension, Distribution::from_counts(dimension.axis_order(), values))
        })
        .collect();

    let focal_lengths = distributions
        .get(&Dimension::FocalLength)
        .map(|d| {
            FocalLengthReport::from_counts(
                d.entries()
                    .iter()
                    .filter_map(|e| e.value.parse::<f64>().ok().map(|f| (f, e.count))),
            )
        })
        .unwrap_or_default();

    tracing::debug!(
        filter = %filter.signature(),
        fetched = photos.len(),
        matched = tally.total,
        "Aggregated corpus slice"
    );

    Ok(AggregateResult {
        total_photos: tally.total,
        total_sessions: matched_sessions.len() as u64,
        distributions,
        day_of_week: Distribution::from_counts(AxisOrder::Fixed(&WEEKDAYS), tally.weekdays),
        focal_lengths,
        hit_rate,
        hit_rate_numerator,
        hit_rate_denominator,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MemoryCorpus;

    fn scenario_corpus() -> MemoryCorpus {
        let session = Session {
            id: 1,
            name: "s".into(),
            category: "Sport".into(),
            group: "Run".into(),
            total_photos: 3,
            total_raw_photos: Some(12),
        };
        let photo = |id, camera: &str, lens: &str, aperture| Photo {
            id,
            session_id: 1,
            camera: Some(camera.to_string()),
            lens: Some(lens.to_string()),
            aperture: Some(aperture),
            category: "Sport".into(),
            group: "Run".into(),
            ..Default::default()
        };
        MemoryCorpus::new(
            vec![session],
            vec![photo(1, "A", "L1", 1.8), photo(2, "A", "L2", 2.8), photo(3, "B", "L1", 1.8)],
        )
    }

    #[test]
    fn test_applied_counts() {
        let corpus = scenario_corpus();
        let filter = FilterState::new().set_single(Dimension::Camera, "A").unwrap();
        for parallel in [false, true] {
            let result = aggregate(&corpus, &filter, &CancelToken::new(), parallel).unwrap();
            assert_eq!(result.total_photos, 2);
            let lens = result.distribution(Dimension::Lens).unwrap();
            assert_eq!(lens.get("L1"), 1);
            assert_eq!(lens.get("L2"), 1);
            let aperture = result.distribution(Dimension::Aperture).unwrap();
            assert_eq!(aperture.labels().collect::<Vec<_>>(), vec!["1.8", "2.8"]);
        }
    }

    #[test]
    fn test_hit_rate_is_weighted_not_averaged() {
        let a = Session { id: 1, total_photos: 10, total_raw_photos: Some(100), ..Default::default() };
        let b = Session { id: 2, total_photos: 100, total_raw_photos: Some(100), ..Default::default() };
        let (numerator, denominator, rate) = weighted_hit_rate([&a, &b]);
        assert_eq!(numerator, 110);
        assert_eq!(denominator, 200);
        assert!((rate.unwrap() - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_rate_skips_sessions_without_raw() {
        let a = Session { id: 1, total_photos: 10, total_raw_photos: Some(40), ..Default::default() };
        let b = Session { id: 2, total_photos: 90, total_raw_photos: None, ..Default::default() };
        let (numerator, denominator, rate) = weighted_hit_rate([&a, &b]);
        assert_eq!((numerator, denominator), (10, 40));
        assert!((rate.unwrap() - 25.0).abs() < 1e-9);

        assert_eq!(weighted_hit_rate([&b]), (0, 0, None));
    }

    #[test]
    fn test_hit_rate_skips_sessions_with_zero_raw() {
        let empty_raw = Session { id: 1, total_photos: 10, total_raw_photos: Some(0), ..Default::default() };
        let counted = Session { id: 2, total_photos: 10, total_raw_photos: Some(100), ..Default::default() };
        assert_eq!(empty_raw.hit_rate(), None);

        let (numerator, denominator, rate) = weighted_hit_rate([&empty_raw, &counted]);
        assert_eq!((numerator, denominator), (10, 100));
        assert!((rate.unwrap() - 10.0).abs() < 1e-9);

        assert_eq!(weighted_hit_rate([&empty_raw]), (0, 0, None));
    }

    #[test]
    fn test_hit_rate_only_counts_matching_sessions() {
        let sessions = vec![
            Session { id: 1, category: "Sport".into(), group: "Run".into(), total_photos: 10, total_raw_photos: Some(100), ..Default::default() },
            Session { id: 2, category: "Family".into(), group: "Home".into(), total_photos: 100, total_raw_photos: Some(100), ..Default::default() },
            Session { id: 3, category: "Family".into(), group: "Home".into(), total_photos: 1, total_raw_photos: None, ..Default::default() },
        ];
        let photos = vec![
            Photo { id: 1, session_id: 1, category: "Sport".into(), group: "Run".into(), ..Default::default() },
            Photo { id: 2, session_id: 2, category: "Family".into(), group: "Home".into(), ..Default::default() },
            Photo { id: 3, session_id: 3, category: "Family".into(), group: "Home".into(), ..Default::default() },
        ];
        let corpus = MemoryCorpus::new(sessions, photos);

        let all = aggregate(&corpus, &FilterState::new(), &CancelToken::new(), false).unwrap();
        assert_eq!(all.total_photos, 3);
        assert_eq!(all.total_sessions, 3);
        assert!((all.hit_rate.unwrap() - 55.0).abs() < 1e-9);

        let family = FilterState::new().set_single(Dimension::Category, "Family").unwrap();
        let result = aggregate(&corpus, &family, &CancelToken::new(), false).unwrap();
        assert_eq!(result.total_photos, 2);
        assert_eq!((result.hit_rate_numerator, result.hit_rate_denominator), (100, 100));
    }

    #[test]
    fn test_focal_report_follows_filter() {
        let photos = vec![
            Photo { id: 1, session_id: 1, camera: Some("A".into()), focal_length: Some(50.0), ..Default::default() },
            Photo { id: 2, session_id: 1, camera: Some("A".into()), focal_length: Some(72.0), ..Default::default() },
            Photo { id: 3, session_id: 1, camera: Some("B".into()), focal_length: Some(35.0), ..Default::default() },
        ];
        let corpus = MemoryCorpus::new(vec![Session { id: 1, ..Default::default() }], photos);
        let filter = FilterState::new().set_single(Dimension::Camera, "A").unwrap();
        let result = aggregate(&corpus, &filter, &CancelToken::new(), false).unwrap();
        assert_eq!(result.focal_lengths.primes, vec![("50".to_string(), 1)]);
        assert_eq!(result.focal_lengths.zoom_ranges, vec![("70-79".to_string(), 1)]);
    }

    #[test]
    fn test_monotonic_narrowing() {
        let corpus = scenario_corpus();
        let token = CancelToken::new();
        let broad = FilterState::new().set_single(Dimension::Lens, "L1").unwrap();
        let narrow = broad.set_single(Dimension::Camera, "B").unwrap();
        assert!(broad.is_subset_of(&narrow));

        let broad_total = aggregate(&corpus, &broad, &token, false).unwrap().total_photos;
        let narrow_total = aggregate(&corpus, &narrow, &token, false).unwrap().total_photos;
        let all_total = aggregate(&corpus, &FilterState::new(), &token, false).unwrap().total_photos;
        assert!(narrow_total <= broad_total);
        assert!(broad_total <= all_total);
    }

    #[test]
    fn test_cancelled_aggregation() {
        let token = CancelToken::new();
        token.cancel();
        let result = aggregate(&scenario_corpus(), &FilterState::new(), &token, true);
        assert_eq!(result, Err(EngineError::Cancelled));
    }
}
