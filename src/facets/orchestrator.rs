//! Concurrent facet resolution.
//!
//! A resolve call plans the applied filter plus one filter per faceted
//! dimension, aggregates each distinct filter on a blocking worker thread, and
//! assembles the results aligned to the baseline axes of the unfiltered
//! corpus.
//!
//! The parallel aggregations are independent reads. If the corpus changes
//! while they run (a session is deleted, say), individual facets may observe
//! different snapshots. Nothing crashes, but the combined result is only
//! eventually consistent in that case.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::corpus::CorpusAccessor;
use crate::error::{EngineError, EngineResult};

use super::aggregator::{aggregate, AggregateResult};
use super::cache::StatsCache;
use super::dimension::Dimension;
use super::distribution::Distribution;
use super::filter::FilterState;
use super::planner::plan;
use super::tracker::{CancelToken, RequestTracker, Sequenced, Ticket};

/// What happens when a single facet aggregation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Fall back to the applied distribution and flag the facet.
    #[default]
    Degrade,
    /// Fail the whole request.
    Strict,
}

/// Axis labels of the unfiltered corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub dataset_version: u64,
    pub axes: BTreeMap<Dimension, Vec<String>>,
    pub group_to_category: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetResult {
    pub result: AggregateResult,
    /// Set when the facet fell back to the applied result.
    pub degraded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    pub sequence: u64,
    pub dataset_version: u64,
    pub filter: FilterState,
    pub applied: AggregateResult,
    pub facets: BTreeMap<Dimension, FacetResult>,
    pub axes: BTreeMap<Dimension, Vec<String>>,
    pub group_to_category: BTreeMap<String, String>,
    pub implied_categories: BTreeSet<String>,
}

impl CombinedResult {
    /// Option counts to display under `dimension`. `lens_type` is read from
    /// the lens facet.
    pub fn facet_distribution(&self, dimension: Dimension) -> Option<&Distribution> {
        self.facets
            .get(&dimension.facet())
            .and_then(|f| f.result.distribution(dimension))
    }

    pub fn degraded_facets(&self) -> Vec<Dimension> {
        self.facets
            .iter()
            .filter(|(_, f)| f.degraded)
            .map(|(d, _)| *d)
            .collect()
    }
}

impl Sequenced for CombinedResult {
    fn sequence(&self) -> u64 {
        self.sequence
    }
}

pub struct FacetEngine {
    corpus: Arc<dyn CorpusAccessor>,
    tracker: RequestTracker,
    cache: Option<StatsCache>,
    baseline: Mutex<Option<Arc<Baseline>>>,
    mode: FailureMode,
    facet_timeout: Duration,
    parallel: bool,
}

impl FacetEngine {
    pub fn new(corpus: Arc<dyn CorpusAccessor>, config: &Config) -> Self {
        Self {
            corpus,
            tracker: RequestTracker::new(),
            cache: config
                .cache
                .enabled
                .then(|| StatsCache::new(config.cache.capacity)),
            baseline: Mutex::new(None),
            mode: config.engine.mode,
            facet_timeout: Duration::from_millis(config.engine.facet_timeout_ms),
            parallel: config.engine.parallel_aggregation,
        }
    }

    pub fn mode(&self) -> FailureMode {
        self.mode
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    pub async fn resolve(&self, filter: FilterState) -> EngineResult<CombinedResult> {
        self.resolve_with_mode(filter, self.mode).await
    }

    /// Resolve `filter`, superseding any request still in flight.
    ///
    /// Fails with `Superseded` when a newer request starts before this one
    /// finishes, regardless of which completes first.
    pub async fn resolve_with_mode(
        &self,
        filter: FilterState,
        mode: FailureMode,
    ) -> EngineResult<CombinedResult> {
        let ticket = self.tracker.begin();
        let started = Instant::now();
        info!(
            sequence = ticket.sequence,
            filter = %filter.signature(),
            ?mode,
            "Resolving facets"
        );

        let outcome = self.run(&ticket, filter, mode).await;
        self.tracker.finish(&ticket);

        // A stale request reports Superseded whatever its own outcome was.
        if !self.tracker.is_current(ticket.sequence) {
            if let Err(e) = &outcome {
                debug!(sequence = ticket.sequence, error = %e, "Dropping error of superseded request");
            }
            return Err(self.superseded(&ticket));
        }
        let result = match outcome {
            Err(EngineError::Cancelled) => return Err(self.superseded(&ticket)),
            other => other?,
        };

        info!(
            sequence = ticket.sequence,
            total_photos = result.applied.total_photos,
            degraded = result.degraded_facets().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Facets resolved"
        );
        Ok(result)
    }

    fn superseded(&self, ticket: &Ticket) -> EngineError {
        EngineError::Superseded {
            sequence: ticket.sequence,
            latest: self.tracker.latest(),
        }
    }

    /// Run `f` against the corpus on a blocking thread, bounded by the facet
    /// timeout.
    async fn blocking<T, F>(&self, label: String, f: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CorpusAccessor) -> EngineResult<T> + Send + 'static,
    {
        run_blocking(self.corpus.clone(), self.facet_timeout, label, f).await
    }

    async fn baseline(&self, dataset_version: u64, cancel: &CancelToken) -> EngineResult<Arc<Baseline>> {
        if let Some(baseline) = self.cached_baseline(dataset_version) {
            return Ok(baseline);
        }

        let unfiltered = FilterState::new();
        let signature = unfiltered.signature();
        let cached = self
            .cache
            .as_ref()
            .and_then(|c| c.get(&signature, dataset_version))
            .map(|s| s.result);

        let parallel = self.parallel;
        let cancel = cancel.clone();
        let (result, group_to_category) = self
            .blocking("baseline".to_string(), move |corpus| {
                let result = match cached {
                    Some(result) => result,
                    None => aggregate(corpus, &unfiltered, &cancel, parallel)?,
                };
                Ok((result, corpus.group_to_category()?))
            })
            .await?;

        if let Some(cache) = &self.cache {
            cache.insert(signature, dataset_version, result.clone());
        }

        let axes = result
            .distributions
            .iter()
            .map(|(dimension, distribution)| {
                (*dimension, distribution.labels().map(str::to_string).collect())
            })
            .collect();
        let baseline = Arc::new(Baseline {
            dataset_version,
            axes,
            group_to_category,
        });

        debug!(dataset_version, "Baseline recomputed");
        if let Ok(mut guard) = self.baseline.lock() {
            *guard = Some(baseline.clone());
        }
        Ok(baseline)
    }

    fn cached_baseline(&self, dataset_version: u64) -> Option<Arc<Baseline>> {
        let guard = self.baseline.lock().ok()?;
        guard
            .as_ref()
            .filter(|b| b.dataset_version == dataset_version)
            .cloned()
    }

    async fn run(
        &self,
        ticket: &Ticket,
        filter: FilterState,
        mode: FailureMode,
    ) -> EngineResult<CombinedResult> {
        let dataset_version = self
            .blocking("dataset_version".to_string(), |corpus| corpus.dataset_version())
            .await?;
        let baseline = self.baseline(dataset_version, &ticket.cancel).await?;
        let plan = plan(&filter, &baseline.group_to_category);

        let mut outcomes: HashMap<String, EngineResult<AggregateResult>> = HashMap::new();
        let mut pending = JoinSet::new();

        for (signature, facet_filter) in plan.unique_filters() {
            if let Some(hit) = self
                .cache
                .as_ref()
                .and_then(|c| c.get(&signature, dataset_version))
            {
                debug!(filter = %signature, "Aggregate served from cache");
                outcomes.insert(signature, Ok(hit.result));
                continue;
            }

            let corpus = self.corpus.clone();
            let cancel = ticket.cancel.clone();
            let timeout = self.facet_timeout;
            let parallel = self.parallel;
            pending.spawn(async move {
                let label = signature.clone();
                let outcome = run_blocking(corpus, timeout, label, move |corpus| {
                    aggregate(corpus, &facet_filter, &cancel, parallel)
                })
                .await;
                (signature, outcome)
            });
        }

        debug!(
            sequence = ticket.sequence,
            spawned = pending.len(),
            cached = outcomes.len(),
            "Fanned out aggregations"
        );

        while let Some(joined) = pending.join_next().await {
            if ticket.cancel.is_cancelled() {
                pending.abort_all();
                return Err(EngineError::Cancelled);
            }
            match joined {
                Ok((signature, outcome)) => {
                    if let (Some(cache), Ok(result)) = (&self.cache, &outcome) {
                        cache.insert(signature.clone(), dataset_version, result.clone());
                    }
                    outcomes.insert(signature, outcome);
                }
                Err(e) => warn!(error = %e, "Aggregation task lost"),
            }
        }

        let applied_signature = plan.applied.signature();
        let mut applied = match outcomes.remove(&applied_signature) {
            Some(Ok(result)) => result,
            Some(Err(e)) => return Err(e),
            None => {
                return Err(EngineError::AggregationFailed {
                    facet: "applied".to_string(),
                    reason: "task lost".to_string(),
                })
            }
        };

        let mut facets = BTreeMap::new();
        for (dimension, facet_filter) in &plan.facets {
            let signature = facet_filter.signature();
            let outcome = if signature == applied_signature {
                Ok(applied.clone())
            } else {
                match outcomes.get(&signature) {
                    Some(outcome) => outcome.clone(),
                    None => Err(EngineError::AggregationFailed {
                        facet: dimension.to_string(),
                        reason: "task lost".to_string(),
                    }),
                }
            };

            let facet = match outcome {
                Ok(mut result) => {
                    result.align_to(&baseline.axes);
                    FacetResult {
                        result,
                        degraded: false,
                        degraded_reason: None,
                    }
                }
                Err(e) if mode == FailureMode::Degrade && e.is_degradable() => {
                    warn!(
                        sequence = ticket.sequence,
                        facet = %dimension,
                        error = %e,
                        "Facet degraded to applied distribution"
                    );
                    let mut result = applied.clone();
                    result.align_to(&baseline.axes);
                    FacetResult {
                        result,
                        degraded: true,
                        degraded_reason: Some(e.to_string()),
                    }
                }
                Err(e) => return Err(e),
            };
            facets.insert(*dimension, facet);
        }

        applied.align_to(&baseline.axes);

        Ok(CombinedResult {
            sequence: ticket.sequence,
            dataset_version,
            filter: plan.applied,
            applied,
            facets,
            axes: baseline.axes.clone(),
            group_to_category: baseline.group_to_category.clone(),
            implied_categories: plan.implied_categories,
        })
    }
}

async fn run_blocking<T, F>(
    corpus: Arc<dyn CorpusAccessor>,
    timeout: Duration,
    label: String,
    f: F,
) -> EngineResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn CorpusAccessor) -> EngineResult<T> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(move || f(corpus.as_ref()));
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Err(EngineError::AggregationFailed {
            facet: label,
            reason: e.to_string(),
        }),
        Err(_) => Err(EngineError::FacetTimeout {
            facet: label,
            after_ms: timeout.as_millis() as u64,
        }),
    }
}
