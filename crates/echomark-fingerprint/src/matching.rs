//! Offset-histogram matching against a catalog.
//!
//! Every query landmark that shares a hash with a catalog landmark casts a
//! vote for `query anchor time - catalog anchor time` on that recording. A
//! genuine match piles its votes into one offset bucket; chance collisions
//! scatter. Recordings are ranked by the size of their best bucket.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use echomark_core::{CatalogStore, LandmarkHash, LandmarkRecord, MatchResult, Result, SampleBuffer};

use crate::config::{MatchConfig, ScoreWeights, ValidationTolerance};
use crate::pipeline::Fingerprinter;

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    votes: u32,
    offset_sum_ms: i64,
}

/// Votes cast for one recording.
#[derive(Debug, Default)]
struct Histogram {
    offsets: BTreeMap<i64, Bucket>,
    /// Query minus catalog time delta in ms, only filled when weighting
    time_deltas: HashMap<i64, u32>,
}

/// Scores query landmarks against a [`CatalogStore`].
pub struct MatchEngine<S: CatalogStore + ?Sized> {
    store: Arc<S>,
    config: MatchConfig,
}

impl<S: CatalogStore + ?Sized> Clone for MatchEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: CatalogStore + ?Sized> MatchEngine<S> {
    /// Create an engine over `store`, rejecting an invalid `config`.
    pub fn new(store: Arc<S>, config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Matching configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// The underlying catalog.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Rank catalog recordings against `query`.
    ///
    /// Returns at most `top_n` results ordered by score, then confidence,
    /// then recording id. Recordings whose best bucket holds fewer than
    /// `min_match_count` votes are dropped. Store failures propagate.
    #[instrument(skip(self, query), fields(query_landmarks = query.len()))]
    pub async fn find_matches(&self, query: &[LandmarkRecord]) -> Result<Vec<MatchResult>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_hash: HashMap<LandmarkHash, Vec<&LandmarkRecord>> = HashMap::new();
        for record in query {
            by_hash.entry(record.hash).or_default().push(record);
        }
        let hashes: HashSet<LandmarkHash> = by_hash.keys().copied().collect();

        let candidates = self.store.query_by_hashes(&hashes).await?;
        debug!(
            distinct_hashes = hashes.len(),
            candidates = candidates.len(),
            "Fetched catalog candidates"
        );

        let mut histograms: HashMap<&str, Histogram> = HashMap::new();
        let mut rejected = 0usize;

        for stored in &candidates {
            let Some(matches) = by_hash.get(&stored.hash) else {
                continue;
            };
            for probe in matches {
                if let Some(tolerance) = &self.config.validation {
                    if !consistent(probe, stored, tolerance) {
                        rejected += 1;
                        continue;
                    }
                }

                let offset_ms = ((probe.anchor_time - stored.anchor_time) * 1000.0).round() as i64;
                let histogram = histograms.entry(stored.recording_id.as_str()).or_default();
                let bucket = histogram
                    .offsets
                    .entry(offset_ms.div_euclid(self.config.offset_bucket_ms))
                    .or_default();
                bucket.votes += 1;
                bucket.offset_sum_ms += offset_ms;

                if self.config.score_weights.is_some() {
                    let delta_ms = ((probe.time_delta - stored.time_delta) * 1000.0).round() as i64;
                    *histogram.time_deltas.entry(delta_ms).or_default() += 1;
                }
            }
        }

        let mut results: Vec<MatchResult> = histograms
            .into_iter()
            .filter_map(|(recording_id, histogram)| self.score(recording_id, &histogram))
            .collect();

        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(b.confidence.total_cmp(&a.confidence))
                .then(a.recording_id.cmp(&b.recording_id))
        });
        results.truncate(self.config.top_n);

        info!(
            matches = results.len(),
            rejected_votes = rejected,
            best = results.first().map(|r| r.recording_id.as_str()).unwrap_or("-"),
            "Matched query"
        );
        Ok(results)
    }

    /// Fingerprint `buffer` and match it.
    pub async fn identify(
        &self,
        fingerprinter: &Fingerprinter,
        buffer: &SampleBuffer,
    ) -> Result<Vec<MatchResult>> {
        let recording_id = format!("query-{}", uuid::Uuid::new_v4());
        let query = fingerprinter
            .fingerprint_blocking(buffer.clone(), recording_id)
            .await?;
        self.find_matches(&query).await
    }

    fn score(&self, recording_id: &str, histogram: &Histogram) -> Option<MatchResult> {
        let buckets = &histogram.offsets;
        let mut best: Option<(i64, Bucket)> = None;
        for (&index, &bucket) in buckets {
            if best.map_or(true, |(_, b)| bucket.votes > b.votes) {
                best = Some((index, bucket));
            }
        }
        let (best_index, best_bucket) = best?;

        if best_bucket.votes < self.config.min_match_count {
            return None;
        }

        let runner_up = buckets
            .iter()
            .filter(|(index, _)| **index != best_index)
            .map(|(_, b)| b.votes)
            .max()
            .unwrap_or(0);

        let confidence = if runner_up > 0 {
            best_bucket.votes as f64 / runner_up as f64
        } else {
            best_bucket.votes as f64
        };
        let offset_ms =
            (best_bucket.offset_sum_ms as f64 / best_bucket.votes as f64).round() as i64;

        let score = match &self.config.score_weights {
            Some(weights) => weighted_score(best_bucket.votes, histogram, weights),
            None => best_bucket.votes,
        };

        Some(MatchResult {
            recording_id: recording_id.to_string(),
            score,
            confidence,
            offset_ms,
        })
    }
}

fn weighted_score(votes: u32, histogram: &Histogram, weights: &ScoreWeights) -> u32 {
    let delta_votes = histogram.time_deltas.values().copied().max().unwrap_or(0);
    (votes as f64 * weights.count_weight + delta_votes as f64 * weights.time_delta_weight).floor() as u32
}

fn consistent(probe: &LandmarkRecord, stored: &LandmarkRecord, tolerance: &ValidationTolerance) -> bool {
    (probe.anchor_freq - stored.anchor_freq).abs() <= tolerance.freq_tolerance_hz
        && (probe.target_freq - stored.target_freq).abs() <= tolerance.freq_tolerance_hz
        && ((probe.time_delta - stored.time_delta) * 1000.0).abs() <= tolerance.time_delta_tolerance_ms
}
