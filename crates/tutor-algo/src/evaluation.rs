//! Validation statistics over resolver output.
//!
//! Labels are compared with ranked actions by vector equality, so they must
//! be expressed in the same encoding the resolver used.

use std::collections::BTreeMap;

use serde::Serialize;
use tutor_core::SubstationId;

use crate::resolver::{ActionEncoding, Ranking};

/// Round a float label to busbar numbers (0, 1 or 2).
pub fn round_label(values: &[f64]) -> Vec<u8> {
    values
        .iter()
        .map(|v| v.round().clamp(0.0, 2.0) as u8)
        .collect()
}

/// Round a float label and express it in `encoding`, so it can be matched
/// against a ranking built with that encoding.
///
/// A label that encodes to no change becomes all zeros, which never
/// matches a ranked action.
pub fn encode_label(encoding: &ActionEncoding, values: &[f64]) -> Vec<u8> {
    let rounded = round_label(values);
    encoding
        .encode(&rounded)
        .unwrap_or_else(|| vec![0; rounded.len()])
}

/// Position of `label` in `ranking`, if it is ranked at all.
pub fn rank_of(ranking: &Ranking, label: &[u8]) -> Option<usize> {
    ranking.position_of(label)
}

/// Running mean without storing samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IncrementalAverage {
    value: f64,
    n: usize,
}

impl IncrementalAverage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sample: f64) {
        self.n += 1;
        self.value += (sample - self.value) / self.n as f64;
    }

    /// Current mean; 0 before any sample.
    pub fn get(&self) -> f64 {
        self.value
    }

    pub fn count(&self) -> usize {
        self.n
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Default)]
struct ClassTally {
    hits: usize,
    total: usize,
}

/// Accumulates accuracy and rank statistics over a validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationStats {
    top1: IncrementalAverage,
    substation: IncrementalAverage,
    mean_rank: IncrementalAverage,
    // keyed by label substation, `None` is the do-nothing class
    classes: BTreeMap<Option<SubstationId>, ClassTally>,
    rank_histogram: BTreeMap<usize, usize>,
    unranked: usize,
}

impl ValidationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one datapoint and return the label's rank.
    pub fn record(
        &mut self,
        ranking: &Ranking,
        label: &[u8],
        label_substation: Option<SubstationId>,
    ) -> Option<usize> {
        let rank = rank_of(ranking, label);
        let hit = rank == Some(0);

        self.top1.add(f64::from(u8::from(hit)));
        self.substation
            .add(f64::from(u8::from(label_substation == Some(ranking.substation))));

        let tally = self.classes.entry(label_substation).or_default();
        tally.total += 1;
        if hit {
            tally.hits += 1;
        }

        match rank {
            Some(r) => {
                *self.rank_histogram.entry(r).or_insert(0) += 1;
                self.mean_rank.add(r as f64);
            }
            None => self.unranked += 1,
        }
        rank
    }

    pub fn count(&self) -> usize {
        self.top1.count()
    }

    /// Top-1 accuracy over all datapoints.
    pub fn accuracy_micro(&self) -> f64 {
        self.top1.get()
    }

    /// Mean of the per-label-substation top-1 accuracies.
    pub fn accuracy_macro(&self) -> f64 {
        if self.classes.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .classes
            .values()
            .map(|t| t.hits as f64 / t.total as f64)
            .sum();
        sum / self.classes.len() as f64
    }

    pub fn substation_accuracy(&self) -> f64 {
        self.substation.get()
    }

    pub fn rank_histogram(&self) -> &BTreeMap<usize, usize> {
        &self.rank_histogram
    }

    /// Datapoints whose label did not appear in the ranking.
    pub fn unranked(&self) -> usize {
        self.unranked
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary {
            count: self.count(),
            accuracy_micro: self.accuracy_micro(),
            accuracy_macro: self.accuracy_macro(),
            substation_accuracy: self.substation_accuracy(),
            mean_rank: (self.mean_rank.count() > 0).then(|| self.mean_rank.get()),
            rank_histogram: self.rank_histogram.clone(),
            unranked: self.unranked,
            per_substation: self
                .classes
                .iter()
                .map(|(&substation, t)| ClassAccuracy {
                    substation,
                    count: t.total,
                    accuracy: t.hits as f64 / t.total as f64,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassAccuracy {
    /// `None` for do-nothing labels
    pub substation: Option<SubstationId>,
    pub count: usize,
    pub accuracy: f64,
}

/// Serializable snapshot of [`ValidationStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub count: usize,
    pub accuracy_micro: f64,
    pub accuracy_macro: f64,
    pub substation_accuracy: f64,
    pub mean_rank: Option<f64>,
    pub rank_histogram: BTreeMap<usize, usize>,
    pub unranked: usize,
    pub per_substation: Vec<ClassAccuracy>,
}

/// Stops a training loop once the validation score stops improving.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    countdown: usize,
    best: Option<f64>,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            countdown: patience,
            best: None,
        }
    }

    /// Feed one score (higher is better). Returns true when training
    /// should stop.
    pub fn observe(&mut self, score: f64) -> bool {
        if self.best.map_or(true, |best| score > best) {
            self.best = Some(score);
            self.countdown = self.patience;
            return false;
        }
        self.countdown = self.countdown.saturating_sub(1);
        self.countdown == 0
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    pub fn remaining(&self) -> usize {
        self.countdown
    }
}
