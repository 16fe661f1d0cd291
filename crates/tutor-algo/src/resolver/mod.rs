//! Nearest-valid-action resolution.
//!
//! A model emits a real-valued vector over the topology columns. It is
//! rarely a legal action itself, so [`ActionDistanceResolver::rank`] orders
//! the legal actions of one substation by distance to it.
//!
//! ## Substation choice
//!
//! The caller may name the substation. Otherwise the one with the largest
//! summed prediction over its columns is used, among substations that have
//! actions and are listed in `legal_substations` (when given). Ties go to
//! the lower id.
//!
//! ## Ordering
//!
//! A stable sort by distance: equal distances keep generation order, so the
//! ranking is deterministic. Distances are taken over the target
//! substation's columns only.

pub mod encoding;
pub mod substation;

use serde::Serialize;
use tutor_core::{DistanceMetric, SubstationId, TutorError, TutorResult};

use crate::action_space::ActionSpace;

pub use encoding::{distance, ActionEncoding};
pub use substation::{
    label_substation, most_activated_among, most_activated_substation, restrict_to_candidates,
    restrict_to_substation, substation_sums, CHANGE_THRESHOLD,
};

/// One legal action with its distance to the prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedAction {
    /// Global index into the action space
    pub action_index: usize,
    pub distance: f64,
    /// Encoded full-grid vector
    pub vector: Vec<u8>,
}

/// All legal actions of one substation, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub substation: SubstationId,
    pub actions: Vec<RankedAction>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn nearest(&self) -> Option<&RankedAction> {
        self.actions.first()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.actions.iter().map(|a| a.action_index).collect()
    }

    /// Position of `vector` in the ranking.
    pub fn position_of(&self, vector: &[u8]) -> Option<usize> {
        self.actions.iter().position(|a| a.vector == vector)
    }
}

pub struct ActionDistanceResolver<'a> {
    space: &'a ActionSpace,
    metric: DistanceMetric,
    encoding: ActionEncoding,
}

impl<'a> ActionDistanceResolver<'a> {
    pub fn new(space: &'a ActionSpace) -> Self {
        Self {
            space,
            metric: DistanceMetric::default(),
            encoding: ActionEncoding::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_encoding(mut self, encoding: ActionEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn encoding(&self) -> &ActionEncoding {
        &self.encoding
    }

    fn is_eligible(&self, id: SubstationId, legal: Option<&[SubstationId]>) -> bool {
        self.space.has_actions(id) && legal.map_or(true, |l| l.contains(&id))
    }

    /// Eligible substation with the largest summed prediction.
    pub fn select_substation(
        &self,
        prediction: &[f64],
        legal_substations: Option<&[SubstationId]>,
    ) -> TutorResult<SubstationId> {
        let mut best: Option<(SubstationId, f64)> = None;
        for range in self.space.substations() {
            if !self.is_eligible(range.substation, legal_substations) {
                continue;
            }
            let activation: f64 = range.columns.iter().map(|&c| prediction[c]).sum();
            let better = match best {
                None => true,
                Some((id, b)) => activation > b || (activation == b && range.substation < id),
            };
            if better {
                best = Some((range.substation, activation));
            }
        }
        best.map(|(id, _)| id).ok_or_else(|| {
            TutorError::invalid("no eligible substation has legal actions")
        })
    }

    /// Rank every legal action of one substation by distance to `prediction`.
    pub fn rank(
        &self,
        prediction: &[f64],
        substation: Option<SubstationId>,
        legal_substations: Option<&[SubstationId]>,
    ) -> TutorResult<Ranking> {
        let n = self.space.n_objects();
        if prediction.len() != n {
            return Err(TutorError::invalid(format!(
                "prediction has {} entries, action space has {} objects",
                prediction.len(),
                n
            )));
        }
        if let Some(bad) = prediction.iter().position(|v| !v.is_finite()) {
            return Err(TutorError::invalid(format!(
                "prediction entry {} is not finite",
                bad
            )));
        }
        self.encoding.check_width(n)?;

        let target = match substation {
            Some(id) => {
                if let Some(legal) = legal_substations {
                    if !legal.contains(&id) {
                        return Err(TutorError::invalid(format!(
                            "substation {} is not in the legal set",
                            id
                        )));
                    }
                }
                if !self.space.has_actions(id) {
                    return Err(TutorError::invalid(format!(
                        "substation {} has no legal actions",
                        id
                    )));
                }
                id
            }
            None => self.select_substation(prediction, legal_substations)?,
        };

        let slice = self.space.actions_for_substation(target);
        let columns = slice.columns();
        let mut actions: Vec<RankedAction> = slice
            .iter()
            .filter_map(|(index, row)| {
                let vector = self.encoding.encode(row)?;
                Some(RankedAction {
                    action_index: index,
                    distance: distance(self.metric, &vector, prediction, columns),
                    vector,
                })
            })
            .collect();
        actions.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        Ok(Ranking {
            substation: target,
            actions,
        })
    }

    /// Closest legal action, if the substation has any left after encoding.
    pub fn nearest(
        &self,
        prediction: &[f64],
        substation: Option<SubstationId>,
        legal_substations: Option<&[SubstationId]>,
    ) -> TutorResult<Option<RankedAction>> {
        let ranking = self.rank(prediction, substation, legal_substations)?;
        Ok(ranking.actions.into_iter().next())
    }
}
