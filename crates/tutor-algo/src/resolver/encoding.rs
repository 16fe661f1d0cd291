//! Action encodings and distance metrics.

use tutor_core::{DistanceMetric, EncodingKind, TutorError, TutorResult};

/// How a set-busbar action is mapped into prediction space.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionEncoding {
    /// Raw busbar numbers: 0 untouched, 1 or 2 inside the substation.
    #[default]
    Assignment,
    /// 1 where the action puts an object on busbar 2.
    SecondBusbar,
    /// 1 where the action moves an object away from its current busbar.
    ///
    /// `current` is the grid's topology vector: 1 or 2 per connected
    /// object, 0 for disconnected ones (never counted as changed).
    TopologyChange { current: Vec<u8> },
}

impl ActionEncoding {
    /// Build from a config-level kind; `TopologyChange` needs the current
    /// topology vector.
    pub fn from_kind(kind: EncodingKind, current: Option<Vec<u8>>) -> TutorResult<Self> {
        match (kind, current) {
            (EncodingKind::Assignment, _) => Ok(ActionEncoding::Assignment),
            (EncodingKind::SecondBusbar, _) => Ok(ActionEncoding::SecondBusbar),
            (EncodingKind::TopologyChange, Some(current)) => {
                Ok(ActionEncoding::TopologyChange { current })
            }
            (EncodingKind::TopologyChange, None) => Err(TutorError::invalid(
                "topology-change encoding requires the current topology vector",
            )),
        }
    }

    pub fn kind(&self) -> EncodingKind {
        match self {
            ActionEncoding::Assignment => EncodingKind::Assignment,
            ActionEncoding::SecondBusbar => EncodingKind::SecondBusbar,
            ActionEncoding::TopologyChange { .. } => EncodingKind::TopologyChange,
        }
    }

    pub(crate) fn check_width(&self, n_objects: usize) -> TutorResult<()> {
        if let ActionEncoding::TopologyChange { current } = self {
            if current.len() != n_objects {
                return Err(TutorError::invalid(format!(
                    "current topology vector has {} entries, expected {}",
                    current.len(),
                    n_objects
                )));
            }
            if let Some(bad) = current.iter().find(|&&v| v > 2) {
                return Err(TutorError::invalid(format!(
                    "current topology vector holds busbar {}",
                    bad
                )));
            }
        }
        Ok(())
    }

    /// Encode one set-busbar row.
    ///
    /// Returns `None` when the action is physically a no-op under this
    /// encoding (no object changes, or every object on the substation
    /// swaps busbar, which only relabels them).
    pub fn encode(&self, action: &[u8]) -> Option<Vec<u8>> {
        match self {
            ActionEncoding::Assignment => Some(action.to_vec()),
            ActionEncoding::SecondBusbar => {
                Some(action.iter().map(|&v| u8::from(v == 2)).collect())
            }
            ActionEncoding::TopologyChange { current } => {
                let mut touched = 0usize;
                let mut changed = 0usize;
                let encoded: Vec<u8> = action
                    .iter()
                    .zip(current)
                    .map(|(&set, &cur)| {
                        if set == 0 || cur == 0 {
                            return 0;
                        }
                        touched += 1;
                        if set != cur {
                            changed += 1;
                            1
                        } else {
                            0
                        }
                    })
                    .collect();
                if changed == 0 || changed == touched {
                    None
                } else {
                    Some(encoded)
                }
            }
        }
    }
}

/// Distance between an encoded action and a prediction of the same width,
/// summed over `columns` only.
pub fn distance(
    metric: DistanceMetric,
    encoded: &[u8],
    prediction: &[f64],
    columns: &[usize],
) -> f64 {
    let diffs = columns
        .iter()
        .map(|&c| f64::from(encoded[c]) - prediction[c]);
    match metric {
        DistanceMetric::L1 => diffs.map(f64::abs).sum(),
        DistanceMetric::L2 => diffs.map(|d| d * d).sum(),
    }
}
