//! Per-substation views of prediction and label vectors.

use tutor_core::{GridTopology, SubstationId, TutorError, TutorResult};

/// Default activation below which a vector counts as "no change".
pub const CHANGE_THRESHOLD: f64 = 0.5;

fn check_width(grid: &GridTopology, values: &[f64]) -> TutorResult<()> {
    if values.len() != grid.n_objects() {
        return Err(TutorError::invalid(format!(
            "vector has {} entries, grid '{}' has {} objects",
            values.len(),
            grid.name(),
            grid.n_objects()
        )));
    }
    Ok(())
}

/// Sum of `values` over each substation's columns, indexed by substation id.
pub fn substation_sums(grid: &GridTopology, values: &[f64]) -> TutorResult<Vec<f64>> {
    check_width(grid, values)?;
    grid.substation_ids()
        .map(|id| Ok(grid.columns(id)?.map(|c| values[c]).sum()))
        .collect()
}

/// Substation with the largest summed activation; ties go to the lower id.
/// `None` when every entry is below `threshold`.
pub fn most_activated_substation(
    grid: &GridTopology,
    values: &[f64],
    threshold: f64,
) -> TutorResult<Option<SubstationId>> {
    let all: Vec<SubstationId> = grid.substation_ids().collect();
    most_activated_among(grid, values, threshold, &all)
}

/// Like [`most_activated_substation`], but only `candidates` compete and
/// only their columns count towards `threshold`.
pub fn most_activated_among(
    grid: &GridTopology,
    values: &[f64],
    threshold: f64,
    candidates: &[SubstationId],
) -> TutorResult<Option<SubstationId>> {
    check_width(grid, values)?;
    let mut reached = false;
    let mut best: Option<(SubstationId, f64)> = None;
    for &id in candidates {
        let columns = grid.columns(id)?;
        reached |= columns.clone().any(|c| values[c] >= threshold);
        let sum: f64 = columns.map(|c| values[c]).sum();
        let better = match best {
            None => true,
            Some((best_id, b)) => sum > b || (sum == b && id < best_id),
        };
        if better {
            best = Some((id, sum));
        }
    }
    Ok(best.filter(|_| reached).map(|(id, _)| id))
}

/// Zero every entry outside the most-activated substation.
///
/// Returns the masked vector and the substation kept, or an all-zero
/// vector and `None` when nothing reaches `threshold`.
pub fn restrict_to_substation(
    grid: &GridTopology,
    prediction: &[f64],
    threshold: f64,
) -> TutorResult<(Vec<f64>, Option<SubstationId>)> {
    let all: Vec<SubstationId> = grid.substation_ids().collect();
    restrict_to_candidates(grid, prediction, threshold, &all)
}

/// [`restrict_to_substation`] limited to `candidates`, typically the
/// substations that have actions.
pub fn restrict_to_candidates(
    grid: &GridTopology,
    prediction: &[f64],
    threshold: f64,
    candidates: &[SubstationId],
) -> TutorResult<(Vec<f64>, Option<SubstationId>)> {
    let mut masked = vec![0.0; prediction.len()];
    let Some(sub) = most_activated_among(grid, prediction, threshold, candidates)? else {
        return Ok((masked, None));
    };
    for c in grid.columns(sub)? {
        masked[c] = prediction[c];
    }
    Ok((masked, Some(sub)))
}

/// Substation changed by a label vector, `None` for a do-nothing label.
pub fn label_substation(grid: &GridTopology, label: &[f64]) -> TutorResult<Option<SubstationId>> {
    most_activated_substation(grid, label, CHANGE_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridTopology {
        GridTopology::from_json_str(
            r#"{
                "n_line": 2,
                "substations": [
                    { "id": 0, "loads_id": [0], "lines_or_id": [0, 1] },
                    { "id": 1, "generators_id": [0], "lines_ex_id": [0, 1] }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_restrict_keeps_strongest_substation() {
        let grid = grid();
        let p = [0.2, 0.6, 0.1, 0.2, 0.2, 0.2];
        let (masked, sub) = restrict_to_substation(&grid, &p, CHANGE_THRESHOLD).unwrap();
        assert_eq!(sub, Some(SubstationId::new(0)));
        assert_eq!(masked, vec![0.2, 0.6, 0.1, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_below_threshold_is_do_nothing() {
        let grid = grid();
        let p = [0.4, 0.4, 0.4, 0.1, 0.1, 0.1];
        let (masked, sub) = restrict_to_substation(&grid, &p, CHANGE_THRESHOLD).unwrap();
        assert_eq!(sub, None);
        assert!(masked.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_label_substation() {
        let grid = grid();
        assert_eq!(
            label_substation(&grid, &[0.0, 0.0, 0.0, 1.0, 0.0, 1.0]).unwrap(),
            Some(SubstationId::new(1))
        );
        assert_eq!(label_substation(&grid, &[0.0; 6]).unwrap(), None);
    }

    #[test]
    fn test_tie_goes_to_lower_id() {
        let grid = grid();
        let p = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        assert_eq!(
            most_activated_substation(&grid, &p, CHANGE_THRESHOLD).unwrap(),
            Some(SubstationId::new(0))
        );
    }

    #[test]
    fn test_width_checked() {
        let grid = grid();
        assert!(label_substation(&grid, &[1.0; 4]).is_err());
    }

    #[test]
    fn test_restrict_among_candidates() {
        let grid = grid();
        // substation 0 is stronger but not a candidate
        let p = [0.9, 0.9, 0.9, 0.6, 0.0, 0.0];
        let only_one = [SubstationId::new(1)];
        let (masked, sub) = restrict_to_candidates(&grid, &p, CHANGE_THRESHOLD, &only_one).unwrap();
        assert_eq!(sub, Some(SubstationId::new(1)));
        assert_eq!(masked, vec![0.0, 0.0, 0.0, 0.6, 0.0, 0.0]);

        // activation outside the candidates does not reach the threshold
        let weak = [0.9, 0.9, 0.9, 0.3, 0.0, 0.0];
        let (_, sub) = restrict_to_candidates(&grid, &weak, CHANGE_THRESHOLD, &only_one).unwrap();
        assert_eq!(sub, None);
    }
}
