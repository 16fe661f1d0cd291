//! Flattened, grid-wide action space.
//!
//! An [`ActionSpace`] is a dense row-major `(n_actions × n_objects)` array
//! of set-busbar values. Row `i` is action `i`: `0` leaves an object alone,
//! `1`/`2` puts it on that busbar. Every row touches exactly one substation
//! and the rows of a substation are contiguous, so a substation's actions
//! are a slice.

use std::collections::HashSet;
use std::ops::Range;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;
use tutor_core::{
    GridTopology, LineId, SubstationId, SubstationObjects, TutorError, TutorResult,
};

use super::enumerate::{enumerate, BusbarAssignment};
use super::legality::LegalityRules;

/// Rows and live columns belonging to one substation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstationRange {
    pub substation: SubstationId,
    pub start: usize,
    pub end: usize,
    /// Topology columns set by every action in the range
    pub columns: Vec<usize>,
}

impl SubstationRange {
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSpace {
    n_objects: usize,
    disabled_line: Option<LineId>,
    data: Vec<u8>,
    substations: Vec<SubstationRange>,
    /// Digest of the rules and substation scope the space was built with.
    fingerprint: Option<String>,
}

/// The actions of a single substation.
#[derive(Debug, Clone, Copy)]
pub struct ActionSlice<'a> {
    space: &'a ActionSpace,
    substation: SubstationId,
    range: Option<&'a SubstationRange>,
}

impl<'a> ActionSlice<'a> {
    pub fn substation(&self) -> SubstationId {
        self.substation
    }

    /// Global action indices covered by this slice.
    pub fn indices(&self) -> Range<usize> {
        self.range.map_or(0..0, SubstationRange::rows)
    }

    pub fn columns(&self) -> &'a [usize] {
        self.range.map(|r| r.columns.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.indices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(global index, set-busbar vector)` pairs in generation order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a [u8])> + 'a {
        let space = self.space;
        self.indices().filter_map(move |i| space.action(i).map(|row| (i, row)))
    }
}

impl ActionSpace {
    /// Rebuild an action space from a dense row-major array.
    ///
    /// Substation grouping is re-derived from `grid`; rows must hold only
    /// values in `{0, 1, 2}`, touch exactly one substation, and be grouped
    /// contiguously by substation.
    pub fn from_dense(
        grid: &GridTopology,
        disabled_line: Option<LineId>,
        data: Vec<u8>,
    ) -> TutorResult<Self> {
        let n = grid.n_objects();
        if n == 0 || data.len() % n != 0 {
            return Err(TutorError::Validation(format!(
                "{} values do not form rows of {} objects",
                data.len(),
                n
            )));
        }
        if let Some(line) = disabled_line {
            grid.check_line(line)?;
        }

        let mut substations: Vec<SubstationRange> = Vec::new();
        for (index, row) in data.chunks_exact(n).enumerate() {
            let mut owner: Option<SubstationId> = None;
            let mut columns = Vec::new();
            for (col, &value) in row.iter().enumerate() {
                match value {
                    0 => {}
                    1 | 2 => {
                        let sub = grid.substation_of_column(col).ok_or_else(|| {
                            TutorError::Validation(format!("column {} has no substation", col))
                        })?;
                        match owner {
                            Some(prev) if prev != sub => {
                                return Err(TutorError::Validation(format!(
                                    "action {} touches substations {} and {}",
                                    index, prev, sub
                                )));
                            }
                            _ => owner = Some(sub),
                        }
                        columns.push(col);
                    }
                    other => {
                        return Err(TutorError::Validation(format!(
                            "action {} has busbar value {} at column {}",
                            index, other, col
                        )));
                    }
                }
            }
            let sub = owner.ok_or_else(|| {
                TutorError::Validation(format!("action {} changes nothing", index))
            })?;

            match substations.last_mut() {
                Some(last) if last.substation == sub => {
                    if last.columns != columns {
                        return Err(TutorError::Validation(format!(
                            "action {} sets columns {:?}, substation {} uses {:?}",
                            index, columns, sub, last.columns
                        )));
                    }
                    last.end = index + 1;
                }
                _ => {
                    if substations.iter().any(|r| r.substation == sub) {
                        return Err(TutorError::Validation(format!(
                            "actions of substation {} are not contiguous (again at row {})",
                            sub, index
                        )));
                    }
                    substations.push(SubstationRange {
                        substation: sub,
                        start: index,
                        end: index + 1,
                        columns,
                    });
                }
            }
        }

        Ok(Self {
            n_objects: n,
            disabled_line,
            data,
            substations,
            fingerprint: None,
        })
    }

    pub(crate) fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Build fingerprint, `None` for spaces assembled from raw rows.
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.n_objects.max(1)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Width of each action vector.
    pub fn n_objects(&self) -> usize {
        self.n_objects
    }

    pub fn disabled_line(&self) -> Option<LineId> {
        self.disabled_line
    }

    /// Set-busbar vector of action `index`.
    pub fn action(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(self.n_objects)?;
        self.data.get(start..start + self.n_objects)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.n_objects.max(1))
    }

    /// Row-major backing array.
    pub fn as_dense(&self) -> &[u8] {
        &self.data
    }

    /// Substations with at least one action, in storage order.
    pub fn substations(&self) -> &[SubstationRange] {
        &self.substations
    }

    pub fn actions_for_substation(&self, substation: SubstationId) -> ActionSlice<'_> {
        ActionSlice {
            space: self,
            substation,
            range: self.substations.iter().find(|r| r.substation == substation),
        }
    }

    pub fn substation_of(&self, index: usize) -> Option<SubstationId> {
        self.substations
            .iter()
            .find(|r| r.rows().contains(&index))
            .map(|r| r.substation)
    }

    pub fn has_actions(&self, substation: SubstationId) -> bool {
        !self.actions_for_substation(substation).is_empty()
    }
}

/// Builds an [`ActionSpace`] from a grid, a disabled line and a rule table.
#[derive(Debug, Clone)]
pub struct ActionSpaceBuilder<'a> {
    grid: &'a GridTopology,
    substations: Option<Vec<SubstationId>>,
    disabled_line: Option<LineId>,
    rules: LegalityRules,
    parallel: bool,
}

impl<'a> ActionSpaceBuilder<'a> {
    pub fn new(grid: &'a GridTopology) -> Self {
        Self {
            grid,
            substations: None,
            disabled_line: None,
            rules: LegalityRules::default(),
            parallel: true,
        }
    }

    /// Restrict enumeration to these substations (default: all).
    pub fn substations(mut self, ids: impl IntoIterator<Item = SubstationId>) -> Self {
        self.substations = Some(ids.into_iter().collect());
        self
    }

    pub fn disabled_line(mut self, line: Option<LineId>) -> Self {
        self.disabled_line = line;
        self
    }

    pub fn rules(mut self, rules: LegalityRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn substation_ids(&self) -> Vec<SubstationId> {
        match &self.substations {
            Some(ids) => ids.clone(),
            None => self.grid.substation_ids().collect(),
        }
    }

    /// SHA-256 over the exclusion rules and the substations in scope.
    ///
    /// Two builders with the same fingerprint produce the same rows for a
    /// given grid and disabled line.
    pub fn fingerprint(&self) -> TutorResult<String> {
        let mut hasher = Sha256::new();
        for rule in self.rules.iter() {
            hasher.update(serde_json::to_vec(rule)?);
            hasher.update(b"\n");
        }
        hasher.update(b"substations:");
        for id in self.substation_ids() {
            hasher.update(format!("{},", id).as_bytes());
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Enumerate every in-scope substation and flatten the result.
    ///
    /// An illegal substation anywhere aborts the whole build.
    pub fn build(&self) -> TutorResult<ActionSpace> {
        let ids = self.substation_ids();
        let mut unique = HashSet::with_capacity(ids.len());
        if let Some(dup) = ids.iter().find(|id| !unique.insert(**id)) {
            return Err(TutorError::invalid(format!(
                "substation {} requested twice",
                dup
            )));
        }
        if let Some(line) = self.disabled_line {
            self.grid.check_line(line)?;
        }

        let view = self.grid.connectivity();
        let disabled_line = self.disabled_line;
        let rules = &self.rules;
        let per_substation =
            |id: &SubstationId| -> TutorResult<(SubstationObjects, Vec<BusbarAssignment>)> {
                let objects = view.substation_objects(*id, disabled_line)?;
                let actions = enumerate(&objects, rules);
                Ok((objects, actions))
            };

        #[cfg(feature = "rayon")]
        let results: Vec<_> = if self.parallel {
            ids.par_iter().map(per_substation).collect()
        } else {
            ids.iter().map(per_substation).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let results: Vec<_> = ids.iter().map(per_substation).collect();

        // first failure in substation order wins, regardless of scheduling
        let enumerated = results.into_iter().collect::<TutorResult<Vec<_>>>()?;

        let n = self.grid.n_objects();
        let total: usize = enumerated.iter().map(|(_, a)| a.len()).sum();
        let mut data = vec![0u8; total * n];
        let mut substations = Vec::new();
        let mut row = 0usize;
        for (objects, actions) in enumerated {
            if actions.is_empty() {
                continue;
            }
            let start = row;
            for assignment in &actions {
                let dst = &mut data[row * n..(row + 1) * n];
                for (&col, &bus) in objects.columns.iter().zip(&assignment.busbars) {
                    dst[col] = bus;
                }
                row += 1;
            }
            let mut columns = objects.columns.clone();
            columns.sort_unstable();
            substations.push(SubstationRange {
                substation: objects.substation,
                start,
                end: row,
                columns,
            });
        }

        info!(
            grid = self.grid.name(),
            disabled_line = ?self.disabled_line.map(|l| l.value()),
            actions = total,
            substations = substations.len(),
            "built action space"
        );

        Ok(ActionSpace {
            n_objects: n,
            disabled_line: self.disabled_line,
            data,
            substations,
            fingerprint: Some(self.fingerprint()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridTopology {
        GridTopology::from_json_str(
            r#"{
                "n_line": 4,
                "substations": [
                    { "id": 0, "loads_id": [0], "generators_id": [0], "lines_or_id": [0, 1, 2] },
                    { "id": 1, "loads_id": [1], "lines_ex_id": [0, 1], "lines_or_id": [3] },
                    { "id": 2, "lines_ex_id": [2, 3] }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_rows_touch_one_substation() {
        let grid = grid();
        let space = ActionSpaceBuilder::new(&grid).parallel(false).build().unwrap();
        assert!(!space.is_empty());
        for (i, row) in space.rows().enumerate() {
            let sub = space.substation_of(i).unwrap();
            let cols = grid.columns(sub).unwrap();
            for (c, &v) in row.iter().enumerate() {
                if cols.contains(&c) {
                    assert!(v == 1 || v == 2);
                } else {
                    assert_eq!(v, 0);
                }
            }
        }
    }

    #[test]
    fn test_slices_are_contiguous() {
        let grid = grid();
        let space = ActionSpaceBuilder::new(&grid).build().unwrap();
        let s0 = space.actions_for_substation(SubstationId::new(0));
        let s1 = space.actions_for_substation(SubstationId::new(1));
        assert_eq!(s0.indices().start, 0);
        assert_eq!(s0.indices().end, s1.indices().start);
        assert_eq!(s1.indices().end, space.len());
        // substation 2 has two objects
        assert!(space.actions_for_substation(SubstationId::new(2)).is_empty());
    }

    #[test]
    fn test_from_dense_matches_build() {
        let grid = grid();
        let space = ActionSpaceBuilder::new(&grid).build().unwrap();
        let rebuilt = ActionSpace::from_dense(&grid, None, space.as_dense().to_vec()).unwrap();
        assert_eq!(rebuilt.as_dense(), space.as_dense());
        assert_eq!(rebuilt.substations(), space.substations());
        assert_eq!(rebuilt.fingerprint(), None);
    }

    #[test]
    fn test_from_dense_rejects_two_substations() {
        let grid = grid();
        let mut row = vec![0u8; grid.n_objects()];
        row[0] = 1;
        row[5] = 2;
        let err = ActionSpace::from_dense(&grid, None, row).unwrap_err();
        assert!(err.to_string().contains("touches substations"));
    }

    #[test]
    fn test_from_dense_rejects_do_nothing_row() {
        let grid = grid();
        let row = vec![0u8; grid.n_objects()];
        assert!(ActionSpace::from_dense(&grid, None, row).is_err());
    }

    #[test]
    fn test_duplicate_substation_request() {
        let grid = grid();
        let err = ActionSpaceBuilder::new(&grid)
            .substations([SubstationId::new(0), SubstationId::new(0)])
            .build()
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_illegal_topology_aborts_build() {
        let grid = grid();
        let err = ActionSpaceBuilder::new(&grid)
            .disabled_line(Some(LineId::new(3)))
            .build()
            .unwrap_err();
        assert!(matches!(err, TutorError::IllegalTopology { .. }));
    }

    #[test]
    fn test_fingerprint_tracks_rules_and_scope() {
        use crate::action_space::ExclusionRule;
        use tutor_core::ObjectRef;

        let grid = grid();
        let plain = ActionSpaceBuilder::new(&grid).fingerprint().unwrap();
        assert_eq!(plain, ActionSpaceBuilder::new(&grid).fingerprint().unwrap());
        // an explicit full scope in grid order is the default scope
        let all: Vec<SubstationId> = grid.substation_ids().collect();
        assert_eq!(
            plain,
            ActionSpaceBuilder::new(&grid).substations(all).fingerprint().unwrap()
        );

        let ruled = ActionSpaceBuilder::new(&grid)
            .rules(LegalityRules::new().with_rule(ExclusionRule::require_any(
                0,
                3,
                vec![ObjectRef::load(0)],
            )))
            .fingerprint()
            .unwrap();
        let scoped = ActionSpaceBuilder::new(&grid)
            .substations([SubstationId::new(1)])
            .fingerprint()
            .unwrap();
        assert_ne!(plain, ruled);
        assert_ne!(plain, scoped);

        let space = ActionSpaceBuilder::new(&grid).build().unwrap();
        assert_eq!(space.fingerprint(), Some(plain.as_str()));
    }
}
