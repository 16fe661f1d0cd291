//! Two-busbar split enumeration for a single substation.
//!
//! ## Algorithm
//!
//! For a substation with `n` live objects, busbar 1 receives a size-`k`
//! subset and busbar 2 the complement. Swapping the two labels gives the
//! same electrical configuration, so only `k ≥ n/2` is visited:
//!
//! ```text
//! k = ⌈n/2⌉ ..= n-2      (k = n-1 is the 1-vs-rest split, k = n is no split)
//! ```
//!
//! Subsets are produced in lexicographic order by `itertools::combinations`.
//! At `k = n/2` each split appears twice (subset and complement). Every
//! candidate is reduced to a canonical key and only the first one seen is
//! considered; since the subset holding object 0 comes first, that is the
//! representative. Legality filters run on the representative only.

use std::collections::HashSet;

use itertools::Itertools;
use tracing::{debug, warn};
use tutor_core::{ObjectRef, SubstationId, SubstationObjects};

use super::legality::{satisfies_line_rule, LegalityRules};

/// Substations below this size have a single legal configuration.
pub const MIN_OBJECTS_FOR_SPLIT: usize = 4;

/// A two-busbar split of one substation's live objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusbarAssignment {
    pub substation: SubstationId,
    /// Busbar (1 or 2) of each live object, aligned with the object list
    pub busbars: Vec<u8>,
}

impl BusbarAssignment {
    pub fn from_subset(substation: SubstationId, n: usize, busbar_one: &[usize]) -> Self {
        let mut busbars = vec![2u8; n];
        for &i in busbar_one {
            busbars[i] = 1;
        }
        Self {
            substation,
            busbars,
        }
    }

    pub fn len(&self) -> usize {
        self.busbars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.busbars.is_empty()
    }

    /// Label-swapped twin of this split.
    pub fn swapped(&self) -> Self {
        Self {
            substation: self.substation,
            busbars: self.busbars.iter().map(|&b| 3 - b).collect(),
        }
    }

    /// Labelling with the first object on busbar 1.
    ///
    /// Two assignments describe the same configuration exactly when their
    /// canonical keys are equal.
    pub fn canonical_key(&self) -> Vec<u8> {
        match self.busbars.first() {
            Some(2) => self.swapped().busbars,
            _ => self.busbars.clone(),
        }
    }

    pub fn objects_on<'a>(
        &'a self,
        objects: &'a [ObjectRef],
        busbar: u8,
    ) -> impl Iterator<Item = ObjectRef> + 'a {
        objects
            .iter()
            .zip(&self.busbars)
            .filter(move |&(_, &b)| b == busbar)
            .map(|(o, _)| *o)
    }
}

/// Enumerate every legal split of `objects`, deduplicated and in generation
/// order (subset size ascending, then lexicographic).
///
/// A substation left with exactly one legal split contributes nothing.
pub fn enumerate(objects: &SubstationObjects, rules: &LegalityRules) -> Vec<BusbarAssignment> {
    let n = objects.len();
    if n < MIN_OBJECTS_FOR_SPLIT {
        debug!(substation = %objects.substation, n, "too few objects to split");
        return Vec::new();
    }

    let mut seen: HashSet<Vec<u8>> = HashSet::new();
    let mut accepted = Vec::new();
    let mut rejected_line = 0usize;
    let mut rejected_rule = 0usize;

    for k in n.div_ceil(2)..=n - 2 {
        for subset in (0..n).combinations(k) {
            let assignment = BusbarAssignment::from_subset(objects.substation, n, &subset);
            if !seen.insert(assignment.canonical_key()) {
                continue;
            }

            let one: Vec<ObjectRef> = assignment.objects_on(&objects.objects, 1).collect();
            let two: Vec<ObjectRef> = assignment.objects_on(&objects.objects, 2).collect();
            if !satisfies_line_rule(&one, &two) {
                rejected_line += 1;
                continue;
            }
            if rules.is_excluded(objects.substation, &one) {
                rejected_rule += 1;
                continue;
            }
            accepted.push(assignment);
        }
    }

    debug!(
        substation = %objects.substation,
        n,
        accepted = accepted.len(),
        rejected_line,
        rejected_rule,
        "enumerated busbar splits"
    );

    if accepted.len() == 1 {
        warn!(
            substation = %objects.substation,
            "only one legal split; substation dropped from the action space"
        );
        return Vec::new();
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_space::legality::ExclusionRule;

    fn sub(id: usize, objects: Vec<ObjectRef>) -> SubstationObjects {
        let columns = (0..objects.len()).collect();
        SubstationObjects {
            substation: SubstationId::new(id),
            objects,
            columns,
        }
    }

    #[test]
    fn test_four_objects_two_lines() {
        // load0, gen0, line_or0, line_or1: only k = 2 is visited
        let objs = sub(
            0,
            vec![
                ObjectRef::load(0),
                ObjectRef::generator(0),
                ObjectRef::line_or(0),
                ObjectRef::line_or(1),
            ],
        );
        let actions = enumerate(&objs, &LegalityRules::new());
        // {load0, gen0} has no line; {load0, or0} and {load0, or1} survive
        assert_eq!(
            actions.iter().map(|a| a.busbars.clone()).collect::<Vec<_>>(),
            vec![vec![1, 2, 1, 2], vec![1, 2, 2, 1]]
        );
    }

    #[test]
    fn test_small_substation_skipped() {
        let objs = sub(
            0,
            vec![ObjectRef::load(0), ObjectRef::line_or(0), ObjectRef::line_ex(1)],
        );
        assert!(enumerate(&objs, &LegalityRules::new()).is_empty());
    }

    #[test]
    fn test_single_action_substation_dropped() {
        // two line-legal splits; forbidding one leaves a single split
        let objs = sub(
            3,
            vec![
                ObjectRef::load(0),
                ObjectRef::generator(0),
                ObjectRef::line_or(0),
                ObjectRef::line_or(1),
            ],
        );
        let rules = LegalityRules::new().with_rule(ExclusionRule::forbid_all(
            3,
            2,
            vec![ObjectRef::load(0), ObjectRef::line_or(1)],
        ));
        assert!(enumerate(&objs, &rules).is_empty());
    }

    #[test]
    fn test_no_swap_duplicates() {
        let objs = sub(
            1,
            vec![
                ObjectRef::load(0),
                ObjectRef::generator(0),
                ObjectRef::line_or(2),
                ObjectRef::line_or(3),
                ObjectRef::line_or(4),
                ObjectRef::line_ex(0),
            ],
        );
        let actions = enumerate(&objs, &LegalityRules::new());
        let keys: HashSet<Vec<u8>> = actions.iter().map(|a| a.canonical_key()).collect();
        assert_eq!(keys.len(), actions.len());
        for a in &actions {
            assert!(!actions.contains(&a.swapped()));
            let ones = a.busbars.iter().filter(|&&b| b == 1).count();
            assert!(ones >= 3 && ones <= 4);
        }
    }

    #[test]
    fn test_generation_order() {
        let objs = sub(
            1,
            vec![
                ObjectRef::load(0),
                ObjectRef::generator(0),
                ObjectRef::line_or(2),
                ObjectRef::line_or(3),
                ObjectRef::line_or(4),
                ObjectRef::line_ex(0),
            ],
        );
        let actions = enumerate(&objs, &LegalityRules::new());
        let sizes: Vec<usize> = actions
            .iter()
            .map(|a| a.busbars.iter().filter(|&&b| b == 1).count())
            .collect();
        let mut sorted = sizes.clone();
        sorted.sort();
        assert_eq!(sizes, sorted);
        // k = n/2 representatives keep object 0 on busbar 1
        for a in actions.iter().filter(|a| a.busbars.iter().filter(|&&b| b == 1).count() == 3) {
            assert_eq!(a.busbars[0], 1);
        }
    }

    #[test]
    fn test_canonical_key() {
        let a = BusbarAssignment {
            substation: SubstationId::new(0),
            busbars: vec![2, 1, 1, 2],
        };
        assert_eq!(a.canonical_key(), vec![1, 2, 2, 1]);
        assert_eq!(a.swapped().canonical_key(), a.canonical_key());
    }
}
