use std::collections::HashSet;
use std::path::PathBuf;

use tempfile::tempdir;
use tutor_algo::action_space::{read_action_space, write_action_space};
use tutor_algo::{
    ActionDistanceResolver, ActionEncoding, ActionSpace, ActionSpaceBuilder, LegalityRules,
    ValidationStats,
};
use tutor_core::{
    DistanceMetric, GridTopology, LineId, ObjectKind, ObjectRef, SubstationId, TutorError,
};

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

fn case14() -> GridTopology {
    GridTopology::load(repo_path("test_data/grids/rte_case14_realistic.json")).unwrap()
}

fn build(grid: &GridTopology, line: Option<LineId>) -> ActionSpace {
    ActionSpaceBuilder::new(grid)
        .disabled_line(line)
        .rules(LegalityRules::rte_case14_realistic())
        .build()
        .unwrap()
}

fn per_substation(space: &ActionSpace) -> Vec<(usize, usize)> {
    space
        .substations()
        .iter()
        .map(|r| (r.substation.value(), r.len()))
        .collect()
}

#[test]
fn case14_intact_grid_counts() {
    let grid = case14();
    assert_eq!(grid.n_substations(), 14);
    assert_eq!(grid.n_objects(), 56);

    let space = build(&grid, None);
    assert_eq!(space.len(), 98);
    assert_eq!(
        per_substation(&space),
        vec![(1, 24), (2, 2), (3, 25), (4, 10), (5, 24), (8, 10), (12, 3)]
    );
}

#[test]
fn case14_disabled_line_shrinks_substations() {
    let grid = case14();
    let space = build(&grid, Some(LineId::new(0)));
    assert_eq!(space.disabled_line(), Some(LineId::new(0)));
    assert_eq!(space.len(), 83);
    let sub1 = space.actions_for_substation(SubstationId::new(1));
    assert_eq!(sub1.len(), 9);

    // line 0 endpoints are never assigned
    let or0 = grid.position(&ObjectRef::line_or(0)).unwrap();
    let ex0 = grid.position(&ObjectRef::line_ex(0)).unwrap();
    assert!(space.rows().all(|row| row[or0] == 0 && row[ex0] == 0));
}

#[test]
fn case14_every_action_keeps_a_line_on_each_busbar() {
    let grid = case14();
    let space = build(&grid, None);
    for row in space.rows() {
        for busbar in [1u8, 2] {
            let has_line = row.iter().enumerate().any(|(col, &b)| {
                b == busbar
                    && grid
                        .object_at(col)
                        .map_or(false, |o| o.is_line_endpoint())
            });
            assert!(has_line, "busbar {} without a line in {:?}", busbar, row);
        }
    }
}

#[test]
fn case14_no_duplicate_or_swapped_actions() {
    let grid = case14();
    let space = build(&grid, None);
    let mut seen = HashSet::new();
    for row in space.rows() {
        let swapped: Vec<u8> = row
            .iter()
            .map(|&b| match b {
                1 => 2,
                2 => 1,
                other => other,
            })
            .collect();
        assert!(!seen.contains(&swapped), "swap duplicate {:?}", row);
        assert!(seen.insert(row.to_vec()), "duplicate {:?}", row);
    }
}

#[test]
fn case14_rows_touch_a_single_substation() {
    let grid = case14();
    let space = build(&grid, None);
    for (index, row) in space.rows().enumerate() {
        let sub = space.substation_of(index).unwrap();
        let columns: Vec<usize> = grid.columns(sub).unwrap().collect();
        for (col, &b) in row.iter().enumerate() {
            if !columns.contains(&col) {
                assert_eq!(b, 0);
            }
        }
    }
}

#[test]
fn case14_parallel_matches_sequential() {
    let grid = case14();
    let parallel = ActionSpaceBuilder::new(&grid).parallel(true).build().unwrap();
    let sequential = ActionSpaceBuilder::new(&grid).parallel(false).build().unwrap();
    assert_eq!(parallel.as_dense(), sequential.as_dense());
    assert_eq!(parallel.substations(), sequential.substations());
}

#[test]
fn case14_line_18_isolates_substation_7() {
    let grid = case14();
    let err = ActionSpaceBuilder::new(&grid)
        .disabled_line(Some(LineId::new(18)))
        .build()
        .unwrap_err();
    match err {
        TutorError::IllegalTopology {
            substation,
            remaining,
        } => {
            assert_eq!(substation, SubstationId::new(7));
            assert_eq!(remaining, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn case14_line_out_of_range() {
    let grid = case14();
    let err = ActionSpaceBuilder::new(&grid)
        .disabled_line(Some(LineId::new(20)))
        .build()
        .unwrap_err();
    assert!(matches!(err, TutorError::InvalidConfiguration(_)));
}

#[test]
fn case14_rule_files_load() {
    let preset =
        LegalityRules::load(repo_path("test_data/rules/rte_case14_realistic.toml")).unwrap();
    assert_eq!(preset, LegalityRules::rte_case14_realistic());

    let custom = LegalityRules::load(repo_path("test_data/rules/forbid_sub4_load.json")).unwrap();
    let grid = case14();
    let space = ActionSpaceBuilder::new(&grid).rules(custom).build().unwrap();
    let sub4 = space.actions_for_substation(SubstationId::new(4));
    assert_eq!(sub4.len(), 7);

    let load3 = grid.position(&ObjectRef::load(3)).unwrap();
    let or17 = grid.position(&ObjectRef::line_or(17)).unwrap();
    for (_, row) in sub4.iter() {
        let on_one = row.iter().filter(|&&b| b == 1).count();
        if on_one == 3 {
            assert!(!(row[load3] == 1 && row[or17] == 1));
        }
    }
}

#[test]
fn case14_substation_subset() {
    let grid = case14();
    let space = ActionSpaceBuilder::new(&grid)
        .substations([SubstationId::new(12), SubstationId::new(2)])
        .build()
        .unwrap();
    assert_eq!(space.len(), 5);
    let mut counts = per_substation(&space);
    counts.sort();
    assert_eq!(counts, vec![(2, 2), (12, 3)]);
    assert!(!space.has_actions(SubstationId::new(1)));
}

#[test]
fn case14_save_and_load() {
    let grid = case14();
    let space = build(&grid, Some(LineId::new(3)));
    let dir = tempdir().unwrap();
    let path = dir.path().join("action_space_lout3.arrow");
    space.save(&path).unwrap();

    let loaded = ActionSpace::load(&path, &grid).unwrap();
    assert_eq!(loaded.as_dense(), space.as_dense());
    assert_eq!(loaded.disabled_line(), Some(LineId::new(3)));
    assert_eq!(loaded.substations(), space.substations());

    let mut buf = Vec::new();
    write_action_space(&space, &mut buf).unwrap();
    let from_buf = read_action_space(buf.as_slice(), &grid).unwrap();
    assert_eq!(from_buf.len(), space.len());
}

#[test]
fn case14_resolver_recovers_labels() {
    let grid = case14();
    let space = build(&grid, None);
    let resolver = ActionDistanceResolver::new(&space).with_metric(DistanceMetric::L2);
    let mut stats = ValidationStats::new();

    for (index, row) in space.rows().enumerate().step_by(7) {
        // noisy copy of the action
        let prediction: Vec<f64> = row
            .iter()
            .enumerate()
            .map(|(i, &v)| f64::from(v) + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let ranking = resolver.rank(&prediction, None, None).unwrap();
        assert_eq!(ranking.nearest().unwrap().action_index, index);
        stats.record(&ranking, row, space.substation_of(index));
    }

    let summary = stats.summary();
    assert_eq!(summary.accuracy_micro, 1.0);
    assert_eq!(summary.accuracy_macro, 1.0);
    assert_eq!(summary.unranked, 0);
}

#[test]
fn case14_second_busbar_encoding() {
    let grid = case14();
    let space = build(&grid, None);
    let resolver = ActionDistanceResolver::new(&space).with_encoding(ActionEncoding::SecondBusbar);
    let sub = SubstationId::new(3);
    let ranking = resolver
        .rank(&vec![0.0; grid.n_objects()], Some(sub), None)
        .unwrap();
    assert_eq!(ranking.len(), 25);
    for action in &ranking.actions {
        assert!(action.vector.iter().all(|&v| v <= 1));
    }
    // kinds on substation 3 are a load and five line endpoints
    let kinds: HashSet<ObjectKind> = grid
        .connectivity()
        .objects_of(sub, None)
        .unwrap()
        .iter()
        .map(|o| o.kind)
        .collect();
    assert!(kinds.contains(&ObjectKind::Load));
    assert!(!kinds.contains(&ObjectKind::Generator));
}
