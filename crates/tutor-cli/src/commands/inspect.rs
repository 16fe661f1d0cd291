//! Summaries of persisted action spaces.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tabwriter::TabWriter;
use tutor_algo::action_space::SubstationRange;
use tutor_algo::ActionSpace;
use tutor_cli::cli::InspectArgs;
use tutor_core::{GridTopology, TutorConfig};

use crate::commands::util::load_grid;

#[derive(Serialize)]
struct SpaceReport<'a> {
    grid: &'a str,
    n_objects: usize,
    disabled_line: Option<usize>,
    actions: usize,
    substations: &'a [SubstationRange],
}

pub fn handle(args: &InspectArgs, config: &TutorConfig) -> Result<()> {
    let InspectArgs {
        action_space,
        grid,
        json,
    } = args;

    let grid = load_grid(grid.as_ref(), config)?;
    let space = ActionSpace::load(action_space, &grid)
        .with_context(|| format!("loading {}", action_space.display()))?;

    if *json {
        let report = SpaceReport {
            grid: grid.name(),
            n_objects: space.n_objects(),
            disabled_line: space.disabled_line().map(|l| l.value()),
            actions: space.len(),
            substations: space.substations(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    print_table(&grid, &space)
}

fn print_table(grid: &GridTopology, space: &ActionSpace) -> Result<()> {
    println!(
        "Grid {} ({} objects), disabled line: {}",
        grid.name(),
        space.n_objects(),
        space
            .disabled_line()
            .map_or_else(|| "none".to_string(), |l| l.to_string())
    );
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "SUBSTATION\tACTIONS\tROWS\tOBJECTS")?;
    for range in space.substations() {
        writeln!(
            writer,
            "{}\t{}\t{}..{}\t{}",
            range.substation,
            range.len(),
            range.start,
            range.end,
            range.columns.len()
        )?;
    }
    writeln!(writer, "total\t{}\t\t", space.len())?;
    writer.flush()?;
    Ok(())
}
