use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tutor_algo::{ActionSpaceCache, LegalityRules};
use tutor_cli::cli::GenerateArgs;
use tutor_core::{LineId, SubstationId, TutorConfig, TutorError};

use crate::commands::util::{configure_threads, load_grid, parse_substations};

/// Command-line rules win over config; a rule file wins over a preset.
fn resolve_rules(
    rules: Option<&PathBuf>,
    preset: Option<&String>,
    config: &TutorConfig,
) -> Result<LegalityRules> {
    if let Some(path) = rules {
        return load_rules(path);
    }
    if let Some(name) = preset {
        return Ok(LegalityRules::preset(name)?);
    }
    if let Some(path) = &config.paths.rules_file {
        return load_rules(path);
    }
    match &config.generation.preset {
        Some(name) => Ok(LegalityRules::preset(name)?),
        None => Ok(LegalityRules::new()),
    }
}

fn load_rules(path: &Path) -> Result<LegalityRules> {
    LegalityRules::load(path).with_context(|| format!("loading rules {}", path.display()))
}

pub fn handle(args: &GenerateArgs, config: &TutorConfig) -> Result<()> {
    let GenerateArgs {
        grid,
        out,
        disable_line,
        all_lines,
        rules,
        preset,
        substations,
        threads,
        sequential,
        force,
    } = args;

    let start = Instant::now();
    configure_threads(threads);
    let grid = Arc::new(load_grid(grid.as_ref(), config)?);
    let rules = resolve_rules(rules.as_ref(), preset.as_ref(), config)?;
    let out = out
        .clone()
        .unwrap_or_else(|| config.paths.action_space_dir.clone());

    let mut subset = parse_substations(substations.as_ref())?;
    if subset.is_empty() {
        if let Some(ids) = &config.generation.substations {
            subset = ids.iter().copied().map(SubstationId::new).collect();
        }
    }

    let mut cache = ActionSpaceCache::new(&out, Arc::clone(&grid), rules)
        .with_parallel(config.generation.parallel && !sequential);
    if !subset.is_empty() {
        cache = cache.with_substations(subset);
    }

    // (line, skip when illegal)
    let targets: Vec<(Option<LineId>, bool)> = if let Some(line) = disable_line {
        vec![(Some(LineId::new(*line)), false)]
    } else if *all_lines {
        std::iter::once((None, false))
            .chain((0..grid.n_line()).map(|l| (Some(LineId::new(l)), true)))
            .collect()
    } else if !config.generation.disabled_lines.is_empty() {
        config
            .generation
            .disabled_lines
            .iter()
            .map(|&l| (Some(LineId::new(l)), false))
            .collect()
    } else {
        vec![(None, false)]
    };

    info!(
        grid = grid.name(),
        out = %out.display(),
        spaces = targets.len(),
        "Generating action spaces"
    );

    let mut written = 0usize;
    for (line, skip_illegal) in targets {
        let path = cache.path_for(line);
        if *force && path.exists() {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        match cache.get(line) {
            Ok(space) => {
                println!(
                    "{}: {} actions over {} substations",
                    path.display(),
                    space.len(),
                    space.substations().len()
                );
                written += 1;
            }
            Err(err @ TutorError::IllegalTopology { .. }) if skip_illegal => {
                warn!(line = ?line.map(|l| l.value()), "skipping: {}", err);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("building {}", path.display()));
            }
        }
    }

    info!(
        written,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Action space generation finished"
    );
    Ok(())
}
