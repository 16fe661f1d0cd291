use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tabwriter::TabWriter;
use tracing::info;
use tutor_algo::resolver::restrict_to_candidates;
use tutor_algo::{ActionDistanceResolver, ActionSpace, RankedAction};
use tutor_cli::cli::RankArgs;
use tutor_core::{DistanceMetric, EncodingKind, SubstationId, TutorConfig};

use crate::commands::util::{load_grid, parse_substations, read_json, resolve_encoding};

#[derive(Serialize)]
struct RankReport<'a> {
    substation: SubstationId,
    metric: DistanceMetric,
    encoding: EncodingKind,
    candidates: usize,
    actions: &'a [RankedAction],
}

pub fn handle(args: &RankArgs, config: &TutorConfig) -> Result<()> {
    let grid = load_grid(args.grid.as_ref(), config)?;
    let space = ActionSpace::load(&args.action_space, &grid)
        .with_context(|| format!("loading {}", args.action_space.display()))?;

    let mut prediction: Vec<f64> = read_json(&args.prediction)?;
    let metric = match &args.metric {
        Some(m) => m.parse::<DistanceMetric>()?,
        None => config.resolver.metric,
    };
    let (kind, encoding) =
        resolve_encoding(args.encoding.as_ref(), args.topo_vect.as_ref(), config)?;

    let legal = parse_substations(args.legal.as_ref())?;
    let legal = (!legal.is_empty()).then_some(legal);

    let mut substation = args.substation.map(SubstationId::new);
    if args.restrict {
        // only substations that can actually act compete
        let candidates: Vec<SubstationId> = space
            .substations()
            .iter()
            .map(|r| r.substation)
            .filter(|id| legal.as_ref().map_or(true, |l| l.contains(id)))
            .collect();
        let threshold = config.resolver.substation_threshold;
        let (masked, kept) = restrict_to_candidates(&grid, &prediction, threshold, &candidates)?;
        let Some(kept) = kept else {
            println!("No prediction entry reaches {threshold}: do nothing");
            return Ok(());
        };
        prediction = masked;
        substation = Some(kept);
    }

    let resolver = ActionDistanceResolver::new(&space)
        .with_metric(metric)
        .with_encoding(encoding);
    let ranking = resolver.rank(&prediction, substation, legal.as_deref())?;
    info!(
        substation = %ranking.substation,
        candidates = ranking.len(),
        "Ranked actions"
    );

    let shown = &ranking.actions[..ranking.len().min(args.top)];
    if args.json {
        let report = RankReport {
            substation: ranking.substation,
            metric,
            encoding: kind,
            candidates: ranking.len(),
            actions: shown,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let columns = space
        .actions_for_substation(ranking.substation)
        .columns()
        .to_vec();
    println!(
        "Substation {}: {} candidate actions ({} metric, {} encoding)",
        ranking.substation,
        ranking.len(),
        metric,
        kind
    );
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "RANK\tACTION\tDISTANCE\tBUSBARS")?;
    for (rank, action) in shown.iter().enumerate() {
        let busbars = space
            .action(action.action_index)
            .map(|row| {
                columns
                    .iter()
                    .map(|&c| row[c].to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        writeln!(
            writer,
            "{}\t{}\t{:.4}\t{}",
            rank, action.action_index, action.distance, busbars
        )?;
    }
    writer.flush()?;
    Ok(())
}
