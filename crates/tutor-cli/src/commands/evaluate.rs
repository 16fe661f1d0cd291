use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};
use tutor_algo::evaluation::encode_label;
use tutor_algo::resolver::label_substation;
use tutor_algo::{ActionDistanceResolver, ActionSpace, ValidationStats};
use tutor_cli::cli::EvaluateArgs;
use tutor_core::{DistanceMetric, TutorConfig};

use crate::commands::util::{load_grid, read_json, resolve_encoding};

#[derive(Debug, Deserialize)]
struct Sample {
    prediction: Vec<f64>,
    /// Set-busbar assignment the model should have produced
    label: Vec<f64>,
}

pub fn handle(args: &EvaluateArgs, config: &TutorConfig) -> Result<()> {
    let grid = load_grid(args.grid.as_ref(), config)?;
    let space = ActionSpace::load(&args.action_space, &grid)
        .with_context(|| format!("loading {}", args.action_space.display()))?;
    let samples: Vec<Sample> = read_json(&args.samples)?;
    let metric = match &args.metric {
        Some(m) => m.parse::<DistanceMetric>()?,
        None => config.resolver.metric,
    };

    let (kind, encoding) =
        resolve_encoding(args.encoding.as_ref(), args.topo_vect.as_ref(), config)?;
    debug!(%metric, encoding = %kind, "evaluating");

    let resolver = ActionDistanceResolver::new(&space)
        .with_metric(metric)
        .with_encoding(encoding);
    let mut stats = ValidationStats::new();
    for (i, sample) in samples.iter().enumerate() {
        let label_sub = label_substation(&grid, &sample.label)
            .with_context(|| format!("sample {i}: bad label"))?;
        let ranking = resolver
            .rank(&sample.prediction, None, None)
            .with_context(|| format!("sample {i}: ranking failed"))?;
        let label = encode_label(resolver.encoding(), &sample.label);
        let rank = stats.record(&ranking, &label, label_sub);
        debug!(sample = i, substation = %ranking.substation, ?rank, "scored sample");
    }

    let summary = stats.summary();
    info!(
        samples = summary.count,
        accuracy = summary.accuracy_micro,
        "Evaluation finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
