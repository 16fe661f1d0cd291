use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rayon::ThreadPoolBuilder;
use serde::de::DeserializeOwned;
use tutor_algo::ActionEncoding;
use tutor_core::{EncodingKind, GridTopology, SubstationId, TutorConfig};

pub fn configure_threads(spec: &str) {
    let count = if spec.eq_ignore_ascii_case("auto") {
        num_cpus::get()
    } else {
        spec.parse().unwrap_or_else(|_| num_cpus::get())
    };
    let _ = ThreadPoolBuilder::new().num_threads(count).build_global();
}

/// Parse a comma-separated list of substation ids.
pub fn parse_substations(spec: Option<&String>) -> Result<Vec<SubstationId>> {
    spec.map_or("", String::as_str)
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map(SubstationId::new)
                .map_err(|_| anyhow!("invalid substation id '{s}'"))
        })
        .collect()
}

/// Grid path from the command line, else from `paths.grid_file`.
pub fn grid_path(arg: Option<&PathBuf>, config: &TutorConfig) -> Result<PathBuf> {
    arg.or(config.paths.grid_file.as_ref())
        .cloned()
        .ok_or_else(|| anyhow!("no grid given; pass --grid or set paths.grid_file"))
}

pub fn load_grid(arg: Option<&PathBuf>, config: &TutorConfig) -> Result<GridTopology> {
    let path = grid_path(arg, config)?;
    GridTopology::load(&path).with_context(|| format!("loading grid {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Encoding from `--encoding`, else `resolver.encoding`. `--topo-vect`
/// supplies the current topology for `topology-change`.
pub fn resolve_encoding(
    encoding: Option<&String>,
    topo_vect: Option<&PathBuf>,
    config: &TutorConfig,
) -> Result<(EncodingKind, ActionEncoding)> {
    let kind = match encoding {
        Some(e) => e.parse::<EncodingKind>()?,
        None => config.resolver.encoding,
    };
    let current = match topo_vect {
        Some(path) => Some(read_json::<Vec<u8>>(path)?),
        None => None,
    };
    Ok((kind, ActionEncoding::from_kind(kind, current)?))
}
