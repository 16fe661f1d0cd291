//! Directory-backed action-space cache keyed by disabled line.
//!
//! Lookup order: memory, then `<dir>/<file_name_for(line)>`, then a fresh
//! build which is written back to disk. A file on disk is only reused when
//! its build fingerprint matches this cache's rules and substation scope.
//! Spaces are immutable once built and handed out as `Arc`s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};
use tutor_core::{GridTopology, LineId, SubstationId, TutorError, TutorResult};

use super::index::{ActionSpace, ActionSpaceBuilder};
use super::io::file_name_for;
use super::legality::LegalityRules;

pub struct ActionSpaceCache {
    dir: PathBuf,
    grid: Arc<GridTopology>,
    rules: LegalityRules,
    substations: Option<Vec<SubstationId>>,
    parallel: bool,
    entries: RwLock<HashMap<Option<LineId>, Arc<ActionSpace>>>,
}

impl ActionSpaceCache {
    pub fn new(dir: impl Into<PathBuf>, grid: Arc<GridTopology>, rules: LegalityRules) -> Self {
        Self {
            dir: dir.into(),
            grid,
            rules,
            substations: None,
            parallel: true,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_substations(mut self, ids: Vec<SubstationId>) -> Self {
        self.substations = Some(ids);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn grid(&self) -> &GridTopology {
        &self.grid
    }

    pub fn path_for(&self, disabled_line: Option<LineId>) -> PathBuf {
        self.dir.join(file_name_for(disabled_line))
    }

    fn builder(&self, disabled_line: Option<LineId>) -> ActionSpaceBuilder<'_> {
        let mut builder = ActionSpaceBuilder::new(&self.grid)
            .disabled_line(disabled_line)
            .rules(self.rules.clone())
            .parallel(self.parallel);
        if let Some(ids) = &self.substations {
            builder = builder.substations(ids.iter().copied());
        }
        builder
    }

    /// Action space for `disabled_line`, loading or building it on first use.
    ///
    /// A file on disk built with other rules or another substation scope is
    /// rebuilt and overwritten.
    pub fn get(&self, disabled_line: Option<LineId>) -> TutorResult<Arc<ActionSpace>> {
        if let Some(space) = self.entries.read().get(&disabled_line) {
            return Ok(Arc::clone(space));
        }

        // no lock held while loading or enumerating
        let path = self.path_for(disabled_line);
        let builder = self.builder(disabled_line);
        let expected = builder.fingerprint()?;
        let stored = if path.exists() {
            let space = ActionSpace::load(&path, &self.grid)?;
            if space.disabled_line() != disabled_line {
                return Err(TutorError::Validation(format!(
                    "{} was built for disabled line {:?}, expected {:?}",
                    path.display(),
                    space.disabled_line().map(|l| l.value()),
                    disabled_line.map(|l| l.value())
                )));
            }
            if space.fingerprint() == Some(expected.as_str()) {
                debug!(path = %path.display(), "action space cache hit on disk");
                Some(space)
            } else {
                info!(
                    path = %path.display(),
                    "cached action space was built with other rules or substations; rebuilding"
                );
                None
            }
        } else {
            info!(path = %path.display(), "action space not cached; building");
            None
        };

        let space = match stored {
            Some(space) => space,
            None => {
                let space = builder.build()?;
                space.save(&path)?;
                space
            }
        };

        let mut entries = self.entries.write();
        let entry = entries
            .entry(disabled_line)
            .or_insert_with(|| Arc::new(space));
        Ok(Arc::clone(entry))
    }

    /// Number of spaces held in memory.
    pub fn cached(&self) -> usize {
        self.entries.read().len()
    }

    /// Drop in-memory entries; files on disk are kept.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
