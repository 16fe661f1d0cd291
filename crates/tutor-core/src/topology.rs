//! Substation connectivity table and topology-vector layout.
//!
//! A [`GridTopology`] is the static description of which objects (loads,
//! generators, line endpoints) hang off which substation, and where each
//! object sits in the grid-wide topology vector. It is read from a JSON
//! document:
//!
//! ```json
//! {
//!   "name": "rte_case14_realistic",
//!   "n_line": 20,
//!   "substations": [
//!     { "id": 0, "loads_id": [], "generators_id": [4],
//!       "lines_or_id": [0, 1], "lines_ex_id": [] }
//!   ],
//!   "topo_vect_pos": { "load": [], "generator": [], "line_or": [], "line_ex": [] }
//! }
//! ```
//!
//! `topo_vect_pos` is optional. Without it the layout is
//! substation-contiguous: substations in id order and, within a substation,
//! loads, generators, line origins, then line extremities, each sorted by id.

use std::collections::HashMap;
use std::fs;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connectivity::ConnectivityView;
use crate::error::{TutorError, TutorResult};
use crate::ids::{LineId, ObjectKind, ObjectRef, SubstationId};

/// One row of the connectivity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substation {
    pub id: SubstationId,
    #[serde(default)]
    pub loads_id: Vec<usize>,
    #[serde(default)]
    pub generators_id: Vec<usize>,
    #[serde(default)]
    pub lines_or_id: Vec<usize>,
    #[serde(default)]
    pub lines_ex_id: Vec<usize>,
    /// Declared object count, checked against the lists when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nb_elements: Option<usize>,
}

impl Substation {
    pub fn ids_of(&self, kind: ObjectKind) -> &[usize] {
        match kind {
            ObjectKind::Load => &self.loads_id,
            ObjectKind::Generator => &self.generators_id,
            ObjectKind::LineOrigin => &self.lines_or_id,
            ObjectKind::LineExtremity => &self.lines_ex_id,
        }
    }

    /// All attached objects in connectivity order.
    pub fn objects(&self) -> impl Iterator<Item = ObjectRef> + '_ {
        ObjectKind::ALL.into_iter().flat_map(move |kind| {
            self.ids_of(kind)
                .iter()
                .map(move |&id| ObjectRef::new(kind, id))
        })
    }

    pub fn len(&self) -> usize {
        self.loads_id.len() + self.generators_id.len() + self.lines_or_id.len() + self.lines_ex_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn normalize(&mut self) {
        self.loads_id.sort_unstable();
        self.generators_id.sort_unstable();
        self.lines_or_id.sort_unstable();
        self.lines_ex_id.sort_unstable();
    }
}

/// Explicit topology-vector columns, indexed by object id within each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopoVectPositions {
    #[serde(default)]
    pub load: Vec<usize>,
    #[serde(default)]
    pub generator: Vec<usize>,
    #[serde(default)]
    pub line_or: Vec<usize>,
    #[serde(default)]
    pub line_ex: Vec<usize>,
}

impl TopoVectPositions {
    fn of(&self, kind: ObjectKind) -> &[usize] {
        match kind {
            ObjectKind::Load => &self.load,
            ObjectKind::Generator => &self.generator,
            ObjectKind::LineOrigin => &self.line_or,
            ObjectKind::LineExtremity => &self.line_ex,
        }
    }
}

/// Serialized form of a [`GridTopology`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridTopologyFile {
    #[serde(default)]
    pub name: String,
    pub n_line: usize,
    pub substations: Vec<Substation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topo_vect_pos: Option<TopoVectPositions>,
}

/// Validated grid connectivity with a resolved topology-vector layout.
#[derive(Debug, Clone)]
pub struct GridTopology {
    name: String,
    n_line: usize,
    substations: Vec<Substation>,
    positions: HashMap<ObjectRef, usize>,
    object_at: Vec<ObjectRef>,
    column_substation: Vec<SubstationId>,
    substation_columns: Vec<Range<usize>>,
}

impl GridTopology {
    pub fn new(
        name: impl Into<String>,
        n_line: usize,
        mut substations: Vec<Substation>,
        topo_vect_pos: Option<&TopoVectPositions>,
    ) -> TutorResult<Self> {
        if substations.is_empty() {
            return Err(TutorError::Validation("grid has no substations".into()));
        }

        let mut owner: HashMap<ObjectRef, SubstationId> = HashMap::new();
        let mut kind_counts: HashMap<ObjectKind, usize> = HashMap::new();
        for (index, sub) in substations.iter_mut().enumerate() {
            if sub.id.value() != index {
                return Err(TutorError::Validation(format!(
                    "substation at position {} has id {}; ids must be listed as 0..n",
                    index, sub.id
                )));
            }
            if let Some(declared) = sub.nb_elements {
                if declared != sub.len() {
                    return Err(TutorError::Validation(format!(
                        "substation {} declares {} elements but lists {}",
                        sub.id,
                        declared,
                        sub.len()
                    )));
                }
            }
            sub.normalize();
            for obj in sub.objects() {
                if obj.is_line_endpoint() && obj.id >= n_line {
                    return Err(TutorError::Validation(format!(
                        "substation {} references {} but the grid has {} lines",
                        sub.id, obj, n_line
                    )));
                }
                if let Some(previous) = owner.insert(obj, sub.id) {
                    return Err(TutorError::Validation(format!(
                        "{} is attached to both substation {} and {}",
                        obj, previous, sub.id
                    )));
                }
                *kind_counts.entry(obj.kind).or_default() += 1;
            }
        }

        for kind in ObjectKind::ALL {
            let count = kind_counts.get(&kind).copied().unwrap_or(0);
            if kind.is_line_endpoint() && count != n_line {
                return Err(TutorError::Validation(format!(
                    "expected {} {} endpoints, found {}",
                    n_line, kind, count
                )));
            }
            if let Some(obj) = owner.keys().find(|o| o.kind == kind && o.id >= count) {
                return Err(TutorError::Validation(format!(
                    "{} ids must be contiguous from 0, found {}",
                    kind, obj
                )));
            }
            if let Some(pos) = topo_vect_pos {
                if pos.of(kind).len() != count {
                    return Err(TutorError::Validation(format!(
                        "topo_vect_pos.{} has {} entries for {} objects",
                        kind,
                        pos.of(kind).len(),
                        count
                    )));
                }
            }
        }

        let n_objects = owner.len();
        let mut slots: Vec<Option<ObjectRef>> = vec![None; n_objects];
        let mut positions = HashMap::with_capacity(n_objects);
        let mut next = 0usize;
        for sub in &substations {
            for obj in sub.objects() {
                let column = match topo_vect_pos {
                    Some(pos) => pos.of(obj.kind)[obj.id],
                    None => {
                        next += 1;
                        next - 1
                    }
                };
                let slot = slots.get_mut(column).ok_or_else(|| {
                    TutorError::Validation(format!(
                        "column {} of {} is outside the {}-object topology vector",
                        column, obj, n_objects
                    ))
                })?;
                if let Some(other) = slot {
                    return Err(TutorError::Validation(format!(
                        "{} and {} share topology column {}",
                        other, obj, column
                    )));
                }
                *slot = Some(obj);
                positions.insert(obj, column);
            }
        }
        // every slot is filled: n_objects distinct columns all < n_objects
        let object_at: Vec<ObjectRef> = slots.into_iter().flatten().collect();

        let mut column_substation = vec![SubstationId::new(0); n_objects];
        let mut substation_columns = Vec::with_capacity(substations.len());
        for sub in &substations {
            let cols: Vec<usize> = sub.objects().map(|o| positions[&o]).collect();
            let range = match (cols.iter().min(), cols.iter().max()) {
                (Some(&lo), Some(&hi)) => lo..hi + 1,
                _ => 0..0,
            };
            if range.len() != cols.len() {
                return Err(TutorError::Validation(format!(
                    "substation {} occupies non-contiguous columns {:?}",
                    sub.id, cols
                )));
            }
            for col in range.clone() {
                column_substation[col] = sub.id;
            }
            substation_columns.push(range);
        }

        Ok(Self {
            name: name.into(),
            n_line,
            substations,
            positions,
            object_at,
            column_substation,
            substation_columns,
        })
    }

    pub fn from_file_repr(file: GridTopologyFile) -> TutorResult<Self> {
        Self::new(
            file.name,
            file.n_line,
            file.substations,
            file.topo_vect_pos.as_ref(),
        )
    }

    pub fn from_json_str(json: &str) -> TutorResult<Self> {
        let file: GridTopologyFile = serde_json::from_str(json)?;
        Self::from_file_repr(file)
    }

    /// Load a topology table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> TutorResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let grid = Self::from_json_str(&contents).map_err(|err| match err {
            TutorError::Parse(msg) => TutorError::Parse(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        debug!(
            grid = grid.name(),
            substations = grid.n_substations(),
            objects = grid.n_objects(),
            "loaded grid topology"
        );
        Ok(grid)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_line(&self) -> usize {
        self.n_line
    }

    pub fn n_substations(&self) -> usize {
        self.substations.len()
    }

    /// Length of the topology vector.
    pub fn n_objects(&self) -> usize {
        self.object_at.len()
    }

    pub fn substations(&self) -> &[Substation] {
        &self.substations
    }

    pub fn substation_ids(&self) -> impl Iterator<Item = SubstationId> + '_ {
        self.substations.iter().map(|s| s.id)
    }

    pub fn substation(&self, id: SubstationId) -> TutorResult<&Substation> {
        self.substations.get(id.value()).ok_or_else(|| {
            TutorError::invalid(format!(
                "unknown substation {} (grid has {})",
                id,
                self.substations.len()
            ))
        })
    }

    pub fn position(&self, obj: &ObjectRef) -> Option<usize> {
        self.positions.get(obj).copied()
    }

    pub fn object_at(&self, column: usize) -> Option<ObjectRef> {
        self.object_at.get(column).copied()
    }

    pub fn substation_of_column(&self, column: usize) -> Option<SubstationId> {
        self.column_substation.get(column).copied()
    }

    /// Contiguous topology-vector columns of a substation.
    pub fn columns(&self, id: SubstationId) -> TutorResult<Range<usize>> {
        self.substation(id)?;
        Ok(self.substation_columns[id.value()].clone())
    }

    pub fn check_line(&self, line: LineId) -> TutorResult<()> {
        if line.value() >= self.n_line {
            return Err(TutorError::invalid(format!(
                "line {} does not exist (grid has {} lines)",
                line, self.n_line
            )));
        }
        Ok(())
    }

    pub fn connectivity(&self) -> ConnectivityView<'_> {
        ConnectivityView::new(self)
    }
}
