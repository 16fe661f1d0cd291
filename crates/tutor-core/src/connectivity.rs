//! Live-object queries over a [`GridTopology`].
//!
//! A disabled line is out of service, so both of its endpoints are dropped
//! from their substations before any busbar configuration is considered.

use crate::error::{TutorError, TutorResult};
use crate::ids::{LineId, ObjectRef, SubstationId};
use crate::topology::GridTopology;

/// Objects of one substation that remain connected, with their columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstationObjects {
    pub substation: SubstationId,
    pub objects: Vec<ObjectRef>,
    /// Topology-vector column of each entry in `objects`
    pub columns: Vec<usize>,
}

impl SubstationObjects {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn n_line_endpoints(&self) -> usize {
        self.objects.iter().filter(|o| o.is_line_endpoint()).count()
    }
}

/// Read-only view answering "what is attached to substation X".
#[derive(Debug, Clone, Copy)]
pub struct ConnectivityView<'a> {
    grid: &'a GridTopology,
}

impl<'a> ConnectivityView<'a> {
    pub fn new(grid: &'a GridTopology) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &'a GridTopology {
        self.grid
    }

    /// Objects attached to `substation` in connectivity order, minus the
    /// endpoints of `disabled_line`.
    pub fn objects_of(
        &self,
        substation: SubstationId,
        disabled_line: Option<LineId>,
    ) -> TutorResult<Vec<ObjectRef>> {
        Ok(self.substation_objects(substation, disabled_line)?.objects)
    }

    pub fn columns_of(
        &self,
        substation: SubstationId,
        disabled_line: Option<LineId>,
    ) -> TutorResult<Vec<usize>> {
        Ok(self.substation_objects(substation, disabled_line)?.columns)
    }

    pub fn substation_objects(
        &self,
        substation: SubstationId,
        disabled_line: Option<LineId>,
    ) -> TutorResult<SubstationObjects> {
        if let Some(line) = disabled_line {
            self.grid.check_line(line)?;
        }
        let sub = self.grid.substation(substation)?;

        let mut objects = Vec::with_capacity(sub.len());
        let mut columns = Vec::with_capacity(sub.len());
        for obj in sub.objects() {
            if matches!((obj.line(), disabled_line), (Some(a), Some(b)) if a == b) {
                continue;
            }
            let column = self.grid.position(&obj).ok_or_else(|| {
                TutorError::Validation(format!("{} has no topology column", obj))
            })?;
            objects.push(obj);
            columns.push(column);
        }

        if objects.len() < 2 {
            return Err(TutorError::IllegalTopology {
                substation,
                remaining: objects.len(),
            });
        }

        Ok(SubstationObjects {
            substation,
            objects,
            columns,
        })
    }
}
