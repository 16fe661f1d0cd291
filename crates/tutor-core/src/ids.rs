use std::fmt;

use serde::{Deserialize, Serialize};

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstationId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(usize);

impl SubstationId {
    #[inline]
    pub fn new(value: usize) -> Self {
        SubstationId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl LineId {
    #[inline]
    pub fn new(value: usize) -> Self {
        LineId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SubstationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of object that can be attached to a substation busbar.
///
/// The declaration order is the connectivity order used everywhere a
/// substation's objects are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "generator")]
    Generator,
    /// Origin end of a power line
    #[serde(rename = "line_or")]
    LineOrigin,
    /// Extremity end of a power line
    #[serde(rename = "line_ex")]
    LineExtremity,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Load,
        ObjectKind::Generator,
        ObjectKind::LineOrigin,
        ObjectKind::LineExtremity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Load => "load",
            ObjectKind::Generator => "generator",
            ObjectKind::LineOrigin => "line_or",
            ObjectKind::LineExtremity => "line_ex",
        }
    }

    #[inline]
    pub fn is_line_endpoint(&self) -> bool {
        matches!(self, ObjectKind::LineOrigin | ObjectKind::LineExtremity)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged identifier of a grid object.
///
/// For line endpoints `id` is the line index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: usize,
}

impl ObjectRef {
    #[inline]
    pub fn new(kind: ObjectKind, id: usize) -> Self {
        Self { kind, id }
    }

    pub fn load(id: usize) -> Self {
        Self::new(ObjectKind::Load, id)
    }

    pub fn generator(id: usize) -> Self {
        Self::new(ObjectKind::Generator, id)
    }

    pub fn line_or(line: usize) -> Self {
        Self::new(ObjectKind::LineOrigin, line)
    }

    pub fn line_ex(line: usize) -> Self {
        Self::new(ObjectKind::LineExtremity, line)
    }

    #[inline]
    pub fn is_line_endpoint(&self) -> bool {
        self.kind.is_line_endpoint()
    }

    /// The line this object terminates, if it is a line endpoint.
    pub fn line(&self) -> Option<LineId> {
        self.is_line_endpoint().then(|| LineId::new(self.id))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
