//! # tutor-core: Grid Topology Model
//!
//! Static description of a power grid as seen by a topology controller:
//! which objects hang off which substation, where each object sits in the
//! grid-wide topology vector, and which objects stay connected when a line
//! is taken out of service.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tutor_core::{GridTopology, LineId, SubstationId};
//!
//! let grid = GridTopology::load("test_data/grids/rte_case14_realistic.json")?;
//! let live = grid
//!     .connectivity()
//!     .objects_of(SubstationId::new(1), Some(LineId::new(0)))?;
//! println!("{} live objects", live.len());
//! # Ok::<(), tutor_core::TutorError>(())
//! ```
//!
//! ## Core Data Structures
//!
//! - [`ObjectRef`] - Tagged object identifier (`kind` + `id`)
//! - [`GridTopology`] - Validated connectivity table and column layout
//! - [`ConnectivityView`] - Live-object queries under a disabled line
//! - [`TutorConfig`] - TOML configuration shared by the tools
//! - [`TutorError`] - Unified error type

pub mod config;
pub mod connectivity;
pub mod error;
pub mod ids;
pub mod topology;

pub use config::{
    DistanceMetric, EncodingKind, ModelType, NetworkType, TutorConfig,
};
pub use connectivity::{ConnectivityView, SubstationObjects};
pub use error::{TutorError, TutorResult};
pub use ids::{LineId, ObjectKind, ObjectRef, SubstationId};
pub use topology::{GridTopology, GridTopologyFile, Substation, TopoVectPositions};
