//! # tutor-algo: Action Spaces for Topology Control
//!
//! Enumerates every legal two-busbar reconfiguration of a grid, stores the
//! result as a flat matrix indexed by substation, and maps real-valued model
//! predictions back onto the nearest legal actions.
//!
//! ## Action Space Generation
//!
//! | Stage | Type | Purpose |
//! |-------|------|---------|
//! | Connectivity | [`tutor_core::ConnectivityView`] | Live objects per substation |
//! | Enumeration | [`action_space::enumerate`] | Canonical splits of one substation |
//! | Legality | [`LegalityRules`] | One-line rule plus per-grid exclusions |
//! | Indexing | [`ActionSpace`] | Flat matrix with per-substation slices |
//! | Persistence | [`action_space::io`] | Arrow IPC, one file per disabled line |
//!
//! Substations are enumerated in parallel when the `desktop` feature (rayon)
//! is enabled. Output order does not depend on scheduling.
//!
//! ## Resolution
//!
//! [`ActionDistanceResolver`] ranks the actions of one substation by L1 or
//! L2 distance to a prediction, under one of three [`ActionEncoding`]s.
//! [`evaluation`] turns those rankings into validation statistics.
//!
//! ```rust,no_run
//! use tutor_algo::{ActionDistanceResolver, ActionSpaceBuilder, LegalityRules};
//! use tutor_core::GridTopology;
//!
//! let grid = GridTopology::load("test_data/grids/rte_case14_realistic.json")?;
//! let space = ActionSpaceBuilder::new(&grid)
//!     .rules(LegalityRules::rte_case14_realistic())
//!     .build()?;
//! let prediction = vec![0.0; grid.n_objects()];
//! let ranking = ActionDistanceResolver::new(&space).rank(&prediction, None, None)?;
//! println!("nearest: {:?}", ranking.nearest());
//! # Ok::<(), tutor_core::TutorError>(())
//! ```

pub mod action_space;
pub mod evaluation;
pub mod resolver;

pub use action_space::{
    ActionSpace, ActionSpaceBuilder, ActionSpaceCache, BusbarAssignment, ExclusionRule,
    LegalityRules, PredicateKind,
};
pub use evaluation::{EarlyStopping, IncrementalAverage, ValidationStats, ValidationSummary};
pub use resolver::{ActionDistanceResolver, ActionEncoding, RankedAction, Ranking};
