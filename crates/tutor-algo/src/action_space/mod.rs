//! Set-busbar action space generation.
//!
//! - [`legality`]: one-line rule and the per-grid exclusion table
//! - [`enumerate`]: two-busbar splits of a single substation
//! - [`index`]: the flattened grid-wide [`ActionSpace`] and its builder
//! - [`io`]: Arrow IPC persistence
//! - [`cache`]: directory-backed cache keyed by disabled line

pub mod cache;
pub mod enumerate;
pub mod index;
pub mod io;
pub mod legality;

pub use cache::ActionSpaceCache;
pub use enumerate::{enumerate, BusbarAssignment, MIN_OBJECTS_FOR_SPLIT};
pub use index::{ActionSlice, ActionSpace, ActionSpaceBuilder, SubstationRange};
pub use io::{file_name_for, read_action_space, write_action_space};
pub use legality::{satisfies_line_rule, ExclusionRule, LegalityRules, PredicateKind};
