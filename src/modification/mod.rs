//! Units of work that move the engine from one State to the next.
//!
//! [`Modification`] is a closed sum type dispatched by a single function,
//! [`Modification::apply`]. Extensions go through the
//! [`Modification::Custom`] variant rather than new variants.

mod generator;
mod types;

pub use generator::ChangesetModificationGenerator;
pub use types::{ItemStateUpdater, Modification, ModificationKind, StateModifier};
