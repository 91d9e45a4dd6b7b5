//! Immutable rendered states and the pure transitions between them.
//!
//! A [`State`] is never mutated after construction. Every transition
//! function takes a base State by reference and returns a brand new one,
//! sharing unchanged items with the base.

mod apply;
mod changes;
mod types;

pub use apply::{apply_changeset, apply_item_state, rerender_all};
pub use changes::AppliedChanges;
pub use types::{Item, State};
