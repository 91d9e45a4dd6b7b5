//! Changesets: batched item and section edits against a State.
//!
//! Coordinate rules:
//! - removed items, updated items and move sources address the base State;
//! - inserted items, move destinations, inserted sections and reloaded
//!   sections address the resulting State.
//!
//! [`plan`] resolves a changeset against the shape of a base State into the
//! final arrangement of slots, validating bounds and conflicts on the way.

mod plan;
mod types;

pub use plan::{plan, Plan, Slot};
pub use types::{Changeset, ChangesetBuilder};
