//! # Cascade
//!
//! A state-transition engine for list data sources: it turns a sequence of
//! model-level edits into a sequence of immutable, fully rendered States.
//!
//! ## Core Concepts
//!
//! - **State**: Immutable snapshot of rendered sections plus the configuration
//!   that produced it
//! - **Changeset**: Batch of inserts, removals, updates, moves and reloads
//! - **Modification**: One transition from a State to the next
//! - **Queue**: Applies modifications in submission order, synchronously or on
//!   a priority scheduler
//! - **Splitter**: Breaks large asynchronous changesets up so visible content
//!   lands first
//! - **Listeners**: Observe every completed transition
//!
//! ## Example
//!
//! ```ignore
//! use cascade::{Changeset, Configuration, DataSource, EngineConfig, IndexPath, UpdateMode, UserInfo};
//!
//! let source = DataSource::new(Configuration::new(MyRenderer, context), EngineConfig::default())?;
//!
//! let changeset = Changeset::builder()
//!     .with_inserted_sections([0])
//!     .with_inserted_items([(IndexPath::new(0, 0), model)])
//!     .build();
//! let state = source.apply_changeset(changeset, UpdateMode::Synchronous, UserInfo::new())?;
//!
//! // Background work, observed through a listener
//! source.add_listener(Arc::new(|transition: &Transition<MyRenderer>| { /* ... */ }));
//! source.reload(UpdateMode::Asynchronous, UserInfo::new())?;
//! ```

pub mod changeset;
pub mod config;
pub mod datasource;
pub mod error;
pub mod listeners;
pub mod modification;
pub mod queue;
pub mod render;
pub mod split;
pub mod state;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports
pub use changeset::{plan, Changeset, ChangesetBuilder, Plan, Slot};
pub use config::{EngineConfig, SplitConfig};
pub use datasource::{DataSource, ItemStateSink};
pub use error::{EngineError, Result};
pub use listeners::{
    AppliedTransition, DataSourceEvent, DropReason, FailedTransition, Listener, ListenerId,
    ListenerManager, SubscriptionConfig, SubscriptionHandle, SubscriptionId, Transition,
};
pub use modification::{
    ChangesetModificationGenerator, ItemStateUpdater, Modification, ModificationKind,
    StateModifier,
};
pub use queue::{ModificationQueue, Scheduler, Submission};
pub use render::{Configuration, RenderFailure, Renderer};
pub use split::{SplitStrategy, ViewportSplitter};
pub use state::{apply_changeset, apply_item_state, rerender_all, AppliedChanges, Item, State};
pub use types::*;
