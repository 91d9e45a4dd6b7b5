//! Listener fan-out.
//!
//! After every completed modification the engine notifies:
//! - callback listeners ([`Listener`]), in registration order, on the thread
//!   that completed the modification;
//! - channel subscriptions, through bounded buffers that drop slow
//!   subscribers.
//!
//! Consumers that need a specific thread must redispatch themselves.
//!
//! # Example
//!
//! ```ignore
//! let id = data_source.add_listener(Arc::new(|transition: &Transition<MyRenderer>| {
//!     if let Transition::Applied(applied) = transition {
//!         println!("inserted {:?}", applied.changes.inserted);
//!     }
//! }));
//!
//! let handle = data_source.subscribe_with(SubscriptionConfig::default());
//! while let Ok(DataSourceEvent::Transition(transition)) = handle.recv() {
//!     // ...
//! }
//! ```

mod manager;
mod types;

pub use manager::ListenerManager;
pub use types::{
    AppliedTransition, DataSourceEvent, DropReason, FailedTransition, Listener, ListenerId,
    SubscriptionConfig, SubscriptionHandle, SubscriptionId, Transition,
};
