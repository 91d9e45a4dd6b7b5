//! Ordered application of modifications.
//!
//! The [`ModificationQueue`] owns the current State and applies queued
//! modifications strictly in submission order. Asynchronous entries run on
//! a shared [`Scheduler`]; a synchronous call first drains everything queued
//! before it on the calling thread, then applies its own modification.

mod modification_queue;
mod scheduler;

pub use modification_queue::{ModificationQueue, Submission};
pub use scheduler::Scheduler;
