//! Listener and subscription types.

use crate::error::EngineError;
use crate::modification::ModificationKind;
use crate::render::Renderer;
use crate::state::{AppliedChanges, State};
use crate::types::{Ticket, UpdateMode, UserInfo};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A modification that produced a new State.
pub struct AppliedTransition<R: Renderer> {
    pub ticket: Ticket,
    pub previous: Arc<State<R>>,
    pub current: Arc<State<R>>,
    pub changes: AppliedChanges,
    pub mode: UpdateMode,
    pub kind: ModificationKind,
    pub user_info: UserInfo,
}

/// A modification that failed. `previous` is the unchanged base State.
pub struct FailedTransition<R: Renderer> {
    pub ticket: Ticket,
    pub previous: Arc<State<R>>,
    pub error: EngineError,
    pub mode: UpdateMode,
    pub kind: ModificationKind,
    pub user_info: UserInfo,
}

/// What listeners receive once per completed modification.
pub enum Transition<R: Renderer> {
    Applied(AppliedTransition<R>),
    Failed(FailedTransition<R>),
}

impl<R: Renderer> Transition<R> {
    pub fn ticket(&self) -> Ticket {
        match self {
            Transition::Applied(applied) => applied.ticket,
            Transition::Failed(failed) => failed.ticket,
        }
    }

    /// The State the modification was applied to.
    pub fn previous(&self) -> &Arc<State<R>> {
        match self {
            Transition::Applied(applied) => &applied.previous,
            Transition::Failed(failed) => &failed.previous,
        }
    }

    /// The engine's State after the modification (unchanged on failure).
    pub fn current(&self) -> &Arc<State<R>> {
        match self {
            Transition::Applied(applied) => &applied.current,
            Transition::Failed(failed) => &failed.previous,
        }
    }

    pub fn mode(&self) -> UpdateMode {
        match self {
            Transition::Applied(applied) => applied.mode,
            Transition::Failed(failed) => failed.mode,
        }
    }

    pub fn kind(&self) -> &ModificationKind {
        match self {
            Transition::Applied(applied) => &applied.kind,
            Transition::Failed(failed) => &failed.kind,
        }
    }

    pub fn user_info(&self) -> &UserInfo {
        match self {
            Transition::Applied(applied) => &applied.user_info,
            Transition::Failed(failed) => &failed.user_info,
        }
    }

    pub fn error(&self) -> Option<&EngineError> {
        match self {
            Transition::Applied(_) => None,
            Transition::Failed(failed) => Some(&failed.error),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Transition::Failed(_))
    }
}

impl<R: Renderer> Clone for Transition<R> {
    fn clone(&self) -> Self {
        match self {
            Transition::Applied(applied) => Transition::Applied(AppliedTransition {
                ticket: applied.ticket,
                previous: Arc::clone(&applied.previous),
                current: Arc::clone(&applied.current),
                changes: applied.changes.clone(),
                mode: applied.mode,
                kind: applied.kind.clone(),
                user_info: applied.user_info.clone(),
            }),
            Transition::Failed(failed) => Transition::Failed(FailedTransition {
                ticket: failed.ticket,
                previous: Arc::clone(&failed.previous),
                error: failed.error.clone(),
                mode: failed.mode,
                kind: failed.kind.clone(),
                user_info: failed.user_info.clone(),
            }),
        }
    }
}

impl<R: Renderer> fmt::Debug for Transition<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Applied(applied) => f
                .debug_struct("Applied")
                .field("ticket", &applied.ticket)
                .field("kind", &applied.kind)
                .field("mode", &applied.mode)
                .field("previous", &applied.previous.generation())
                .field("current", &applied.current.generation())
                .field("changes", &applied.changes)
                .finish(),
            Transition::Failed(failed) => f
                .debug_struct("Failed")
                .field("ticket", &failed.ticket)
                .field("kind", &failed.kind)
                .field("mode", &failed.mode)
                .field("previous", &failed.previous.generation())
                .field("error", &failed.error)
                .finish(),
        }
    }
}

/// Observer called once per completed modification.
///
/// Called on the thread that completed the modification: the caller's
/// thread for synchronous applies, a scheduler worker otherwise.
pub trait Listener<R: Renderer>: Send + Sync {
    fn on_transition(&self, transition: &Transition<R>);
}

impl<R, F> Listener<R> for F
where
    R: Renderer,
    F: Fn(&Transition<R>) + Send + Sync,
{
    fn on_transition(&self, transition: &Transition<R>) {
        self(transition)
    }
}

/// Unique identifier for a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Configuration for a channel subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping the subscriber.
    /// Default: 256
    pub buffer_size: usize,

    /// Deliver failed transitions too.
    pub include_failures: bool,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            include_failures: true,
        }
    }
}

/// Events delivered to channel subscriptions.
pub enum DataSourceEvent<R: Renderer> {
    Transition(Transition<R>),
    /// Subscription was dropped; no further events follow.
    Dropped { reason: DropReason },
}

impl<R: Renderer> Clone for DataSourceEvent<R> {
    fn clone(&self) -> Self {
        match self {
            DataSourceEvent::Transition(transition) => {
                DataSourceEvent::Transition(transition.clone())
            }
            DataSourceEvent::Dropped { reason } => DataSourceEvent::Dropped {
                reason: reason.clone(),
            },
        }
    }
}

impl<R: Renderer> fmt::Debug for DataSourceEvent<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceEvent::Transition(transition) => {
                f.debug_tuple("Transition").field(transition).finish()
            }
            DataSourceEvent::Dropped { reason } => {
                f.debug_struct("Dropped").field("reason", reason).finish()
            }
        }
    }
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to a channel subscription.
pub struct SubscriptionHandle<R: Renderer> {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<DataSourceEvent<R>>,
}

impl<R: Renderer> SubscriptionHandle<R> {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<DataSourceEvent<R>, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<DataSourceEvent<R>, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<DataSourceEvent<R>, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
