//! Ticketed FIFO of modifications with synchronous drain.

use super::scheduler::Scheduler;
use crate::changeset::Changeset;
use crate::error::{EngineError, Result};
use crate::listeners::{AppliedTransition, FailedTransition, ListenerManager, Transition};
use crate::modification::{Modification, ModificationKind};
use crate::render::Renderer;
use crate::split::SplitStrategy;
use crate::state::{apply_changeset, AppliedChanges, State};
use crate::types::{Qos, Ticket, UpdateMode, UserInfo, Viewport};
use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// Outcome of an enqueue call.
pub enum Submission<R: Renderer> {
    /// Synchronous: the State after this modification.
    Applied(Arc<State<R>>),
    /// Asynchronous: the ticket the modification was queued under.
    Queued(Ticket),
}

impl<R: Renderer> Submission<R> {
    pub fn state(&self) -> Option<&Arc<State<R>>> {
        match self {
            Submission::Applied(state) => Some(state),
            Submission::Queued(_) => None,
        }
    }

    pub fn ticket(&self) -> Option<Ticket> {
        match self {
            Submission::Applied(_) => None,
            Submission::Queued(ticket) => Some(*ticket),
        }
    }
}

impl<R: Renderer> fmt::Debug for Submission<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Submission::Applied(state) => f
                .debug_tuple("Applied")
                .field(&state.generation())
                .finish(),
            Submission::Queued(ticket) => f.debug_tuple("Queued").field(ticket).finish(),
        }
    }
}

enum Work<R: Renderer> {
    Modification(Modification<R>),
    /// A later part of a split changeset, computed before the first part
    /// was committed.
    Prepared {
        state: State<R>,
        changes: AppliedChanges,
        kind: ModificationKind,
        user_info: UserInfo,
    },
}

struct Pending<R: Renderer> {
    ticket: Ticket,
    work: Work<R>,
    mode: UpdateMode,
    qos: Qos,
    /// Completing this entry completes its ticket.
    last_part: bool,
    /// Eligible for viewport splitting.
    splittable: bool,
}

/// Who is responsible for applying queued entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Driver {
    Idle,
    /// A scheduler job for this epoch is queued.
    Scheduled(u64),
    /// A thread is applying entries right now.
    Running(ThreadId),
}

struct QueueState<R: Renderer> {
    pending: VecDeque<Pending<R>>,
    driver: Driver,
    next_ticket: u64,
    /// Highest ticket fully applied (or failed).
    completed: Ticket,
    sync_waiters: usize,
    /// Results of synchronous tickets, taken by their callers.
    results: HashMap<Ticket, Result<Arc<State<R>>>>,
    epoch: u64,
}

impl<R: Renderer> QueueState<R> {
    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }
}

/// Releases the driver role when dropped, even on unwind.
struct DriverGuard<'a, R: Renderer> {
    owner: &'a ModificationQueue<R>,
}

impl<R: Renderer> Drop for DriverGuard<'_, R> {
    fn drop(&mut self) {
        let mut queue = self.owner.queue.lock();
        self.owner.release(&mut queue);
    }
}

/// Serializes modifications and owns the current State.
///
/// Only the driver commits: exactly one modification's effects are being
/// committed at any time, and the current State is replaced once per
/// successful modification before listeners hear about it.
pub struct ModificationQueue<R: Renderer> {
    queue: Mutex<QueueState<R>>,
    idle: Condvar,
    current: RwLock<Arc<State<R>>>,
    listeners: ListenerManager<R>,
    scheduler: Arc<Scheduler>,
    splitter: RwLock<Option<Arc<dyn SplitStrategy<R>>>>,
    viewport: RwLock<Viewport>,
    this: Weak<Self>,
}

impl<R: Renderer> ModificationQueue<R> {
    pub fn new(
        initial: State<R>,
        scheduler: Arc<Scheduler>,
        splitter: Option<Arc<dyn SplitStrategy<R>>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            queue: Mutex::new(QueueState {
                pending: VecDeque::new(),
                driver: Driver::Idle,
                next_ticket: 0,
                completed: Ticket::default(),
                sync_waiters: 0,
                results: HashMap::new(),
                epoch: 0,
            }),
            idle: Condvar::new(),
            current: RwLock::new(Arc::new(initial)),
            listeners: ListenerManager::new(),
            scheduler,
            splitter: RwLock::new(splitter),
            viewport: RwLock::new(Viewport::default()),
            this: this.clone(),
        })
    }

    /// The most recently committed State.
    pub fn state(&self) -> Arc<State<R>> {
        Arc::clone(&self.current.read())
    }

    pub fn listeners(&self) -> &ListenerManager<R> {
        &self.listeners
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Takes effect on the next changeset split.
    pub fn set_viewport(&self, viewport: Viewport) {
        *self.viewport.write() = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.read()
    }

    /// Install or disable (None) the split strategy.
    pub fn set_split_strategy(&self, strategy: Option<Arc<dyn SplitStrategy<R>>>) {
        *self.splitter.write() = strategy;
    }

    /// Entries queued but not yet applied.
    pub fn pending_count(&self) -> usize {
        self.queue.lock().pending.len()
    }

    pub fn enqueue(&self, modification: Modification<R>, mode: UpdateMode) -> Result<Submission<R>> {
        match mode {
            UpdateMode::Synchronous => self.apply_sync(modification).map(Submission::Applied),
            UpdateMode::Asynchronous => self.enqueue_async(modification).map(Submission::Queued),
        }
    }

    /// Queue for background application and return immediately.
    pub fn enqueue_async(&self, modification: Modification<R>) -> Result<Ticket> {
        let qos = modification.qos();
        let mut queue = self.queue.lock();
        let ticket = queue.issue_ticket();
        queue.pending.push_back(Pending {
            ticket,
            work: Work::Modification(modification),
            mode: UpdateMode::Asynchronous,
            qos,
            last_part: true,
            splittable: true,
        });
        debug!(ticket = ticket.0, ?qos, "queued modification");

        if queue.driver == Driver::Idle && queue.sync_waiters == 0 {
            if let Err(error) = self.schedule(&mut queue) {
                queue.pending.pop_back();
                return Err(error);
            }
        }
        Ok(ticket)
    }

    /// Apply everything queued so far, then `modification`, on this thread.
    ///
    /// Blocks while another thread is in the middle of applying an entry.
    /// Called from a thread that already drives the queue (a listener
    /// callback), it drains inline instead.
    pub fn apply_sync(&self, modification: Modification<R>) -> Result<Arc<State<R>>> {
        let qos = modification.qos();
        let mut queue = self.queue.lock();
        let ticket = queue.issue_ticket();
        queue.pending.push_back(Pending {
            ticket,
            work: Work::Modification(modification),
            mode: UpdateMode::Synchronous,
            qos,
            last_part: true,
            splittable: false,
        });

        let _driver = self.acquire(queue);
        self.drain_through(ticket);
        self.take_result(ticket)
    }

    /// Apply every queued entry on the calling thread.
    pub fn flush(&self) {
        let queue = self.queue.lock();
        let last = match queue.pending.back() {
            Some(entry) => entry.ticket,
            None => return,
        };
        let _driver = self.acquire(queue);
        self.drain_through(last);
    }

    /// Block until nothing is queued or running.
    ///
    /// Returns immediately when called from the thread driving the queue.
    pub fn wait_until_idle(&self) {
        let this_thread = thread::current().id();
        let mut queue = self.queue.lock();
        loop {
            if queue.driver == Driver::Running(this_thread) {
                return;
            }
            if queue.pending.is_empty() && queue.driver == Driver::Idle {
                return;
            }
            if queue.driver == Driver::Idle && queue.sync_waiters == 0 {
                if self.schedule(&mut queue).is_err() {
                    drop(queue);
                    self.flush();
                    queue = self.queue.lock();
                    continue;
                }
            }
            self.idle.wait(&mut queue);
        }
    }

    /// Become the driver on the calling thread. None when it already is.
    fn acquire<'a>(
        &'a self,
        mut queue: MutexGuard<'a, QueueState<R>>,
    ) -> Option<DriverGuard<'a, R>> {
        let this_thread = thread::current().id();
        if queue.driver == Driver::Running(this_thread) {
            return None;
        }

        queue.sync_waiters += 1;
        while matches!(queue.driver, Driver::Running(_)) {
            self.idle.wait(&mut queue);
        }
        queue.sync_waiters -= 1;
        // Overrides a queued scheduler job; it becomes stale.
        queue.driver = Driver::Running(this_thread);
        Some(DriverGuard { owner: self })
    }

    fn schedule(&self, queue: &mut QueueState<R>) -> Result<()> {
        let qos = match queue.pending.front() {
            Some(entry) => entry.qos,
            None => return Ok(()),
        };
        queue.epoch += 1;
        let epoch = queue.epoch;
        let this = self.this.clone();
        self.scheduler.submit(qos, move || {
            if let Some(owner) = this.upgrade() {
                owner.run_scheduled(epoch);
            }
        })?;
        queue.driver = Driver::Scheduled(epoch);
        Ok(())
    }

    /// Scheduler job: apply one entry, then hand the queue back.
    fn run_scheduled(&self, epoch: u64) {
        let entry = {
            let mut queue = self.queue.lock();
            if queue.driver != Driver::Scheduled(epoch) {
                return;
            }
            match queue.pending.pop_front() {
                Some(entry) => {
                    queue.driver = Driver::Running(thread::current().id());
                    entry
                }
                None => {
                    queue.driver = Driver::Idle;
                    self.idle.notify_all();
                    return;
                }
            }
        };

        let _driver = DriverGuard { owner: self };
        self.process(entry);
    }

    /// Give up the driver role; reschedule remaining work unless a
    /// synchronous caller is about to take over.
    fn release(&self, queue: &mut QueueState<R>) {
        queue.driver = Driver::Idle;
        if queue.sync_waiters == 0 && !queue.pending.is_empty() {
            if let Err(error) = self.schedule(queue) {
                warn!(%error, pending = queue.pending.len(), "could not reschedule modifications");
            }
        }
        self.idle.notify_all();
    }

    fn drain_through(&self, ticket: Ticket) {
        loop {
            let entry = {
                let mut queue = self.queue.lock();
                if queue.completed >= ticket {
                    return;
                }
                match queue.pending.pop_front() {
                    Some(entry) => entry,
                    None => return,
                }
            };
            self.process(entry);
        }
    }

    fn take_result(&self, ticket: Ticket) -> Result<Arc<State<R>>> {
        self.queue.lock().results.remove(&ticket).unwrap_or_else(|| {
            Err(EngineError::Modification(format!(
                "no result recorded for ticket {}",
                ticket.0
            )))
        })
    }

    /// Split an asynchronous changeset and compute every part against the
    /// State it follows. Returns the first part; the others are queued at
    /// the front under the same ticket, already computed. If any part
    /// fails, nothing is queued and the whole changeset fails.
    fn apply_split(
        &self,
        ticket: Ticket,
        last_part: &mut bool,
        base: &State<R>,
        changeset: Changeset<R::Model>,
        user_info: &UserInfo,
        qos: Qos,
    ) -> Result<(State<R>, AppliedChanges)> {
        let splitter = match self.splitter.read().clone() {
            Some(splitter) => splitter,
            None => return apply_changeset(base, &changeset),
        };
        let viewport = self.viewport();

        let batches = splitter.split(base, changeset, &viewport);
        let mut parts: Vec<(State<R>, AppliedChanges)> = Vec::with_capacity(batches.len());
        for batch in &batches {
            let next = match parts.last() {
                Some((state, _)) => apply_changeset(state, batch)?,
                None => apply_changeset(base, batch)?,
            };
            parts.push(next);
        }

        let mut parts = parts.into_iter();
        let first = match parts.next() {
            Some(first) => first,
            None => return apply_changeset(base, &Changeset::default()),
        };
        let rest: Vec<(State<R>, AppliedChanges)> = parts.collect();

        if !rest.is_empty() {
            debug!(ticket = ticket.0, parts = rest.len() + 1, "split changeset");
            let count = rest.len();
            let mut queue = self.queue.lock();
            for (index, (state, changes)) in rest.into_iter().enumerate().rev() {
                queue.pending.push_front(Pending {
                    ticket,
                    work: Work::Prepared {
                        state,
                        changes,
                        kind: ModificationKind::ApplyChangeset,
                        user_info: user_info.clone(),
                    },
                    mode: UpdateMode::Asynchronous,
                    qos,
                    last_part: *last_part && index + 1 == count,
                    splittable: false,
                });
            }
            *last_part = false;
        }

        Ok(first)
    }

    /// Apply one entry, commit, and notify listeners.
    fn process(&self, entry: Pending<R>) {
        let Pending {
            ticket,
            work,
            mode,
            mut last_part,
            splittable,
            ..
        } = entry;
        let base = self.state();

        let (kind, user_info, outcome) = match work {
            Work::Prepared {
                state,
                changes,
                kind,
                user_info,
            } => (kind, user_info, Ok((state, changes))),
            Work::Modification(modification) => {
                let kind = modification.kind();
                let user_info = modification.user_info().clone();
                debug!(
                    ticket = ticket.0,
                    %kind,
                    generation = base.generation().0,
                    "applying modification"
                );
                let outcome = match modification {
                    Modification::ApplyChangeset {
                        changeset, qos, ..
                    } if splittable && mode == UpdateMode::Asynchronous => self.apply_split(
                        ticket,
                        &mut last_part,
                        &base,
                        changeset,
                        &user_info,
                        qos,
                    ),
                    other => other.apply(&base),
                };
                (kind, user_info, outcome)
            }
        };

        let transition = match outcome {
            Ok((state, changes)) => {
                let current = Arc::new(state);
                *self.current.write() = Arc::clone(&current);
                {
                    let mut queue = self.queue.lock();
                    if last_part {
                        queue.completed = ticket;
                    }
                    if mode == UpdateMode::Synchronous {
                        queue.results.insert(ticket, Ok(Arc::clone(&current)));
                    }
                }
                debug!(
                    ticket = ticket.0,
                    generation = current.generation().0,
                    "committed modification"
                );
                Transition::Applied(AppliedTransition {
                    ticket,
                    previous: base,
                    current,
                    changes,
                    mode,
                    kind,
                    user_info,
                })
            }
            Err(error) => {
                warn!(ticket = ticket.0, %kind, %error, "modification failed");
                {
                    let mut queue = self.queue.lock();
                    queue.completed = ticket;
                    if mode == UpdateMode::Synchronous {
                        queue.results.insert(ticket, Err(error.clone()));
                    }
                }
                Transition::Failed(FailedTransition {
                    ticket,
                    previous: base,
                    error,
                    mode,
                    kind,
                    user_info,
                })
            }
        };

        self.listeners.notify(&transition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitConfig;
    use crate::split::ViewportSplitter;
    use crate::testing::{config, s, LabelRenderer};
    use crate::types::{IndexPath, Point, Size};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn queue() -> Arc<ModificationQueue<LabelRenderer>> {
        let scheduler = Arc::new(Scheduler::new(1, "queue-test").unwrap());
        ModificationQueue::new(State::empty(config("w")), scheduler, None)
    }

    /// Two 44pt rows visible, two items per later batch.
    fn split_queue() -> Arc<ModificationQueue<LabelRenderer>> {
        let scheduler = Arc::new(Scheduler::new(1, "queue-split-test").unwrap());
        let splitter = ViewportSplitter::new(SplitConfig {
            batch_size: 2,
            ..Default::default()
        });
        let queue = ModificationQueue::new(
            State::empty(config("w")),
            scheduler,
            Some(Arc::new(splitter) as Arc<dyn SplitStrategy<LabelRenderer>>),
        );
        queue.set_viewport(Viewport::new(
            Size {
                width: 100.0,
                height: 88.0,
            },
            Point::default(),
        ));
        queue
    }

    fn fill(models: &[&str]) -> Modification<LabelRenderer> {
        let changeset = Changeset::builder()
            .with_inserted_items(
                models
                    .iter()
                    .enumerate()
                    .map(|(i, model)| (IndexPath::new(0, i), s(model))),
            )
            .build();
        Modification::apply_changeset(changeset, Qos::Default, UserInfo::new())
    }

    fn recorder(
        queue: &ModificationQueue<LabelRenderer>,
    ) -> Arc<Mutex<Vec<Transition<LabelRenderer>>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        queue
            .listeners()
            .add_listener(Arc::new(move |transition: &Transition<LabelRenderer>| {
                sink.lock().push(transition.clone());
            }));
        log
    }

    fn insert(section: usize, item: usize, model: &str) -> Modification<LabelRenderer> {
        let changeset = Changeset::builder()
            .with_inserted_items([(IndexPath::new(section, item), s(model))])
            .build();
        Modification::apply_changeset(changeset, Qos::Default, UserInfo::new())
    }

    fn new_section() -> Modification<LabelRenderer> {
        let changeset = Changeset::builder().with_inserted_sections([0]).build();
        Modification::apply_changeset(changeset, Qos::Default, UserInfo::new())
    }

    #[test]
    fn test_sync_apply() {
        let queue = queue();
        queue.apply_sync(new_section()).unwrap();
        let state = queue.apply_sync(insert(0, 0, "A")).unwrap();
        assert_eq!(state.models(), vec![vec![s("A")]]);
        assert!(Arc::ptr_eq(&state, &queue.state()));
    }

    #[test]
    fn test_async_then_wait() {
        let queue = queue();
        let first = queue.enqueue_async(new_section()).unwrap();
        let second = queue.enqueue_async(insert(0, 0, "A")).unwrap();
        assert!(first < second);

        queue.wait_until_idle();
        assert_eq!(queue.state().models(), vec![vec![s("A")]]);
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_sync_drains_prior_async() {
        let queue = queue();
        queue.enqueue_async(new_section()).unwrap();
        queue.enqueue_async(insert(0, 0, "A")).unwrap();
        let state = queue.apply_sync(insert(0, 1, "B")).unwrap();
        assert_eq!(state.models(), vec![vec![s("A"), s("B")]]);
    }

    #[test]
    fn test_failure_keeps_state_and_continues() {
        let queue = queue();
        queue.apply_sync(new_section()).unwrap();
        let before = queue.state();

        let result = queue.apply_sync(insert(0, 4, "X"));
        assert!(matches!(result, Err(EngineError::ItemOutOfBounds { .. })));
        assert!(Arc::ptr_eq(&before, &queue.state()));

        let state = queue.apply_sync(insert(0, 0, "A")).unwrap();
        assert_eq!(state.models(), vec![vec![s("A")]]);
    }

    #[test]
    fn test_reentrant_sync_from_listener() {
        let queue = queue();
        let fired = Arc::new(AtomicUsize::new(0));
        {
            let weak = Arc::downgrade(&queue);
            let fired = Arc::clone(&fired);
            queue.listeners().add_listener(Arc::new(move |transition: &Transition<LabelRenderer>| {
                // React to the section insert by filling it, synchronously.
                if transition.current().section_count() == 1
                    && transition.current().item_count() == 0
                    && fired.fetch_add(1, Ordering::SeqCst) == 0
                {
                    if let Some(queue) = weak.upgrade() {
                        queue.apply_sync(insert(0, 0, "nested")).unwrap();
                    }
                }
            }));
        }

        let state = queue.apply_sync(new_section()).unwrap();
        // The outer call returns the State its own modification produced.
        assert_eq!(state.item_count(), 0);
        assert_eq!(queue.state().models(), vec![vec![s("nested")]]);
    }

    #[test]
    fn test_split_parts_commit_in_order() {
        let queue = split_queue();
        queue.apply_sync(new_section()).unwrap();
        let log = recorder(&queue);

        let ticket = queue
            .enqueue_async(fill(&["a", "b", "c", "d", "e", "f"]))
            .unwrap();
        queue.wait_until_idle();

        let log = log.lock();
        let counts: Vec<usize> = log.iter().map(|t| t.current().item_count()).collect();
        assert_eq!(counts, vec![2, 4, 6]);
        assert!(log.iter().all(|t| t.ticket() == ticket && !t.is_failure()));
        assert!(log
            .windows(2)
            .all(|pair| Arc::ptr_eq(pair[0].current(), pair[1].previous())));
        assert!(Arc::ptr_eq(log[2].current(), &queue.state()));
    }

    #[test]
    fn test_split_failure_commits_nothing() {
        let queue = split_queue();
        queue.apply_sync(new_section()).unwrap();
        let before = queue.state();
        let log = recorder(&queue);

        // The failing item lands in the last batch, well off screen.
        let ticket = queue
            .enqueue_async(fill(&["a", "b", "c", "d", "e", "!f"]))
            .unwrap();
        queue.enqueue_async(insert(0, 0, "next")).unwrap();
        queue.wait_until_idle();

        let log = log.lock();
        assert_eq!(log.len(), 2);
        assert!(log[0].is_failure());
        assert_eq!(log[0].ticket(), ticket);
        assert!(Arc::ptr_eq(log[0].previous(), &before));
        assert!(!log[1].is_failure());
        assert_eq!(queue.state().models(), vec![vec![s("next")]]);
    }
}
