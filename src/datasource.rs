//! The data source: public entry point tying the queue, splitter and
//! listeners together.

use crate::changeset::Changeset;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::listeners::{Listener, ListenerId, SubscriptionConfig, SubscriptionHandle, SubscriptionId};
use crate::modification::{ChangesetModificationGenerator, Modification};
use crate::queue::{ModificationQueue, Scheduler, Submission};
use crate::render::{Configuration, Renderer};
use crate::split::{SplitStrategy, ViewportSplitter};
use crate::state::State;
use crate::types::{IndexPath, Point, Qos, Size, UpdateMode, UserInfo, Viewport};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Sequences rendered States for one list of sections.
///
/// Provides a unified interface for:
/// - Applying changesets, configuration updates and reloads
/// - Routing item-state updates from rendered items
/// - Observing every transition through listeners or subscriptions
/// - Steering viewport splitting of large asynchronous changesets
pub struct DataSource<R: Renderer> {
    config: EngineConfig,

    /// Queue owning the current State.
    queue: Arc<ModificationQueue<R>>,

    /// Maps changesets to modifications (None = ApplyChangeset).
    generator: RwLock<Option<Arc<dyn ChangesetModificationGenerator<R>>>>,
}

impl<R: Renderer> DataSource<R> {
    /// Create a data source with its own scheduler.
    pub fn new(configuration: Configuration<R>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let scheduler = Arc::new(Scheduler::from_config(&config)?);
        Ok(Self::with_scheduler(configuration, config, scheduler))
    }

    /// Create a data source that runs its background work on `scheduler`.
    ///
    /// `config.worker_threads` and `config.thread_name` are ignored.
    pub fn with_scheduler(
        configuration: Configuration<R>,
        config: EngineConfig,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        let splitter = config.split.clone().map(|split| {
            Arc::new(ViewportSplitter::new(split)) as Arc<dyn SplitStrategy<R>>
        });
        debug!(
            scheduler = scheduler.name(),
            split = splitter.is_some(),
            "creating data source"
        );
        let queue = ModificationQueue::new(State::empty(configuration), scheduler, splitter);

        Self {
            config,
            queue,
            generator: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The most recently committed State.
    pub fn state(&self) -> Arc<State<R>> {
        self.queue.state()
    }

    // --- Modifications ---

    /// Apply a changeset at default priority.
    pub fn apply_changeset(
        &self,
        changeset: Changeset<R::Model>,
        mode: UpdateMode,
        user_info: UserInfo,
    ) -> Result<Submission<R>> {
        self.apply_changeset_with_qos(changeset, mode, Qos::Default, user_info)
    }

    /// Apply a changeset. `qos` only affects when background work runs.
    pub fn apply_changeset_with_qos(
        &self,
        changeset: Changeset<R::Model>,
        mode: UpdateMode,
        qos: Qos,
        user_info: UserInfo,
    ) -> Result<Submission<R>> {
        let generator = self.generator.read().clone();
        let modification = match generator {
            Some(generator) => generator.generate(changeset, user_info, qos),
            None => Modification::apply_changeset(changeset, qos, user_info),
        };
        self.queue.enqueue(modification, mode)
    }

    /// Re-render every item against a new configuration.
    pub fn update_configuration(
        &self,
        configuration: Configuration<R>,
        mode: UpdateMode,
        user_info: UserInfo,
    ) -> Result<Submission<R>> {
        self.queue.enqueue(
            Modification::UpdateConfiguration {
                configuration,
                user_info,
            },
            mode,
        )
    }

    /// Re-render every item against the current configuration.
    pub fn reload(&self, mode: UpdateMode, user_info: UserInfo) -> Result<Submission<R>> {
        self.queue.enqueue(Modification::Reload { user_info }, mode)
    }

    /// Replace the internal state of the item at `path` and re-render it.
    pub fn update_item_state<F>(
        &self,
        path: IndexPath,
        updater: F,
        mode: UpdateMode,
        user_info: UserInfo,
    ) -> Result<Submission<R>>
    where
        F: FnOnce(&R::ItemState) -> R::ItemState + Send + 'static,
    {
        self.queue
            .enqueue(Modification::state_update(path, updater, user_info), mode)
    }

    /// Enqueue any modification, including [`Modification::Custom`].
    pub fn apply_modification(
        &self,
        modification: Modification<R>,
        mode: UpdateMode,
    ) -> Result<Submission<R>> {
        self.queue.enqueue(modification, mode)
    }

    /// Handle rendered items use to request their own state updates.
    pub fn item_state_sink(&self) -> ItemStateSink<R> {
        ItemStateSink {
            queue: Arc::downgrade(&self.queue),
        }
    }

    // --- Viewport & strategies ---

    /// Takes effect on the next changeset split, not retroactively.
    pub fn set_viewport(&self, size: Size, content_offset: Point) {
        self.queue.set_viewport(Viewport::new(size, content_offset));
    }

    pub fn viewport(&self) -> Viewport {
        self.queue.viewport()
    }

    /// Replace the split strategy; `None` disables splitting.
    pub fn set_viewport_split_strategy(&self, strategy: Option<Arc<dyn SplitStrategy<R>>>) {
        self.queue.set_split_strategy(strategy);
    }

    /// Replace the changeset generator; `None` restores the default.
    pub fn set_changeset_modification_generator(
        &self,
        generator: Option<Arc<dyn ChangesetModificationGenerator<R>>>,
    ) {
        *self.generator.write() = generator;
    }

    // --- Listeners ---

    pub fn add_listener(&self, listener: Arc<dyn Listener<R>>) -> ListenerId {
        self.queue.listeners().add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.queue.listeners().remove_listener(id)
    }

    /// Remove a listener by `Arc` identity.
    pub fn remove_listener_instance(&self, listener: &Arc<dyn Listener<R>>) -> bool {
        self.queue.listeners().remove_listener_instance(listener)
    }

    /// Subscribe with the configured default buffer size.
    pub fn subscribe(&self) -> SubscriptionHandle<R> {
        self.subscribe_with(SubscriptionConfig {
            buffer_size: self.config.subscription_buffer_size,
            ..Default::default()
        })
    }

    pub fn subscribe_with(&self, config: SubscriptionConfig) -> SubscriptionHandle<R> {
        self.queue.listeners().subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.queue.listeners().unsubscribe(id)
    }

    // --- Queue control ---

    /// Apply everything queued so far on the calling thread.
    pub fn flush(&self) {
        self.queue.flush()
    }

    /// Block until no modification is queued or running.
    pub fn wait_until_idle(&self) {
        self.queue.wait_until_idle()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.pending_count()
    }
}

impl<R: Renderer> fmt::Debug for DataSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("generation", &self.state().generation())
            .field("pending", &self.pending_count())
            .field("config", &self.config)
            .finish()
    }
}

/// Inbound path for item-level state updates.
///
/// Holds the queue weakly: rendered items may outlive their data source, in
/// which case requests fail with [`EngineError::Disconnected`].
pub struct ItemStateSink<R: Renderer> {
    queue: Weak<ModificationQueue<R>>,
}

impl<R: Renderer> ItemStateSink<R> {
    pub fn request_update<F>(
        &self,
        path: IndexPath,
        updater: F,
        mode: UpdateMode,
        user_info: UserInfo,
    ) -> Result<Submission<R>>
    where
        F: FnOnce(&R::ItemState) -> R::ItemState + Send + 'static,
    {
        let queue = self.queue.upgrade().ok_or(EngineError::Disconnected)?;
        queue.enqueue(Modification::state_update(path, updater, user_info), mode)
    }

    pub fn is_connected(&self) -> bool {
        self.queue.strong_count() > 0
    }
}

impl<R: Renderer> Clone for ItemStateSink<R> {
    fn clone(&self) -> Self {
        Self {
            queue: Weak::clone(&self.queue),
        }
    }
}

impl<R: Renderer> fmt::Debug for ItemStateSink<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStateSink")
            .field("connected", &self.is_connected())
            .finish()
    }
}
