//! Priority worker pool.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::types::Qos;
use crossbeam_channel::{unbounded, Receiver, Select, Sender, TryRecvError};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{info, trace, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed pool of worker threads fed by one channel per [`Qos`] level.
///
/// A worker always takes the most urgent ready job first. Jobs still queued
/// when the scheduler is dropped are run before the workers exit.
pub struct Scheduler {
    /// Indexed by `Qos::rank`.
    senders: Vec<Sender<Job>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_ids: Vec<ThreadId>,
    name: String,
}

impl Scheduler {
    pub fn new(worker_threads: usize, name: &str) -> Result<Self> {
        if worker_threads == 0 {
            return Err(EngineError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }

        let (senders, receivers): (Vec<Sender<Job>>, Vec<Receiver<Job>>) =
            Qos::ALL.iter().map(|_| unbounded()).unzip();

        let mut workers = Vec::with_capacity(worker_threads);
        for index in 0..worker_threads {
            let receivers = receivers.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, index))
                .spawn(move || worker_loop(receivers))
                .map_err(|e| EngineError::Spawn(e.to_string()))?;
            workers.push(handle);
        }
        let worker_ids = workers.iter().map(|handle| handle.thread().id()).collect();

        info!(name, worker_threads, "scheduler started");

        Ok(Self {
            senders,
            workers: Mutex::new(workers),
            worker_ids,
            name: name.to_string(),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(config.worker_threads, &config.thread_name)
    }

    /// Queue `job` at `qos`.
    pub fn submit<F>(&self, qos: Qos, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self
            .senders
            .get(qos.rank())
            .ok_or(EngineError::SchedulerUnavailable)?;
        trace!(?qos, "submitting job");
        sender
            .send(Box::new(job))
            .map_err(|_| EngineError::SchedulerUnavailable)
    }

    /// Whether the calling thread is one of this scheduler's workers.
    pub fn is_worker_thread(&self) -> bool {
        self.worker_ids.contains(&thread::current().id())
    }

    pub fn worker_count(&self) -> usize {
        self.worker_ids.len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // Disconnecting the channels lets workers drain and exit.
        self.senders.clear();

        let current = thread::current().id();
        for handle in self.workers.lock().drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!(name = %self.name, "scheduler worker exited with a panic");
            }
        }
        info!(name = %self.name, "scheduler stopped");
    }
}

fn worker_loop(receivers: Vec<Receiver<Job>>) {
    loop {
        let mut disconnected = 0;
        let mut job = None;

        for receiver in &receivers {
            match receiver.try_recv() {
                Ok(next) => {
                    job = Some(next);
                    break;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => disconnected += 1,
            }
        }

        if let Some(job) = job {
            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                warn!("scheduler job panicked");
            }
            continue;
        }
        if disconnected == receivers.len() {
            return;
        }

        // Block until any level has work, then re-scan in priority order.
        let mut select = Select::new();
        for receiver in &receivers {
            select.recv(receiver);
        }
        select.ready();
    }
}
