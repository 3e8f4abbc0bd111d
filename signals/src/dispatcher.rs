use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::config::HubConfig;
use crate::error::HubError;
use crate::signal::SignalId;

/// A notification delivery, run on a dispatcher worker
pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Envelope {
    Deliver(SignalId, Job),
    Flush(oneshot::Sender<()>),
}

/// Delivers notifications off the thread that detected the change.
///
/// Each signal maps to one worker queue, so deliveries for a signal run in the order they were posted.
/// Different signals may land on different workers and carry no relative order.
#[derive(Clone)]
pub struct Dispatcher {
    shards: Arc<Vec<mpsc::UnboundedSender<Envelope>>>,
    runtime: Handle,
    catch_panics: bool,
}

impl Dispatcher {
    /// Spawns the configured number of workers on the configured (or current) tokio runtime
    pub fn new(config: &HubConfig) -> Result<Self, HubError> {
        let runtime = config.resolve_runtime()?;
        let catch_panics = config.catch_handler_panics();
        let workers = (0..config.workers())
            .map(|index| {
                let (tx, rx) = mpsc::unbounded_channel();
                runtime.spawn(worker(index, rx, catch_panics));
                tx
            })
            .collect();
        Ok(Self { shards: Arc::new(workers), runtime, catch_panics })
    }

    /// Queues a delivery and returns immediately
    pub fn post(&self, signal: SignalId, job: Job) {
        let shard = &self.shards[signal.0 as usize % self.shards.len()];
        if shard.send(Envelope::Deliver(signal, job)).is_err() {
            debug!("Dispatcher worker for signal {} is gone, dropping notification", signal);
        }
    }

    /// Resolves once every worker has run everything posted before this call
    pub async fn flush(&self) {
        let mut pending = Vec::with_capacity(self.shards.len());
        for shard in self.shards.iter() {
            let (tx, rx) = oneshot::channel();
            if shard.send(Envelope::Flush(tx)).is_ok() {
                pending.push(rx);
            }
        }
        for rx in pending {
            let _ = rx.await;
        }
    }

    /// Runs `cleanup` on the runtime's blocking pool instead of the calling thread
    pub fn spawn_blocking(&self, cleanup: impl FnOnce() + Send + 'static) { drop(self.runtime.spawn_blocking(cleanup)); }

    pub fn workers(&self) -> usize { self.shards.len() }

    /// Whether handler panics are caught and logged rather than unwinding the worker
    pub fn catches_panics(&self) -> bool { self.catch_panics }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("Dispatcher").field("workers", &self.shards.len()).finish() }
}

async fn worker(index: usize, mut rx: mpsc::UnboundedReceiver<Envelope>, catch_panics: bool) {
    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Deliver(signal, job) => {
                if !catch_panics {
                    job();
                } else if std::panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("Change handler for signal {} panicked", signal);
                }
            }
            Envelope::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Dispatcher worker {} stopped", index);
}
