use crate::error::HubError;
use tokio::runtime::Handle;

/// Construction-time settings for a [`NotificationHub`](crate::NotificationHub)
#[derive(Debug, Clone)]
pub struct HubConfig {
    workers: usize,
    runtime: Option<Handle>,
    catch_handler_panics: bool,
}

impl Default for HubConfig {
    fn default() -> Self { Self { workers: 1, runtime: None, catch_handler_panics: true } }
}

impl HubConfig {
    pub fn new() -> Self { Self::default() }

    /// Number of dispatcher queues. Signals are sharded onto queues by id, so notifications for one
    /// signal stay ordered while different signals may be delivered in parallel.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Runtime the dispatcher workers are spawned on. Defaults to the runtime current at build time.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// When set (the default), a panicking handler is logged and its worker keeps delivering
    pub fn with_catch_handler_panics(mut self, catch: bool) -> Self {
        self.catch_handler_panics = catch;
        self
    }

    pub fn workers(&self) -> usize { self.workers }

    pub fn catch_handler_panics(&self) -> bool { self.catch_handler_panics }

    pub(crate) fn resolve_runtime(&self) -> Result<Handle, HubError> {
        match &self.runtime {
            Some(runtime) => Ok(runtime.clone()),
            None => Handle::try_current().map_err(|_| HubError::NoRuntime),
        }
    }
}
