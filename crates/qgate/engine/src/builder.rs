//! Builder for running gates
//!
//! Collects the optional collaborators of a gate (shared store, timer
//! service, mailbox size) and starts its worker.

use std::sync::Arc;

use qgate_store::KeyValueStore;
use qgate_types::GateConfig;

use crate::error::{GateError, GateResult};
use crate::record::RecordStore;
use crate::runtime::{GateHandle, GateWorker};
use crate::timer::{TimerService, TokioTimer};

/// Default number of events buffered in a gate's mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// Builder for a single gate instance
pub struct GateBuilder {
    config: GateConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    timer: Option<Arc<dyn TimerService>>,
    mailbox_capacity: usize,
}

impl GateBuilder {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            store: None,
            timer: None,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }

    /// Set the store used when persistence is enabled
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the timer service for message expiry
    pub fn with_timer(mut self, timer: Arc<dyn TimerService>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Validate the configuration and start the gate.
    ///
    /// Fails when persistence is enabled but no store was provided. A store
    /// given to a gate without persistence is ignored.
    pub async fn spawn(self) -> GateResult<GateHandle> {
        let config = self.config.validate()?;

        let records = match (config.persistence.enabled, self.store) {
            (true, Some(store)) => Some(RecordStore::new(
                store,
                config.persistence.store_name.clone(),
                config.name.clone(),
            )),
            (true, None) => {
                return Err(GateError::Config(format!(
                    "gate {} has persistence enabled but no store",
                    config.name
                )))
            }
            (false, _) => None,
        };

        let timer = self.timer.unwrap_or_else(|| Arc::new(TokioTimer));
        Ok(GateWorker::start(Arc::new(config), records, timer, self.mailbox_capacity).await)
    }
}
