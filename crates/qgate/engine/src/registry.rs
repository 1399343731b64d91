//! Registry of running gates.
//!
//! Gates registered here share one store and one timer service but keep
//! separate records, queues and workers.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use qgate_store::KeyValueStore;
use qgate_types::{Emission, GateConfig, Message};
use tracing::info;

use crate::builder::{GateBuilder, DEFAULT_MAILBOX_CAPACITY};
use crate::error::{GateError, GateResult};
use crate::runtime::GateHandle;
use crate::timer::{TimerService, TokioTimer};

/// Named set of gate instances.
pub struct GateRegistry {
    gates: DashMap<String, GateHandle>,
    store: Option<Arc<dyn KeyValueStore>>,
    timer: Arc<dyn TimerService>,
    mailbox_capacity: usize,
}

impl GateRegistry {
    /// Registry whose gates run without a store.
    pub fn new() -> Self {
        Self {
            gates: DashMap::new(),
            store: None,
            timer: Arc::new(TokioTimer),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }

    /// Registry whose gates persist through `store` when enabled.
    pub fn with_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    pub fn with_timer(mut self, timer: Arc<dyn TimerService>) -> Self {
        self.timer = timer;
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Start a gate and register it under its configured name.
    pub async fn register(&self, config: GateConfig) -> GateResult<GateHandle> {
        let name = config.name.clone();
        if self.gates.contains_key(&name) {
            return Err(GateError::DuplicateGate(name));
        }

        let mut builder = GateBuilder::new(config)
            .with_timer(self.timer.clone())
            .with_mailbox_capacity(self.mailbox_capacity);
        if let Some(store) = &self.store {
            builder = builder.with_store(store.clone());
        }
        let handle = builder.spawn().await?;

        // Another task may have registered the same name while this one
        // was starting.
        let inserted = match self.gates.entry(name.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle.clone());
                true
            }
        };
        if !inserted {
            handle.shutdown().await?;
            return Err(GateError::DuplicateGate(name));
        }

        info!(gate = %name, "Gate registered");
        Ok(handle)
    }

    pub fn get(&self, name: &str) -> Option<GateHandle> {
        self.gates.get(name).map(|entry| entry.value().clone())
    }

    /// Deliver a message to the named gate.
    pub async fn dispatch(&self, name: &str, message: Message) -> GateResult<Option<Emission>> {
        let gate = self
            .get(name)
            .ok_or_else(|| GateError::UnknownGate(name.to_string()))?;
        gate.dispatch(message).await
    }

    /// Unregister a gate and stop its worker.
    pub async fn remove(&self, name: &str) -> GateResult<()> {
        let (_, gate) = self
            .gates
            .remove(name)
            .ok_or_else(|| GateError::UnknownGate(name.to_string()))?;
        gate.shutdown().await?;
        info!(gate = %name, "Gate removed");
        Ok(())
    }

    /// Stop every registered gate.
    pub async fn shutdown_all(&self) {
        let names = self.names();
        for name in names {
            if let Some((_, gate)) = self.gates.remove(&name) {
                let _ = gate.shutdown().await;
            }
        }
    }

    /// Registered gate names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gates.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

impl Default for GateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
