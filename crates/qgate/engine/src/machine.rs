//! Gate state machine.
//!
//! Owns the current [`Mode`] and the [`GateQueue`], interprets control
//! commands and routes data messages. The machine is synchronous: it never
//! touches the store or the clock. The worker in [`crate::runtime`] wraps it
//! with persistence, expiry timers and status publication, using the
//! [`Outcome`] of each step to know what changed.

use std::sync::Arc;

use qgate_types::{Command, Emission, GateConfig, GateStatus, Message, Mode, ToggleMode};
use tracing::{debug, warn};

use crate::queue::{GateQueue, Offer, Queued, Ticket};
use crate::renege::RenegeFilter;
use crate::router::{self, Disposition};

/// How an incoming message was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Ordinary data message.
    Data,

    /// Control message carrying a known command.
    Command(Command),

    /// Control message whose payload matches no command token.
    Unknown(String),
}

/// Effects of one handled event.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outcome {
    /// Message or batch to send downstream.
    pub emission: Option<Emission>,

    /// Mode or queue changed; the record must be written back.
    pub mutated: bool,

    /// Ticket of the message newly admitted to the queue.
    pub admitted: Option<Ticket>,

    /// Tickets of messages that left the queue by any path.
    pub departed: Vec<Ticket>,
}

/// Mode and queue of one gate.
#[derive(Debug, Clone)]
pub struct GateMachine {
    config: Arc<GateConfig>,
    mode: Mode,
    queue: GateQueue,
}

impl GateMachine {
    /// Create a machine in the configured default mode with an empty queue.
    pub fn new(config: Arc<GateConfig>) -> Self {
        let mode = config.default_mode;
        Self::restore(config, mode, Vec::new())
    }

    /// Create a machine from a persisted mode and queue.
    pub fn restore(config: Arc<GateConfig>, mode: Mode, queue: Vec<Queued>) -> Self {
        let queue = GateQueue::restore(config.capacity(), config.keep_newest, queue);
        Self {
            config,
            mode,
            queue,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn queue(&self) -> &GateQueue {
        &self.queue
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Current status descriptor.
    pub fn status(&self) -> GateStatus {
        GateStatus::derive(self.mode, self.queue.len(), self.config.capacity())
    }

    /// Decide whether `message` is a command and, if so, which one.
    pub fn classify(&self, message: &Message) -> Classification {
        let fields = &self.config.fields;
        let is_control = message
            .get_str(&fields.control)
            .is_some_and(|topic| topic.to_lowercase() == self.config.control_topic);
        if !is_control {
            return Classification::Data;
        }

        match message.get(&fields.payload) {
            Some(serde_json::Value::String(token)) => match self.config.commands.resolve(token) {
                Some(command) => Classification::Command(command),
                None => Classification::Unknown(token.clone()),
            },
            Some(other) => Classification::Unknown(other.to_string()),
            None => Classification::Unknown(String::new()),
        }
    }

    /// Handle one ingress message, command or data.
    pub fn handle(&mut self, message: Message) -> Outcome {
        match self.classify(&message) {
            Classification::Data => self.route_data(message),
            Classification::Command(command) => self.apply(command, &message),
            Classification::Unknown(token) => {
                warn!(
                    gate = %self.config.name,
                    token = %token,
                    "Invalid command ignored"
                );
                Outcome::default()
            }
        }
    }

    /// Apply a command. `message` is the control message that carried it.
    pub fn apply(&mut self, command: Command, message: &Message) -> Outcome {
        let before = self.mode;
        let mut outcome = Outcome::default();

        match command {
            Command::Open => {
                let released = self.release(&mut outcome);
                outcome.emission = Some(released);
                self.mode = Mode::Open;
            }
            Command::Close => {
                self.clear(&mut outcome);
                self.mode = Mode::Closed;
            }
            Command::Queue => {
                self.mode = Mode::Queueing;
            }
            Command::Toggle => match (self.config.toggle, self.mode) {
                (ToggleMode::Binary, Mode::Open) => self.mode = Mode::Closed,
                (ToggleMode::Binary, Mode::Closed) => self.mode = Mode::Open,
                (ToggleMode::Queue, Mode::Open) => self.mode = Mode::Queueing,
                (ToggleMode::Queue, Mode::Queueing) => {
                    let released = self.release(&mut outcome);
                    outcome.emission = Some(released);
                    self.mode = Mode::Open;
                }
                (ToggleMode::Binary, Mode::Queueing) | (ToggleMode::Queue, Mode::Closed) => {}
            },
            Command::Trigger => {
                if self.mode == Mode::Queueing {
                    if let Some(head) = self.queue.pop_front() {
                        outcome.departed.push(head.ticket);
                        outcome.emission = Some(Emission::Single(head.message));
                    }
                }
            }
            Command::Peek => {
                if self.mode == Mode::Queueing {
                    if let Some(head) = self.queue.front() {
                        outcome.emission = Some(Emission::Single(head.clone()));
                    }
                }
            }
            Command::Drop => {
                if self.mode == Mode::Queueing {
                    if let Some(head) = self.queue.pop_front() {
                        outcome.departed.push(head.ticket);
                    }
                }
            }
            Command::Flush => {
                // Flush continues into reset: emit everything, then clear.
                let released = self.release(&mut outcome);
                outcome.emission = Some(released);
                self.clear(&mut outcome);
            }
            Command::Reset => {
                self.clear(&mut outcome);
            }
            Command::Default => {
                self.clear(&mut outcome);
                self.mode = self.config.default_mode;
            }
            Command::Status => {}
            Command::Renege => {
                self.renege(message, &mut outcome);
            }
        }

        outcome.mutated = self.mode != before || !outcome.departed.is_empty();
        debug!(
            gate = %self.config.name,
            command = %command,
            mode = %self.mode,
            queue_len = self.queue.len(),
            "Command applied"
        );
        outcome
    }

    /// Route a data message according to the current mode.
    pub fn route_data(&mut self, message: Message) -> Outcome {
        let mut outcome = Outcome::default();
        match router::route(self.mode) {
            Disposition::Forward => outcome.emission = Some(Emission::Single(message)),
            Disposition::Discard => {
                debug!(gate = %self.config.name, "Gate closed, message discarded");
            }
            Disposition::Enqueue => self.enqueue(message, &mut outcome),
        }
        outcome
    }

    /// Remove the message admitted under `ticket`, if it is still queued.
    pub fn expire(&mut self, ticket: &Ticket) -> Outcome {
        let mut outcome = Outcome::default();
        if let Some(expired) = self.queue.remove_ticket(ticket) {
            debug!(
                gate = %self.config.name,
                message_id = ?expired.message.id(&self.config.fields.id),
                ticket = %ticket,
                "Queued message expired"
            );
            outcome.departed.push(expired.ticket);
            outcome.mutated = true;
        }
        outcome
    }

    fn enqueue(&mut self, mut message: Message, outcome: &mut Outcome) {
        let id = message.ensure_id(&self.config.fields.id);
        let entry = Queued::new(message);
        let ticket = entry.ticket.clone();
        match self.queue.offer(entry) {
            Offer::Accepted => {
                outcome.admitted = Some(ticket);
                outcome.mutated = true;
            }
            Offer::Evicted(oldest) => {
                outcome.departed.push(oldest.ticket);
                outcome.admitted = Some(ticket);
                outcome.mutated = true;
            }
            Offer::Rejected(_) => {
                warn!(
                    gate = %self.config.name,
                    message_id = %id,
                    queue_len = self.queue.len(),
                    "Queue full, message discarded"
                );
            }
        }
    }

    fn renege(&mut self, command: &Message, outcome: &mut Outcome) {
        let filter_field = &self.config.fields.filter;
        let Some(filter) = command.get(filter_field).and_then(RenegeFilter::locate) else {
            debug!(gate = %self.config.name, "Renege without a usable filter, nothing removed");
            return;
        };

        let removed = self.queue.remove_where(|queued| filter.matches(queued));
        debug!(
            gate = %self.config.name,
            path = %filter.describe_path(),
            removed = removed.len(),
            "Renege applied"
        );
        outcome
            .departed
            .extend(removed.into_iter().map(|entry| entry.ticket));
    }

    /// Take the whole queue as one batch.
    fn release(&mut self, outcome: &mut Outcome) -> Emission {
        let mut batch = Vec::with_capacity(self.queue.len());
        for entry in self.queue.drain_all() {
            outcome.departed.push(entry.ticket);
            batch.push(entry.message);
        }
        Emission::Batch(batch)
    }

    fn clear(&mut self, outcome: &mut Outcome) {
        outcome
            .departed
            .extend(self.queue.drain_all().into_iter().map(|entry| entry.ticket));
    }
}
