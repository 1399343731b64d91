//! Per-instance gate worker and its handle.
//!
//! Every event of one gate (ingress message, expiry, inspection, shutdown)
//! goes through a single mailbox consumed by one worker task, so each
//! read-modify-write cycle against the store completes before the next one
//! starts. Distinct gates have distinct workers and run concurrently.

use std::sync::Arc;
use std::time::Duration;

use qgate_types::{Emission, GateConfig, GateStatus, Message, Mode};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, trace};

use crate::error::{GateError, GateResult};
use crate::machine::{GateMachine, Outcome};
use crate::queue::Ticket;
use crate::record::{ExpiryJob, GateRecord, RecordStore};
use crate::timer::{remaining, ExpiryTimers, TimerService};

pub(crate) enum GateEvent {
    Ingress {
        message: Message,
        reply: oneshot::Sender<GateResult<Option<Emission>>>,
    },
    Expire(Ticket),
    Snapshot(oneshot::Sender<GateSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Point-in-time view of a gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GateSnapshot {
    pub mode: Mode,
    pub queue: Vec<Message>,
    pub pending_expiry: usize,
}

/// Handle to a running gate. Cheap to clone.
#[derive(Clone)]
pub struct GateHandle {
    name: Arc<str>,
    id_field: Arc<str>,
    sender: mpsc::Sender<GateEvent>,
    status: watch::Receiver<GateStatus>,
}

impl GateHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deliver one message and wait for its emission, if any.
    ///
    /// A message without an identifier is assigned one first.
    pub async fn dispatch(&self, mut message: Message) -> GateResult<Option<Emission>> {
        message.ensure_id(&self.id_field);
        let (reply, response) = oneshot::channel();
        self.sender
            .send(GateEvent::Ingress { message, reply })
            .await
            .map_err(|_| self.closed())?;
        response.await.map_err(|_| self.closed())?
    }

    /// Subscribe to status updates.
    pub fn status(&self) -> watch::Receiver<GateStatus> {
        self.status.clone()
    }

    /// Most recently published status.
    pub fn current_status(&self) -> GateStatus {
        self.status.borrow().clone()
    }

    /// Current mode and queue contents.
    pub async fn snapshot(&self) -> GateResult<GateSnapshot> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(GateEvent::Snapshot(reply))
            .await
            .map_err(|_| self.closed())?;
        response.await.map_err(|_| self.closed())
    }

    /// Stop the worker after the events already in its mailbox. Pending
    /// expiry timers are cancelled.
    pub async fn shutdown(&self) -> GateResult<()> {
        let (done, stopped) = oneshot::channel();
        if self.sender.send(GateEvent::Shutdown(done)).await.is_err() {
            return Ok(());
        }
        let _ = stopped.await;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn closed(&self) -> GateError {
        GateError::Closed(self.name.to_string())
    }
}

pub(crate) struct GateWorker {
    config: Arc<GateConfig>,
    machine: GateMachine,
    records: Option<RecordStore>,
    timers: ExpiryTimers,
    status: watch::Sender<GateStatus>,
    events: mpsc::WeakSender<GateEvent>,
}

impl GateWorker {
    /// Load the initial record, start the worker task and return its handle.
    pub(crate) async fn start(
        config: Arc<GateConfig>,
        records: Option<RecordStore>,
        timer: Arc<dyn TimerService>,
        mailbox: usize,
    ) -> GateHandle {
        let record = match &records {
            Some(records) => match records.load().await {
                Ok(Some(record)) => {
                    info!(
                        gate = %config.name,
                        mode = %record.mode,
                        queue_len = record.queue.len(),
                        "Gate record restored"
                    );
                    Some(record)
                }
                Ok(None) => None,
                Err(e) => {
                    error!(
                        gate = %config.name,
                        error = %e,
                        "Failed to load gate record, starting from defaults"
                    );
                    None
                }
            },
            None => None,
        };

        let (machine, expiry) = match record {
            Some(record) => (
                GateMachine::restore(config.clone(), record.mode, record.queue),
                record.expiry,
            ),
            None => (GateMachine::new(config.clone()), Vec::new()),
        };

        let (sender, receiver) = mpsc::channel(mailbox.max(1));
        let (status, status_rx) = watch::channel(machine.status());

        let mut worker = GateWorker {
            config: config.clone(),
            machine,
            records,
            timers: ExpiryTimers::new(timer),
            status,
            events: sender.downgrade(),
        };
        worker.rearm(expiry);

        info!(
            gate = %config.name,
            mode = %worker.machine.mode(),
            persistence = worker.records.is_some(),
            ttl_ms = config.ttl_ms,
            "Gate started"
        );
        tokio::spawn(worker.run(receiver));

        GateHandle {
            name: Arc::from(config.name.as_str()),
            id_field: Arc::from(config.fields.id.as_str()),
            sender,
            status: status_rx,
        }
    }

    async fn run(mut self, mut events: mpsc::Receiver<GateEvent>) {
        let mut stopped = Vec::new();

        while let Some(event) = events.recv().await {
            match event {
                GateEvent::Ingress { message, reply } => {
                    let result = self.on_message(message).await;
                    let _ = reply.send(result);
                }
                GateEvent::Expire(ticket) => self.on_expire(ticket).await,
                GateEvent::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                GateEvent::Shutdown(done) => {
                    events.close();
                    stopped.push(done);
                }
            }
        }

        self.timers.cancel_all();
        info!(gate = %self.config.name, "Gate stopped");
        for done in stopped {
            let _ = done.send(());
        }
    }

    async fn on_message(&mut self, message: Message) -> GateResult<Option<Emission>> {
        trace!(
            gate = %self.config.name,
            message_id = ?message.id(&self.config.fields.id),
            "Message received"
        );
        self.refresh().await?;
        let outcome = self.machine.handle(message);
        Ok(self.commit(outcome).await)
    }

    async fn on_expire(&mut self, ticket: Ticket) {
        self.timers.fired(&ticket);
        if self.refresh().await.is_err() {
            return;
        }
        let outcome = self.machine.expire(&ticket);
        if !outcome.mutated {
            trace!(
                gate = %self.config.name,
                ticket = %ticket,
                "Expiry for a departed message ignored"
            );
        }
        self.commit(outcome).await;
    }

    /// Read phase of a cycle: pick up the persisted record.
    ///
    /// A record holding an invalid mode aborts the cycle. Other read failures
    /// are logged and the cycle continues from the in-memory state.
    async fn refresh(&mut self) -> GateResult<()> {
        let Some(records) = &self.records else {
            return Ok(());
        };

        match records.load().await {
            Ok(Some(record)) => {
                self.machine =
                    GateMachine::restore(self.config.clone(), record.mode, record.queue);
                let queue = self.machine.queue();
                self.timers.retain(|ticket| queue.contains_ticket(ticket));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(GateError::Config(reason)) => {
                error!(
                    gate = %self.config.name,
                    reason = %reason,
                    "Invalid gate mode, event aborted"
                );
                Err(GateError::Config(reason))
            }
            Err(e) => {
                error!(
                    gate = %self.config.name,
                    error = %e,
                    "Failed to read gate record, continuing from memory"
                );
                Ok(())
            }
        }
    }

    /// Apply timer, persistence and status effects of an outcome.
    async fn commit(&mut self, outcome: Outcome) -> Option<Emission> {
        for ticket in &outcome.departed {
            self.timers.cancel(ticket);
        }
        if let (Some(ticket), Some(ttl)) = (outcome.admitted, self.config.ttl()) {
            self.arm(ticket, ttl);
        }
        if outcome.mutated {
            self.persist().await;
        }
        self.publish_status();
        outcome.emission
    }

    async fn persist(&self) {
        let Some(records) = &self.records else {
            return;
        };
        let record = GateRecord {
            mode: self.machine.mode(),
            queue: self.machine.queue().to_entries(),
            expiry: self.timers.jobs(),
        };
        if let Err(e) = records.save(&record).await {
            error!(gate = %self.config.name, error = %e, "Failed to write gate record");
        }
    }

    fn publish_status(&self) {
        let next = self.machine.status();
        let name = &self.config.name;
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(gate = %name, status = %next.text, "Status changed");
            *current = next;
            true
        });
    }

    fn arm(&mut self, ticket: Ticket, delay: Duration) {
        let events = self.events.clone();
        let expired = ticket.clone();
        self.timers.arm(
            ticket,
            delay,
            Box::pin(async move {
                if let Some(sender) = events.upgrade() {
                    let _ = sender.send(GateEvent::Expire(expired)).await;
                }
            }),
        );
    }

    /// Re-arm persisted expiry jobs after a restart. Queued messages without
    /// a job get the full time-to-live.
    fn rearm(&mut self, jobs: Vec<ExpiryJob>) {
        let Some(ttl) = self.config.ttl() else {
            return;
        };

        let queued: Vec<Ticket> = self
            .machine
            .queue()
            .entries()
            .map(|entry| entry.ticket.clone())
            .collect();

        for ticket in queued {
            let delay = jobs
                .iter()
                .find(|job| job.ticket == ticket)
                .map(|job| remaining(job.due_at))
                .unwrap_or(ttl);
            self.arm(ticket, delay);
        }

        let armed = self.timers.len();
        if armed > 0 {
            debug!(gate = %self.config.name, timers = armed, "Expiry timers re-armed");
        }
    }

    fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            mode: self.machine.mode(),
            queue: self.machine.queue().to_vec(),
            pending_expiry: self.timers.len(),
        }
    }
}
