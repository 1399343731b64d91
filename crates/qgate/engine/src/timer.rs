//! One-shot timers for message expiry.
//!
//! Every scheduled expiry is tracked by queue ticket together with an abort
//! handle, so a message leaving the queue early takes its timer with it. A
//! timer that fires anyway (aborted too late, or after a reload) must find
//! its message gone and do nothing; that check lives in the state machine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::task::AbortHandle;

use crate::queue::Ticket;
use crate::record::ExpiryJob;

/// Handle to a scheduled callback.
#[derive(Debug)]
pub struct TimerHandle(AbortHandle);

impl TimerHandle {
    pub fn cancel(&self) {
        self.0.abort();
    }
}

/// Schedules one-shot callbacks after a delay.
pub trait TimerService: Send + Sync {
    fn schedule(&self, delay: Duration, callback: BoxFuture<'static, ()>) -> TimerHandle;
}

/// Timer service backed by the tokio runtime clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl TimerService for TokioTimer {
    fn schedule(&self, delay: Duration, callback: BoxFuture<'static, ()>) -> TimerHandle {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback.await;
        });
        TimerHandle(task.abort_handle())
    }
}

struct PendingExpiry {
    due_at: DateTime<Utc>,
    handle: TimerHandle,
}

/// Expiry timers of one gate, keyed by queue ticket.
pub(crate) struct ExpiryTimers {
    timer: Arc<dyn TimerService>,
    pending: HashMap<Ticket, PendingExpiry>,
}

impl ExpiryTimers {
    pub(crate) fn new(timer: Arc<dyn TimerService>) -> Self {
        Self {
            timer,
            pending: HashMap::new(),
        }
    }

    /// Arm a timer for `ticket`, replacing any earlier one.
    pub(crate) fn arm(
        &mut self,
        ticket: Ticket,
        delay: Duration,
        callback: BoxFuture<'static, ()>,
    ) {
        let due_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        let handle = self.timer.schedule(delay, callback);
        if let Some(previous) = self.pending.insert(ticket, PendingExpiry { due_at, handle }) {
            previous.handle.cancel();
        }
    }

    /// Cancel the timer of a message that left the queue.
    pub(crate) fn cancel(&mut self, ticket: &Ticket) {
        if let Some(pending) = self.pending.remove(ticket) {
            pending.handle.cancel();
        }
    }

    /// Forget a timer that has fired.
    pub(crate) fn fired(&mut self, ticket: &Ticket) {
        self.pending.remove(ticket);
    }

    /// Cancel every timer whose message is not kept.
    pub(crate) fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Ticket) -> bool,
    {
        self.pending.retain(|ticket, pending| {
            let kept = keep(ticket);
            if !kept {
                pending.handle.cancel();
            }
            kept
        });
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.handle.cancel();
        }
    }

    /// Pending jobs, ordered by due time, for persistence.
    pub(crate) fn jobs(&self) -> Vec<ExpiryJob> {
        let mut jobs: Vec<ExpiryJob> = self
            .pending
            .iter()
            .map(|(ticket, pending)| ExpiryJob {
                ticket: ticket.clone(),
                due_at: pending.due_at,
            })
            .collect();
        jobs.sort_by(|a, b| a.due_at.cmp(&b.due_at));
        jobs
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for ExpiryTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Remaining delay until `due_at`, zero if already past.
pub(crate) fn remaining(due_at: DateTime<Utc>) -> Duration {
    (due_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}
