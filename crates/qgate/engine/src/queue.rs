//! Bounded FIFO buffer with an overflow policy.
//!
//! Every admission is issued a [`Ticket`]. Hosts may hand the gate several
//! messages carrying the same id field, so expiry is correlated by ticket.

use std::collections::VecDeque;
use std::fmt;

use qgate_types::{Capacity, Message};
use serde::{Deserialize, Serialize};

/// Gate-assigned token for one admission to the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(String);

impl Ticket {
    /// Issue a fresh, process-wide unique ticket.
    pub fn issue() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A queued message and the ticket it was admitted under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Queued {
    pub ticket: Ticket,
    pub message: Message,
}

impl Queued {
    /// Wrap `message` under a freshly issued ticket.
    pub fn new(message: Message) -> Self {
        Self {
            ticket: Ticket::issue(),
            message,
        }
    }
}

/// Result of offering a message to a queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Offer {
    /// Appended at the tail.
    Accepted,

    /// Appended at the tail after evicting the returned head (keep-newest).
    Evicted(Queued),

    /// Queue full; the returned incoming entry was discarded.
    Rejected(Queued),
}

/// Ordered buffer of messages, oldest at the head.
///
/// The length never exceeds the capacity.
#[derive(Debug, Clone)]
pub struct GateQueue {
    items: VecDeque<Queued>,
    capacity: Capacity,
    keep_newest: bool,
}

impl GateQueue {
    pub fn new(capacity: Capacity, keep_newest: bool) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
            keep_newest,
        }
    }

    /// Rebuild a queue from persisted contents. Contents beyond capacity are
    /// trimmed the way the overflow policy would have: from the head with
    /// keep-newest, from the tail otherwise.
    pub fn restore(capacity: Capacity, keep_newest: bool, contents: Vec<Queued>) -> Self {
        let mut queue = Self::new(capacity, keep_newest);
        queue.items = contents.into();
        if let Capacity::Bounded(max) = capacity {
            if keep_newest {
                while queue.items.len() > max {
                    queue.items.pop_front();
                }
            } else {
                queue.items.truncate(max);
            }
        }
        queue
    }

    /// Offer an entry according to the overflow policy.
    pub fn offer(&mut self, entry: Queued) -> Offer {
        if self.capacity.has_headroom(self.items.len()) {
            self.items.push_back(entry);
            return Offer::Accepted;
        }

        if !self.keep_newest {
            return Offer::Rejected(entry);
        }

        self.items.push_back(entry);
        match self.items.pop_front() {
            Some(evicted) => Offer::Evicted(evicted),
            None => Offer::Accepted,
        }
    }

    pub fn pop_front(&mut self) -> Option<Queued> {
        self.items.pop_front()
    }

    pub fn front(&self) -> Option<&Message> {
        self.items.front().map(|entry| &entry.message)
    }

    /// Remove and return every entry, oldest first.
    pub fn drain_all(&mut self) -> Vec<Queued> {
        self.items.drain(..).collect()
    }

    /// Remove the entry admitted under `ticket`, wherever it sits.
    pub fn remove_ticket(&mut self, ticket: &Ticket) -> Option<Queued> {
        let position = self.items.iter().position(|entry| entry.ticket == *ticket)?;
        self.items.remove(position)
    }

    /// Remove every entry whose message matches `predicate`, oldest first.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<Queued>
    where
        F: FnMut(&Message) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = VecDeque::with_capacity(self.items.len());
        for entry in self.items.drain(..) {
            if predicate(&entry.message) {
                removed.push(entry);
            } else {
                kept.push_back(entry);
            }
        }
        self.items = kept;
        removed
    }

    pub fn contains_ticket(&self, ticket: &Ticket) -> bool {
        self.items.iter().any(|entry| entry.ticket == *ticket)
    }

    /// Queued messages, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.items.iter().map(|entry| &entry.message)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Queued> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.iter().cloned().collect()
    }

    pub fn to_entries(&self) -> Vec<Queued> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }
}
