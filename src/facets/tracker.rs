//! Request sequencing and cooperative cancellation.
//!
//! Every resolve call takes a ticket with a fresh sequence number. Taking a
//! ticket cancels whatever request was in flight before it, and only the
//! newest sequence may publish a result.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Shared flag checked by long-running corpus reads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle for one in-flight request.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub sequence: u64,
    pub cancel: CancelToken,
}

#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: AtomicU64,
    in_flight: Mutex<Option<Ticket>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next sequence number and cancel the previous request.
    pub fn begin(&self) -> Ticket {
        let ticket = Ticket {
            sequence: self.latest.fetch_add(1, Ordering::SeqCst) + 1,
            cancel: CancelToken::new(),
        };

        let previous = match self.in_flight.lock() {
            Ok(mut guard) => guard.replace(ticket.clone()),
            Err(poisoned) => poisoned.into_inner().replace(ticket.clone()),
        };
        if let Some(previous) = previous {
            tracing::debug!(
                superseded = previous.sequence,
                by = ticket.sequence,
                "Cancelling in-flight request"
            );
            previous.cancel.cancel();
        }

        ticket
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, sequence: u64) -> bool {
        self.latest() == sequence
    }

    /// Forget the ticket if it is still the in-flight one.
    pub fn finish(&self, ticket: &Ticket) {
        let mut guard = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.as_ref().is_some_and(|t| t.sequence == ticket.sequence) {
            *guard = None;
        }
    }
}

/// Something that carries the sequence number of the request it answers.
pub trait Sequenced {
    fn sequence(&self) -> u64;
}

/// Holds the most recent result a consumer should display. Results arriving
/// out of order are refused.
#[derive(Debug)]
pub struct ResultSlot<T> {
    current: Mutex<Option<T>>,
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self { current: Mutex::new(None) }
    }
}

impl<T: Sequenced + Clone> ResultSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `result` if it is newer than the held one. Returns whether it
    /// was accepted.
    pub fn offer(&self, result: T) -> bool {
        let mut guard = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let newer = guard
            .as_ref()
            .map_or(true, |held| result.sequence() > held.sequence());
        if newer {
            *guard = Some(result);
        } else {
            tracing::debug!(sequence = result.sequence(), "Discarding stale result");
        }
        newer
    }

    pub fn current(&self) -> Option<T> {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
