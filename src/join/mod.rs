//! Two-party completion join.
//!
//! Merges two independently ordered completions (the upload finishing and
//! the caller registering its "done" continuation) into a single callback.
//! Either side may arrive first. The join is built for exactly two arrivals:
//!
//! | slot              | + continuation `g`       | + value `w`             |
//! |-------------------|--------------------------|-------------------------|
//! | `Empty`           | `HasContinuation(g)`     | `HasValue(w)`           |
//! | `HasContinuation(f)` | fire `f(None)`, `g` dropped | fire `f(Some(w))` |
//! | `HasValue(v)`     | fire `g(Some(v))`        | spent, nothing fires    |
//! | `Spent`           | ignored                  | ignored                 |
//!
//! Two value arrivals leave the continuation unset, so nothing is ever
//! invoked for that join. Callers must make sure both sides eventually
//! arrive; there is no timeout.

use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub type Continuation<T> = Box<dyn FnOnce(Option<T>) + Send + 'static>;

/// One arrival at the join.
pub enum Arrival<T> {
    Continuation(Continuation<T>),
    Value(T),
}

impl<T> Arrival<T> {
    pub fn continuation<F>(f: F) -> Self
    where
        F: FnOnce(Option<T>) + Send + 'static,
    {
        Self::Continuation(Box::new(f))
    }

    pub fn value(value: T) -> Self {
        Self::Value(value)
    }
}

/// Observable phase of a join, mirroring its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPhase {
    Empty,
    HasContinuation,
    HasValue,
    Spent,
}

impl JoinPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::HasContinuation => "has_continuation",
            Self::HasValue => "has_value",
            Self::Spent => "spent",
        }
    }
}

enum Slot<T> {
    Empty,
    HasContinuation(Continuation<T>),
    HasValue(T),
    Spent,
}

impl<T> Slot<T> {
    fn phase(&self) -> JoinPhase {
        match self {
            Slot::Empty => JoinPhase::Empty,
            Slot::HasContinuation(_) => JoinPhase::HasContinuation,
            Slot::HasValue(_) => JoinPhase::HasValue,
            Slot::Spent => JoinPhase::Spent,
        }
    }
}

type Firing<T> = Option<(Continuation<T>, Option<T>)>;

fn transition<T>(slot: Slot<T>, arrival: Arrival<T>) -> (Slot<T>, Firing<T>) {
    match (slot, arrival) {
        (Slot::Empty, Arrival::Continuation(f)) => (Slot::HasContinuation(f), None),
        (Slot::Empty, Arrival::Value(v)) => (Slot::HasValue(v), None),
        (Slot::HasContinuation(f), Arrival::Value(v)) => (Slot::Spent, Some((f, Some(v)))),
        (Slot::HasContinuation(f), Arrival::Continuation(_)) => (Slot::Spent, Some((f, None))),
        (Slot::HasValue(v), Arrival::Continuation(f)) => (Slot::Spent, Some((f, Some(v)))),
        (Slot::HasValue(_), Arrival::Value(_)) => {
            warn!("Join completed with two values and no continuation; nothing to invoke");
            (Slot::Spent, None)
        }
        (Slot::Spent, _) => {
            debug!("Ignoring arrival at an already completed join");
            (Slot::Spent, None)
        }
    }
}

/// Cloneable handle to a two-party join. All clones share one slot.
pub struct CompletionJoin<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for CompletionJoin<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for CompletionJoin<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompletionJoin<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Empty)),
        }
    }

    /// Records one arrival. On the second arrival the captured continuation,
    /// if any, runs synchronously on the caller's stack after the slot lock
    /// has been released.
    pub fn arrive(&self, arrival: Arrival<T>) {
        let firing = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            let current = std::mem::replace(&mut *slot, Slot::Spent);
            let (next, firing) = transition(current, arrival);
            *slot = next;
            firing
        };

        if let Some((continuation, value)) = firing {
            debug!("Join complete, invoking continuation");
            continuation(value);
        }
    }

    pub fn phase(&self) -> JoinPhase {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).phase()
    }
}
