//! Evaluation clock: the "now" that timestamp features are measured from.
//!
//! Training vectors and test vectors read the clock separately, so the
//! same raw record yields different elapsed-seconds values at training
//! time and at scoring time. Tests use `FixedClock` or `SteppingClock`
//! to pin those instants.

use crate::types::Timestamp;
use chrono::Utc;
use std::cell::Cell;

pub trait EvaluationClock {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in Unix seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl EvaluationClock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl EvaluationClock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Advances by `step` seconds after every read.
#[derive(Debug)]
pub struct SteppingClock {
    next: Cell<Timestamp>,
    step: Timestamp,
}

impl SteppingClock {
    pub fn new(start: Timestamp, step: Timestamp) -> Self {
        Self { next: Cell::new(start), step }
    }
}

impl EvaluationClock for SteppingClock {
    fn now(&self) -> Timestamp {
        let t = self.next.get();
        self.next.set(t + self.step);
        t
    }
}
