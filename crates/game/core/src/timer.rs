//! One-shot deferred callbacks.
//!
//! The rules only ever register `(delay, callback, description)` triples
//! through [`Scheduler`]; they never wait on one. Callbacks may fire into a
//! state that changed since they were scheduled, so every callback
//! re-validates what it needs before acting.

use crate::encounter::EncounterId;
use crate::script::Formula;

/// Deferred work.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Callback {
    /// Start the next encounter, unless `replacing` is no longer the current
    /// (resolved) encounter by the time the timer fires.
    StartEncounter { replacing: Option<EncounterId> },
    /// Evaluate a content formula for its side effects on the timer bindings.
    Script(Formula),
}

/// Scheduler boundary.
pub trait Scheduler {
    fn schedule(&mut self, delay: f64, callback: Callback, description: &str);
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timer {
    pub duration: f64,
    pub remaining: f64,
    pub callback: Callback,
    pub description: String,
    pub triggered: bool,
}

impl Timer {
    pub fn new(duration: f64, callback: Callback, description: impl Into<String>) -> Self {
        Self {
            duration,
            remaining: duration,
            callback,
            description: description.into(),
            triggered: false,
        }
    }

    /// Counts down by `dt`, flooring at zero. Returns `true` exactly once,
    /// on the update that brings the timer to zero.
    pub fn update(&mut self, dt: f64) -> bool {
        if self.triggered {
            return false;
        }
        self.remaining = (self.remaining - dt).max(0.0);
        if self.remaining <= 0.0 {
            self.triggered = true;
            return true;
        }
        false
    }
}

/// In-process timer queue advanced by the simulation tick.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TimerQueue {
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts every timer down by `dt` and returns how many came due.
    ///
    /// Due timers stay queued until [`TimerQueue::pop_due`] takes them, so a
    /// caller that stops halfway loses nothing.
    pub fn advance(&mut self, dt: f64) -> usize {
        self.timers
            .iter_mut()
            .map(|timer| timer.update(dt))
            .filter(|fired| *fired)
            .count()
    }

    /// Removes the earliest-scheduled due timer and returns its callback.
    pub fn pop_due(&mut self) -> Option<Callback> {
        let index = self.timers.iter().position(|timer| timer.triggered)?;
        Some(self.timers.remove(index).callback)
    }

    pub fn pending(&self) -> &[Timer] {
        &self.timers
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, delay: f64, callback: Callback, description: &str) {
        tracing::debug!(target: "rules::timer", delay, description, "scheduled");
        self.timers.push(Timer::new(delay, callback, description));
    }
}
