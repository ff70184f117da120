//! Deferred tasks
//!
//! Timers post events back into the controller's queue instead of running
//! callbacks. Every scheduled task carries a cancellation token, and the
//! inactivity timer also stamps its events with a generation number so that
//! an event which fired just before cancellation is recognised as stale.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Posts events into a queue after a delay
#[derive(Debug)]
pub struct Scheduler<E> {
    tx: mpsc::UnboundedSender<E>,
}

impl<E> Clone for Scheduler<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E: Send + 'static> Scheduler<E> {
    /// Create a scheduler feeding `tx`
    pub fn new(tx: mpsc::UnboundedSender<E>) -> Self {
        Self { tx }
    }

    /// Deliver `event` after `delay` unless the returned task is cancelled
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, delay: Duration, event: E) -> ScheduledTask {
        let token = CancellationToken::new();
        let child = token.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // Receiver gone means the controller shut down
                    let _ = tx.send(event);
                }
            }
        });
        ScheduledTask { token }
    }
}

/// Handle to a scheduled event; dropping it cancels the event
#[derive(Debug)]
pub struct ScheduledTask {
    token: CancellationToken,
}

impl ScheduledTask {
    /// Cancel the event if it has not fired yet
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the task was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Stage of the inactivity window that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleStage {
    /// First stage: remind the customer
    Nudge,
    /// Second stage: close the session
    AutoClose,
}

/// Event emitted by the inactivity window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTimeout {
    /// Arming generation the event belongs to
    pub generation: u64,
    /// Which stage elapsed
    pub stage: IdleStage,
}

/// Two-stage inactivity timer
///
/// `arm` always clears the previous window first. After `idle` the nudge
/// stage fires; the controller then calls [`InactivityScheduler::arm_close`]
/// which fires the close stage `close_after` later.
#[derive(Debug)]
pub struct InactivityScheduler<E> {
    scheduler: Scheduler<E>,
    wrap: fn(IdleTimeout) -> E,
    idle: Duration,
    close_after: Duration,
    generation: u64,
    pending: Option<ScheduledTask>,
}

impl<E: Send + 'static> InactivityScheduler<E> {
    /// Create a disarmed window; `wrap` turns timeouts into queue events
    pub fn new(
        scheduler: Scheduler<E>,
        wrap: fn(IdleTimeout) -> E,
        idle: Duration,
        close_after: Duration,
    ) -> Self {
        Self {
            scheduler,
            wrap,
            idle,
            close_after,
            generation: 0,
            pending: None,
        }
    }

    /// Clear any pending stage and start a fresh window
    pub fn arm(&mut self) {
        self.cancel();
        let event = (self.wrap)(IdleTimeout {
            generation: self.generation,
            stage: IdleStage::Nudge,
        });
        self.pending = Some(self.scheduler.schedule(self.idle, event));
        debug!(generation = self.generation, "Inactivity window armed");
    }

    /// Schedule the close stage of the current window
    pub fn arm_close(&mut self) {
        if let Some(task) = self.pending.take() {
            task.cancel();
        }
        let event = (self.wrap)(IdleTimeout {
            generation: self.generation,
            stage: IdleStage::AutoClose,
        });
        self.pending = Some(self.scheduler.schedule(self.close_after, event));
    }

    /// Cancel the window; events already queued become stale
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.cancel();
        }
        self.generation += 1;
    }

    /// Whether a timeout belongs to the live window
    pub fn is_current(&self, timeout: &IdleTimeout) -> bool {
        self.pending.is_some() && timeout.generation == self.generation
    }

    /// Whether a stage is pending
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}

/// Picks nudge messages without repeating until every one was used
#[derive(Debug, Default)]
pub struct NudgePicker {
    used: HashSet<usize>,
}

impl NudgePicker {
    /// Create a picker with no history
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick an index into a list of `count` messages
    pub fn pick<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> Option<usize> {
        if count == 0 {
            return None;
        }
        let mut available: Vec<usize> = (0..count).filter(|i| !self.used.contains(i)).collect();
        if available.is_empty() {
            self.used.clear();
            available = (0..count).collect();
        }
        let index = *available.choose(rng)?;
        self.used.insert(index);
        Some(index)
    }
}
