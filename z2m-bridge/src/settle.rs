//! Startup discovery burst detection
//!
//! Subscribing to the discovery wildcard replays every retained config
//! message at once. Startup waits until that replay has tapered off:
//!
//! ```text
//! Idle ──first message──► Bursting ──quiet deadline──► Settled
//!   │                        │
//!   └──quiet deadline────────┴──ceiling deadline──────► Settled
//! ```
//!
//! [`SettleState`] is the pure state machine with two deadlines; it is driven
//! by explicit instants so it can be tested without a clock.
//! [`DiscoverySettle`] wraps it for concurrent use with tokio timers.

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::config::SettleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePhase {
    /// Waiting for the first discovery message
    Idle,
    /// Messages are arriving
    Bursting,
    Settled,
}

/// Which deadline ended the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleReason {
    /// No message arrived within the quiet interval
    Quiet,
    /// The hard ceiling elapsed
    Ceiling,
}

#[derive(Debug, Clone)]
pub struct SettleState {
    config: SettleConfig,
    phase: SettlePhase,
    quiet_deadline: Option<Instant>,
    ceiling_deadline: Option<Instant>,
    reason: Option<SettleReason>,
}

impl SettleState {
    pub fn new(config: SettleConfig) -> Self {
        Self {
            config,
            phase: SettlePhase::Idle,
            quiet_deadline: None,
            ceiling_deadline: None,
            reason: None,
        }
    }

    /// Arm both deadlines; called right after subscribing
    pub fn on_start(&mut self, now: Instant) {
        self.phase = SettlePhase::Idle;
        self.reason = None;
        self.quiet_deadline = Some(now + self.config.initial_quiet);
        self.ceiling_deadline = Some(now + self.config.ceiling);
    }

    /// Record a discovery message; ignored once settled
    pub fn on_message(&mut self, now: Instant) {
        match self.phase {
            SettlePhase::Idle => {
                self.phase = SettlePhase::Bursting;
                self.quiet_deadline = Some(now + self.config.initial_quiet);
                self.ceiling_deadline = Some(now + self.config.ceiling);
            }
            SettlePhase::Bursting => {
                self.quiet_deadline = Some(now + self.config.burst_quiet);
            }
            SettlePhase::Settled => {}
        }
    }

    /// Settle if a deadline has passed
    pub fn evaluate(&mut self, now: Instant) -> Option<SettleReason> {
        if let Some(reason) = self.reason {
            return Some(reason);
        }

        let (quiet, ceiling) = (self.quiet_deadline?, self.ceiling_deadline?);
        let reason = if quiet <= ceiling {
            (now >= quiet).then_some(SettleReason::Quiet)
        } else {
            (now >= ceiling).then_some(SettleReason::Ceiling)
        }?;

        self.phase = SettlePhase::Settled;
        self.reason = Some(reason);
        Some(reason)
    }

    /// The earlier of the two deadlines; `None` before start or once settled
    pub fn deadline(&self) -> Option<Instant> {
        if self.phase == SettlePhase::Settled {
            return None;
        }
        match (self.quiet_deadline, self.ceiling_deadline) {
            (Some(quiet), Some(ceiling)) => Some(quiet.min(ceiling)),
            _ => None,
        }
    }

    pub fn phase(&self) -> SettlePhase {
        self.phase
    }
}

/// Shared settle tracker for the discovery consumer and startup
#[derive(Debug)]
pub struct DiscoverySettle {
    state: Mutex<SettleState>,
    started: Notify,
}

impl DiscoverySettle {
    pub fn new(config: SettleConfig) -> Self {
        Self {
            state: Mutex::new(SettleState::new(config)),
            started: Notify::new(),
        }
    }

    pub fn start(&self) {
        self.state.lock().on_start(Instant::now());
        self.started.notify_waiters();
    }

    pub fn record_message(&self) {
        self.state.lock().on_message(Instant::now());
    }

    pub fn phase(&self) -> SettlePhase {
        self.state.lock().phase()
    }

    pub fn is_settled(&self) -> bool {
        self.phase() == SettlePhase::Settled
    }

    /// Wait until settled
    ///
    /// Bounded by the ceiling once [`start`](Self::start) has been called.
    pub async fn wait_settled(&self) -> SettleReason {
        loop {
            let started = self.started.notified();
            tokio::pin!(started);
            started.as_mut().enable();

            let deadline = {
                let mut state = self.state.lock();
                if let Some(reason) = state.evaluate(Instant::now()) {
                    return reason;
                }
                state.deadline()
            };

            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => started.await,
            }
        }
    }
}
