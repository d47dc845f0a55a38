//! Timer engine implementation.
//!
//! The engine is a synchronous fold over config, action and tick inputs.
//! It owns no thread and no clock: every fold returns a [`Transition`]
//! telling the driver what to emit and what to do with its clock
//! subscription. [`crate::timer::TimerService`] is the async driver.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Counting --tick reaching 0--> Idle (next phase)
//! Counting --pause|reset|skip|config--> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(config)?;
//! let first = engine.publish_initial();
//! let t = engine.apply(TimerAction::Start); // t.clock == ClockCommand::Restart
//! // for each clock tick n:
//! let t = engine.tick(n);
//! ```

use tracing::debug;

use super::config::TimerConfig;
use super::phase_table::PhaseTable;
use super::state::{TimerAction, TimerState};
use crate::error::ValidationError;

/// What the driver must do with its clock subscription after a fold.
///
/// The driver applies the command before publishing the emitted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCommand {
    /// Leave the current subscription (or lack of one) alone.
    Keep,
    /// Drop any live subscription and subscribe afresh from tick 0.
    Restart,
    /// Drop any live subscription.
    Stop,
}

/// Result of folding one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// New state, or `None` when it equals the last emitted one.
    pub emitted: Option<TimerState>,
    pub clock: ClockCommand,
}

/// Countdown in progress, anchored at the seconds left when it started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Countdown {
    from: u64,
}

/// Core timer engine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    table: PhaseTable,
    state: TimerState,
    countdown: Option<Countdown>,
    last_emitted: Option<TimerState>,
}

impl TimerEngine {
    /// Create an engine in the config's initial state. Nothing is emitted
    /// until [`publish_initial`](Self::publish_initial) or the first fold.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the config breaks an invariant.
    pub fn new(config: TimerConfig) -> Result<Self, ValidationError> {
        let table = PhaseTable::new(config)?;
        let state = table.initial_state();
        Ok(Self {
            table,
            state,
            countdown: None,
            last_emitted: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_some()
    }

    pub fn table(&self) -> &PhaseTable {
        &self.table
    }

    pub fn config(&self) -> &TimerConfig {
        self.table.config()
    }

    pub fn last_emitted(&self) -> Option<TimerState> {
        self.last_emitted
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Emit the current state if it has not been emitted yet.
    pub fn publish_initial(&mut self) -> Option<TimerState> {
        self.emit(self.state)
    }

    /// Start a new epoch from `config`, discarding any countdown.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] and leaves the engine untouched when
    /// the config is invalid.
    pub fn apply_config(&mut self, config: TimerConfig) -> Result<Transition, ValidationError> {
        let table = PhaseTable::new(config)?;
        debug!(phases = table.len(), start = table.start_index(), "timer config applied");
        self.table = table;
        self.countdown = None;
        let initial = self.table.initial_state();
        Ok(self.transition(initial, ClockCommand::Stop))
    }

    /// Fold a user action.
    pub fn apply(&mut self, action: TimerAction) -> Transition {
        debug!(%action, running = self.is_running(), "timer action");
        let index = self.state.phase_index;
        match action {
            TimerAction::Start => {
                if self.is_running() {
                    // Already counting; keep the live subscription.
                    return self.transition(self.state, ClockCommand::Keep);
                }
                self.countdown = Some(Countdown {
                    from: self.state.seconds_left,
                });
                let next = TimerState::counting(self.state.seconds_left, index);
                self.transition(next, ClockCommand::Restart)
            }
            TimerAction::Pause => {
                if !self.is_running() {
                    return self.transition(self.state, ClockCommand::Keep);
                }
                self.countdown = None;
                let next = TimerState::idle(self.state.seconds_left, index);
                self.transition(next, ClockCommand::Stop)
            }
            TimerAction::Reset => {
                self.countdown = None;
                let next = TimerState::idle(self.table.duration_of(index), index);
                self.transition(next, ClockCommand::Stop)
            }
            TimerAction::Skip => {
                self.countdown = None;
                let next = self.next_phase_state();
                self.transition(next, ClockCommand::Stop)
            }
        }
    }

    /// Fold clock tick `n` (0-based) of the live subscription.
    ///
    /// The tick that brings the countdown to zero is replaced by the
    /// rollover into the next phase, which is paused.
    pub fn tick(&mut self, n: u64) -> Transition {
        let Some(countdown) = self.countdown else {
            // Late tick from a subscription that has already been cancelled.
            return Transition {
                emitted: None,
                clock: ClockCommand::Stop,
            };
        };
        let left = countdown.from.saturating_sub(n.saturating_add(1));
        if left > 0 {
            let next = TimerState::counting(left, self.state.phase_index);
            return self.transition(next, ClockCommand::Keep);
        }
        self.countdown = None;
        let next = self.next_phase_state();
        debug!(
            from = self.state.phase_index,
            to = next.phase_index,
            "phase rollover"
        );
        self.transition(next, ClockCommand::Stop)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn next_phase_state(&self) -> TimerState {
        let next = self.table.next_index(self.state.phase_index);
        TimerState::idle(self.table.duration_of(next), next)
    }

    fn transition(&mut self, next: TimerState, clock: ClockCommand) -> Transition {
        Transition {
            emitted: self.emit(next),
            clock,
        }
    }

    fn emit(&mut self, next: TimerState) -> Option<TimerState> {
        self.state = next;
        if self.last_emitted == Some(next) {
            return None;
        }
        self.last_emitted = Some(next);
        Some(next)
    }
}
