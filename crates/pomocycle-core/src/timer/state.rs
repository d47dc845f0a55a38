use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Snapshot emitted by the engine after every observable change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub seconds_left: u64,
    /// True only while a countdown is ticking.
    pub running: bool,
    /// Index into the active config's phase order.
    pub phase_index: usize,
}

impl TimerState {
    pub fn idle(seconds_left: u64, phase_index: usize) -> Self {
        Self {
            seconds_left,
            running: false,
            phase_index,
        }
    }

    pub fn counting(seconds_left: u64, phase_index: usize) -> Self {
        Self {
            seconds_left,
            running: true,
            phase_index,
        }
    }
}

/// User command folded against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerAction {
    Start,
    Pause,
    Reset,
    Skip,
}

impl TimerAction {
    pub const ALL: [TimerAction; 4] = [
        TimerAction::Start,
        TimerAction::Pause,
        TimerAction::Reset,
        TimerAction::Skip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimerAction::Start => "start",
            TimerAction::Pause => "pause",
            TimerAction::Reset => "reset",
            TimerAction::Skip => "skip",
        }
    }
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimerAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s.trim())
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "action".into(),
                message: format!("expected one of start, pause, reset, skip; got '{s}'"),
            })
    }
}
