use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Phase durations and play order for one timer epoch.
///
/// Immutable once handed to the engine; a new value replaces the old one
/// wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    /// Phase names in play order. Repeats are allowed.
    pub phase_order: Vec<String>,
    #[serde(default)]
    pub start_phase_index: usize,
    /// Phase name -> duration in seconds.
    pub phase_durations: BTreeMap<String, u64>,
}

impl TimerConfig {
    pub fn new<I, S>(durations: I, order: &[&str], start_phase_index: usize) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        Self {
            phase_order: order.iter().map(|s| s.to_string()).collect(),
            start_phase_index,
            phase_durations: durations
                .into_iter()
                .map(|(name, secs)| (name.into(), secs))
                .collect(),
        }
    }

    /// Classic pomodoro cycle: three work phases, two short breaks, one long break.
    pub fn default_pomodoro() -> Self {
        Self::new(
            [("work", 25 * 60), ("break", 5 * 60), ("longBreak", 15 * 60)],
            &["work", "break", "work", "break", "work", "longBreak"],
            0,
        )
    }

    /// Check the config invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: an empty play order, an
    /// out-of-range start index, a phase without a duration, or a zero
    /// duration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.phase_order.is_empty() {
            return Err(ValidationError::EmptyCollection("phase_order".into()));
        }
        if self.start_phase_index >= self.phase_order.len() {
            return Err(ValidationError::OutOfBounds {
                collection: "phase_order".into(),
                index: self.start_phase_index,
                len: self.phase_order.len(),
            });
        }
        for name in &self.phase_order {
            match self.phase_durations.get(name) {
                None => {
                    return Err(ValidationError::MissingPhase {
                        phase: name.clone(),
                    })
                }
                Some(0) => {
                    return Err(ValidationError::InvalidValue {
                        field: format!("phase_durations.{name}"),
                        message: "duration must be at least one second".into(),
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::default_pomodoro()
    }
}
