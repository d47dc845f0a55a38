use super::config::TimerConfig;
use super::state::TimerState;
use crate::error::ValidationError;

/// Index-based lookups over a validated [`TimerConfig`].
///
/// Durations are resolved once per play-order slot, so lookups never touch
/// the name map again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTable {
    config: TimerConfig,
    durations: Vec<u64>,
}

impl PhaseTable {
    /// # Errors
    ///
    /// Returns the config's validation error if it breaks an invariant.
    pub fn new(config: TimerConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        let durations = config
            .phase_order
            .iter()
            .map(|name| config.phase_durations.get(name).copied().unwrap_or(0))
            .collect();
        Ok(Self { config, durations })
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Number of slots in the play order. Never zero.
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    pub fn start_index(&self) -> usize {
        self.config.start_phase_index
    }

    /// Duration in seconds of the phase at `phase_index`.
    pub fn duration_of(&self, phase_index: usize) -> u64 {
        self.durations.get(phase_index).copied().unwrap_or(0)
    }

    /// Successor slot, wrapping at the end of the play order.
    pub fn next_index(&self, phase_index: usize) -> usize {
        (phase_index + 1) % self.len()
    }

    pub fn phase_name(&self, phase_index: usize) -> Option<&str> {
        self.config.phase_order.get(phase_index).map(String::as_str)
    }

    /// Paused state at the configured start slot.
    pub fn initial_state(&self) -> TimerState {
        let start = self.start_index();
        TimerState::idle(self.duration_of(start), start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PhaseTable {
        PhaseTable::new(TimerConfig::default()).unwrap()
    }

    #[test]
    fn initial_state_uses_start_index() {
        let cfg = TimerConfig::new([("work", 60), ("break", 5)], &["work", "break"], 1);
        let t = PhaseTable::new(cfg).unwrap();
        assert_eq!(t.initial_state(), TimerState::idle(5, 1));
    }

    #[test]
    fn durations_follow_play_order() {
        let t = table();
        assert_eq!(t.duration_of(0), 1500);
        assert_eq!(t.duration_of(1), 300);
        assert_eq!(t.duration_of(5), 900);
        assert_eq!(t.phase_name(5), Some("longBreak"));
    }

    #[test]
    fn next_index_wraps() {
        let t = table();
        assert_eq!(t.next_index(0), 1);
        assert_eq!(t.next_index(5), 0);
    }

    #[test]
    fn single_phase_wraps_to_itself() {
        let t = PhaseTable::new(TimerConfig::new([("work", 7)], &["work"], 0)).unwrap();
        assert_eq!(t.next_index(0), 0);
        assert_eq!(t.duration_of(t.next_index(0)), 7);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = TimerConfig::new([("work", 7)], &["work", "rest"], 0);
        assert!(PhaseTable::new(cfg).is_err());
    }
}
