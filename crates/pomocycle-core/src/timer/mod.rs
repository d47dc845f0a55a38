mod clock;
mod config;
mod engine;
mod phase_table;
mod service;
mod state;

pub use clock::{Clock, Ticks};
pub use config::TimerConfig;
pub use engine::{ClockCommand, TimerEngine, Transition};
pub use phase_table::PhaseTable;
pub use service::{run, run_with_initial, TimerHandle, TimerService};
pub use state::{TimerAction, TimerState};
