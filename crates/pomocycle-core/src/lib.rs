//! # Pomocycle Core Library
//!
//! Core logic for the Pomocycle phase-cycling countdown timer. The CLI is a
//! thin front-end over the same library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a synchronous state machine folding config, action and
//!   clock-tick inputs into duplicate-suppressed [`TimerState`] snapshots
//! - **Timer Service**: a tokio task owning one engine and at most one live
//!   [`Clock`] subscription, fed through a single ordered input queue
//! - **Storage**: TOML-based application configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerService`] / [`TimerHandle`]: Async driver and its control surface
//! - [`PhaseTable`]: Index lookups over a validated [`TimerConfig`]
//! - [`Config`]: Application configuration management

pub mod error;
pub mod logging;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, ValidationError};
pub use storage::Config;
pub use timer::{
    Clock, PhaseTable, TimerAction, TimerConfig, TimerEngine, TimerHandle, TimerService,
    TimerState,
};
