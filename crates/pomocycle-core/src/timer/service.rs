//! Async driver for [`TimerEngine`].
//!
//! One tokio task owns the engine and at most one clock subscription.
//! Config and action inputs share a single queue, so they are folded in
//! arrival order; inbound inputs are polled before clock ticks, which makes
//! a config racing a tick supersede the countdown.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::{Clock, Ticks};
use super::config::TimerConfig;
use super::engine::{ClockCommand, TimerEngine, Transition};
use super::state::{TimerAction, TimerState};
use crate::error::{CoreError, Result};

/// Tagged input queued to the timer task.
#[derive(Debug)]
enum Input {
    Config(TimerConfig),
    Action(TimerAction),
    Subscribe(mpsc::UnboundedSender<TimerState>),
    Snapshot(oneshot::Sender<Option<TimerState>>),
    Shutdown,
}

/// Entry point for spawning a timer task.
pub struct TimerService;

impl TimerService {
    /// Spawn a timer task whose first state comes from `initial`.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `initial` is invalid.
    pub fn spawn(initial: TimerConfig, clock: Clock) -> Result<TimerHandle> {
        let mut engine = TimerEngine::new(initial)?;
        let first = engine.state();
        engine.publish_initial();
        let (current_tx, current_rx) = watch::channel(first);
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();

        let actor = Actor {
            engine: Some(engine),
            clock,
            ticks: None,
            subscribers: Vec::new(),
            current: Some(current_tx),
            streams: false,
        };
        let task = tokio::spawn(actor.run(inputs_rx));
        info!(tick = ?clock.period(), "timer service started");

        Ok(TimerHandle {
            inputs: inputs_tx,
            current: current_rx,
            task,
        })
    }
}

/// Control surface of a spawned timer task.
///
/// Dropping the handle shuts the task down.
#[derive(Debug)]
pub struct TimerHandle {
    inputs: mpsc::UnboundedSender<Input>,
    current: watch::Receiver<TimerState>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Validate `config` and queue it as the new epoch.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] without touching the running timer
    /// if the config is invalid, or [`CoreError::EngineStopped`] if the
    /// task has exited.
    pub fn apply_config(&self, config: TimerConfig) -> Result<()> {
        config.validate()?;
        self.send(Input::Config(config))
    }

    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] if the task has exited.
    pub fn apply_action(&self, action: TimerAction) -> Result<()> {
        self.send(Input::Action(action))
    }

    /// Receive every state emitted from now on, starting with the current one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] if the task has exited.
    pub fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<TimerState>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.send(Input::Subscribe(tx))?;
        Ok(rx)
    }

    /// Most recently emitted state.
    pub fn current(&self) -> TimerState {
        *self.current.borrow()
    }

    /// Watch channel tracking the most recently emitted state.
    pub fn watch(&self) -> watch::Receiver<TimerState> {
        self.current.clone()
    }

    /// State after every input queued before this call has been folded.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EngineStopped`] if the task has exited.
    pub async fn snapshot(&self) -> Result<TimerState> {
        let (tx, rx) = oneshot::channel();
        self.send(Input::Snapshot(tx))?;
        rx.await
            .ok()
            .flatten()
            .ok_or(CoreError::EngineStopped)
    }

    /// Stop the task and wait for it to release its clock subscription.
    pub async fn shutdown(self) {
        let _ = self.inputs.send(Input::Shutdown);
        if let Err(e) = self.task.await {
            warn!(error = %e, "timer task ended abnormally");
        }
    }

    fn send(&self, input: Input) -> Result<()> {
        self.inputs.send(input).map_err(|_| CoreError::EngineStopped)
    }
}

/// Drive an engine from separate config and action streams.
///
/// No state is emitted until the first valid config arrives. Invalid
/// configs on the stream are logged and skipped. An action sent before a
/// config is folded before it, even when both are already queued.
///
/// Once both input streams are closed, a running countdown still finishes
/// its phase and rolls over; the task then ends, releasing its clock.
/// Dropping the returned receiver ends the task right away.
pub fn run(
    configs: mpsc::Receiver<TimerConfig>,
    actions: mpsc::Receiver<TimerAction>,
    clock: Clock,
) -> mpsc::UnboundedReceiver<TimerState> {
    spawn_streams(None, configs, actions, clock)
}

/// Like [`run`], but the first state comes from `initial` before any config
/// event arrives.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if `initial` is invalid.
pub fn run_with_initial(
    initial: TimerConfig,
    configs: mpsc::Receiver<TimerConfig>,
    actions: mpsc::Receiver<TimerAction>,
    clock: Clock,
) -> Result<mpsc::UnboundedReceiver<TimerState>> {
    let engine = TimerEngine::new(initial)?;
    Ok(spawn_streams(Some(engine), configs, actions, clock))
}

fn spawn_streams(
    engine: Option<TimerEngine>,
    configs: mpsc::Receiver<TimerConfig>,
    actions: mpsc::Receiver<TimerAction>,
    clock: Clock,
) -> mpsc::UnboundedReceiver<TimerState> {
    let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
    let (states_tx, states_rx) = mpsc::unbounded_channel();

    let mut actor = Actor {
        engine: None,
        clock,
        ticks: None,
        subscribers: vec![states_tx],
        current: None,
        streams: true,
    };
    if let Some(mut engine) = engine {
        if let Some(first) = engine.publish_initial() {
            actor.publish(first);
        }
        actor.engine = Some(engine);
    }

    tokio::spawn(merge_inputs(configs, actions, inputs_tx));
    tokio::spawn(actor.run(inputs_rx));
    states_rx
}

/// Funnel both streams into one tagged queue.
///
/// Configs are polled first, but actions already waiting when a config
/// arrives are forwarded ahead of it.
async fn merge_inputs(
    mut configs: mpsc::Receiver<TimerConfig>,
    mut actions: mpsc::Receiver<TimerAction>,
    inputs: mpsc::UnboundedSender<Input>,
) {
    let mut configs_open = true;
    let mut actions_open = true;
    loop {
        let input = tokio::select! {
            biased;
            config = configs.recv(), if configs_open => match config {
                Some(config) => {
                    while let Ok(action) = actions.try_recv() {
                        if inputs.send(Input::Action(action)).is_err() {
                            return;
                        }
                    }
                    Input::Config(config)
                }
                None => {
                    configs_open = false;
                    continue;
                }
            },
            action = actions.recv(), if actions_open => match action {
                Some(action) => Input::Action(action),
                None => {
                    actions_open = false;
                    continue;
                }
            },
            _ = inputs.closed(), if configs_open || actions_open => break,
            else => break,
        };
        if inputs.send(input).is_err() {
            break;
        }
    }
    debug!("timer input streams closed");
}

struct Actor {
    engine: Option<TimerEngine>,
    clock: Clock,
    ticks: Option<Ticks>,
    subscribers: Vec<mpsc::UnboundedSender<TimerState>>,
    current: Option<watch::Sender<TimerState>>,
    /// Fed by [`run`] streams rather than a [`TimerHandle`].
    streams: bool,
}

impl Actor {
    async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<Input>) {
        let mut inputs_open = true;
        loop {
            tokio::select! {
                biased;
                input = inputs.recv(), if inputs_open => match input {
                    Some(Input::Config(config)) => self.on_config(config),
                    Some(Input::Action(action)) => self.on_action(action),
                    Some(Input::Subscribe(tx)) => self.on_subscribe(tx),
                    Some(Input::Snapshot(reply)) => {
                        let _ = reply.send(self.engine.as_ref().map(TimerEngine::state));
                    }
                    None if self.streams && self.ticks.is_some() => {
                        debug!("input streams closed; finishing the running phase");
                        inputs_open = false;
                    }
                    Some(Input::Shutdown) | None => break,
                },
                _ = all_closed(&self.subscribers), if self.streams => {
                    debug!("state receiver dropped");
                    break;
                }
                n = next_tick(&mut self.ticks) => self.on_tick(n),
            }
            if !inputs_open && self.ticks.is_none() {
                break;
            }
            if self.current.is_none() && self.subscribers.is_empty() {
                debug!("no timer state consumers left");
                break;
            }
        }
        self.ticks = None;
        info!("timer service stopped");
    }

    fn on_config(&mut self, config: TimerConfig) {
        match self.engine.as_mut() {
            Some(engine) => match engine.apply_config(config) {
                Ok(transition) => {
                    info!("timer epoch reset by new config");
                    self.apply(transition);
                }
                Err(e) => warn!(error = %e, "rejected timer config; keeping previous"),
            },
            None => match TimerEngine::new(config) {
                Ok(mut engine) => {
                    info!("timer epoch started");
                    let first = engine.publish_initial();
                    self.engine = Some(engine);
                    if let Some(state) = first {
                        self.publish(state);
                    }
                }
                Err(e) => warn!(error = %e, "rejected timer config"),
            },
        }
    }

    fn on_action(&mut self, action: TimerAction) {
        let Some(engine) = self.engine.as_mut() else {
            warn!(%action, "timer action before any config; ignored");
            return;
        };
        let transition = engine.apply(action);
        self.apply(transition);
    }

    fn on_tick(&mut self, n: u64) {
        let Some(engine) = self.engine.as_mut() else {
            self.ticks = None;
            return;
        };
        let transition = engine.tick(n);
        self.apply(transition);
    }

    fn on_subscribe(&mut self, tx: mpsc::UnboundedSender<TimerState>) {
        if let Some(state) = self.engine.as_ref().and_then(TimerEngine::last_emitted) {
            if tx.send(state).is_err() {
                return;
            }
        }
        self.subscribers.push(tx);
    }

    /// Clock first, then emission: a cancelled countdown never outlives
    /// the state that cancelled it.
    fn apply(&mut self, transition: Transition) {
        match transition.clock {
            ClockCommand::Keep => {}
            ClockCommand::Restart => {
                self.ticks = None;
                self.ticks = Some(self.clock.ticks());
                debug!("clock subscribed");
            }
            ClockCommand::Stop => {
                if self.ticks.take().is_some() {
                    debug!("clock cancelled");
                }
            }
        }
        if let Some(state) = transition.emitted {
            self.publish(state);
        }
    }

    fn publish(&mut self, state: TimerState) {
        if let Some(current) = &self.current {
            current.send_replace(state);
        }
        self.subscribers.retain(|tx| tx.send(state).is_ok());
    }
}

/// Resolves once every subscriber has been dropped.
async fn all_closed(subscribers: &[mpsc::UnboundedSender<TimerState>]) {
    for tx in subscribers {
        tx.closed().await;
    }
}

async fn next_tick(ticks: &mut Option<Ticks>) -> u64 {
    match ticks {
        Some(ticks) => ticks.tick().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn cfg() -> TimerConfig {
        TimerConfig::new(
            [("work", 3), ("break", 1), ("longBreak", 1)],
            &["work", "break"],
            0,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn handle_rejects_invalid_config_synchronously() {
        let handle = TimerService::spawn(cfg(), Clock::new()).unwrap();
        let bad = TimerConfig::new([("work", 3)], &["work", "break"], 0);
        let err = handle.apply_config(bad).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(handle.snapshot().await.unwrap(), TimerState::idle(3, 0));
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_sees_queued_actions() {
        let handle = TimerService::spawn(cfg(), Clock::new()).unwrap();
        handle.apply_action(TimerAction::Skip).unwrap();
        assert_eq!(handle.snapshot().await.unwrap(), TimerState::idle(1, 1));
        assert_eq!(handle.current(), TimerState::idle(1, 1));
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn subscriber_gets_current_state_first() {
        let handle = TimerService::spawn(cfg(), Clock::new()).unwrap();
        let mut rx = handle.subscribe().unwrap();
        assert_eq!(rx.recv().await, Some(TimerState::idle(3, 0)));
        handle.apply_action(TimerAction::Start).unwrap();
        assert_eq!(rx.recv().await, Some(TimerState::counting(3, 0)));
        handle.shutdown().await;
        // Sender side is gone once the task has stopped.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn inputs_after_shutdown_fail() {
        let handle = TimerService::spawn(cfg(), Clock::with_period(Duration::from_millis(10)))
            .unwrap();
        let inputs = handle.inputs.clone();
        handle.shutdown().await;
        assert!(inputs.send(Input::Action(TimerAction::Start)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_for_first_config() {
        let (config_tx, config_rx) = mpsc::channel(4);
        let (action_tx, action_rx) = mpsc::channel(4);
        let mut states = run(config_rx, action_rx, Clock::new());

        action_tx.send(TimerAction::Start).await.unwrap();
        // Let the action be folded (and ignored) before the config lands.
        tokio::time::sleep(Duration::from_millis(1)).await;
        config_tx.send(cfg()).await.unwrap();
        assert_eq!(states.recv().await, Some(TimerState::idle(3, 0)));

        drop(config_tx);
        drop(action_tx);
        assert_eq!(states.recv().await, None);
    }
}
