use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Subcommand;
use pomocycle_core::{Clock, Config, PhaseTable, TimerAction, TimerConfig, TimerService, TimerState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

#[derive(Subcommand)]
pub enum TimerCommand {
    /// Run the timer, reading actions (start, pause, reset, skip) from stdin
    ///
    /// Other stdin commands: `config <file>` applies a JSON timer config,
    /// `quit` exits. On end of input a running countdown finishes its phase.
    Run {
        /// JSON timer config file (defaults to the [timer] config section)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Length of one logical second in milliseconds
        #[arg(long)]
        tick_ms: Option<u64>,
        /// Print states as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Validate a JSON timer config file
    Validate {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Print the phase table of the configured timer
    Show {
        /// JSON timer config file (defaults to the [timer] config section)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Action(TimerAction),
    Config(PathBuf),
    Quit,
    Empty,
}

fn parse_line(line: &str) -> Result<Line, pomocycle_core::ValidationError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line::Empty);
    }
    if line == "quit" || line == "exit" {
        return Ok(Line::Quit);
    }
    if let Some(path) = line.strip_prefix("config ") {
        return Ok(Line::Config(PathBuf::from(path.trim())));
    }
    line.parse().map(Line::Action)
}

fn read_timer_config(path: &Path) -> Result<TimerConfig, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let config: TimerConfig = serde_json::from_str(&content)?;
    Ok(config)
}

fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn format_state(state: &TimerState, phase_order: &[String]) -> String {
    let name = phase_order
        .get(state.phase_index)
        .map_or("?", String::as_str);
    format!(
        "{name} [{}/{}] {} {}",
        state.phase_index + 1,
        phase_order.len(),
        format_clock(state.seconds_left),
        if state.running { "running" } else { "paused" }
    )
}

pub fn run(command: TimerCommand) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        TimerCommand::Run {
            config,
            tick_ms,
            json,
        } => {
            // Every setting given on the command line: leave the config file alone.
            let app = if config.is_some() && tick_ms.is_some() && json {
                Config::default()
            } else {
                Config::load()?
            };
            let timer = match config {
                Some(path) => read_timer_config(&path)?,
                None => app.timer.clone(),
            };
            let clock = match tick_ms {
                Some(ms) => Clock::with_period(Duration::from_millis(ms)),
                None => app.clock(),
            };
            let json = json || app.display.json_output;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_interactive(timer, clock, json))?;
        }
        TimerCommand::Validate { file } => {
            let config = read_timer_config(&file)?;
            let table = PhaseTable::new(config)?;
            println!("ok: {} phases", table.len());
        }
        TimerCommand::Show { config } => {
            let timer = match config {
                Some(path) => read_timer_config(&path)?,
                None => Config::load()?.timer,
            };
            let table = PhaseTable::new(timer)?;
            for index in 0..table.len() {
                let marker = if index == table.start_index() { " *" } else { "" };
                println!(
                    "{index} {} {}{marker}",
                    table.phase_name(index).unwrap_or("?"),
                    format_clock(table.duration_of(index))
                );
            }
        }
    }
    Ok(())
}

/// Prints states labelled with the phase names of their config epoch.
struct Printer {
    json: bool,
    names: Vec<String>,
}

impl Printer {
    fn print(&self, state: &TimerState) {
        let line = if self.json {
            serde_json::to_string(state).unwrap_or_default()
        } else {
            format_state(state, &self.names)
        };
        println!("{line}");
    }
}

/// Split states drained right after a config was folded into those of the
/// old epoch and the new epoch's initial state, if it was emitted.
///
/// The config stops the clock, so the new initial state can only be the
/// last one drained.
fn split_epoch(
    mut pending: Vec<TimerState>,
    current: TimerState,
) -> (Vec<TimerState>, Option<TimerState>) {
    let fresh = match pending.last() {
        Some(last) if *last == current => pending.pop(),
        _ => None,
    };
    (pending, fresh)
}

fn drain(states: &mut UnboundedReceiver<TimerState>) -> Vec<TimerState> {
    std::iter::from_fn(|| states.try_recv().ok()).collect()
}

async fn run_interactive(
    timer: TimerConfig,
    clock: Clock,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut printer = Printer {
        json,
        names: timer.phase_order.clone(),
    };
    let handle = TimerService::spawn(timer, clock)?;
    let mut states = handle.subscribe()?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reading = true;

    loop {
        tokio::select! {
            state = states.recv() => match state {
                Some(state) => {
                    printer.print(&state);
                    if !reading && !state.running {
                        break;
                    }
                }
                None => break,
            },
            line = lines.next_line(), if reading => {
                let Some(line) = line? else {
                    reading = false;
                    // Everything emitted up to the barrier is already queued.
                    let mut latest = handle.snapshot().await?;
                    for state in drain(&mut states) {
                        printer.print(&state);
                        latest = state;
                    }
                    if !latest.running {
                        break;
                    }
                    debug!("input closed; waiting for the running phase to finish");
                    continue;
                };
                match parse_line(&line) {
                    Ok(Line::Empty) => {}
                    Ok(Line::Quit) => break,
                    Ok(Line::Action(action)) => handle.apply_action(action)?,
                    Ok(Line::Config(path)) => {
                        let config = match read_timer_config(&path) {
                            Ok(config) => config,
                            Err(e) => {
                                eprintln!("invalid config: {e}");
                                continue;
                            }
                        };
                        let names = config.phase_order.clone();
                        if let Err(e) = handle.apply_config(config) {
                            eprintln!("invalid config: {e}");
                            continue;
                        }
                        let current = handle.snapshot().await?;
                        let (old, fresh) = split_epoch(drain(&mut states), current);
                        for state in &old {
                            printer.print(state);
                        }
                        printer.names = names;
                        if let Some(state) = fresh {
                            printer.print(&state);
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }

    handle.shutdown().await;
    while let Some(state) = states.recv().await {
        printer.print(&state);
    }
    Ok(())
}
