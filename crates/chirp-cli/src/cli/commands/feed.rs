//! Interactive feed: drives the client runtime against the terminal.

use std::io::{IsTerminal, stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chirp_client::ClientRuntime;
use chirp_client::events::UiEvent;
use chirp_core::{Config, logging};
use crossterm::event;
use tracing::info;

use crate::terminal::{self, TerminalGuard};

/// Poll interval while input is flowing or a task is in flight (~60fps).
const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Poll interval when nothing is happening.
const IDLE_POLL_DURATION: Duration = Duration::from_millis(100);

/// Must be called inside a Tokio runtime context.
pub fn run(config: &Config) -> Result<()> {
    if !stdout().is_terminal() {
        anyhow::bail!(
            "chirp needs a terminal.\n\
             Run `chirp config path` to locate the config file."
        );
    }

    let _log_guard = logging::init(config).context("init logging")?;
    info!(backend = ?config.backend, "starting chirp");

    let mut runtime = ClientRuntime::from_config(config).context("configure backend")?;
    runtime.start();

    terminal::install_panic_hook();
    let mut guard = TerminalGuard::setup()?;
    let result = event_loop(&mut runtime, &mut guard);

    runtime.shutdown();
    drop(guard);
    info!("chirp exited");
    result
}

fn event_loop(runtime: &mut ClientRuntime, guard: &mut TerminalGuard) -> Result<()> {
    let mut last_input = Instant::now();
    loop {
        runtime.drain_inbox();
        if runtime.state.should_quit {
            return Ok(());
        }

        guard
            .terminal()
            .draw(|frame| chirp_client::render::render(&runtime.state, frame))
            .context("draw frame")?;

        let busy = runtime.state.tasks.is_any_running()
            || last_input.elapsed() < IDLE_POLL_DURATION;
        let timeout = if busy { FRAME_DURATION } else { IDLE_POLL_DURATION };

        if event::poll(timeout)? {
            runtime.dispatch(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                runtime.dispatch(UiEvent::Terminal(event::read()?));
            }
            last_input = Instant::now();
        }
    }
}
