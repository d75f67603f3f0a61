//! Fixed-timestep game loop.
//!
//! One thread runs everything: each iteration waits up to one update period
//! for input (the only suspension point), applies it, advances the engine,
//! and publishes a snapshot once a render period has passed.

use std::io;
use std::time::Duration;

use tracing::debug;

use crate::game::{Engine, Snapshot};
use crate::input::Input;

pub const UPDATES_PER_SECOND: u32 = 600;
pub const RENDERS_PER_SECOND: u32 = 60;

/// Where the loop gets input from and sends snapshots to.
pub trait Frontend {
    /// Waits at most `timeout` for the next input.
    fn poll_input(&mut self, timeout: Duration) -> io::Result<Option<Input>>;

    fn present(&mut self, snapshot: &Snapshot) -> io::Result<()>;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LoopExit {
    /// The engine stopped running (stop command or game over)
    Stopped,
    /// The frontend asked to quit
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub struct Scheduler {
    update_period: Duration,
    render_period: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(UPDATES_PER_SECOND, RENDERS_PER_SECOND)
    }
}

impl Scheduler {
    pub fn new(updates_per_second: u32, renders_per_second: u32) -> Self {
        Self {
            update_period: Duration::from_secs(1) / updates_per_second,
            render_period: Duration::from_secs(1) / renders_per_second,
        }
    }

    pub fn update_period(&self) -> Duration {
        self.update_period
    }

    pub fn render_period(&self) -> Duration {
        self.render_period
    }

    /// Runs the loop while the engine is running. The final state is always
    /// presented before returning.
    pub fn run<F: Frontend>(&self, engine: &mut Engine, frontend: &mut F) -> io::Result<LoopExit> {
        debug!(
            "Loop started: update every {:?}, render every {:?}",
            self.update_period, self.render_period
        );

        while engine.is_running() {
            engine.update();
            for event in engine.take_events() {
                debug!("{:?}", event);
            }

            if engine.since_last_render() >= self.render_period {
                if let Some(snapshot) = engine.render() {
                    frontend.present(&snapshot)?;
                }
            }

            match frontend.poll_input(self.update_period)? {
                Some(Input::Quit) => {
                    engine.stop();
                    self.present_final(engine, frontend)?;
                    return Ok(LoopExit::Quit);
                }
                Some(Input::Command(command)) => {
                    engine.apply(command);
                }
                None => {}
            }
        }

        self.present_final(engine, frontend)?;
        Ok(LoopExit::Stopped)
    }

    fn present_final<F: Frontend>(&self, engine: &mut Engine, frontend: &mut F) -> io::Result<()> {
        let snapshot = match engine.render() {
            Some(snapshot) => snapshot,
            None => engine.snapshot().clone(),
        };
        debug!("Loop finished in state {:?}", snapshot.state);
        frontend.present(&snapshot)
    }
}
