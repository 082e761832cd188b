//! Fixed-rate update/render pacing.
//!
//! Every scheduling opportunity the host calls [`Scheduler::tick`]. If a
//! full frame interval of wall-clock time has passed, the session is
//! advanced by exactly one interval of simulated time (never the measured
//! delta, so emulation does not depend on host jitter) and the fresh frame
//! goes to the display. Otherwise nothing happens and the host yields.

use crate::display::Display;
use crate::engine::DeviceEngine;
use crate::session::DeviceSession;
use std::cell::Cell;
use std::io;
use std::time::Duration;

/// frame rate of the terminal host
pub const HEADLESS_FPS: u32 = 20;
/// frame rate of the browser hosts
pub const BROWSER_FPS: u32 = 10;

/// monotonic time since some fixed origin
pub trait Clock {
    fn now(&self) -> Duration;
}

#[cfg(not(target_arch = "wasm32"))]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// clock that only moves when told to
#[derive(Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    pub last_tick: Duration,
    pub interval: Duration,
}

impl FrameTiming {
    pub fn new(fps: u32) -> Self {
        FrameTiming {
            last_tick: Duration::ZERO,
            interval: Duration::from_secs(1) / fps.max(1),
        }
    }

    fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.last_tick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// host not ready yet
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// not due yet, or not running
    Skipped,
    /// one update and one frame went out
    Rendered,
}

pub struct Scheduler<C: Clock> {
    clock: C,
    timing: FrameTiming,
    state: SchedulerState,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C, fps: u32) -> Self {
        Scheduler {
            clock,
            timing: FrameTiming::new(fps),
            state: SchedulerState::Idle,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn timing(&self) -> FrameTiming {
        self.timing
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// the host is ready: start counting from now
    pub fn start(&mut self) {
        if self.state == SchedulerState::Idle {
            self.timing.last_tick = self.clock.now();
            self.state = SchedulerState::Running;
            log::info!(
                "scheduler running at {:?} per frame",
                self.timing.interval
            );
        }
    }

    /// how long until the next tick is due
    pub fn until_due(&self) -> Duration {
        let elapsed = self.timing.elapsed(self.clock.now());
        self.timing.interval.saturating_sub(elapsed)
    }

    /// one scheduling opportunity
    pub fn tick<E, D>(
        &mut self,
        session: &mut DeviceSession<E>,
        display: &mut D,
    ) -> Result<Tick, io::Error>
    where
        E: DeviceEngine,
        D: Display + ?Sized,
    {
        if self.state != SchedulerState::Running {
            return Ok(Tick::Skipped);
        }
        let now = self.clock.now();
        if self.timing.elapsed(now) < self.timing.interval {
            return Ok(Tick::Skipped);
        }
        self.timing.last_tick = now;
        session.update(self.timing.interval.as_secs_f64());
        display.draw(&session.read_frame())?;
        Ok(Tick::Rendered)
    }
}

/// How the terminal host gives the thread back between ticks: it yields,
/// and when the next frame is still a while off it parks for a short
/// slice instead of spinning. It never waits past a deadline.
#[cfg(not(target_arch = "wasm32"))]
pub struct CooperativePacer {
    sleeper: spin_sleep::SpinSleeper,
    slice: Duration,
}

#[cfg(not(target_arch = "wasm32"))]
impl CooperativePacer {
    pub fn new(slice: Duration) -> Self {
        CooperativePacer {
            sleeper: spin_sleep::SpinSleeper::new(100_000),
            slice,
        }
    }

    pub fn pause(&self, until_due: Duration) {
        if until_due > self.slice {
            self.sleeper.sleep(self.slice);
        } else {
            std::thread::yield_now();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for CooperativePacer {
    fn default() -> Self {
        CooperativePacer::new(Duration::from_micros(500))
    }
}
