//! Host shell for a VMU device engine.
//!
//! ## Design
//!
//! * the device engine is opaque; we only stage ROM bytes where it can read
//!   them, tick it at a fixed rate and copy its LCD out
//! * fixed simulated step per tick, so what runs does not depend on host
//!   jitter
//! * abstract display so can plug alternatives; TUI in-console and a
//!   browser canvas
//! * loads are a strict sequence: fetch info, write, fetch data, write,
//!   then load
//!
//! Model
//!
//! Host
//!  |-- config, logger, virtual filesystem(mount)
//!  |-- session(engine, filesystem)
//!  |    |-- startup load / hot swap
//!  |    `-- read frame -> pixel grid
//!  |-- loader(source) -> session
//!  `-- main loop
//!       |-- poll input (terminal only)
//!       |-- scheduler.tick(session, display)
//!       |     elapsed >= interval? update(interval); draw(read frame)
//!       `-- yield until the next tick is due

pub mod display;
pub mod engine;
pub mod error;
pub mod input;
pub mod loader;
pub mod logger;
pub mod rom;
pub mod scheduler;
pub mod session;
pub mod vfs;
pub mod viewer;

#[cfg(not(target_arch = "wasm32"))]
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod host;
#[cfg(target_arch = "wasm32")]
pub mod web;
