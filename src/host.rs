//! The terminal host: stages the ROM from a host directory, then runs the
//! scheduler against a character display until told to stop.

use crate::config::Config;
use crate::display::{CharDisplay, Display};
use crate::engine::DeviceEngine;
use crate::error::LoaderError;
use crate::input::{HostCommand, Input, KeyboardInput};
use crate::loader::{DirSource, LoadMode, Loader};
use crate::logger::{self, LogTarget};
use crate::scheduler::{Clock, CooperativePacer, MonotonicClock, Scheduler, Tick};
use crate::session::DeviceSession;
use crate::vfs::VirtualFs;
use crate::viewer::FlashViewer;
use pollster::block_on;
use std::error::Error;
use std::io;
use std::time::Duration;
use tui::backend::CrosstermBackend;

/// Drive the scheduler until a quit command or `frame_limit` rendered
/// frames. Host commands are applied between ticks; `pause` is handed the
/// time left until the next tick whenever a tick is skipped.
pub fn run_loop<E, C, D, I, P>(
    session: &mut DeviceSession<E>,
    scheduler: &mut Scheduler<C>,
    display: &mut D,
    input: &mut I,
    frame_limit: Option<u64>,
    mut pause: P,
) -> Result<u64, io::Error>
where
    E: DeviceEngine,
    C: Clock,
    D: Display + ?Sized,
    I: Input + ?Sized,
    P: FnMut(Duration),
{
    let mut frames = 0;
    loop {
        match input.poll_command()? {
            Some(HostCommand::Quit) => {
                log::info!("quit requested");
                break;
            }
            Some(HostCommand::Reset) => session.reset_execution(),
            None => {}
        }
        match scheduler.tick(session, display)? {
            Tick::Rendered => {
                frames += 1;
                if frame_limit.map_or(false, |limit| frames >= limit) {
                    break;
                }
            }
            Tick::Skipped => pause(scheduler.until_due()),
        }
    }
    Ok(frames)
}

/// Stage and start the ROM named on the command line, if any. A failure
/// is not fatal; the test card stays up.
pub fn load_startup_rom<E: DeviceEngine>(
    config: &Config,
    session: &mut DeviceSession<E>,
) -> Result<(), LoaderError> {
    let request = match config.rom_request() {
        Some(request) => request,
        None => return Ok(()),
    };
    let source = DirSource::new(&config.roms_dir, session.fs().root());
    let loader = Loader::new(config.overwrite());
    let staged = block_on(loader.load_rom(&source, session, &request, LoadMode::Startup))?;
    log::info!("{} started from {} files", request.load_path(), staged.len());
    Ok(())
}

pub fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    if !config.rom.is_empty() && config.rom_request().is_none() {
        return Err(format!(
            "{} is not a .vmi/.vms pair of the same game",
            config.rom.join(" ")
        )
        .into());
    }

    let target = match &config.log_file {
        Some(path) => LogTarget::File(path.clone()),
        None => LogTarget::Stderr,
    };
    logger::init(config.log_level, target)?;

    let fs = VirtualFs::mount(&config.mount);
    let mut session = DeviceSession::create(FlashViewer::new(), fs)?;

    let startup = load_startup_rom(config, &mut session);
    if let Err(e) = &startup {
        log::error!("{} was not loaded: {}", config.rom.join(" "), e);
    }

    let mut input = KeyboardInput::new()?;
    let mut display = CharDisplay::new(CrosstermBackend::new(io::stdout()), "VMU")?;
    let mut scheduler = Scheduler::new(MonotonicClock::new(), config.fps);
    scheduler.start();

    let pacer = CooperativePacer::default();
    let frames = run_loop(
        &mut session,
        &mut scheduler,
        &mut display,
        &mut input,
        config.frames,
        |until_due| pacer.pause(until_due),
    );
    // back on the main screen before anything else is reported
    drop(display);
    drop(input);
    let frames = frames?;
    log::info!("stopped after {} frames", frames);

    // an error logged to stderr before the display came up was hidden by it
    if let (Err(e), None) = (&startup, &config.log_file) {
        log::error!("{} was not loaded: {}", config.rom.join(" "), e);
    }
    Ok(())
}
