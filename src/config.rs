use crate::rom::RomRequest;
use crate::scheduler::HEADLESS_FPS;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

/// Run a VMU image in the terminal.
#[derive(Debug, Parser)]
#[command(name = "vmu-host", version)]
pub struct Config {
    /// ROM to run: the .vmi/.vms pair of one game, a lone .vmi (its .vms is found by
    /// name), or a single .dci/.dcm/.bin image. Without one the test card
    /// is shown.
    #[arg(value_name = "ROM", num_args = 0..=2)]
    pub rom: Vec<String>,

    /// host directory the ROM files are read from
    #[arg(long, default_value = "roms")]
    pub roms_dir: PathBuf,

    /// virtual directory the ROM files are staged into
    #[arg(long, default_value = "roms")]
    pub mount: String,

    /// target frame rate
    #[arg(long, default_value_t = HEADLESS_FPS, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    /// stop after this many rendered frames
    #[arg(long)]
    pub frames: Option<u64>,

    /// keep files already in the virtual filesystem instead of overwriting
    #[arg(long)]
    pub keep_existing: bool,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "warn")]
    pub log_level: LevelFilter,

    /// write log lines here instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// the ROM request, with paths placed under the virtual mount
    pub fn rom_request(&self) -> Option<RomRequest> {
        RomRequest::from_paths(&self.rom).map(|r| r.under(&self.mount))
    }

    pub fn overwrite(&self) -> bool {
        !self.keep_existing
    }
}
