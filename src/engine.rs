//! The device engine's fixed call surface.
//!
//! CPU execution, flash parsing and LCD computation all live behind this
//! trait; the host only ever stages files, pumps time and reads pixels.

use crate::error::LoadImageStatus;
use crate::vfs::VirtualFs;

/// LCD width in pixels
pub const DISPLAY_WIDTH: usize = 48;
/// LCD height in pixels
pub const DISPLAY_HEIGHT: usize = 32;

/// raw brightness read from the LCD buffer; 0 is off
pub type Intensity = u8;

pub trait DeviceEngine {
    /// bring up the engine's process-wide services
    fn init(&mut self) -> Result<(), String>;

    /// release whatever `init` acquired
    fn uninit(&mut self);

    /// instantiate the device; called once per session
    fn create_device(&mut self) -> Result<(), String>;

    /// load an image that is already present in `fs`
    fn load_image(&mut self, fs: &VirtualFs, path: &str) -> Result<(), LoadImageStatus>;

    /// wipe flash storage back to the default layout
    fn format_flash_default(&mut self) -> Result<(), String>;

    /// human-readable listing of the flash root block
    fn flash_root_block(&self) -> String;

    /// reinitialise CPU and registers, keeping flash intact
    fn reset(&mut self);

    /// advance emulation by `dt` seconds of simulated time
    fn update(&mut self, dt: f64);

    /// LCD intensity at (x, y), with `x < DISPLAY_WIDTH` and `y < DISPLAY_HEIGHT`
    fn pixel(&self, x: usize, y: usize) -> Intensity;
}
