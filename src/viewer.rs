//! Built-in device engine that shows what is in flash.
//!
//! It does not execute VMU code. Until a game is loaded it draws a test
//! card; afterwards it draws the game's data component as a 1-bit
//! bitmap, six bytes per LCD row, scrolling one row for every tenth of a
//! second of simulated time. Only `update`'s `dt` moves it forward, so
//! the same image and the same updates always give the same frames.

use crate::engine::{DeviceEngine, Intensity, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::error::LoadImageStatus;
use crate::rom::{with_extension, RomFormat};
use crate::vfs::VirtualFs;
use std::fmt::Write;

const BYTES_PER_ROW: usize = DISPLAY_WIDTH / 8;

/// flash geometry of a stock VMU
const FLASH_BLOCK_BYTES: usize = 512;
const FLASH_BLOCKS: usize = 256;
const FLASH_USER_BLOCKS: usize = 200;

/// simulated time per scrolled row
const SCROLL_PERIOD_NANOS: u64 = 100_000_000;

/// brightness of a lit segment
const LIT: Intensity = 0xff;

struct FlashGame {
    path: String,
    data: Box<[u8]>,
}

impl FlashGame {
    fn blocks(&self) -> usize {
        (self.data.len() + FLASH_BLOCK_BYTES - 1) / FLASH_BLOCK_BYTES
    }

    fn rows(&self) -> usize {
        (self.data.len() + BYTES_PER_ROW - 1) / BYTES_PER_ROW
    }
}

#[derive(Default)]
pub struct FlashViewer {
    initialised: bool,
    device: bool,
    game: Option<FlashGame>,
    running: bool,
    scroll_row: usize,
    pending_nanos: u64,
    buzzer: bool,
    ghosting: bool,
}

impl FlashViewer {
    pub fn new() -> Self {
        FlashViewer::default()
    }

    pub fn buzzer_enabled(&self) -> bool {
        self.buzzer
    }

    pub fn ghosting_enabled(&self) -> bool {
        self.ghosting
    }

    /// path of the game currently in flash
    pub fn game_path(&self) -> Option<&str> {
        self.game.as_ref().map(|g| g.path.as_str())
    }

    fn read_game(fs: &VirtualFs, path: &str) -> Result<Box<[u8]>, LoadImageStatus> {
        let bytes = match RomFormat::from_path(path) {
            RomFormat::Info => {
                // only the info header needs to exist; the payload is in the .vms
                fs.read(path).map_err(|_| LoadImageStatus::OpenFailed)?;
                fs.read(&with_extension(path, "vms"))
                    .map_err(|_| LoadImageStatus::VmiNoVms)?
            }
            RomFormat::Data => {
                let data = fs.read(path).map_err(|_| LoadImageStatus::OpenFailed)?;
                if !fs.exists(&with_extension(path, "vmi")) {
                    return Err(LoadImageStatus::VmsNoVmi);
                }
                data
            }
            RomFormat::Single => fs.read(path).map_err(|_| LoadImageStatus::OpenFailed)?,
            RomFormat::Unknown => {
                if !fs.exists(path) {
                    return Err(LoadImageStatus::OpenFailed);
                }
                return Err(LoadImageStatus::UnknownFormat);
            }
        };
        if bytes.is_empty() {
            return Err(LoadImageStatus::ReadFailed);
        }
        Ok(bytes.into())
    }
}

impl DeviceEngine for FlashViewer {
    fn init(&mut self) -> Result<(), String> {
        self.initialised = true;
        Ok(())
    }

    fn uninit(&mut self) {
        self.initialised = false;
        self.device = false;
    }

    fn create_device(&mut self) -> Result<(), String> {
        if !self.initialised {
            return Err("engine is not initialised".to_string());
        }
        self.device = true;
        Ok(())
    }

    fn load_image(&mut self, fs: &VirtualFs, path: &str) -> Result<(), LoadImageStatus> {
        if self.game.is_some() {
            return Err(LoadImageStatus::GameDuplicate);
        }
        let data = FlashViewer::read_game(fs, path)?;
        let game = FlashGame {
            path: path.to_string(),
            data,
        };
        if game.blocks() > FLASH_USER_BLOCKS {
            return Err(LoadImageStatus::InadequateFreeBlocks);
        }
        self.game = Some(game);
        Ok(())
    }

    fn format_flash_default(&mut self) -> Result<(), String> {
        if !self.device {
            return Err("no device".to_string());
        }
        self.game = None;
        self.running = false;
        Ok(())
    }

    fn flash_root_block(&self) -> String {
        let used = self.game.as_ref().map_or(0, FlashGame::blocks);
        let mut out = String::new();
        let _ = writeln!(out, "ROOT BLOCK  format: default");
        let _ = writeln!(
            out,
            "  blocks: {} total, {} user, {} used, {} free",
            FLASH_BLOCKS,
            FLASH_USER_BLOCKS,
            used,
            FLASH_USER_BLOCKS - used
        );
        match &self.game {
            Some(g) => {
                let _ = write!(out, "  game: {} ({} bytes, {} blocks)", g.path, g.data.len(), used);
            }
            None => {
                let _ = write!(out, "  game: <none>");
            }
        }
        out
    }

    fn reset(&mut self) {
        self.running = self.game.is_some();
        self.scroll_row = 0;
        self.pending_nanos = 0;
        self.buzzer = true;
        self.ghosting = false;
    }

    fn update(&mut self, dt: f64) {
        let game = match (&self.game, self.running) {
            (Some(g), true) => g,
            _ => return,
        };
        self.pending_nanos += (dt * 1e9).round() as u64;
        let steps = self.pending_nanos / SCROLL_PERIOD_NANOS;
        self.pending_nanos %= SCROLL_PERIOD_NANOS;
        self.scroll_row = (self.scroll_row + steps as usize) % game.rows();
    }

    fn pixel(&self, x: usize, y: usize) -> Intensity {
        let bit = match (&self.game, self.running) {
            (Some(g), true) => {
                let row = (self.scroll_row + y) % g.rows();
                let idx = row * BYTES_PER_ROW + x / 8;
                match g.data.get(idx) {
                    Some(byte) => 1 & (byte >> (7 - x % 8)),
                    None => 0,
                }
            }
            _ => 1 & (VMU_TEST_CARD[y * BYTES_PER_ROW + x / 8] >> (7 - x % 8)),
        };
        if bit == 1 {
            LIT
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> FlashViewer {
        let mut v = FlashViewer::new();
        v.init().unwrap();
        v.create_device().unwrap();
        v
    }

    fn fs_with(files: &[(&str, &[u8])]) -> VirtualFs {
        let mut fs = VirtualFs::mount("roms");
        for (path, data) in files {
            fs.create_data_file(path, data, true).unwrap();
        }
        fs
    }

    #[test]
    fn test_device_needs_init() {
        let mut v = FlashViewer::new();
        assert!(v.create_device().is_err());
    }

    #[test]
    fn test_shows_test_card_before_load() {
        let v = ready();
        // the border is lit, the inside corner is not
        assert_eq!(v.pixel(0, 0), LIT);
        assert_eq!(v.pixel(47, 31), LIT);
        assert_eq!(v.pixel(1, 1), 0);
    }

    #[test]
    fn test_vmi_needs_vms() {
        let mut v = ready();
        let fs = fs_with(&[("roms/a.vmi", &[1])]);
        assert_eq!(v.load_image(&fs, "roms/a.vmi"), Err(LoadImageStatus::VmiNoVms));
    }

    #[test]
    fn test_vms_alone_rejected() {
        let mut v = ready();
        let fs = fs_with(&[("roms/a.vms", &[1])]);
        assert_eq!(v.load_image(&fs, "roms/a.vms"), Err(LoadImageStatus::VmsNoVmi));
    }

    #[test]
    fn test_vms_finds_its_vmi() {
        let mut v = ready();
        let fs = fs_with(&[("roms/a.vmi", &[0]), ("roms/a.vms", &[0x80])]);
        v.load_image(&fs, "roms/a.vms").unwrap();
        v.reset();
        assert_eq!(v.game_path(), Some("roms/a.vms"));
        assert_eq!(v.pixel(0, 0), LIT);
        assert_eq!(v.pixel(1, 0), 0);
    }

    #[test]
    fn test_missing_and_unknown() {
        let mut v = ready();
        let fs = fs_with(&[("roms/a.txt", &[1])]);
        assert_eq!(v.load_image(&fs, "roms/b.dci"), Err(LoadImageStatus::OpenFailed));
        assert_eq!(v.load_image(&fs, "roms/a.txt"), Err(LoadImageStatus::UnknownFormat));
    }

    #[test]
    fn test_empty_image_unreadable() {
        let mut v = ready();
        let fs = fs_with(&[("roms/a.bin", &[])]);
        assert_eq!(v.load_image(&fs, "roms/a.bin"), Err(LoadImageStatus::ReadFailed));
    }

    #[test]
    fn test_too_big_for_flash() {
        let mut v = ready();
        let big = vec![0u8; FLASH_BLOCK_BYTES * FLASH_USER_BLOCKS + 1];
        let fs = fs_with(&[("roms/a.bin", &big)]);
        assert_eq!(
            v.load_image(&fs, "roms/a.bin"),
            Err(LoadImageStatus::InadequateFreeBlocks)
        );
    }

    #[test]
    fn test_second_game_needs_format() {
        let mut v = ready();
        let fs = fs_with(&[("a.bin", &[1]), ("b.bin", &[2])]);
        v.load_image(&fs, "a.bin").unwrap();
        assert_eq!(v.load_image(&fs, "b.bin"), Err(LoadImageStatus::GameDuplicate));
        v.format_flash_default().unwrap();
        v.load_image(&fs, "b.bin").unwrap();
        assert_eq!(v.game_path(), Some("b.bin"));
    }

    #[test]
    fn test_reset_sets_peripherals() {
        let mut v = ready();
        v.reset();
        assert!(v.buzzer_enabled());
        assert!(!v.ghosting_enabled());
    }

    #[test]
    fn test_draws_data_bitmap() {
        let mut v = ready();
        // row 0: first pixel lit; row 1: last pixel lit
        let data: [u8; 12] = [0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01];
        let fs = fs_with(&[("g.vmi", &[0]), ("g.vms", &data)]);
        v.load_image(&fs, "g.vmi").unwrap();
        v.reset();
        assert_eq!(v.pixel(0, 0), LIT);
        assert_eq!(v.pixel(1, 0), 0);
        assert_eq!(v.pixel(47, 1), LIT);
        // two data rows wrap around the 32-row display
        assert_eq!(v.pixel(0, 2), LIT);
    }

    #[test]
    fn test_scrolls_with_simulated_time() {
        let mut v = ready();
        let mut data = [0u8; 18];
        data[0] = 0x80;
        let fs = fs_with(&[("g.bin", &data)]);
        v.load_image(&fs, "g.bin").unwrap();
        v.reset();
        v.update(0.05);
        assert_eq!(v.pixel(0, 0), LIT);
        v.update(0.05);
        // one row scrolled: the lit row is now at the bottom of the 3-row cycle
        assert_eq!(v.pixel(0, 0), 0);
        assert_eq!(v.pixel(0, 2), LIT);
    }

    #[test]
    fn test_no_scroll_before_reset() {
        let mut v = ready();
        let fs = fs_with(&[("g.bin", &[0x80])]);
        v.load_image(&fs, "g.bin").unwrap();
        v.update(1.0);
        // not running yet, so the test card stays up
        assert_eq!(v.pixel(1, 1), 0);
        assert_eq!(v.pixel(0, 0), LIT);
    }

    #[test]
    fn test_root_block_listing() {
        let mut v = ready();
        assert!(v.flash_root_block().contains("game: <none>"));
        let fs = fs_with(&[("g.bin", &[0u8; 513])]);
        v.load_image(&fs, "g.bin").unwrap();
        let listing = v.flash_root_block();
        assert!(listing.contains("2 used, 198 free"));
        assert!(listing.contains("g.bin (513 bytes, 2 blocks)"));
    }
}

/// shown until a game is running
#[rustfmt::skip]
const VMU_TEST_CARD: [u8; BYTES_PER_ROW * DISPLAY_HEIGHT] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // 00 XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX
    0x80, 0x00, 0x00, 0x00, 0x00, 0x01, // 01 X                                              X
    0x80, 0x00, 0x00, 0x2a, 0xaa, 0xa9, // 02 X                         X X X X X X X X X X  X
    0x80, 0x00, 0x00, 0x15, 0x55, 0x55, // 03 X                          X X X X X X X X X X X
    0x88, 0x91, 0x22, 0x2a, 0xaa, 0xa9, // 04 X   X   X  X   X  X   X   X X X X X X X X X X  X
    0x88, 0x9b, 0x22, 0x15, 0x55, 0x55, // 05 X   X   X  XX XX  X   X    X X X X X X X X X X X
    0x88, 0x95, 0x22, 0x2a, 0xaa, 0xa9, // 06 X   X   X  X X X  X   X   X X X X X X X X X X  X
    0x88, 0x95, 0x22, 0x15, 0x55, 0x55, // 07 X   X   X  X X X  X   X    X X X X X X X X X X X
    0x88, 0x91, 0x22, 0x2a, 0xaa, 0xa9, // 08 X   X   X  X   X  X   X   X X X X X X X X X X  X
    0x85, 0x11, 0x22, 0x15, 0x55, 0x55, // 09 X    X X   X   X  X   X    X X X X X X X X X X X
    0x82, 0x11, 0x1c, 0x2a, 0xaa, 0xa9, // 10 X     X    X   X   XXX    X X X X X X X X X X  X
    0x80, 0x00, 0x00, 0x15, 0x55, 0x55, // 11 X                          X X X X X X X X X X X
    0x80, 0x00, 0x00, 0x2a, 0xaa, 0xa9, // 12 X                         X X X X X X X X X X  X
    0x80, 0x00, 0x00, 0x15, 0x55, 0x55, // 13 X                          X X X X X X X X X X X
    0x80, 0x00, 0x00, 0x00, 0x00, 0x01, // 14 X                                              X
    0x80, 0x00, 0x00, 0x00, 0x00, 0x01, // 15 X                                              X
    0x80, 0x00, 0x00, 0x20, 0x00, 0x05, // 16 X                         X                  X X
    0x8f, 0xff, 0xfc, 0x10, 0x00, 0x09, // 17 X   XXXXXXXXXXXXXXXXXX     X                X  X
    0x80, 0x00, 0x00, 0x08, 0x00, 0x11, // 18 X                           X              X   X
    0x8f, 0xff, 0xfc, 0x04, 0x00, 0x21, // 19 X   XXXXXXXXXXXXXXXXXX       X            X    X
    0x8f, 0xff, 0xfc, 0x02, 0x00, 0x41, // 20 X   XXXXXXXXXXXXXXXXXX        X          X     X
    0x80, 0x00, 0x00, 0x01, 0x00, 0x81, // 21 X                              X        X      X
    0x8f, 0xff, 0xfc, 0x00, 0x81, 0x01, // 22 X   XXXXXXXXXXXXXXXXXX          X      X       X
    0x8f, 0xff, 0xfc, 0x00, 0x42, 0x01, // 23 X   XXXXXXXXXXXXXXXXXX           X    X        X
    0x8f, 0xff, 0xfc, 0x00, 0x24, 0x01, // 24 X   XXXXXXXXXXXXXXXXXX            X  X         X
    0x80, 0x00, 0x00, 0x00, 0x18, 0x01, // 25 X                                  XX          X
    0x80, 0x00, 0x00, 0x00, 0x18, 0x01, // 26 X                                  XX          X
    0x80, 0x00, 0x00, 0x00, 0x24, 0x01, // 27 X                                 X  X         X
    0x80, 0x00, 0x00, 0x00, 0x42, 0x01, // 28 X                                X    X        X
    0x80, 0x00, 0x00, 0x00, 0x81, 0x01, // 29 X                               X      X       X
    0x80, 0x00, 0x00, 0x00, 0x00, 0x01, // 30 X                                              X
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // 31 XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX
];
