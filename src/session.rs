use crate::display::PixelGrid;
use crate::engine::{DeviceEngine, Intensity, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::error::SessionError;
use crate::vfs::VirtualFs;
use std::cell::Cell;

thread_local! {
    // both hosts run everything on one thread, so this is one per process
    static SESSION_LIVE: Cell<bool> = Cell::new(false);
}

/// The one device instance of the host, together with the virtual
/// filesystem it loads from.
///
/// Creating a session initialises the engine and the device; dropping it
/// uninitialises the engine, including when a host bails out with an
/// error. Loader and scheduler borrow the session; nothing else holds it.
pub struct DeviceSession<E: DeviceEngine> {
    engine: E,
    fs: VirtualFs,
    loaded: Option<String>,
}

impl<E: DeviceEngine> DeviceSession<E> {
    pub fn create(mut engine: E, fs: VirtualFs) -> Result<Self, SessionError> {
        if SESSION_LIVE.with(Cell::get) {
            return Err(SessionError::AlreadyCreated);
        }
        engine.init().map_err(SessionError::Engine)?;
        if let Err(e) = engine.create_device() {
            engine.uninit();
            return Err(SessionError::Engine(e));
        }
        SESSION_LIVE.with(|live| live.set(true));
        log::info!("device created");
        Ok(DeviceSession {
            engine,
            fs,
            loaded: None,
        })
    }

    pub fn fs(&self) -> &VirtualFs {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut VirtualFs {
        &mut self.fs
    }

    /// path of the last image that loaded successfully
    pub fn loaded_image(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    /// load an image already present in the virtual filesystem
    pub fn load_image(&mut self, path: &str) -> Result<(), SessionError> {
        log::info!("loading image {}", path);
        self.engine
            .load_image(&self.fs, path)
            .map_err(|status| SessionError::Load {
                path: path.to_string(),
                status,
            })?;
        self.loaded = Some(path.to_string());
        Ok(())
    }

    /// first load after the device comes up: flash is already blank, so no
    /// reformat
    pub fn startup_load(&mut self, path: &str) -> Result<(), SessionError> {
        self.load_image(path)?;
        self.reset_execution();
        Ok(())
    }

    /// replace whatever is running: reformat flash, load `path`, restart
    pub fn hot_swap(&mut self, path: &str) -> Result<(), SessionError> {
        self.engine
            .format_flash_default()
            .map_err(SessionError::Engine)?;
        self.loaded = None;
        for line in self.engine.flash_root_block().lines() {
            log::debug!("{}", line);
        }
        self.load_image(path)?;
        self.reset_execution();
        Ok(())
    }

    /// restart the CPU without touching flash
    pub fn reset_execution(&mut self) {
        log::debug!("resetting cpu");
        self.engine.reset();
    }

    /// advance simulated time by `dt` seconds
    pub fn update(&mut self, dt: f64) {
        self.engine.update(dt);
    }

    /// panics when (x, y) is off the LCD
    pub fn read_pixel(&self, x: usize, y: usize) -> Intensity {
        assert!(
            x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT,
            "pixel ({}, {}) is outside the {}x{} display",
            x,
            y,
            DISPLAY_WIDTH,
            DISPLAY_HEIGHT
        );
        self.engine.pixel(x, y)
    }

    /// read every pixel into a fresh grid
    pub fn read_frame(&self) -> PixelGrid {
        PixelGrid::from_fn(|x, y| self.read_pixel(x, y))
    }
}

impl<E: DeviceEngine> Drop for DeviceSession<E> {
    fn drop(&mut self) {
        self.engine.uninit();
        SESSION_LIVE.with(|live| live.set(false));
        log::info!("device engine released");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::LoadImageStatus;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// engine that records every call it receives
    #[derive(Default)]
    pub struct ScriptedEngine {
        pub calls: Rc<RefCell<Vec<String>>>,
        pub fail_create: bool,
        pub level: Intensity,
    }

    impl ScriptedEngine {
        fn log(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl DeviceEngine for ScriptedEngine {
        fn init(&mut self) -> Result<(), String> {
            self.log("init".into());
            Ok(())
        }
        fn uninit(&mut self) {
            self.log("uninit".into());
        }
        fn create_device(&mut self) -> Result<(), String> {
            self.log("create".into());
            if self.fail_create {
                Err("no device".into())
            } else {
                Ok(())
            }
        }
        fn load_image(&mut self, fs: &VirtualFs, path: &str) -> Result<(), LoadImageStatus> {
            self.log(format!("load {}", path));
            fs.read(path).map(|_| ()).map_err(|_| LoadImageStatus::OpenFailed)
        }
        fn format_flash_default(&mut self) -> Result<(), String> {
            self.log("format".into());
            Ok(())
        }
        fn flash_root_block(&self) -> String {
            self.log("root".into());
            "ROOT".into()
        }
        fn reset(&mut self) {
            self.log("reset".into());
        }
        fn update(&mut self, dt: f64) {
            self.log(format!("update {}", dt));
            self.level = self.level.wrapping_add(1);
        }
        fn pixel(&self, _x: usize, _y: usize) -> Intensity {
            self.level
        }
    }

    pub fn scripted() -> (ScriptedEngine, Rc<RefCell<Vec<String>>>) {
        let engine = ScriptedEngine::default();
        let calls = Rc::clone(&engine.calls);
        (engine, calls)
    }

    #[test]
    fn test_create_inits_engine() -> Result<(), SessionError> {
        let (engine, calls) = scripted();
        let _s = DeviceSession::create(engine, VirtualFs::mount("roms"))?;
        assert_eq!(*calls.borrow(), ["init", "create"]);
        Ok(())
    }

    #[test]
    fn test_only_one_session() {
        let (a, _) = scripted();
        let (b, calls_b) = scripted();
        let _first = DeviceSession::create(a, VirtualFs::mount("roms")).unwrap();
        let second = DeviceSession::create(b, VirtualFs::mount("roms"));
        assert!(matches!(second, Err(SessionError::AlreadyCreated)));
        // the refused engine was never touched
        assert!(calls_b.borrow().is_empty());
    }

    #[test]
    fn test_drop_releases_engine() {
        let (engine, calls) = scripted();
        let s = DeviceSession::create(engine, VirtualFs::mount("roms")).unwrap();
        drop(s);
        assert_eq!(calls.borrow().last().map(String::as_str), Some("uninit"));
        // and a new session may be created afterwards
        let (again, _) = scripted();
        assert!(DeviceSession::create(again, VirtualFs::mount("roms")).is_ok());
    }

    #[test]
    fn test_failed_create_releases_engine() {
        let (mut engine, calls) = scripted();
        engine.fail_create = true;
        let s = DeviceSession::create(engine, VirtualFs::mount("roms"));
        assert!(matches!(s, Err(SessionError::Engine(_))));
        assert_eq!(*calls.borrow(), ["init", "create", "uninit"]);
        let (again, _) = scripted();
        assert!(DeviceSession::create(again, VirtualFs::mount("roms")).is_ok());
    }

    #[test]
    fn test_load_missing_path_fails() {
        let (engine, _) = scripted();
        let mut s = DeviceSession::create(engine, VirtualFs::mount("roms")).unwrap();
        let err = s.load_image("roms/none.vmi").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Load {
                status: LoadImageStatus::OpenFailed,
                ..
            }
        ));
        assert_eq!(s.loaded_image(), None);
    }

    #[test]
    fn test_startup_load_skips_format() -> Result<(), SessionError> {
        let (engine, calls) = scripted();
        let mut s = DeviceSession::create(engine, VirtualFs::mount("roms"))?;
        s.fs_mut().create_data_file("roms/a.bin", &[1], true).unwrap();
        s.startup_load("roms/a.bin")?;
        assert_eq!(*calls.borrow(), ["init", "create", "load roms/a.bin", "reset"]);
        assert_eq!(s.loaded_image(), Some("roms/a.bin"));
        Ok(())
    }

    #[test]
    fn test_hot_swap_sequence() -> Result<(), SessionError> {
        let (engine, calls) = scripted();
        let mut s = DeviceSession::create(engine, VirtualFs::mount("roms"))?;
        s.fs_mut().create_data_file("game.vmi", &[1], true).unwrap();
        s.hot_swap("game.vmi")?;
        assert_eq!(
            calls.borrow()[2..],
            ["format", "root", "load game.vmi", "reset"]
        );
        Ok(())
    }

    #[test]
    fn test_read_frame_reads_every_pixel() {
        let (mut engine, _) = scripted();
        engine.level = 7;
        let s = DeviceSession::create(engine, VirtualFs::mount("roms")).unwrap();
        let frame = s.read_frame();
        assert!(frame.iter().all(|(_, _, v)| v == 7));
    }

    #[test]
    #[should_panic]
    fn test_read_pixel_out_of_bounds() {
        let (engine, _) = scripted();
        let s = DeviceSession::create(engine, VirtualFs::mount("roms")).unwrap();
        s.read_pixel(DISPLAY_WIDTH, 0);
    }
}
