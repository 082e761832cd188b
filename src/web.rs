//! The browser host: a canvas app that fetches its ROM over HTTP, plus
//! drag-and-drop hot swapping onto a drop target.
//!
//! All state lives behind one `Rc<RefCell<..>>` shared by the frame
//! callback and the async load pipelines. Borrows are only taken inside a
//! single synchronous step, never across an `.await`.

use crate::display::{RasterDisplay, Rgba, Surface};
use crate::error::{LoaderError, SessionError, TransportError, VfsError};
use crate::loader::{url_for, LoadMode, Loader, RomSource, StagingTarget};
use crate::logger::{self, LogTarget};
use crate::rom::RomRequest;
use crate::scheduler::{Clock, FrameTiming, Scheduler, BROWSER_FPS};
use crate::session::DeviceSession;
use crate::vfs::VirtualFs;
use crate::viewer::FlashViewer;
use js_sys::{Function, Reflect, Uint8Array};
use log::LevelFilter;
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    CanvasRenderingContext2d, DataTransfer, DragEvent, Event, File, HtmlCanvasElement,
    Performance, Response, Window,
};

/// where ROMs are served from when the page does not say
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080";
/// virtual directory fetched ROMs are staged into
pub const MOUNT: &str = "roms";

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn js_error(url: &str, value: JsValue) -> TransportError {
    TransportError::Js {
        url: url.to_string(),
        message: describe(&value),
    }
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}

/// `performance.now()` as a clock
pub struct PerformanceClock {
    performance: Performance,
}

impl PerformanceClock {
    pub fn new(window: &Window) -> Result<Self, JsValue> {
        let performance = window
            .performance()
            .ok_or_else(|| JsValue::from_str("no performance timer"))?;
        Ok(PerformanceClock { performance })
    }
}

impl Clock for PerformanceClock {
    fn now(&self) -> Duration {
        Duration::from_secs_f64(self.performance.now().max(0.0) / 1000.0)
    }
}

/// GETs ROM components from an HTTP origin; the body is taken as an
/// `ArrayBuffer` so nothing is decoded as text
pub struct HttpSource {
    origin: String,
}

impl HttpSource {
    pub fn new(origin: &str) -> Self {
        HttpSource {
            origin: origin.to_string(),
        }
    }
}

impl RomSource for HttpSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, TransportError> {
        let url = url_for(&self.origin, path);
        log::debug!("fetching {}", url);
        let window = window().map_err(|e| js_error(&url, e))?;
        let response: Response = JsFuture::from(window.fetch_with_str(&url))
            .await
            .map_err(|e| js_error(&url, e))?
            .dyn_into()
            .map_err(|e| js_error(&url, e))?;
        if !response.ok() {
            return Err(TransportError::Http {
                url,
                status: response.status(),
            });
        }
        let body = response.array_buffer().map_err(|e| js_error(&url, e))?;
        let body = JsFuture::from(body).await.map_err(|e| js_error(&url, e))?;
        Ok(Uint8Array::new(&body).to_vec())
    }
}

/// 2D canvas context as a raster surface, one canvas pixel per LCD pixel
pub struct CanvasSurface {
    context: CanvasRenderingContext2d,
    width: f64,
    height: f64,
}

impl CanvasSurface {
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(CanvasSurface {
            context,
            width: f64::from(canvas.width()),
            height: f64::from(canvas.height()),
        })
    }
}

impl Surface for CanvasSurface {
    fn clear(&mut self) -> Result<(), io::Error> {
        self.context.clear_rect(0.0, 0.0, self.width, self.height);
        Ok(())
    }

    fn fill_cell(&mut self, x: usize, y: usize, colour: Rgba) -> Result<(), io::Error> {
        self.context.set_fill_style_str(&colour.to_string());
        self.context.fill_rect(x as f64, y as f64, 1.0, 1.0);
        Ok(())
    }
}

struct App {
    session: DeviceSession<FlashViewer>,
    scheduler: Scheduler<PerformanceClock>,
    display: RasterDisplay<CanvasSurface>,
}

/// shared handle the load pipelines stage through
#[derive(Clone)]
struct SharedApp(Rc<RefCell<App>>);

impl StagingTarget for SharedApp {
    fn write_file(&mut self, path: &str, bytes: &[u8], overwrite: bool) -> Result<(), VfsError> {
        self.0.borrow_mut().session.write_file(path, bytes, overwrite)
    }

    fn load(&mut self, path: &str, mode: LoadMode) -> Result<(), SessionError> {
        self.0.borrow_mut().session.load(path, mode)
    }
}

/// next animation frame if the browser has one, else a plain timeout of
/// one frame interval
fn schedule_frame(window: &Window, callback: &Function) -> Result<(), JsValue> {
    if Reflect::has(window, &JsValue::from_str("requestAnimationFrame"))? {
        window.request_animation_frame(callback)?;
    } else {
        let interval = FrameTiming::new(BROWSER_FPS).interval.as_millis() as i32;
        window.set_timeout_with_callback_and_timeout_and_arguments_0(callback, interval)?;
    }
    Ok(())
}

/// tick on every frame callback, forever
fn run_frames(app: Rc<RefCell<App>>, window: Window) -> Result<(), JsValue> {
    let frame: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = frame.clone();
    let frame_window = window.clone();
    *frame.borrow_mut() = Some(Closure::new(move || {
        {
            let mut app = app.borrow_mut();
            let App {
                session,
                scheduler,
                display,
            } = &mut *app;
            if let Err(e) = scheduler.tick(session, display) {
                log::error!("frame not drawn: {}", e);
            }
        }
        if let Some(callback) = next.borrow().as_ref() {
            if let Err(e) = schedule_frame(&frame_window, callback.as_ref().unchecked_ref()) {
                log::error!("frame loop stopped: {}", describe(&e));
            }
        }
    }));
    if let Some(callback) = frame.borrow().as_ref() {
        schedule_frame(&window, callback.as_ref().unchecked_ref())?;
    }
    Ok(())
}

/// files in a drop, from the item list when the browser has one, else
/// from the plain file list
fn dropped_files(transfer: &DataTransfer) -> Vec<File> {
    let has_items = Reflect::has(transfer, &JsValue::from_str("items")).unwrap_or(false);
    if has_items {
        let items = transfer.items();
        return (0..items.length())
            .filter_map(|i| items.get(i))
            .filter(|item| item.kind() == "file")
            .filter_map(|item| item.get_as_file().ok().flatten())
            .collect();
    }
    match transfer.files() {
        Some(files) => (0..files.length()).filter_map(|i| files.get(i)).collect(),
        None => Vec::new(),
    }
}

async fn read_dropped(file: &File) -> Result<Vec<u8>, TransportError> {
    let name = file.name();
    let body = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| js_error(&name, e))?;
    Ok(Uint8Array::new(&body).to_vec())
}

async fn ingest(mut target: SharedApp, file: File) -> Result<(), LoaderError> {
    let bytes = read_dropped(&file).await?;
    Loader::new(true).ingest_dropped(&mut target, &file.name(), &bytes)
}

/// The canvas app. Construct it from JS with the id of a `<canvas>`; the
/// frame loop starts immediately and shows the test card until a ROM is
/// loaded.
#[wasm_bindgen]
pub struct WebApp {
    app: SharedApp,
    origin: String,
}

#[wasm_bindgen]
impl WebApp {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, origin: Option<String>) -> Result<WebApp, JsValue> {
        if let Err(e) = logger::init(LevelFilter::Info, LogTarget::Console) {
            web_sys::console::warn_1(&JsValue::from_str(&e.to_string()));
        }
        let window = window()?;
        let canvas = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element #{}", canvas_id)))?
            .dyn_into::<HtmlCanvasElement>()?;

        let session = DeviceSession::create(FlashViewer::new(), VirtualFs::mount(MOUNT))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let mut scheduler = Scheduler::new(PerformanceClock::new(&window)?, BROWSER_FPS);
        scheduler.start();
        let display = RasterDisplay::new(CanvasSurface::new(&canvas)?);

        let app = Rc::new(RefCell::new(App {
            session,
            scheduler,
            display,
        }));
        run_frames(app.clone(), window)?;
        log::info!("canvas host running on #{}", canvas_id);
        Ok(WebApp {
            app: SharedApp(app),
            origin: origin.unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
        })
    }

    /// Fetch and load a ROM: a `.vmi`/`.vms` pair, a lone `.vmi`, or a
    /// single-file image. Whichever load lands first starts the device;
    /// later ones hot swap.
    pub fn load(&self, paths: Vec<String>) -> Result<(), JsValue> {
        let request = RomRequest::from_paths(&paths)
            .ok_or_else(|| JsValue::from_str("expected one or two ROM paths"))?;
        let source = HttpSource::new(&self.origin);
        let mut target = self.app.clone();
        spawn_local(async move {
            let loader = Loader::new(true);
            match loader.load_rom(&source, &mut target, &request, LoadMode::Auto).await {
                Ok(staged) => log::info!("{} loaded from {} files", request.load_path(), staged.len()),
                Err(e) => log::error!("{} was not loaded: {}", request.load_path(), e),
            }
        });
        Ok(())
    }

    /// restart execution of whatever is loaded
    pub fn reset(&self) {
        self.app.0.borrow_mut().session.reset_execution();
    }

    /// path of the image in flash, if any
    pub fn loaded(&self) -> Option<String> {
        self.app.0.borrow().session.loaded_image().map(str::to_string)
    }

    /// Make the element `target_id` accept dropped ROM files. Each file is
    /// written under its own name and hot swapped in.
    pub fn enable_drop(&self, target_id: &str) -> Result<(), JsValue> {
        let target = window()?
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?
            .get_element_by_id(target_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element #{}", target_id)))?;

        let on_drag_over = Closure::<dyn FnMut(Event)>::new(|event: Event| {
            event.prevent_default();
        });
        target.add_event_listener_with_callback(
            "dragover",
            on_drag_over.as_ref().unchecked_ref(),
        )?;
        on_drag_over.forget();

        let app = self.app.clone();
        let on_drop = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            event.prevent_default();
            let transfer = match event.dyn_ref::<DragEvent>().and_then(|e| e.data_transfer()) {
                Some(transfer) => transfer,
                None => return,
            };
            for file in dropped_files(&transfer) {
                let name = file.name();
                let app = app.clone();
                spawn_local(async move {
                    if let Err(e) = ingest(app, file).await {
                        log::error!("{} was not loaded: {}", name, e);
                    }
                });
            }
        });
        target.add_event_listener_with_callback("drop", on_drop.as_ref().unchecked_ref())?;
        on_drop.forget();
        Ok(())
    }
}
