use crate::error::LoggerError;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use yansi::Paint;

/// where log lines end up
pub enum LogTarget {
    Stderr,
    /// appended to; keeps lines out of the way of the terminal display
    File(PathBuf),
    /// the browser's devtools console
    #[cfg(target_arch = "wasm32")]
    Console,
}

enum Sink {
    Stderr,
    File(Mutex<File>),
    #[cfg(target_arch = "wasm32")]
    Console,
}

/// log implementation shared by both hosts; colours the level header
/// unless writing to a file
pub struct HostLogger {
    level: LevelFilter,
    sink: Sink,
}

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match &self.sink {
            Sink::Stderr => {
                let msg = format_line(record.level(), record.target(), record.args(), true);
                eprintln!("{}", msg);
            }
            Sink::File(file) => {
                let msg = format_line(record.level(), record.target(), record.args(), false);
                if let Ok(mut f) = file.lock() {
                    let _ = writeln!(f, "{}", msg);
                }
            }
            #[cfg(target_arch = "wasm32")]
            Sink::Console => {
                let msg = format_line(record.level(), record.target(), record.args(), false);
                let msg = wasm_bindgen::JsValue::from_str(&msg);
                match record.level() {
                    Level::Error => web_sys::console::error_1(&msg),
                    Level::Warn => web_sys::console::warn_1(&msg),
                    _ => web_sys::console::log_1(&msg),
                }
            }
        }
    }

    fn flush(&self) {
        if let Sink::File(file) = &self.sink {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

/// `LEVEL target > message`
pub fn format_line(level: Level, target: &str, args: &fmt::Arguments, colour: bool) -> String {
    if !colour {
        return format!("{} {} > {}", level, target, args);
    }
    let header = match level {
        Level::Error => Paint::red("ERROR").bold(),
        Level::Warn => Paint::yellow("WARN").bold(),
        Level::Info => Paint::green("INFO").bold(),
        Level::Debug => Paint::blue("DEBUG").bold(),
        Level::Trace => Paint::magenta("TRACE").bold(),
    };
    format!("{} {} > {}", header, Paint::new(target), args)
}

/// install the logger for the whole process
pub fn init(level: LevelFilter, target: LogTarget) -> Result<(), LoggerError> {
    let sink = match target {
        LogTarget::Stderr => Sink::Stderr,
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| LoggerError::File {
                    path: path.display().to_string(),
                    source,
                })?;
            Sink::File(Mutex::new(file))
        }
        #[cfg(target_arch = "wasm32")]
        LogTarget::Console => Sink::Console,
    };
    log::set_boxed_logger(Box::new(HostLogger { level, sink }))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line() {
        let line = format_line(
            Level::Warn,
            "vmu_host::loader",
            &format_args!("{} missing", "a.vms"),
            false,
        );
        assert_eq!(line, "WARN vmu_host::loader > a.vms missing");
    }

    #[test]
    fn test_coloured_line_keeps_message() {
        let line = format_line(Level::Error, "t", &format_args!("boom"), true);
        assert!(line.contains("ERROR"));
        assert!(line.ends_with("boom"));
    }

    #[test]
    fn test_level_filter() {
        let logger = HostLogger {
            level: LevelFilter::Info,
            sink: Sink::Stderr,
        };
        let debug = Metadata::builder().level(Level::Debug).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&warn));
    }
}
