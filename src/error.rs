use std::io;
use thiserror::Error;

/// a ROM component could not be fetched or read
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u16 },
    #[error("host rejected request for {url}: {message}")]
    Js { url: String, message: String },
}

/// errors from the virtual filesystem namespace
#[derive(Debug, Error)]
pub enum VfsError {
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("{0} not found")]
    NotFound(String),
}

/// status codes reported by the device engine when it loads an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadImageStatus {
    #[error("image could not be opened")]
    OpenFailed,
    #[error("image could not be read")]
    ReadFailed,
    #[error("not enough free flash blocks")]
    InadequateFreeBlocks,
    #[error("flash directory is full")]
    FilesMaxed,
    #[error("VMS data has no VMI info component")]
    VmsNoVmi,
    #[error("VMI info has no VMS data component")]
    VmiNoVms,
    #[error("a game is already present in flash")]
    GameDuplicate,
    #[error("unknown image format")]
    UnknownFormat,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a device session already exists on this thread")]
    AlreadyCreated,
    #[error("loading {path} failed: {status}")]
    Load {
        path: String,
        status: LoadImageStatus,
    },
    #[error("device engine: {0}")]
    Engine(String),
}

/// anything that stops a ROM from reaching the device
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Vfs(#[from] VfsError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("a logger is already installed")]
    AlreadyInstalled(#[from] log::SetLoggerError),
    #[error("unable to open log file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: io::Error,
    },
}
