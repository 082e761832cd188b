//! Getting ROM bytes into the virtual filesystem and onto the device.
//!
//! Loads are an explicit sequential pipeline: each component is fetched
//! and written before the next fetch starts, and the device is only asked
//! to load once every write is done. Any failure ends the pipeline there;
//! nothing is retried.

use crate::engine::DeviceEngine;
use crate::error::{LoaderError, SessionError, TransportError, VfsError};
use crate::rom::{RomImage, RomRequest};
use crate::session::DeviceSession;
use std::path::PathBuf;

/// somewhere ROM component bytes come from. Bytes are returned exactly as
/// received; nothing is decoded.
#[allow(async_fn_in_trait)]
pub trait RomSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, TransportError>;
}

/// reads components from a host directory that mirrors the virtual mount
pub struct DirSource {
    dir: PathBuf,
    mount: String,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>, mount: &str) -> Self {
        DirSource {
            dir: dir.into(),
            mount: crate::vfs::normalize(mount),
        }
    }

    /// host path backing the virtual `path`
    pub fn host_path(&self, path: &str) -> PathBuf {
        let path = crate::vfs::normalize(path);
        let relative = path
            .strip_prefix(self.mount.as_str())
            .and_then(|p| p.strip_prefix('/'))
            .unwrap_or(&path);
        self.dir.join(relative)
    }
}

impl RomSource for DirSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, TransportError> {
        let host = self.host_path(path);
        log::debug!("reading {}", host.display());
        std::fs::read(&host).map_err(|source| TransportError::Io {
            path: host.display().to_string(),
            source,
        })
    }
}

/// absolute URL of a virtual `path` served from `origin`
pub fn url_for(origin: &str, path: &str) -> String {
    format!(
        "{}/{}",
        origin.trim_end_matches('/'),
        crate::vfs::normalize(path)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// device just came up, flash is blank
    Startup,
    /// something may already be running; reformat first
    HotSwap,
    /// startup if nothing is loaded yet, else hot swap; decided at load
    /// time, not when the request was made
    Auto,
}

/// what the loader writes into and loads from
pub trait StagingTarget {
    fn write_file(&mut self, path: &str, bytes: &[u8], overwrite: bool) -> Result<(), VfsError>;
    fn load(&mut self, path: &str, mode: LoadMode) -> Result<(), SessionError>;
}

impl<E: DeviceEngine> StagingTarget for DeviceSession<E> {
    fn write_file(&mut self, path: &str, bytes: &[u8], overwrite: bool) -> Result<(), VfsError> {
        self.fs_mut().create_data_file(path, bytes, overwrite)
    }

    fn load(&mut self, path: &str, mode: LoadMode) -> Result<(), SessionError> {
        match mode {
            LoadMode::Startup => self.startup_load(path),
            LoadMode::HotSwap => self.hot_swap(path),
            LoadMode::Auto if self.loaded_image().is_some() => self.hot_swap(path),
            LoadMode::Auto => self.startup_load(path),
        }
    }
}

pub struct Loader {
    overwrite: bool,
}

impl Loader {
    /// `overwrite` decides whether a write replaces an existing entry or
    /// keeps it
    pub fn new(overwrite: bool) -> Self {
        Loader { overwrite }
    }

    /// write, treating an existing entry as good enough
    pub fn write<T: StagingTarget + ?Sized>(
        &self,
        target: &mut T,
        path: &str,
        bytes: &[u8],
    ) -> Result<(), VfsError> {
        match target.write_file(path, bytes, self.overwrite) {
            Err(VfsError::AlreadyExists(existing)) => {
                log::debug!("{} already exists, keeping it", existing);
                Ok(())
            }
            other => other,
        }
    }

    /// fetch one component and write it at the same virtual path
    pub async fn stage<S, T>(
        &self,
        source: &S,
        target: &mut T,
        path: &str,
    ) -> Result<RomImage, LoaderError>
    where
        S: RomSource + ?Sized,
        T: StagingTarget + ?Sized,
    {
        let image = RomImage::new(path, source.fetch(path).await?);
        self.write(target, image.path(), image.bytes())?;
        log::info!("staged {} ({} bytes)", image.path(), image.bytes().len());
        Ok(image)
    }

    /// stage every component of `request` in order, then load it
    pub async fn load_rom<S, T>(
        &self,
        source: &S,
        target: &mut T,
        request: &RomRequest,
        mode: LoadMode,
    ) -> Result<Vec<RomImage>, LoaderError>
    where
        S: RomSource + ?Sized,
        T: StagingTarget + ?Sized,
    {
        let mut staged = Vec::new();
        for path in request.components() {
            staged.push(self.stage(source, target, path).await?);
        }
        target.load(request.load_path(), mode)?;
        Ok(staged)
    }

    /// a file dropped onto the host: write it under its own name and swap
    /// it in
    pub fn ingest_dropped<T: StagingTarget + ?Sized>(
        &self,
        target: &mut T,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), LoaderError> {
        log::info!("dropped {} ({} bytes)", name, bytes.len());
        self.write(target, name, bytes)?;
        target.load(name, LoadMode::HotSwap)?;
        Ok(())
    }
}
