use crate::error::VfsError;
use std::collections::BTreeMap;

// NB. paths are plain strings; the device engine never sees the host filesystem

/// In-memory file namespace the device engine loads images from. It is
/// mounted once when the host comes up and lives as long as the session.
///
/// Entries are created with [`VirtualFs::create_data_file`], may be
/// overwritten, and are never removed.
#[derive(Debug, Default)]
pub struct VirtualFs {
    root: String,
    entries: BTreeMap<String, Box<[u8]>>,
}

impl VirtualFs {
    /// mount an empty namespace whose conventional ROM directory is `root`
    pub fn mount(root: &str) -> Self {
        let root = normalize(root);
        log::debug!("mounted virtual filesystem at /{}", root);
        VirtualFs {
            root,
            entries: BTreeMap::new(),
        }
    }

    /// the ROM directory this namespace was mounted at
    pub fn root(&self) -> &str {
        &self.root
    }

    /// write a chunk of bytes at `path`. Without `overwrite`, an existing
    /// entry is left alone and `AlreadyExists` is returned.
    pub fn create_data_file(
        &mut self,
        path: &str,
        data: &[u8],
        overwrite: bool,
    ) -> Result<(), VfsError> {
        let key = normalize(path);
        if !overwrite && self.entries.contains_key(&key) {
            return Err(VfsError::AlreadyExists(key));
        }
        log::trace!("vfs write /{} ({} bytes)", key, data.len());
        self.entries.insert(key, data.into());
        Ok(())
    }

    /// get a r/o view of an entry
    pub fn read(&self, path: &str) -> Result<&[u8], VfsError> {
        let key = normalize(path);
        match self.entries.get(&key) {
            Some(bytes) => Ok(bytes),
            None => Err(VfsError::NotFound(key)),
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.entries.contains_key(&normalize(path))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `./roms/a.vmi`, `/roms/a.vmi` and `roms/a.vmi` all name the same entry
pub fn normalize(path: &str) -> String {
    let mut p = path.trim();
    loop {
        if let Some(rest) = p.strip_prefix("./") {
            p = rest;
        } else if let Some(rest) = p.strip_prefix('/') {
            p = rest;
        } else {
            break;
        }
    }
    p.trim_end_matches('/').to_string()
}
