//! ROM images and the requests that name them.
//!
//! A VMU game is usually captured as two files: a small `.vmi` info
//! component describing the save, and the `.vms` data component holding
//! the flash contents. Dreamcast dumps (`.dci`, `.dcm`) and raw flash
//! images (`.bin`, `.vmu`) are self-contained.

use std::path::Path;

/// which part of a ROM a file is, decided by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomFormat {
    /// `.vmi`
    Info,
    /// `.vms`
    Data,
    /// `.dci`, `.dcm`, or a raw flash image (`.bin`, `.vmu`)
    Single,
    Unknown,
}

impl RomFormat {
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("vmi") => RomFormat::Info,
            Some("vms") => RomFormat::Data,
            Some("dci") | Some("dcm") | Some("bin") | Some("vmu") => RomFormat::Single,
            _ => RomFormat::Unknown,
        }
    }
}

/// bytes staged at a virtual path; never modified once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomImage {
    path: String,
    bytes: Box<[u8]>,
}

impl RomImage {
    pub fn new(path: &str, bytes: Vec<u8>) -> Self {
        RomImage {
            path: path.to_string(),
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// what the loader should fetch, in the order it must be staged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RomRequest {
    /// info component first, then data; the engine is pointed at the info path
    Split { info: String, data: String },
    Single(String),
}

impl RomRequest {
    /// build a request from one or two paths. A lone `.vmi` brings its
    /// `.vms` sibling along; two paths must be the `.vmi` and `.vms` of
    /// the same game.
    pub fn from_paths(paths: &[String]) -> Option<Self> {
        match paths {
            [one] => Some(match RomFormat::from_path(one) {
                RomFormat::Info => RomRequest::Split {
                    info: one.clone(),
                    data: with_extension(one, "vms"),
                },
                RomFormat::Data => RomRequest::Split {
                    info: with_extension(one, "vmi"),
                    data: one.clone(),
                },
                _ => RomRequest::Single(one.clone()),
            }),
            [a, b] => {
                let (info, data) = match (RomFormat::from_path(a), RomFormat::from_path(b)) {
                    (RomFormat::Info, RomFormat::Data) => (a, b),
                    (RomFormat::Data, RomFormat::Info) => (b, a),
                    _ => return None,
                };
                // the engine finds the data component by name
                if Path::new(info).with_extension("") != Path::new(data).with_extension("") {
                    return None;
                }
                Some(RomRequest::Split {
                    info: info.clone(),
                    data: data.clone(),
                })
            }
            _ => None,
        }
    }

    /// paths in staging order
    pub fn components(&self) -> Vec<&str> {
        match self {
            RomRequest::Split { info, data } => vec![info.as_str(), data.as_str()],
            RomRequest::Single(path) => vec![path.as_str()],
        }
    }

    /// the path handed to the device engine once everything is staged
    pub fn load_path(&self) -> &str {
        match self {
            RomRequest::Split { info, .. } => info,
            RomRequest::Single(path) => path,
        }
    }

    /// the same request with every path placed under `dir`
    pub fn under(&self, dir: &str) -> Self {
        let join = |p: &str| {
            if dir.is_empty() {
                p.to_string()
            } else {
                format!("{}/{}", dir.trim_end_matches('/'), p)
            }
        };
        match self {
            RomRequest::Split { info, data } => RomRequest::Split {
                info: join(info),
                data: join(data),
            },
            RomRequest::Single(path) => RomRequest::Single(join(path)),
        }
    }
}

/// swap the extension of a virtual path
pub fn with_extension(path: &str, ext: &str) -> String {
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => format!("{}.{}", &path[..dot], ext),
        _ => format!("{}.{}", path, ext),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(RomFormat::from_path("roms/minigame.vmi"), RomFormat::Info);
        assert_eq!(RomFormat::from_path("roms/minigame.VMS"), RomFormat::Data);
        assert_eq!(RomFormat::from_path("save.dci"), RomFormat::Single);
        assert_eq!(RomFormat::from_path("flash.bin"), RomFormat::Single);
        assert_eq!(RomFormat::from_path("backup.VMU"), RomFormat::Single);
        assert_eq!(RomFormat::from_path("readme.txt"), RomFormat::Unknown);
        assert_eq!(RomFormat::from_path("noext"), RomFormat::Unknown);
    }

    #[test]
    fn test_image_keeps_bytes() {
        let img = RomImage::new("roms/minigame.vms", vec![0xff, 0x00, 0x80]);
        assert_eq!(img.bytes(), &[0xff, 0x00, 0x80]);
        assert_eq!(img.path(), "roms/minigame.vms");
    }

    #[test]
    fn test_lone_vmi_brings_vms() {
        let r = RomRequest::from_paths(&paths(&["minigame.vmi"])).unwrap();
        assert_eq!(
            r,
            RomRequest::Split {
                info: "minigame.vmi".into(),
                data: "minigame.vms".into()
            }
        );
        assert_eq!(r.components(), ["minigame.vmi", "minigame.vms"]);
        assert_eq!(r.load_path(), "minigame.vmi");
    }

    #[test]
    fn test_pair_is_ordered_info_first() {
        let r = RomRequest::from_paths(&paths(&["a.vms", "a.vmi"])).unwrap();
        assert_eq!(r.components(), ["a.vmi", "a.vms"]);
    }

    #[test]
    fn test_pair_must_match() {
        // the engine would look for a.vms and miss b.vms
        assert_eq!(RomRequest::from_paths(&paths(&["a.vmi", "b.vms"])), None);
        assert_eq!(RomRequest::from_paths(&paths(&["a.bin", "b.bin"])), None);
        assert_eq!(RomRequest::from_paths(&paths(&["a.vmi", "a.vmi"])), None);
        assert_eq!(RomRequest::from_paths(&paths(&["roms/a.vmi", "a.vms"])), None);
        assert!(RomRequest::from_paths(&paths(&["roms/a.vmi", "roms/a.vms"])).is_some());
    }

    #[test]
    fn test_single_file() {
        let r = RomRequest::from_paths(&paths(&["save.dci"])).unwrap();
        assert_eq!(r, RomRequest::Single("save.dci".into()));
        assert_eq!(r.load_path(), "save.dci");
    }

    #[test]
    fn test_no_paths() {
        assert_eq!(RomRequest::from_paths(&[]), None);
        assert_eq!(RomRequest::from_paths(&paths(&["a", "b", "c"])), None);
    }

    #[test]
    fn test_under_dir() {
        let r = RomRequest::Single("game.bin".into()).under("roms/");
        assert_eq!(r.load_path(), "roms/game.bin");
        let r = RomRequest::Single("game.bin".into()).under("");
        assert_eq!(r.load_path(), "game.bin");
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("roms/minigame.vmi", "vms"), "roms/minigame.vms");
        assert_eq!(with_extension("roms.d/minigame", "vms"), "roms.d/minigame.vms");
    }
}
