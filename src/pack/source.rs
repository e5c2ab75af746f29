//! Texture pack resource access from ZIP files and directories.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{MapTexError, Result};

enum SourceKind {
    Zip(zip::ZipArchive<BufReader<File>>),
    Dir(PathBuf),
}

/// A texture pack opened from either a ZIP archive or a directory tree,
/// addressed by relative resource names in both cases.
pub struct PackSource {
    kind: SourceKind,
    path: PathBuf,
}

impl PackSource {
    /// Open a texture pack at `path`. A readable file is treated as a ZIP
    /// archive, a directory is walked directly.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PackSource> {
        let path = path.as_ref();
        let kind = if path.is_file() {
            let file = File::open(path)?;
            SourceKind::Zip(zip::ZipArchive::new(BufReader::new(file))?)
        } else if path.is_dir() {
            SourceKind::Dir(path.to_path_buf())
        } else {
            return Err(MapTexError::InvalidTexturePack(format!(
                "{} is neither a file nor a directory",
                path.display()
            )));
        };
        Ok(PackSource {
            kind,
            path: path.to_path_buf(),
        })
    }

    /// Read the resource named `rname`, or `None` if the pack has no such
    /// entry. Missing entries are not errors; callers substitute a blank
    /// tile and log.
    pub fn read(&mut self, rname: &str) -> Option<Vec<u8>> {
        match &mut self.kind {
            SourceKind::Zip(archive) => {
                let mut entry = archive.by_name(rname).ok()?;
                if entry.is_dir() {
                    return None;
                }
                let mut data = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut data).ok()?;
                Some(data)
            }
            SourceKind::Dir(dir) => {
                let file = dir.join(rname);
                if file.is_file() {
                    std::fs::read(&file).ok()
                } else {
                    None
                }
            }
        }
    }

    /// Read `rname`, falling back to `altname` when the primary is missing.
    pub fn read_with_alt(&mut self, rname: &str, altname: Option<&str>) -> Option<Vec<u8>> {
        if let Some(data) = self.read(rname) {
            return Some(data);
        }
        if let Some(alt) = altname {
            if let Some(data) = self.read(alt) {
                info!(
                    "{}: using alternate resource {} for {}",
                    self.path.display(),
                    alt,
                    rname
                );
                return Some(data);
            }
        }
        None
    }

    /// All entry names in the pack, with `/` separators.
    pub fn entries(&mut self) -> Vec<String> {
        match &mut self.kind {
            SourceKind::Zip(archive) => {
                let mut out = Vec::new();
                for i in 0..archive.len() {
                    if let Ok(e) = archive.by_index(i) {
                        if !e.is_dir() {
                            out.push(e.name().to_string());
                        }
                    }
                }
                out
            }
            SourceKind::Dir(dir) => {
                let mut out = Vec::new();
                collect_files(dir, "", &mut out);
                out
            }
        }
    }
}

fn collect_files(dir: &Path, prefix: &str, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        let rel = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, &rel, out);
        } else {
            out.push(rel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_dir_pack() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("textures/blocks")).unwrap();
        std::fs::write(dir.path().join("textures/blocks/stone.png"), b"fakepng").unwrap();
        dir
    }

    #[test]
    fn test_directory_pack() {
        let dir = make_dir_pack();
        let mut src = PackSource::open(dir.path()).unwrap();
        assert_eq!(
            src.read("textures/blocks/stone.png").as_deref(),
            Some(b"fakepng".as_ref())
        );
        assert!(src.read("textures/blocks/missing.png").is_none());
        let entries = src.entries();
        assert!(entries.contains(&"textures/blocks/stone.png".to_string()));
    }

    #[test]
    fn test_zip_pack() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("pack.zip");
        let file = File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let opts = zip::write::SimpleFileOptions::default();
        writer.start_file("terrain.png", opts).unwrap();
        writer.write_all(b"zipdata").unwrap();
        writer.finish().unwrap();

        let mut src = PackSource::open(&zip_path).unwrap();
        assert_eq!(src.read("terrain.png").as_deref(), Some(b"zipdata".as_ref()));
        assert!(src.read("nope.png").is_none());
        assert_eq!(src.entries(), vec!["terrain.png".to_string()]);
    }

    #[test]
    fn test_alt_name_fallback() {
        let dir = make_dir_pack();
        let mut src = PackSource::open(dir.path()).unwrap();
        let data = src.read_with_alt("missing.png", Some("textures/blocks/stone.png"));
        assert_eq!(data.as_deref(), Some(b"fakepng".as_ref()));
    }

    #[test]
    fn test_missing_pack_path() {
        assert!(PackSource::open("/no/such/path").is_err());
    }
}
