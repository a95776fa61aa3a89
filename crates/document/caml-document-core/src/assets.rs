//! Flat asset folder held fully in memory.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{CamlError, Result};

/// Asset file name to raw bytes. Names are kept sorted so saves are
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetBundle {
    files: BTreeMap<String, Vec<u8>>,
}

impl AssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every regular file in `<bundle_dir>/<folder>`.
    ///
    /// A missing folder yields an empty bundle. A folder that cannot be listed,
    /// and files that cannot be read, are reported and skipped.
    pub fn load(bundle_dir: &Path, folder: &str, diagnostics: &mut Diagnostics) -> Self {
        let dir = bundle_dir.join(folder);
        let mut files = BTreeMap::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "no asset folder");
                return Self { files };
            }
            Err(e) => {
                diagnostics.push(
                    DiagnosticKind::AssetUnreadable,
                    format!("Failed to list asset folder {}: {e}", dir.display()),
                );
                return Self { files };
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    diagnostics.push(
                        DiagnosticKind::AssetUnreadable,
                        format!("Failed to list asset in {}: {e}", dir.display()),
                    );
                    continue;
                }
            };
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            // follows symlinks; dangling ones are reported
            match fs::metadata(&path) {
                Ok(meta) if !meta.is_file() => continue,
                Ok(_) => {}
                Err(e) => {
                    diagnostics.push(
                        DiagnosticKind::AssetUnreadable,
                        format!("Failed to load asset {name}: {e}"),
                    );
                    continue;
                }
            }
            match fs::read(&path) {
                Ok(bytes) => {
                    files.insert(name, bytes);
                }
                Err(e) => diagnostics.push(
                    DiagnosticKind::AssetUnreadable,
                    format!("Failed to load asset {name}: {e}"),
                ),
            }
        }
        debug!(count = files.len(), "loaded assets");
        Self { files }
    }

    /// Write every asset into `<output_dir>/<folder>`, creating it if needed.
    ///
    /// Failing to create the folder is fatal; a single file that cannot be
    /// written is reported and skipped.
    pub fn save(&self, output_dir: &Path, folder: &str, diagnostics: &mut Diagnostics) -> Result<()> {
        let dir = output_dir.join(folder);
        fs::create_dir_all(&dir).map_err(|e| CamlError::io(&dir, e))?;
        for (name, bytes) in &self.files {
            if let Err(e) = fs::write(dir.join(name), bytes) {
                diagnostics.push(
                    DiagnosticKind::AssetUnwritable,
                    format!("Failed to write asset {name}: {e}"),
                );
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Option<Vec<u8>> {
        self.files.insert(name.into(), bytes)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut diags = Diagnostics::new();
        let assets = AssetBundle::load(dir.path(), "assets", &mut diags);
        assert!(assets.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn loads_files_and_skips_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let assets_dir = dir.path().join("assets");
        fs::create_dir_all(assets_dir.join("nested")).unwrap();
        fs::write(assets_dir.join("b.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(assets_dir.join("a.bin"), [0u8, 1, 2]).unwrap();

        let mut diags = Diagnostics::new();
        let assets = AssetBundle::load(dir.path(), "assets", &mut diags);
        assert_eq!(assets.names().collect::<Vec<_>>(), ["a.bin", "b.png"]);
        assert_eq!(assets.get("a.bin"), Some(&[0u8, 1, 2][..]));
        assert!(diags.is_empty());
    }

    #[test]
    fn unlistable_folder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("assets"), b"not a folder").unwrap();

        let mut diags = Diagnostics::new();
        let assets = AssetBundle::load(dir.path(), "assets", &mut diags);
        assert!(assets.is_empty());
        assert_eq!(diags.count(DiagnosticKind::AssetUnreadable), 1);
        let message = &diags.iter().next().unwrap().message;
        assert!(message.contains("assets"), "{message}");
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let assets_dir = dir.path().join("assets");
        fs::create_dir_all(&assets_dir).unwrap();
        fs::write(assets_dir.join("good.png"), [1u8, 2]).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.png"), assets_dir.join("broken.png"))
            .unwrap();

        let mut diags = Diagnostics::new();
        let assets = AssetBundle::load(dir.path(), "assets", &mut diags);
        assert_eq!(assets.names().collect::<Vec<_>>(), ["good.png"]);
        assert_eq!(diags.count(DiagnosticKind::AssetUnreadable), 1);
    }

    #[test]
    fn unwritable_asset_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut assets = AssetBundle::new();
        assets.insert("ok.png", vec![1, 2, 3]);
        assets.insert("blocked.png", vec![4]);
        // A directory in the way makes the write fail.
        fs::create_dir_all(dir.path().join("assets/blocked.png")).unwrap();

        let mut diags = Diagnostics::new();
        assets.save(dir.path(), "assets", &mut diags).unwrap();
        assert_eq!(diags.count(DiagnosticKind::AssetUnwritable), 1);
        assert_eq!(fs::read(dir.path().join("assets/ok.png")).unwrap(), [1, 2, 3]);
    }
}
