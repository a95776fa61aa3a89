use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use tempfile::TempDir;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    bundles: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to).with_context(|| format!("failed to create {}", to.display()))?;
    for entry in fs::read_dir(from).with_context(|| format!("failed to list {}", from.display()))? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }
    Ok(())
}

/// A fixture bundle copied into a temporary directory. The copy is removed
/// when this value is dropped.
pub struct StagedBundle {
    _dir: TempDir,
    path: PathBuf,
}

impl StagedBundle {
    /// Path of the bundle directory (pass this to `Document::open`).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scratch directory next to the bundle, e.g. for save output.
    pub fn scratch(&self) -> PathBuf {
        self.path.with_file_name("out")
    }

    pub fn read_to_string(&self, rel: &str) -> Result<String> {
        let path = self.path.join(rel);
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
    }
}

pub mod bundles {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.bundles.keys().cloned().collect()
    }

    /// Checked-in location of a bundle. Treat as read-only.
    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.bundles, "bundle", name)?;
        Ok(resolve_path(rel))
    }

    /// Copy a bundle into a fresh temporary directory, so loading (which may
    /// write a repaired file back) never touches the checked-in fixture.
    pub fn stage(name: &str) -> Result<StagedBundle> {
        let source = path(name)?;
        let dir = tempfile::tempdir().context("failed to create temp dir")?;
        let path = dir.path().join(format!("{name}.ca"));
        copy_dir(&source, &path)?;
        Ok(StagedBundle { _dir: dir, path })
    }
}
