//! Bundle orchestration: open, edit in place, save.
//!
//! Opening runs index → assets → root document parse (with repair fallback)
//! → layer tree, in that order. Any failure before the tree exists aborts the
//! open, except for individual assets.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::assets::AssetBundle;
use crate::config::Config;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{CamlError, Result};
use crate::index::IndexDocument;
use crate::layer::LayerNode;
use crate::repair::{repair_and_parse, RepairKind};
use crate::xml::{parse_document, write_document, XmlElement};

pub const CAML_ROOT_ELEMENT: &str = "caml";

/// Stages of [`Document::open`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoadState {
    Uninitialized,
    IndexLoaded,
    AssetsLoaded,
    Parsed,
    Ready,
}

fn advance(state: &mut LoadState, next: LoadState) {
    debug!(from = ?*state, to = ?next, "load state");
    *state = next;
}

/// How the root document was parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    Direct,
    Repaired {
        passes: Vec<RepairKind>,
        /// Copy of the original file, when write-back succeeded.
        backup: Option<PathBuf>,
    },
}

/// Result of [`Document::save`].
#[derive(Clone, Debug)]
pub struct SaveReport {
    pub bundle_dir: PathBuf,
    pub root_document: String,
    pub diagnostics: Diagnostics,
}

#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    config: Config,
    index: IndexDocument,
    assets: AssetBundle,
    root: LayerNode,
    outcome: ParseOutcome,
    diagnostics: Diagnostics,
}

impl Document {
    /// Open the bundle directory at `path` with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, Config::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CamlError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_dir() {
            return Err(CamlError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let mut state = LoadState::Uninitialized;
        let mut diagnostics = Diagnostics::new();

        let index = IndexDocument::load(&path.join(&config.index_file))?;
        advance(&mut state, LoadState::IndexLoaded);

        let assets = AssetBundle::load(path, &config.assets_dir, &mut diagnostics);
        advance(&mut state, LoadState::AssetsLoaded);

        let caml_path = path.join(index.root_document());
        let (tree, outcome) = parse_root_document(&caml_path, &config, &mut diagnostics)?;
        advance(&mut state, LoadState::Parsed);

        let root = root_layer(&tree, &mut diagnostics)?;
        advance(&mut state, LoadState::Ready);

        info!(
            bundle = %path.display(),
            layers = root.walk().count(),
            assets = assets.len(),
            diagnostics = diagnostics.len(),
            "opened bundle"
        );
        Ok(Self {
            path: path.to_path_buf(),
            config,
            index,
            assets,
            root,
            outcome,
            diagnostics,
        })
    }

    /// Directory the bundle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &LayerNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut LayerNode {
        &mut self.root
    }

    pub fn index(&self) -> &IndexDocument {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut IndexDocument {
        &mut self.index
    }

    pub fn assets(&self) -> &AssetBundle {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetBundle {
        &mut self.assets
    }

    pub fn parse_outcome(&self) -> &ParseOutcome {
        &self.outcome
    }

    /// Everything recovered from while opening.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The current tree wrapped in a namespaced `<caml>` root.
    pub fn build_document_tree(&self) -> XmlElement {
        let mut caml =
            XmlElement::new(CAML_ROOT_ELEMENT).with_attr("xmlns", self.config.namespace.as_str());
        caml.push(self.root.to_element());
        caml
    }

    /// Root document text as it would be saved.
    pub fn to_caml_string(&self) -> String {
        write_document(&self.build_document_tree())
    }

    /// Write the bundle to `<output_dir>/<name>/`.
    ///
    /// The root document is named after the stem of `name`, and the index is
    /// re-pointed at it. Index and root document failures are fatal; asset
    /// failures are reported in the returned diagnostics.
    pub fn save(&mut self, name: &str, output_dir: impl AsRef<Path>) -> Result<SaveReport> {
        let bundle_dir = output_dir.as_ref().join(name);
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                CamlError::io(
                    &bundle_dir,
                    io::Error::new(io::ErrorKind::InvalidInput, "bundle name has no file stem"),
                )
            })?;
        fs::create_dir_all(&bundle_dir).map_err(|e| CamlError::io(&bundle_dir, e))?;

        let root_document = format!("{stem}.{}", self.config.document_extension);
        let mut diagnostics = Diagnostics::new();

        self.index
            .save(&bundle_dir.join(&self.config.index_file), &root_document)?;
        self.assets
            .save(&bundle_dir, &self.config.assets_dir, &mut diagnostics)?;

        let caml_path = bundle_dir.join(&root_document);
        fs::write(&caml_path, self.to_caml_string()).map_err(|e| CamlError::io(&caml_path, e))?;
        info!(path = %caml_path.display(), "wrote CAML file");

        Ok(SaveReport {
            bundle_dir,
            root_document,
            diagnostics,
        })
    }
}

fn parse_root_document(
    caml_path: &Path,
    config: &Config,
    diagnostics: &mut Diagnostics,
) -> Result<(XmlElement, ParseOutcome)> {
    if !caml_path.is_file() {
        return Err(CamlError::NotFound {
            path: caml_path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(caml_path).map_err(|e| CamlError::io(caml_path, e))?;
    if !text.trim_start().starts_with('<') {
        return Err(CamlError::ParseError {
            file: caml_path.to_path_buf(),
            original: "Invalid XML - doesn't start with an opening tag".into(),
            repair: None,
        });
    }

    let original = match parse_document(&text) {
        Ok(root) => return Ok((root, ParseOutcome::Direct)),
        Err(err) => err,
    };
    info!(file = %caml_path.display(), error = %original, "XML parsing error");
    if !config.repair.enabled {
        return Err(CamlError::ParseError {
            file: caml_path.to_path_buf(),
            original: original.to_string(),
            repair: None,
        });
    }

    let repaired = repair_and_parse(&text, &original, config.repair.max_passes).map_err(|e| {
        CamlError::ParseError {
            file: caml_path.to_path_buf(),
            original: original.to_string(),
            repair: Some(e.to_string()),
        }
    })?;
    diagnostics.push(
        DiagnosticKind::XmlRepaired,
        format!(
            "Repaired {} in {} pass(es)",
            caml_path.display(),
            repaired.passes.len()
        ),
    );

    let backup = if config.repair.write_back {
        write_back(caml_path, &repaired.text, &config.repair.backup_suffix, diagnostics)
    } else {
        None
    };
    Ok((
        repaired.root,
        ParseOutcome::Repaired {
            passes: repaired.passes,
            backup,
        },
    ))
}

/// Copy the original next to itself and overwrite it with the repaired text.
fn write_back(
    caml_path: &Path,
    repaired: &str,
    suffix: &str,
    diagnostics: &mut Diagnostics,
) -> Option<PathBuf> {
    let mut backup: OsString = caml_path.as_os_str().to_owned();
    backup.push(suffix);
    let backup = PathBuf::from(backup);

    let result = fs::copy(caml_path, &backup).and_then(|_| fs::write(caml_path, repaired));
    match result {
        Ok(()) => {
            info!(backup = %backup.display(), "saved repaired XML");
            Some(backup)
        }
        Err(e) => {
            diagnostics.push(
                DiagnosticKind::BackupFailed,
                format!("Could not backup or save repaired file: {e}"),
            );
            None
        }
    }
}

fn root_layer(tree: &XmlElement, diagnostics: &mut Diagnostics) -> Result<LayerNode> {
    if tree.name != CAML_ROOT_ELEMENT {
        diagnostics.push(
            DiagnosticKind::NonCamlRoot,
            format!("Root element is <{}>, not <caml>. Using it as root layer.", tree.name),
        );
        return LayerNode::parse(Some(tree), diagnostics);
    }
    match tree.elements().next() {
        Some(layer) => LayerNode::parse(Some(layer), diagnostics),
        None => {
            diagnostics.push(
                DiagnosticKind::DefaultRootLayer,
                "Creating a default root layer for empty CAML file.",
            );
            Ok(LayerNode::default())
        }
    }
}
