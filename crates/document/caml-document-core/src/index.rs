//! Bundle index (`index.xml`): a property-list dictionary that names the root
//! document. Keys other than `rootDocument` are carried through untouched.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use plist::{Dictionary, Value};
use tracing::debug;

use crate::error::{CamlError, Result};

pub const ROOT_DOCUMENT_KEY: &str = "rootDocument";

#[derive(Clone, Debug, PartialEq)]
pub struct IndexDocument {
    entries: Dictionary,
}

impl IndexDocument {
    /// Build an index that only names `root_document`.
    pub fn new(root_document: impl Into<String>) -> Self {
        let mut entries = Dictionary::new();
        entries.insert(
            ROOT_DOCUMENT_KEY.to_string(),
            Value::String(root_document.into()),
        );
        Self { entries }
    }

    /// Read and validate the index at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CamlError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path).map_err(|e| CamlError::io(path, e))?;
        let value = Value::from_reader(Cursor::new(bytes)).map_err(|source| CamlError::Plist {
            path: path.to_path_buf(),
            source,
        })?;
        let entries = value
            .into_dictionary()
            .ok_or_else(|| malformed(path, "top-level value is not a dictionary"))?;

        match entries.get(ROOT_DOCUMENT_KEY) {
            Some(Value::String(name)) if !name.is_empty() => {
                debug!(root_document = %name, keys = entries.len(), "loaded index");
            }
            Some(_) => return Err(malformed(path, "'rootDocument' is not a non-empty string")),
            None => return Err(malformed(path, "missing 'rootDocument' key")),
        }
        Ok(Self { entries })
    }

    /// Name of the root CAML document, relative to the bundle directory.
    pub fn root_document(&self) -> &str {
        self.entries
            .get(ROOT_DOCUMENT_KEY)
            .and_then(Value::as_string)
            .unwrap_or_default()
    }

    pub fn set_root_document(&mut self, name: impl Into<String>) {
        self.entries
            .insert(ROOT_DOCUMENT_KEY.to_string(), Value::String(name.into()));
    }

    /// Every entry, including keys this crate does not interpret.
    pub fn entries(&self) -> &Dictionary {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Dictionary {
        &mut self.entries
    }

    /// Point the index at `root_document` and write the whole dictionary as
    /// an XML property list.
    pub fn save(&mut self, path: &Path, root_document: &str) -> Result<()> {
        self.set_root_document(root_document);
        Value::Dictionary(self.entries.clone())
            .to_file_xml(path)
            .map_err(|source| match source.into_io() {
                Ok(io) => CamlError::io(path, io),
                Err(source) => CamlError::Plist {
                    path: path.to_path_buf(),
                    source,
                },
            })?;
        debug!(path = %path.display(), root_document, "wrote index");
        Ok(())
    }
}

fn malformed(path: &Path, reason: &str) -> CamlError {
    CamlError::MalformedIndex {
        path: PathBuf::from(path),
        reason: reason.to_string(),
    }
}
