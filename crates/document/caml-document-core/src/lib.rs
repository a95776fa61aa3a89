//! caml-document-core
//!
//! In-memory model of Core Animation archive bundles: a directory holding a
//! property-list index (`index.xml`), one CAML document describing a tree of
//! layers, and a flat `assets/` folder.
//!
//! ```no_run
//! use caml_document_core::Document;
//!
//! let mut doc = Document::open("Wallpaper.ca")?;
//! if let Some(layer) = doc.root_mut().find_layer_mut("clock") {
//!     layer.hidden = true;
//! }
//! doc.save("Edited", "./dist")?;
//! # Ok::<(), caml_document_core::CamlError>(())
//! ```
//!
//! Root documents with unquoted attribute values are repaired on open; the
//! original is kept next to the file with a `.backup` suffix.

pub mod assets;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod elements;
pub mod error;
pub mod index;
pub mod layer;
pub mod repair;
pub mod xml;

pub use assets::AssetBundle;
pub use config::{Config, RepairConfig, CAML_NAMESPACE};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use document::{Document, ParseOutcome, SaveReport};
pub use elements::{Animation, Content, LayerState, StateTransition};
pub use error::{CamlError, Result};
pub use index::IndexDocument;
pub use layer::{LayerClass, LayerNode, TextAttributes};
pub use repair::{locate_error, repair_text, RepairKind};
pub use xml::{XmlElement, XmlNode};
