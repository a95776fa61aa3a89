//! Recoverable load/save events.
//!
//! Every "warn and skip" decision is logged through `tracing` and also kept
//! here, so callers (and tests) can inspect what was dropped without scraping
//! log output.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A `<sublayers>` child had no `id`; it was parsed and dropped.
    SublayerMissingId,
    /// Two siblings shared an id; the later one replaced the earlier.
    DuplicateSublayerId,
    /// A `<states>` child had no `name`.
    StateMissingName,
    /// Animation type not modeled; kept as a generic animation.
    UnrecognizedAnimation,
    /// Animation entry could not be constructed and was omitted.
    AnimationSkipped,
    AssetUnreadable,
    AssetUnwritable,
    /// Root document was repaired before parsing.
    XmlRepaired,
    /// Repaired text could not be written back or backed up.
    BackupFailed,
    /// Root document had no layer; an empty one was created.
    DefaultRootLayer,
    /// Root element was not `<caml>` and was used as the layer itself.
    NonCamlRoot,
}

impl DiagnosticKind {
    /// Informational kinds describe a successful recovery rather than lost data.
    pub fn is_informational(self) -> bool {
        matches!(self, Self::XmlRepaired | Self::DefaultRootLayer)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Ordered list of diagnostics collected during one operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it.
    pub fn push(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        if kind.is_informational() {
            info!(?kind, "{message}");
        } else {
            warn!(?kind, "{message}");
        }
        self.entries.push(Diagnostic { kind, message });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.count(kind) > 0
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
