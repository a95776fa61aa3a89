//! Bundle layout and repair configuration.

use serde::{Deserialize, Serialize};

/// Default XML namespace of CAML documents.
pub const CAML_NAMESPACE: &str = "http://www.apple.com/CoreAnimation/1.0";

/// Names of the files inside a bundle plus repair behavior.
/// Every field has a default, so partial JSON overrides are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Property-list index file name inside the bundle.
    pub index_file: String,
    /// Flat asset folder name inside the bundle.
    pub assets_dir: String,
    /// Extension given to the root document on save (without the dot).
    pub document_extension: String,
    /// Default namespace written on the `<caml>` root.
    pub namespace: String,
    pub repair: RepairConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// When false, the first parse failure is fatal.
    pub enabled: bool,
    /// Targeted repair passes before giving up. One pass is the standard behavior.
    pub max_passes: usize,
    /// Back up the original and overwrite it with the repaired text.
    pub write_back: bool,
    /// Appended to the root document file name for the backup copy.
    pub backup_suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_file: "index.xml".into(),
            assets_dir: "assets".into(),
            document_extension: "caml".into(),
            namespace: CAML_NAMESPACE.into(),
            repair: RepairConfig::default(),
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_passes: 1,
            write_back: true,
            backup_suffix: ".backup".into(),
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = Config::from_json_str(r#"{ "repair": { "max_passes": 3 } }"#).unwrap();
        assert_eq!(cfg.repair.max_passes, 3);
        assert!(cfg.repair.enabled);
        assert_eq!(cfg.repair.backup_suffix, ".backup");
        assert_eq!(cfg.index_file, "index.xml");
        assert_eq!(cfg.namespace, CAML_NAMESPACE);
    }
}
