//! Normaliser configuration.
//!
//! Layered the usual way: built-in defaults, then an optional TOML file, then
//! `TIMEPHASED_*` environment variables.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::duration::TimeUnit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormaliserConfig {
    /// Unit every canonical span is stored in.
    pub storage_unit: TimeUnit,
    /// Decimal places kept when pro-rating work across days (in minutes).
    pub rounding_places: u32,
    /// Fuse consecutive days carrying the same work into one multi-day span.
    pub compact_runs: bool,
    /// Minutes two per-day amounts may differ by and still count as equal.
    pub compaction_tolerance: f64,
}

impl Default for NormaliserConfig {
    fn default() -> Self {
        Self {
            storage_unit: TimeUnit::Hours,
            rounding_places: 2,
            compact_runs: false,
            compaction_tolerance: 0.01,
        }
    }
}

impl NormaliserConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("TIMEPHASED_"));

        figment.extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_store_hours_with_two_places() {
        let config = NormaliserConfig::default();
        assert_eq!(config.storage_unit, TimeUnit::Hours);
        assert_eq!(config.rounding_places, 2);
        assert!(!config.compact_runs);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "storage_unit = \"minutes\"\ncompact_runs = true").unwrap();

        let config = NormaliserConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.storage_unit, TimeUnit::Minutes);
        assert!(config.compact_runs);
        assert_eq!(config.rounding_places, 2);
    }
}
