// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Settings for the diagnostic bridge.
///
/// Missing fields in a config file take their default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    /// Upper bound (inclusive) of the permission request id range.
    /// Ids are handed to the platform as `requestCode` values.
    pub request_id_ceiling: u32,
    /// On hosts without runtime permissions, report every permission as
    /// granted (install-time grants) instead of failing the query.
    pub legacy_permissions_granted: bool,
    /// Emit Bluetooth / NFC / location change events to the web view.
    pub notify_state_changes: bool,
    /// Fallback `tracing` filter when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            request_id_ceiling: 1_000_000,
            legacy_permissions_granted: true,
            notify_state_changes: true,
            log_filter: "info".into(),
        }
    }
}

impl DiagnosticConfig {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&data)?;
        Ok(config)
    }

    /// Read a JSON config file, falling back to defaults when it is missing
    /// or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %e, "using default config");
                Self::default()
            }
        }
    }

    /// Write the config as pretty-printed JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagnostic.json");
        std::fs::write(&path, r#"{ "request_id_ceiling": 32767 }"#).unwrap();

        let config = DiagnosticConfig::load(&path).unwrap();
        assert_eq!(config.request_id_ceiling, 32767);
        assert!(config.legacy_permissions_granted);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagnostic.json");
        let config = DiagnosticConfig {
            notify_state_changes: false,
            ..DiagnosticConfig::default()
        };
        config.persist(&path).unwrap();
        assert_eq!(DiagnosticConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = DiagnosticConfig::load_or_default(dir.path().join("absent.json"));
        assert_eq!(config, DiagnosticConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(DiagnosticConfig::load(&path).is_err());
    }
}
