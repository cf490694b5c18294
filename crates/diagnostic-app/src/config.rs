// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simulator configuration: bridge settings plus the scripted host profile.

use std::path::Path;

use serde::{Deserialize, Serialize};

use diagnostic_bridge::scripted::ScriptedProfile;
use diagnostic_core::DiagnosticConfig;
use diagnostic_core::error::Result;

/// Which permission host the simulator drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKind {
    /// In-memory host answering prompts from the `host` profile.
    #[default]
    Scripted,
    /// The host this binary was built for (the stub on desktop targets).
    #[serde(alias = "stub")]
    Platform,
}

/// Contents of the simulator's config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub diagnostic: DiagnosticConfig,
    pub host_kind: HostKind,
    /// Only used with [`HostKind::Scripted`].
    pub host: ScriptedProfile,
}

impl SimConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use diagnostic_core::types::Permission;

    use super::*;

    #[test]
    fn reads_both_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        std::fs::write(
            &path,
            r#"{
                "diagnostic": { "request_id_ceiling": 10, "log_filter": "debug" },
                "host": { "granted": ["CAMERA"], "answers": { "RECORD_AUDIO": false } }
            }"#,
        )
        .unwrap();

        let config = SimConfig::load(&path).unwrap();
        assert_eq!(config.diagnostic.request_id_ceiling, 10);
        assert_eq!(config.diagnostic.log_filter, "debug");
        assert!(config.host.granted.contains(&Permission::Camera));
        assert_eq!(config.host.answers.get(&Permission::RecordAudio), Some(&false));
        assert_eq!(config.host_kind, HostKind::Scripted);
    }

    #[test]
    fn host_kind_accepts_stub_alias() {
        let config: SimConfig = serde_json::from_str(r#"{ "host_kind": "stub" }"#).unwrap();
        assert_eq!(config.host_kind, HostKind::Platform);
        let config: SimConfig = serde_json::from_str(r#"{ "host_kind": "platform" }"#).unwrap();
        assert_eq!(config.host_kind, HostKind::Platform);
    }

    #[test]
    fn empty_object_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(SimConfig::load(&path).unwrap(), SimConfig::default());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SimConfig::load(dir.path().join("absent.json")),
            Err(diagnostic_core::DiagnosticError::Io(_))
        ));
    }
}
