// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory host driven by a profile instead of a real OS.
//
// Used by the `diagnostic-sim` binary and by tests. Prompts are recorded
// rather than shown; the driver collects them with `take_prompts` and feeds
// the scripted answers back through the normal result callback.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use diagnostic_core::error::{DiagnosticError, Result};
use diagnostic_core::types::{Permission, RequestId};

use crate::traits::*;

/// Describes how the scripted host behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedProfile {
    /// Permissions the app already holds.
    pub granted: BTreeSet<Permission>,
    /// Permissions for which the platform would show a rationale.
    pub rationale: BTreeSet<Permission>,
    /// How the user answers a prompt. Unlisted permissions are denied.
    pub answers: BTreeMap<Permission, bool>,
    /// When false the host behaves like a pre-runtime-permission platform.
    pub runtime_permissions: bool,
}

impl Default for ScriptedProfile {
    fn default() -> Self {
        Self {
            granted: BTreeSet::new(),
            rationale: BTreeSet::new(),
            answers: BTreeMap::new(),
            runtime_permissions: true,
        }
    }
}

/// A prompt the host was asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPrompt {
    pub token: RequestId,
    pub permissions: Vec<Permission>,
}

/// Host whose answers come from a [`ScriptedProfile`].
pub struct ScriptedHost {
    profile: Mutex<ScriptedProfile>,
    prompts: Mutex<Vec<RecordedPrompt>>,
}

impl ScriptedHost {
    pub fn new(profile: ScriptedProfile) -> Self {
        Self {
            profile: Mutex::new(profile),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Mark a permission as held (or not).
    pub fn set_granted(&self, permission: Permission, granted: bool) {
        if let Ok(mut profile) = self.profile.lock() {
            if granted {
                profile.granted.insert(permission);
            } else {
                profile.granted.remove(&permission);
            }
        }
    }

    /// Change the rationale flag for a permission.
    pub fn set_rationale(&self, permission: Permission, showable: bool) {
        if let Ok(mut profile) = self.profile.lock() {
            if showable {
                profile.rationale.insert(permission);
            } else {
                profile.rationale.remove(&permission);
            }
        }
    }

    /// Remove and return every prompt recorded so far.
    pub fn take_prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts
            .lock()
            .map(|mut p| p.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of prompts waiting to be answered.
    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Answer a prompt from the profile, the way the OS would.
    ///
    /// Returns `(platform name, granted)` pairs as the result callback
    /// delivers them. Granted answers are remembered so later queries
    /// see the permission as held.
    pub fn answer(&self, prompt: &RecordedPrompt) -> Vec<(String, bool)> {
        let Ok(mut profile) = self.profile.lock() else {
            return Vec::new();
        };
        prompt
            .permissions
            .iter()
            .map(|p| {
                let granted = profile.answers.get(p).copied().unwrap_or(false);
                if granted {
                    profile.granted.insert(*p);
                }
                (p.platform_name().to_string(), granted)
            })
            .collect()
    }

    fn runtime_permissions(&self) -> bool {
        self.profile
            .lock()
            .map(|p| p.runtime_permissions)
            .unwrap_or(false)
    }
}

impl PermissionHost for ScriptedHost {
    fn platform_name(&self) -> &str {
        "Scripted"
    }

    fn supports_runtime_permissions(&self) -> bool {
        self.runtime_permissions()
    }
}

impl PermissionQuery for ScriptedHost {
    fn is_granted(&self, permission: Permission) -> Result<bool> {
        let profile = self
            .profile
            .lock()
            .map_err(|_| DiagnosticError::Bridge("scripted profile lock poisoned".into()))?;
        Ok(!profile.runtime_permissions || profile.granted.contains(&permission))
    }
}

impl RationaleSource for ScriptedHost {
    fn should_show_rationale(&self, permission: Permission) -> Result<bool> {
        let profile = self
            .profile
            .lock()
            .map_err(|_| DiagnosticError::Bridge("scripted profile lock poisoned".into()))?;
        if !profile.runtime_permissions {
            return Err(DiagnosticError::PlatformUnsupported(
                "shouldShowRequestPermissionRationale".into(),
            ));
        }
        Ok(profile.rationale.contains(&permission))
    }
}

impl PermissionPrompter for ScriptedHost {
    fn prompt_for(&self, permissions: &[Permission], token: RequestId) -> Result<()> {
        if !self.runtime_permissions() {
            return Err(DiagnosticError::PlatformUnsupported("requestPermissions".into()));
        }
        info!(%token, count = permissions.len(), "scripted prompt recorded");
        debug!(?permissions, "prompted permissions");
        self.prompts
            .lock()
            .map_err(|_| DiagnosticError::Bridge("scripted prompt lock poisoned".into()))?
            .push(RecordedPrompt {
                token,
                permissions: permissions.to_vec(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ScriptedProfile {
        ScriptedProfile {
            granted: [Permission::Camera].into(),
            rationale: [Permission::RecordAudio].into(),
            answers: [(Permission::ReadContacts, true)].into(),
            runtime_permissions: true,
        }
    }

    #[test]
    fn queries_follow_profile() {
        let host = ScriptedHost::new(profile());
        assert!(host.is_granted(Permission::Camera).unwrap());
        assert!(!host.is_granted(Permission::RecordAudio).unwrap());
        assert!(host.should_show_rationale(Permission::RecordAudio).unwrap());
        assert!(!host.should_show_rationale(Permission::Camera).unwrap());
    }

    #[test]
    fn prompts_are_recorded_and_answered() {
        let host = ScriptedHost::new(profile());
        host.prompt_for(&[Permission::ReadContacts, Permission::RecordAudio], RequestId(7))
            .unwrap();
        assert_eq!(host.prompt_count(), 1);

        let prompts = host.take_prompts();
        assert_eq!(prompts[0].token, RequestId(7));
        assert_eq!(host.prompt_count(), 0);

        let answers = host.answer(&prompts[0]);
        assert_eq!(
            answers,
            vec![
                ("android.permission.READ_CONTACTS".to_string(), true),
                ("android.permission.RECORD_AUDIO".to_string(), false),
            ]
        );
        assert!(host.is_granted(Permission::ReadContacts).unwrap());
    }

    #[test]
    fn legacy_profile_grants_and_refuses_prompts() {
        let host = ScriptedHost::new(ScriptedProfile {
            runtime_permissions: false,
            ..ScriptedProfile::default()
        });
        assert!(host.is_granted(Permission::BodySensors).unwrap());
        assert!(matches!(
            host.prompt_for(&[Permission::BodySensors], RequestId(1)),
            Err(DiagnosticError::PlatformUnsupported(_))
        ));
    }

    #[test]
    fn profile_parses_from_json() {
        let profile: ScriptedProfile = serde_json::from_str(
            r#"{ "granted": ["CAMERA"], "answers": { "RECORD_AUDIO": true } }"#,
        )
        .unwrap();
        assert!(profile.granted.contains(&Permission::Camera));
        assert_eq!(profile.answers.get(&Permission::RecordAudio), Some(&true));
        assert!(profile.runtime_permissions);
    }
}
