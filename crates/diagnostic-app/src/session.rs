// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One simulator session: a plugin instance over a scripted host, or over
// the build target's own host when `host_kind` is `platform`.
//
// Input lines are either plugin calls, `{"action": ..., "args": [...]}`, or
// hardware events, `{"event": "bluetooth" | "nfc" | "location", "code": n}`.
// Each line produces exactly one JSON output line.

use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use diagnostic_bridge::platform_host;
use diagnostic_bridge::scripted::ScriptedHost;
use diagnostic_bridge::sink::channel_sink;
use diagnostic_bridge::traits::{EventSink, PermissionHost};
use diagnostic_core::error::Result;
use diagnostic_core::types::StateChange;
use diagnostic_permissions::{Diagnostic, StateMonitor};

use crate::config::{HostKind, SimConfig};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EventKind {
    Bluetooth,
    Nfc,
    Location,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Command {
    Call {
        action: String,
        #[serde(default)]
        args: Value,
    },
    Event {
        event: EventKind,
        code: i32,
    },
}

/// Collects the scripts the monitor would evaluate in the web view.
#[derive(Default)]
struct ScriptLog(Mutex<Vec<String>>);

impl ScriptLog {
    fn drain(&self) -> Vec<String> {
        self.0
            .lock()
            .map(|mut l| l.drain(..).collect())
            .unwrap_or_default()
    }
}

impl EventSink for ScriptLog {
    fn emit(&self, change: &StateChange) {
        if let Ok(mut log) = self.0.lock() {
            log.push(change.to_script());
        }
    }
}

pub struct Session {
    /// Set when prompts must be answered from a profile.
    scripted: Option<Arc<ScriptedHost>>,
    diagnostic: Diagnostic,
    monitor: StateMonitor,
    scripts: Arc<ScriptLog>,
}

impl Session {
    pub fn new(config: SimConfig) -> Result<Self> {
        let (host, scripted): (Arc<dyn PermissionHost>, _) = match config.host_kind {
            HostKind::Scripted => {
                let host = Arc::new(ScriptedHost::new(config.host));
                let shared: Arc<dyn PermissionHost> = host.clone();
                (shared, Some(host))
            }
            HostKind::Platform => (platform_host(&config.diagnostic)?, None),
        };
        let scripts = Arc::new(ScriptLog::default());
        Ok(Self {
            diagnostic: Diagnostic::new(host, &config.diagnostic),
            monitor: StateMonitor::new(scripts.clone(), &config.diagnostic),
            scripted,
            scripts,
        })
    }

    /// Run one input line and return the output line's JSON.
    pub async fn handle_line(&self, line: &str) -> Value {
        match serde_json::from_str::<Command>(line) {
            Ok(Command::Call { action, args }) => self.call(&action, &args).await,
            Ok(Command::Event { event, code }) => self.event(event, code),
            Err(e) => {
                warn!(error = %e, "unreadable input line");
                json!({ "error": format!("unreadable input line: {e}") })
            }
        }
    }

    async fn call(&self, action: &str, args: &Value) -> Value {
        let (sink, rx) = channel_sink();
        self.diagnostic.execute(action, args, sink);

        // Stand in for the OS dialog: answer whatever was prompted.
        if let Some(host) = &self.scripted {
            for prompt in host.take_prompts() {
                let outcomes = host.answer(&prompt);
                debug!(token = %prompt.token, ?outcomes, "answering scripted prompt");
                self.diagnostic.deliver_outcomes(prompt.token, &outcomes);
            }
        }

        match rx.await {
            Ok(Ok(payload)) => json!({ "ok": payload }),
            Ok(Err(message)) => json!({ "error": message }),
            Err(_) => json!({ "error": "request dropped without a reply" }),
        }
    }

    fn event(&self, kind: EventKind, code: i32) -> Value {
        let emitted = match kind {
            EventKind::Bluetooth => self.monitor.on_bluetooth_state(code),
            EventKind::Nfc => self.monitor.on_nfc_state(code),
            EventKind::Location => self.monitor.on_location_mode(code),
        };
        json!({ "emitted": emitted, "scripts": self.scripts.drain() })
    }
}

#[cfg(test)]
mod tests {
    use diagnostic_bridge::scripted::ScriptedProfile;
    use diagnostic_core::types::Permission;
    use diagnostic_core::{DiagnosticConfig, DiagnosticError};

    use super::*;

    fn session() -> Session {
        Session::new(SimConfig {
            host: ScriptedProfile {
                granted: [Permission::Camera].into(),
                rationale: [Permission::ReadSms].into(),
                answers: [(Permission::RecordAudio, true)].into(),
                ..ScriptedProfile::default()
            },
            ..SimConfig::default()
        })
        .unwrap()
    }

    fn platform_session(legacy_permissions_granted: bool) -> Session {
        Session::new(SimConfig {
            host_kind: HostKind::Platform,
            diagnostic: DiagnosticConfig {
                legacy_permissions_granted,
                ..DiagnosticConfig::default()
            },
            ..SimConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn request_is_answered_from_profile() {
        let session = session();
        let out = session
            .handle_line(
                r#"{"action":"requestRuntimePermissions","args":[["CAMERA","RECORD_AUDIO","READ_SMS","SEND_SMS"]]}"#,
            )
            .await;
        assert_eq!(
            out,
            json!({ "ok": {
                "CAMERA": "GRANTED",
                "RECORD_AUDIO": "GRANTED",
                "READ_SMS": "DENIED",
                "SEND_SMS": "STATUS_NOT_REQUESTED_OR_DENIED_ALWAYS"
            }})
        );

        let out = session
            .handle_line(r#"{"action":"getPermissionAuthorizationStatus","args":["RECORD_AUDIO"]}"#)
            .await;
        assert_eq!(out, json!({ "ok": "GRANTED" }));
    }

    #[tokio::test]
    async fn errors_become_error_lines() {
        let session = session();
        let out = session
            .handle_line(r#"{"action":"requestRuntimePermission","args":["TELEPORT"]}"#)
            .await;
        assert!(out["error"].as_str().unwrap().contains("TELEPORT"));

        let out = session.handle_line("not json").await;
        assert!(out.get("error").is_some());
    }

    #[tokio::test]
    async fn nfc_events_are_deduplicated() {
        let session = session();
        let first = session.handle_line(r#"{"event":"nfc","code":3}"#).await;
        assert_eq!(
            first,
            json!({
                "emitted": true,
                "scripts": ["cordova.plugins.diagnostic._onNFCStateChange(\"powered_on\");"]
            })
        );
        let again = session.handle_line(r#"{"event":"nfc","code":3}"#).await;
        assert_eq!(again, json!({ "emitted": false, "scripts": [] }));
    }

    #[tokio::test]
    async fn bluetooth_events_repeat() {
        let session = session();
        let line = r#"{"event":"bluetooth","code":10}"#;
        let script = "cordova.plugins.diagnostic._onBluetoothStateChange(\"powered_off\");";
        assert_eq!(
            session.handle_line(line).await,
            json!({ "emitted": true, "scripts": [script] })
        );
        assert_eq!(
            session.handle_line(line).await,
            json!({ "emitted": true, "scripts": [script] })
        );
    }

    #[cfg(not(target_os = "android"))]
    #[tokio::test]
    async fn legacy_platform_host_grants_everything() {
        let session = platform_session(true);
        let out = session
            .handle_line(r#"{"action":"requestRuntimePermissions","args":[["CAMERA","BODY_SENSORS"]]}"#)
            .await;
        assert_eq!(out, json!({ "ok": { "CAMERA": "GRANTED", "BODY_SENSORS": "GRANTED" } }));
    }

    #[cfg(not(target_os = "android"))]
    #[tokio::test]
    async fn strict_platform_host_is_unsupported() {
        let session = platform_session(false);
        let out = session
            .handle_line(r#"{"action":"getPermissionAuthorizationStatus","args":["CAMERA"]}"#)
            .await;
        let expected = DiagnosticError::PlatformUnsupported("runtime permission checks".into());
        assert_eq!(out, json!({ "error": expected.to_string() }));

        let out = session
            .handle_line(r#"{"action":"requestRuntimePermission","args":["CAMERA"]}"#)
            .await;
        assert_eq!(out, json!({ "error": expected.to_string() }));
    }
}
