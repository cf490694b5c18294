// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JavaScript action surface of the diagnostic plugin.
//
// The web view calls `execute(action, args, reply)` with Cordova-style JSON
// arguments (a positional array). Every outcome, success or failure, leaves
// through `reply` exactly once.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use diagnostic_bridge::traits::{CompletionSink, PermissionHost};
use diagnostic_core::DiagnosticConfig;
use diagnostic_core::error::{DiagnosticError, Result};
use diagnostic_core::types::{Permission, RequestId};

use crate::correlator::PermissionCorrelator;

/// `PackageManager.PERMISSION_GRANTED` in the platform's result callback.
pub const PERMISSION_GRANTED: i32 = 0;

pub const GET_PERMISSION_AUTHORIZATION_STATUS: &str = "getPermissionAuthorizationStatus";
pub const GET_PERMISSIONS_AUTHORIZATION_STATUS: &str = "getPermissionsAuthorizationStatus";
pub const REQUEST_RUNTIME_PERMISSION: &str = "requestRuntimePermission";
pub const REQUEST_RUNTIME_PERMISSIONS: &str = "requestRuntimePermissions";

/// A parsed plugin action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Reply with the status string of one permission.
    GetPermissionAuthorizationStatus(Permission),
    /// Reply with `{name: status}` for each permission.
    GetPermissionsAuthorizationStatus(Vec<Permission>),
    /// Prompt for one permission, reply with `{name: status}`.
    RequestRuntimePermission(Permission),
    /// Prompt for several permissions, reply with `{name: status}`.
    RequestRuntimePermissions(Vec<Permission>),
}

impl Action {
    /// Parse an action name and its positional JSON arguments.
    pub fn parse(name: &str, args: &Value) -> Result<Self> {
        match name {
            GET_PERMISSION_AUTHORIZATION_STATUS => Ok(Self::GetPermissionAuthorizationStatus(
                permission_arg(first_arg(args)?)?,
            )),
            GET_PERMISSIONS_AUTHORIZATION_STATUS => Ok(Self::GetPermissionsAuthorizationStatus(
                permission_list_arg(first_arg(args)?)?,
            )),
            REQUEST_RUNTIME_PERMISSION => Ok(Self::RequestRuntimePermission(permission_arg(
                first_arg(args)?,
            )?)),
            REQUEST_RUNTIME_PERMISSIONS => Ok(Self::RequestRuntimePermissions(
                permission_list_arg(first_arg(args)?)?,
            )),
            other => Err(DiagnosticError::UnknownAction(other.to_string())),
        }
    }

    /// The action name as JavaScript spells it.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GetPermissionAuthorizationStatus(_) => GET_PERMISSION_AUTHORIZATION_STATUS,
            Self::GetPermissionsAuthorizationStatus(_) => GET_PERMISSIONS_AUTHORIZATION_STATUS,
            Self::RequestRuntimePermission(_) => REQUEST_RUNTIME_PERMISSION,
            Self::RequestRuntimePermissions(_) => REQUEST_RUNTIME_PERMISSIONS,
        }
    }
}

fn first_arg(args: &Value) -> Result<&Value> {
    args.as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| DiagnosticError::InvalidArguments("expected at least one argument".into()))
}

fn permission_arg(value: &Value) -> Result<Permission> {
    let name = value.as_str().ok_or_else(|| {
        DiagnosticError::InvalidArguments(format!("expected a permission name, got {value}"))
    })?;
    Permission::parse(name)
}

fn permission_list_arg(value: &Value) -> Result<Vec<Permission>> {
    let names = value.as_array().ok_or_else(|| {
        DiagnosticError::InvalidArguments(format!("expected an array of permission names, got {value}"))
    })?;
    names.iter().map(permission_arg).collect()
}

/// The plugin object the host shell instantiates.
///
/// Cheap to clone; clones share the same pending requests.
#[derive(Clone)]
pub struct Diagnostic {
    correlator: Arc<PermissionCorrelator>,
}

impl Diagnostic {
    pub fn new(host: Arc<dyn PermissionHost>, config: &DiagnosticConfig) -> Self {
        Self {
            correlator: Arc::new(PermissionCorrelator::new(host, config)),
        }
    }

    pub fn correlator(&self) -> &Arc<PermissionCorrelator> {
        &self.correlator
    }

    /// Parse and run an action.
    pub fn execute(&self, action: &str, args: &Value, reply: Box<dyn CompletionSink>) {
        match Action::parse(action, args) {
            Ok(parsed) => self.dispatch(parsed, reply),
            Err(e) => {
                error!(action, error = %e, "rejected plugin action");
                reply.fail(e.to_string());
            }
        }
    }

    /// Run an already parsed action.
    pub fn dispatch(&self, action: Action, reply: Box<dyn CompletionSink>) {
        debug!(action = action.name(), "dispatching");
        match action {
            Action::GetPermissionAuthorizationStatus(permission) => {
                match self.correlator.status_of(permission) {
                    Ok(status) => reply.succeed(Value::String(status.as_str().to_string())),
                    Err(e) => fail(reply, GET_PERMISSION_AUTHORIZATION_STATUS, e),
                }
            }
            Action::GetPermissionsAuthorizationStatus(permissions) => {
                let payload = self
                    .correlator
                    .statuses_of(&permissions)
                    .and_then(|s| serde_json::to_value(s).map_err(DiagnosticError::from));
                match payload {
                    Ok(payload) => reply.succeed(payload),
                    Err(e) => fail(reply, GET_PERMISSIONS_AUTHORIZATION_STATUS, e),
                }
            }
            Action::RequestRuntimePermission(permission) => self.request(vec![permission], reply),
            Action::RequestRuntimePermissions(permissions) => self.request(permissions, reply),
        }
    }

    fn request(&self, permissions: Vec<Permission>, reply: Box<dyn CompletionSink>) {
        // The correlator owns `reply` from here on and fails it itself.
        match self
            .correlator
            .begin_request(permissions.into_iter().collect(), reply)
        {
            Ok(id) => debug!(%id, "permission request started"),
            Err(e) => warn!(error = %e, "permission request ended with an error"),
        }
    }

    /// Platform callback boundary for `onRequestPermissionsResult`.
    ///
    /// `grant_results` uses the platform's integers (`0` granted, anything
    /// else denied). Extra entries in the longer array are dropped. Late or
    /// duplicate callbacks are logged and dropped here; nothing is raised.
    pub fn on_request_permissions_result(
        &self,
        request_code: i32,
        permissions: &[String],
        grant_results: &[i32],
    ) {
        let Ok(raw) = u32::try_from(request_code) else {
            warn!(request_code, "ignoring permission result with negative request code");
            return;
        };
        if permissions.len() != grant_results.len() {
            warn!(
                permissions = permissions.len(),
                grant_results = grant_results.len(),
                "permission result arrays differ in length"
            );
        }
        let outcomes: Vec<(String, bool)> = permissions
            .iter()
            .zip(grant_results)
            .map(|(name, grant)| (name.clone(), *grant == PERMISSION_GRANTED))
            .collect();
        self.deliver_outcomes(RequestId(raw), &outcomes);
    }

    /// Like [`Diagnostic::on_request_permissions_result`] for already
    /// decoded `(name, granted)` pairs.
    pub fn deliver_outcomes(&self, id: RequestId, outcomes: &[(String, bool)]) {
        info!(%id, "received result for permissions request");
        match self.correlator.resolve_permissions(id, outcomes) {
            Ok(()) => {}
            Err(DiagnosticError::RequestNotFound(id)) => {
                warn!(%id, "dropping permission result with no waiting request");
            }
            Err(e) => error!(%id, error = %e, "permission result could not be aggregated"),
        }
    }
}

fn fail(reply: Box<dyn CompletionSink>, action: &str, e: DiagnosticError) {
    error!(action, error = %e, "plugin action failed");
    reply.fail(e.to_string());
}
