// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Runtime permission request correlation.
//
// A multi-permission request is answered in two halves: permissions the app
// already holds are resolved on the caller's thread, the rest are handed to
// the OS prompt with a request id as correlation token. The platform later
// calls back (possibly on another thread) with that id and the user's
// answers. The correlator merges both halves and replies to the original
// caller exactly once, then forgets the request.
//
// Lock discipline: the pending table is only touched while holding its
// mutex, and an entry is always removed from the table before its sink or
// any host collaborator is invoked. Sinks may therefore start new requests
// from inside their callback.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use diagnostic_bridge::traits::{CompletionSink, PermissionHost};
use diagnostic_core::DiagnosticConfig;
use diagnostic_core::error::{DiagnosticError, Result};
use diagnostic_core::types::{Permission, PermissionStatus, PermissionStatuses, RequestId};

/// One outstanding multi-permission request.
struct PendingRequest {
    /// Permissions this request waits on.
    requested: BTreeSet<Permission>,
    /// Statuses resolved so far. Keys are always a subset of `requested`.
    results: PermissionStatuses,
    /// Reply channel to the original caller.
    callback: Box<dyn CompletionSink>,
}

impl PendingRequest {
    /// Requested permissions that have no status yet.
    fn unresolved(&self) -> Vec<Permission> {
        self.requested
            .iter()
            .filter(|p| !self.results.contains_key(p))
            .copied()
            .collect()
    }
}

/// Live requests plus the id allocator.
struct RequestTable {
    pending: HashMap<RequestId, PendingRequest>,
    /// Next candidate id, always within `1..=ceiling`.
    next_id: u32,
    ceiling: u32,
}

/// Ids travel as Android `int` request codes.
const MAX_REQUEST_ID: u32 = i32::MAX as u32;

impl RequestTable {
    fn new(ceiling: u32) -> Self {
        Self {
            pending: HashMap::new(),
            next_id: 1,
            ceiling: ceiling.clamp(1, MAX_REQUEST_ID),
        }
    }

    /// Hand out the next id that is not held by a live request.
    ///
    /// Ids count upwards and wrap at the ceiling; ids still in use are
    /// skipped, so a live id is never issued twice.
    fn allocate(&mut self) -> Result<RequestId> {
        if self.pending.len() >= self.ceiling as usize {
            return Err(DiagnosticError::RequestTableFull);
        }
        loop {
            let candidate = RequestId(self.next_id);
            self.next_id = if self.next_id >= self.ceiling {
                1
            } else {
                self.next_id + 1
            };
            if !self.pending.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }
}

/// Correlates permission prompts with their asynchronous results.
pub struct PermissionCorrelator {
    host: Arc<dyn PermissionHost>,
    table: Mutex<RequestTable>,
}

impl PermissionCorrelator {
    pub fn new(host: Arc<dyn PermissionHost>, config: &DiagnosticConfig) -> Self {
        info!(
            platform = host.platform_name(),
            runtime_permissions = host.supports_runtime_permissions(),
            "permission correlator ready"
        );
        Self {
            host,
            table: Mutex::new(RequestTable::new(config.request_id_ceiling)),
        }
    }

    /// The host this correlator talks to.
    pub fn host(&self) -> &Arc<dyn PermissionHost> {
        &self.host
    }

    fn table(&self) -> Result<MutexGuard<'_, RequestTable>> {
        self.table
            .lock()
            .map_err(|_| DiagnosticError::Bridge("permission request table lock poisoned".into()))
    }

    // -- Queries ------------------------------------------------------------

    /// Current status of a single permission. Creates no request state.
    pub fn status_of(&self, permission: Permission) -> Result<PermissionStatus> {
        if self.host.is_granted(permission)? {
            return Ok(PermissionStatus::Granted);
        }
        let rationale = self.host.should_show_rationale(permission)?;
        Ok(PermissionStatus::from_denial(rationale))
    }

    /// Current status of each permission in `permissions`.
    pub fn statuses_of(&self, permissions: &[Permission]) -> Result<PermissionStatuses> {
        permissions
            .iter()
            .map(|p| {
                let status = self.status_of(*p)?;
                debug!(permission = p.name(), status = status.as_str(), "authorisation status");
                Ok((*p, status))
            })
            .collect()
    }

    /// Number of requests waiting for a platform result.
    pub fn pending_count(&self) -> usize {
        self.table.lock().map(|t| t.pending.len()).unwrap_or(0)
    }

    /// Whether `id` belongs to a request that is still waiting.
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.table
            .lock()
            .map(|t| t.pending.contains_key(&id))
            .unwrap_or(false)
    }

    // -- Request lifecycle --------------------------------------------------

    /// Start a multi-permission request.
    ///
    /// Once called, `callback` is invoked exactly once: immediately when
    /// every permission is already held, later from
    /// [`PermissionCorrelator::resolve_permissions`], or with the error that
    /// stopped the request. Errors are also returned so the caller can log
    /// them; the callback has already been failed in that case.
    #[instrument(skip_all, fields(count = permissions.len()))]
    pub fn begin_request(
        &self,
        permissions: BTreeSet<Permission>,
        callback: Box<dyn CompletionSink>,
    ) -> Result<RequestId> {
        if permissions.is_empty() {
            let err = DiagnosticError::InvalidArguments("no permissions requested".into());
            callback.fail(err.to_string());
            return Err(err);
        }

        let mut results = PermissionStatuses::new();
        let mut outstanding = Vec::new();
        for permission in &permissions {
            match self.host.is_granted(*permission) {
                Ok(true) => {
                    debug!(permission = permission.name(), "permission already granted");
                    results.insert(*permission, PermissionStatus::Granted);
                }
                Ok(false) => outstanding.push(*permission),
                Err(e) => {
                    error!(permission = permission.name(), error = %e, "permission check failed");
                    callback.fail(e.to_string());
                    return Err(e);
                }
            }
        }

        let mut table = match self.table() {
            Ok(table) => table,
            Err(e) => {
                callback.fail(e.to_string());
                return Err(e);
            }
        };
        let id = match table.allocate() {
            Ok(id) => id,
            Err(e) => {
                drop(table);
                error!(error = %e, "cannot allocate permission request id");
                callback.fail(e.to_string());
                return Err(e);
            }
        };

        if outstanding.is_empty() {
            drop(table);
            debug!(%id, "no permissions to request, returning result");
            deliver(id, &results, callback);
            return Ok(id);
        }

        table.pending.insert(
            id,
            PendingRequest {
                requested: permissions,
                results,
                callback,
            },
        );
        drop(table);

        info!(%id, outstanding = outstanding.len(), "requesting permissions");
        if let Err(e) = self.host.prompt_for(&outstanding, id) {
            error!(%id, error = %e, "permission prompt failed");
            match self.take(id) {
                Ok(Some(request)) => request.callback.fail(e.to_string()),
                Ok(None) => {}
                Err(lock) => error!(%id, error = %lock, "failed request could not be removed"),
            }
            return Err(e);
        }
        Ok(id)
    }

    /// Merge the platform's answers for request `id` and reply to its caller.
    ///
    /// `outcomes` holds `(permission name, granted)` pairs; names may be
    /// short or platform names. Names that are unknown or were not part of
    /// the request are ignored. Requested permissions missing from the reply
    /// (the prompt was dismissed) get their current status.
    ///
    /// Fails with `RequestNotFound` when no request with `id` is live, which
    /// means the callback is late or duplicated. No sink is touched then.
    /// A poisoned request table is reported as `Bridge`.
    #[instrument(skip(self, outcomes), fields(count = outcomes.len()))]
    pub fn resolve_permissions(&self, id: RequestId, outcomes: &[(String, bool)]) -> Result<()> {
        let Some(mut request) = self.take(id)? else {
            return Err(DiagnosticError::RequestNotFound(id));
        };

        for (name, granted) in outcomes {
            let Some(permission) = Permission::lookup(name) else {
                warn!(%id, name = %name, "ignoring unrecognised permission in platform result");
                continue;
            };
            if !request.requested.contains(&permission) {
                warn!(%id, permission = permission.name(), "ignoring permission that was not requested");
                continue;
            }
            let status = if *granted {
                PermissionStatus::Granted
            } else {
                match self.host.should_show_rationale(permission) {
                    Ok(rationale) => PermissionStatus::from_denial(rationale),
                    Err(e) => {
                        error!(%id, error = %e, "rationale check failed");
                        request.callback.fail(e.to_string());
                        return Err(e);
                    }
                }
            };
            debug!(%id, permission = permission.name(), status = status.as_str(), "authorisation resolved");
            request.results.insert(permission, status);
        }

        for permission in request.unresolved() {
            match self.status_of(permission) {
                Ok(status) => {
                    debug!(%id, permission = permission.name(), "missing from platform result, using current status");
                    request.results.insert(permission, status);
                }
                Err(e) => {
                    error!(%id, error = %e, "status check failed");
                    request.callback.fail(e.to_string());
                    return Err(e);
                }
            }
        }

        deliver(id, &request.results, request.callback);
        Ok(())
    }

    /// Remove a request from the table.
    fn take(&self, id: RequestId) -> Result<Option<PendingRequest>> {
        Ok(self.table()?.pending.remove(&id))
    }
}

/// Send the aggregated statuses to the caller.
fn deliver(id: RequestId, results: &PermissionStatuses, callback: Box<dyn CompletionSink>) {
    match serde_json::to_value(results) {
        Ok(payload) => {
            info!(%id, "permission request complete");
            callback.succeed(payload);
        }
        Err(e) => {
            error!(%id, error = %e, "failed to encode permission statuses");
            callback.fail(e.to_string());
        }
    }
}

/// Decode a delivered payload back into statuses.
pub fn statuses_from_payload(payload: Value) -> Result<PermissionStatuses> {
    Ok(serde_json::from_value(payload)?)
}
