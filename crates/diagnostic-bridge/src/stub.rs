// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub host for desktop/CI builds where runtime permissions do not exist.
//
// Behaves like a host with install-time permissions: queries succeed (every
// permission is held, unless configured otherwise) while rationale and
// prompting return `PlatformUnsupported`. The real implementation lives in
// the `android` module.

use diagnostic_core::error::{DiagnosticError, Result};
use diagnostic_core::types::{Permission, RequestId};

use crate::traits::*;

/// Host returned on non-mobile platforms.
pub struct StubHost {
    legacy_granted: bool,
}

impl StubHost {
    /// `legacy_granted` mirrors `DiagnosticConfig::legacy_permissions_granted`.
    pub fn new(legacy_granted: bool) -> Self {
        Self { legacy_granted }
    }
}

impl PermissionHost for StubHost {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn supports_runtime_permissions(&self) -> bool {
        false
    }
}

impl PermissionQuery for StubHost {
    fn is_granted(&self, permission: Permission) -> Result<bool> {
        if self.legacy_granted {
            tracing::debug!(
                permission = permission.name(),
                "no runtime permissions on this host, defaulting to GRANTED"
            );
            Ok(true)
        } else {
            tracing::warn!("PermissionQuery::is_granted called on stub host");
            Err(DiagnosticError::PlatformUnsupported(
                "runtime permission checks".into(),
            ))
        }
    }
}

impl RationaleSource for StubHost {
    fn should_show_rationale(&self, _permission: Permission) -> Result<bool> {
        tracing::warn!("RationaleSource::should_show_rationale called on stub host");
        Err(DiagnosticError::PlatformUnsupported(
            "shouldShowRequestPermissionRationale".into(),
        ))
    }
}

impl PermissionPrompter for StubHost {
    fn prompt_for(&self, _permissions: &[Permission], _token: RequestId) -> Result<()> {
        tracing::warn!("PermissionPrompter::prompt_for called on stub host");
        Err(DiagnosticError::PlatformUnsupported("requestPermissions".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_host_grants_everything() {
        let host = StubHost::new(true);
        assert!(Permission::ALL.iter().all(|p| host.is_granted(*p).unwrap()));
        assert!(!host.supports_runtime_permissions());
    }

    #[test]
    fn strict_host_refuses_queries() {
        let host = StubHost::new(false);
        assert!(matches!(
            host.is_granted(Permission::Camera),
            Err(DiagnosticError::PlatformUnsupported(_))
        ));
    }

    #[test]
    fn prompting_is_unsupported() {
        let host = StubHost::new(true);
        assert!(host.prompt_for(&[Permission::Camera], RequestId(1)).is_err());
        assert!(host.should_show_rationale(Permission::Camera).is_err());
    }
}
