// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic bridge: native host abstractions.
//
// Defines the collaborator traits the permission correlator talks to and
// picks the host implementation for the target operating system at build
// time. Capability differences between hosts are expressed by which
// implementation is compiled in, never by probing at runtime.

use std::sync::Arc;

use diagnostic_core::DiagnosticConfig;
use diagnostic_core::error::Result;

pub mod scripted;
pub mod sink;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

/// Returns the permission host for the target operating system.
///
/// The host is shared between the correlator and whatever delivers the
/// platform callbacks, hence the `Arc`.
pub fn platform_host(config: &DiagnosticConfig) -> Result<Arc<dyn traits::PermissionHost>> {
    #[cfg(target_os = "android")]
    {
        // Android: runtime permissions through `jni-rs` calls into ART.
        let _ = config;
        Ok(Arc::new(android::AndroidHost::from_ndk_context()?))
    }
    #[cfg(not(target_os = "android"))]
    {
        // DESKTOP/CI: install-time permission model, no prompting.
        Ok(Arc::new(stub::StubHost::new(config.legacy_permissions_granted)))
    }
}
