// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic permissions: runtime permission request correlation, the
// JavaScript action surface, and hardware state change monitoring. This crate
// sits between the host collaborators defined in `diagnostic-bridge` and the
// web view that calls into the plugin.

pub mod correlator;
pub mod dispatch;
pub mod monitor;

#[cfg(target_os = "android")]
pub mod android;

pub use correlator::PermissionCorrelator;
pub use dispatch::{Action, Diagnostic};
pub use monitor::StateMonitor;
