// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the host collaborators.
//
// The correlator never talks to the OS directly. Everything it needs from
// the host is one of the small traits below, so each platform (and each
// test) supplies its own implementation.

use diagnostic_core::error::Result;
use diagnostic_core::types::{Permission, RequestId, StateChange};

/// Unified host that groups the permission capabilities.
///
/// Hosts that predate runtime permissions return
/// `DiagnosticError::PlatformUnsupported` from the rationale and prompt
/// methods.
pub trait PermissionHost: PermissionQuery + RationaleSource + PermissionPrompter + Send + Sync {
    /// Human-readable platform name (e.g. "Android", "Desktop (stub)").
    fn platform_name(&self) -> &str;

    /// Whether the host asks the user for permissions at runtime.
    fn supports_runtime_permissions(&self) -> bool;
}

/// Synchronous, side-effect free permission check.
pub trait PermissionQuery {
    /// Whether the app currently holds `permission`.
    fn is_granted(&self, permission: Permission) -> Result<bool>;
}

/// Distinguishes "can still ask" from "never asked or permanently denied".
pub trait RationaleSource {
    /// Whether the platform would show a rationale before prompting again.
    fn should_show_rationale(&self, permission: Permission) -> Result<bool>;
}

/// Launches the OS permission prompt.
pub trait PermissionPrompter {
    /// Ask the user for `permissions`.
    ///
    /// Returns once the prompt is dispatched. The outcome arrives later
    /// through the host's result callback carrying `token`.
    fn prompt_for(&self, permissions: &[Permission], token: RequestId) -> Result<()>;
}

/// Where the answer to one JavaScript call goes.
///
/// Both methods consume the sink, so a reply can only ever be sent once.
pub trait CompletionSink: Send {
    fn succeed(self: Box<Self>, payload: serde_json::Value);

    fn fail(self: Box<Self>, message: String);
}

/// Receives hardware state changes for delivery to the web view.
pub trait EventSink: Send + Sync {
    fn emit(&self, change: &StateChange);
}
