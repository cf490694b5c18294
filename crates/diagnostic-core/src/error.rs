// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the diagnostic bridge.

use thiserror::Error;

use crate::types::RequestId;

/// Top-level error type for all diagnostic operations.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    // -- Permission errors --
    #[error("Permission name '{0}' is not a valid permission")]
    UnknownPermission(String),

    #[error("no pending permission request with id={0}")]
    RequestNotFound(RequestId),

    #[error("every permission request id is in use")]
    RequestTableFull,

    // -- Action dispatch --
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("platform bridge error: {0}")]
    Bridge(String),

    #[error("not supported on this platform: {0}")]
    PlatformUnsupported(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DiagnosticError>;
