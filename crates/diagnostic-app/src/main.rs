// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Diagnostic simulator
//
// Entry point. Loads the optional config file, initialises logging, and runs
// JSON-line plugin calls from stdin against a scripted host, printing one
// JSON reply per line on stdout. Logs go to stderr.
//
// Usage: diagnostic-sim [config.json]

mod config;
mod session;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use diagnostic_core::error::Result;

use config::SimConfig;
use session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args().nth(1);
    let loaded = path.as_deref().map(SimConfig::load).transpose();
    let fallback_filter = match &loaded {
        Ok(Some(config)) => config.diagnostic.log_filter.clone(),
        _ => "info".to_string(),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&fallback_filter)),
        )
        .init();

    let config = match loaded {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "using default config");
            SimConfig::default()
        }
    };

    tracing::info!(host = ?config.host_kind, "diagnostic simulator starting");

    let session = Session::new(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = session.handle_line(&line).await;
        stdout.write_all(format!("{reply}\n").as_bytes()).await?;
        stdout.flush().await?;
    }

    tracing::info!("input closed, shutting down");
    Ok(())
}
