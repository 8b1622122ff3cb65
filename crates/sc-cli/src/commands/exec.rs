//! Exec command: attach this terminal to a sandbox debug console

use anyhow::Result;
use sc_core::config::ConsoleConfig;
use sc_core::{Console, LocalTerminal};

/// Attach stdin/stdout to the console of `sandbox_id` until it closes
pub async fn exec_command(config: ConsoleConfig, sandbox_id: &str) -> Result<()> {
    let console = Console::new(config)?;
    let stats = console
        .attach(sandbox_id, LocalTerminal::current())
        .await?;

    tracing::info!(
        sandbox = sandbox_id,
        sent = stats.sent,
        received = stats.received,
        "Console session ended"
    );
    Ok(())
}
