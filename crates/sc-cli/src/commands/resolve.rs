//! Resolve command: print where a sandbox's console lives

use anyhow::Result;
use sc_core::config::ConsoleConfig;
use sc_core::Console;

pub async fn resolve_command(config: ConsoleConfig, sandbox_id: &str) -> Result<()> {
    let console = Console::new(config)?;
    let address = console.resolve(sandbox_id).await?;
    println!("{}", address);
    Ok(())
}
