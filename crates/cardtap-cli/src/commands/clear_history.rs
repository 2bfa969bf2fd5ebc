use std::path::Path;

use anyhow::Context;

use super::open_ledger;

pub fn execute(data_dir: &Path) -> anyhow::Result<()> {
    open_ledger(data_dir)
        .clear_history()
        .context("Failed to save the cleared history")?;
    println!("History cleared");
    Ok(())
}
