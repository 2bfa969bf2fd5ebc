use std::path::Path;

use anyhow::Context;

use crate::cli::ExportArgs;

use super::open_ledger;

pub fn execute(args: ExportArgs, data_dir: &Path) -> anyhow::Result<()> {
    let csv = open_ledger(data_dir).export_csv()?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &csv)
                .with_context(|| format!("Failed to write export file '{}'", path.display()))?;
            eprintln!(
                "Exported {} UIDs to {}",
                csv.lines().count().saturating_sub(1),
                path.display()
            );
        }
        None => print!("{}", csv),
    }
    Ok(())
}
