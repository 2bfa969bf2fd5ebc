use std::path::Path;

use crate::cli::ListArgs;

use super::open_ledger;

pub fn execute(args: ListArgs, data_dir: &Path) -> anyhow::Result<()> {
    let history = open_ledger(data_dir).history();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("No scans recorded");
        return Ok(());
    }
    for record in &history {
        println!(
            "{}  {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            record.uid
        );
    }
    Ok(())
}
