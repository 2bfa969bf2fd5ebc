use std::path::Path;

use cardtap_session::UniqueIdentifiers;

use crate::cli::ListArgs;

use super::open_ledger;

pub fn execute(args: ListArgs, data_dir: &Path) -> anyhow::Result<()> {
    let list = open_ledger(data_dir).unique_identifiers();
    let unique = UniqueIdentifiers {
        count: list.len(),
        list,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&unique)?);
        return Ok(());
    }

    for uid in &unique.list {
        println!("{}", uid);
    }
    println!("{} unique UIDs", unique.count);
    Ok(())
}
