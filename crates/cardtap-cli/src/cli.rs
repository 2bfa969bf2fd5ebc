use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cardtap",
    version,
    about = "Contactless card reader session",
    long_about = "Runs a supervised session against a card reader and inspects the \
                  persisted scan history.\n\
                  The `run` command drives a simulated reader from stdin: each line \
                  is a card UID in hex."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding history.json and unique_uids.json
    #[arg(
        long,
        global = true,
        env = "CARDTAP_DATA_DIR",
        default_value = "data"
    )]
    pub data_dir: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a session against a stdin-driven simulated reader
    Run(RunArgs),
    /// Show the recent scan history
    History(ListArgs),
    /// Show every unique UID ever scanned
    Unique(ListArgs),
    /// Export the unique UIDs as CSV
    Export(ExportArgs),
    /// Empty the scan history (unique UIDs are kept)
    ClearHistory,
}

#[derive(Args)]
pub struct RunArgs {
    /// Name reported by the simulated reader
    #[arg(long, env = "CARDTAP_READER_NAME", default_value = "Mock NFC Reader")]
    pub reader_name: String,

    /// Initialization attempts before giving up
    #[arg(long, env = "CARDTAP_MAX_INIT_ATTEMPTS", default_value_t = 60)]
    pub max_init_attempts: u32,

    /// Delay between initialization attempts, in milliseconds
    #[arg(long, env = "CARDTAP_RETRY_DELAY_MS", default_value_t = 5_000)]
    pub retry_delay_ms: u64,

    /// Delay between initialization and the readiness check, in milliseconds
    #[arg(long, env = "CARDTAP_SETTLE_DELAY_MS", default_value_t = 300)]
    pub settle_delay_ms: u64,

    /// Wait before reconnecting to a lost reader, in milliseconds
    #[arg(long, env = "CARDTAP_COOLDOWN_MS", default_value_t = 5_000)]
    pub cooldown_ms: u64,

    /// How long a scanned UID stays on the display, in milliseconds
    #[arg(long, env = "CARDTAP_DWELL_MS", default_value_t = 2_000)]
    pub dwell_ms: u64,
}

#[derive(Args)]
pub struct ListArgs {
    /// Print JSON instead of plain text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
