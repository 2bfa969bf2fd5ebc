use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod exit_codes;

use cardtap_session::ExportError;
use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match cli.command {
        cli::Command::Run(args) => commands::run::execute(args, &cli.data_dir).await,
        cli::Command::History(args) => commands::history::execute(args, &cli.data_dir),
        cli::Command::Unique(args) => commands::unique::execute(args, &cli.data_dir),
        cli::Command::Export(args) => commands::export::execute(args, &cli.data_dir),
        cli::Command::ClearHistory => commands::clear_history::execute(&cli.data_dir),
    };

    let exit_code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if matches!(
                e.downcast_ref::<ExportError>(),
                Some(ExportError::NothingToExport)
            ) {
                exit_codes::NOTHING_TO_EXPORT
            } else {
                exit_codes::FAILURE
            }
        }
    };

    std::process::exit(exit_code);
}
