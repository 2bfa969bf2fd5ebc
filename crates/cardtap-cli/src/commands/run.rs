//! `cardtap run`: a live session against a simulated reader.
//!
//! Each stdin line is handed to the reader as if a card were presented.
//! Control lines inject faults so the recovery paths can be exercised by
//! hand.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cardtap_core::CardIdentifier;
use cardtap_hardware::devices::AnyCardReader;
use cardtap_hardware::mock::{MockReader, MockReaderHandle};
use cardtap_hardware::{CardReader, HardwareError};
use cardtap_session::{ScanEvent, Session, SessionConfig, SessionHandle};
use cardtap_storage::JsonFileStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::RunArgs;

/// One line of operator input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Blank,
    Quit,
    Disconnect,
    ReadError,
    Card(CardIdentifier),
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "" => Input::Blank,
        "q" | "x" => Input::Quit,
        "!disconnect" => Input::Disconnect,
        "!error" => Input::ReadError,
        text => match CardIdentifier::parse(text) {
            Ok(uid) => Input::Card(uid),
            Err(e) => Input::Invalid(e.to_string()),
        },
    }
}

fn session_config(args: &RunArgs) -> SessionConfig {
    SessionConfig::default()
        .with_max_init_attempts(args.max_init_attempts)
        .with_init_retry_delay(Duration::from_millis(args.retry_delay_ms))
        .with_settle_delay(Duration::from_millis(args.settle_delay_ms))
        .with_reconnect_cooldown(Duration::from_millis(args.cooldown_ms))
        .with_display_dwell(Duration::from_millis(args.dwell_ms))
}

pub async fn execute(args: RunArgs, data_dir: &Path) -> anyhow::Result<()> {
    let (reader, cards) = MockReader::with_name(args.reader_name.as_str());
    let (scans_tx, mut scans) = mpsc::unbounded_channel::<ScanEvent>();

    let session = Session::builder(
        AnyCardReader::Mock(reader),
        Arc::new(JsonFileStore::new(data_dir)),
    )
    .with_config(session_config(&args))
    .with_observer(Arc::new(scans_tx))
    .build()?;
    let session = Arc::new(session);
    let handle = session.handle();

    info!("Using data directory {}", data_dir.display());

    let supervisor = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.run().await }
    });

    let printer = tokio::spawn(async move {
        while let Some(scan) = scans.recv().await {
            let marker = if scan.first_seen { " (new)" } else { "" };
            println!("{}  tap #{}{}", scan.record.uid, scan.tap_count, marker);
        }
    });

    let feeder = tokio::spawn(feed_stdin(cards, handle.clone()));

    let interrupt = tokio::spawn({
        let handle = handle.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.shutdown();
            }
        }
    });

    let result = supervisor.await.context("Session task panicked")?;
    feeder.abort();
    interrupt.abort();

    // The last observer goes with the session, which ends the printer.
    drop(session);
    printer.await.ok();

    result?;
    Ok(())
}

async fn feed_stdin<R: CardReader>(
    cards: MockReaderHandle,
    session: SessionHandle<R>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Type a card UID in hex to present it; !disconnect, !error, q to quit");

    while let Some(line) = lines.next_line().await? {
        match parse_input(&line) {
            Input::Blank => {}
            Input::Quit => break,
            Input::Disconnect => {
                cards
                    .fail_next_read(HardwareError::disconnected("simulated disconnect"))
                    .await?
            }
            Input::ReadError => {
                cards
                    .fail_next_read(HardwareError::card_read("simulated read error"))
                    .await?
            }
            Input::Card(uid) => cards.present_card(uid.to_bytes()).await?,
            Input::Invalid(reason) => eprintln!("Ignoring input: {}", reason),
        }
    }

    session.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_commands() {
        assert_eq!(parse_input("   "), Input::Blank);
        assert_eq!(parse_input("q"), Input::Quit);
        assert_eq!(parse_input("x\n"), Input::Quit);
        assert_eq!(parse_input("!disconnect"), Input::Disconnect);
        assert_eq!(parse_input("!error"), Input::ReadError);
    }

    #[test]
    fn test_parse_input_card() {
        assert_eq!(
            parse_input(" 04abcdef "),
            Input::Card(CardIdentifier::parse("04ABCDEF").unwrap())
        );
        assert!(matches!(parse_input("xyz"), Input::Invalid(_)));
    }
}
