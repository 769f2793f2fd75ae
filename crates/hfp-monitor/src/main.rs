//! HFP Monitor
//!
//! Replays a capture file, standard input, or a live serial link through the
//! HFP parser and logs every completed command with its decoded fields.

mod session;
mod settings;
mod source;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hfp_parser::command::{self, CommandForm};
use hfp_parser::{CommandId, ConnectionRecord};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use session::Session;
use settings::MonitorSettings;
use source::Source;

const DEFAULT_LOG_FILTER: &str = "hfp_monitor=info,hfp_parser=info";

#[derive(Parser, Debug)]
#[command(name = "hfp-monitor", version, about)]
struct Cli {
    /// Capture file to replay (standard input when neither --input nor --port is given)
    #[arg(long, conflicts_with = "port")]
    input: Option<PathBuf>,
    /// Serial port carrying the HFP link
    #[arg(long)]
    port: Option<String>,
    /// Serial baud rate (overrides the settings file)
    #[arg(long)]
    baud: Option<u32>,
    /// JSON settings file with indicator tables
    #[arg(long)]
    config: Option<PathBuf>,
    /// Command this side sent before the capture, in wire syntax (e.g. "AT+CIND?")
    #[arg(long, value_parser = parse_sent_command)]
    sent: Option<CommandId>,
    /// Print the final connection record as JSON on stdout
    #[arg(long)]
    json: bool,
    /// Tracing filter (overrides RUST_LOG)
    #[arg(long)]
    log_filter: Option<String>,
}

/// Resolve a command given in wire syntax
fn parse_sent_command(text: &str) -> Result<CommandId, String> {
    let text = text.trim();
    let (name, form) = if let Some(name) = text.strip_suffix("=?") {
        (name, CommandForm::Test)
    } else if let Some((name, _)) = text.split_once('=') {
        (name, CommandForm::Set)
    } else {
        // A trailing `?` turns the action form into the read form
        (text, CommandForm::Action)
    };

    match command::resolve(name.as_bytes(), form, CommandId::None).id {
        CommandId::Unknown => Err(format!("unknown command: {}", text)),
        id => Ok(id),
    }
}

fn init_logging(cli_filter: Option<&str>, settings_filter: Option<&str>) {
    let filter = match cli_filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(settings_filter.unwrap_or(DEFAULT_LOG_FILTER))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => MonitorSettings::load(path)?,
        None => MonitorSettings::default(),
    };
    init_logging(cli.log_filter.as_deref(), settings.log_filter.as_deref());

    let registry = settings
        .registry()
        .context("Invalid indicator tables in settings")?
        .install()
        .context("Failed to install indicator registry")?;
    info!(
        "{} AG indicators, {} generic status indicators",
        registry.ag_indicators_nr(),
        registry.generic_status_indicator_descriptors().len()
    );

    let mut session = Session::new(ConnectionRecord::new());
    if let Some(sent) = cli.sent {
        session.set_sent_command(sent);
    }

    let source = Source::select(cli.input, cli.port, cli.baud.unwrap_or(settings.baud_rate));
    info!("Monitoring {}", source);
    let mut reader = source.open().await?;
    let mut buffer = vec![0u8; settings.read_buffer_size.max(1)];

    loop {
        tokio::select! {
            read = reader.read(&mut buffer) => {
                let n = read.with_context(|| format!("Failed to read from {}", source))?;
                if n == 0 {
                    break;
                }
                session.feed(&buffer[..n]);
            }
            _ = tokio::signal::ctrl_c(), if !source.is_finite() => {
                info!("Interrupted");
                break;
            }
        }
    }

    let conn = session.connection();
    if conn.parser_state().in_command() {
        info!("Stream ended inside a command ({:?})", conn.parser_state());
    }
    info!(
        "{} lines, {} unknown, last command {:?}",
        session.lines(),
        session.unknown_lines(),
        conn.command()
    );

    if cli.json {
        let json = serde_json::to_string_pretty(conn).context("Failed to serialize record")?;
        println!("{}", json);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sent_command() {
        assert_eq!(
            parse_sent_command("AT+CIND?"),
            Ok(CommandId::RetrieveAgIndicatorsStatus)
        );
        assert_eq!(
            parse_sent_command("AT+CIND=?"),
            Ok(CommandId::RetrieveAgIndicators)
        );
        assert_eq!(
            parse_sent_command("AT+BIND=?"),
            Ok(CommandId::RetrieveGenericStatusIndicators)
        );
        assert_eq!(
            parse_sent_command("at+bind=1,2"),
            Ok(CommandId::GenericStatusIndicator)
        );
        assert!(parse_sent_command("AT+NREC=0").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "hfp-monitor",
            "--input",
            "capture.log",
            "--sent",
            "AT+BIND=?",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("capture.log")));
        assert_eq!(cli.sent, Some(CommandId::RetrieveGenericStatusIndicators));
        assert!(cli.json);

        assert!(Cli::try_parse_from(["hfp-monitor", "--input", "a", "--port", "b"]).is_err());
    }
}
