//! Byte sources the monitor can read HFP traffic from

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncRead;
use tokio_serial::SerialPortBuilderExt;

/// Boxed async reader over any source
pub type SourceReader = Pin<Box<dyn AsyncRead + Send>>;

/// Where the byte stream comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Capture file replayed from start to end
    File(PathBuf),
    /// Standard input
    Stdin,
    /// Live serial link (RFCOMM TTY or UART)
    Serial { port: String, baud_rate: u32 },
}

impl Source {
    /// Pick the source from the command line options
    ///
    /// A serial port takes precedence over an input file; with neither,
    /// standard input is read.
    pub fn select(input: Option<PathBuf>, port: Option<String>, baud_rate: u32) -> Self {
        match (port, input) {
            (Some(port), _) => Source::Serial { port, baud_rate },
            (None, Some(path)) => Source::File(path),
            (None, None) => Source::Stdin,
        }
    }

    /// Returns whether the source ends on its own
    pub fn is_finite(&self) -> bool {
        !matches!(self, Source::Serial { .. })
    }

    /// Open the source for reading
    pub async fn open(&self) -> Result<SourceReader> {
        match self {
            Source::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                Ok(Box::pin(file))
            }
            Source::Stdin => Ok(Box::pin(tokio::io::stdin())),
            Source::Serial { port, baud_rate } => {
                let stream = tokio_serial::new(port, *baud_rate)
                    .timeout(Duration::from_millis(100))
                    .open_native_async()
                    .with_context(|| format!("Failed to open {} at {} baud", port, baud_rate))?;
                Ok(Box::pin(stream))
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Stdin => write!(f, "stdin"),
            Source::Serial { port, baud_rate } => write!(f, "{} @ {} baud", port, baud_rate),
        }
    }
}
