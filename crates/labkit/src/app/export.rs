//! Output sinks for concatenated scripts.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::domain::model::ConcatenationResult;
use crate::infra::clipboard::Clipboard;

/// Where a concatenation is delivered. Exactly one sink is used per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Clipboard,
    File(PathBuf),
    Console,
}

impl FromStr for Sink {
    type Err = SinkParseError;

    /// Parses the sinks that need no argument; file sinks come from an explicit path.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clipboard" | "clip" => Ok(Sink::Clipboard),
            "console" | "stdout" => Ok(Sink::Console),
            other => Err(SinkParseError::UnknownSink(other.to_string())),
        }
    }
}

/// Error returned when parsing a [`Sink`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SinkParseError {
    #[error("unknown output sink '{0}' (expected 'clipboard' or 'console')")]
    UnknownSink(String),
}

/// What happened to the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing matched, so no sink was touched.
    Skipped,
    Clipboard { copied: bool },
    File(PathBuf),
    Console,
}

/// Delivers a finished concatenation to its sink.
#[derive(Debug)]
pub struct Exporter {
    clipboard: Clipboard,
}

impl Exporter {
    pub fn new(clipboard: Clipboard) -> Self {
        Self { clipboard }
    }

    /// Write `result` to `sink`. Console output goes to `console`.
    pub fn deliver(
        &mut self,
        result: &ConcatenationResult,
        sink: &Sink,
        console: &mut dyn Write,
    ) -> Result<Delivery> {
        match sink {
            Sink::Clipboard => {
                let copied = self.clipboard.copy(&result.joined());
                if copied {
                    tracing::info!(blocks = result.len(), "copied scripts to clipboard");
                } else {
                    tracing::warn!("scripts were not copied to the clipboard");
                }
                Ok(Delivery::Clipboard { copied })
            }
            Sink::File(path) => {
                write_file(result, path)?;
                tracing::info!(
                    blocks = result.len(),
                    path = %path.display(),
                    "wrote concatenated scripts"
                );
                Ok(Delivery::File(path.clone()))
            }
            Sink::Console => {
                for block in result.rendered() {
                    writeln!(console, "{block}").context("failed to write to stdout")?;
                }
                console.flush().context("failed to flush stdout")?;
                tracing::info!(blocks = result.len(), "printed concatenated scripts to stdout");
                Ok(Delivery::Console)
            }
        }
    }
}

fn write_file(result: &ConcatenationResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }
    fs::write(path, result.joined().as_bytes())
        .with_context(|| format!("failed to write output to {}", path.display()))
}
