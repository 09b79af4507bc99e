//! Script concatenation: discover, annotate, deliver.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::app::export::{Delivery, Exporter, Sink};
use crate::app::scan::{Scanner, ScannerConfig};
use crate::domain::model::{AnnotatedBlock, ConcatenationResult, FileRecord};
use crate::infra::clipboard::Clipboard;
use crate::infra::config::{Config, Ignore};
use crate::infra::encoding::TextDecoder;

/// Runtime options for a single concatenation.
#[derive(Debug, Clone)]
pub struct ConcatOptions {
    /// Directory searched when no explicit file list is given.
    pub base_dir: PathBuf,
    /// Explicit files, used verbatim and in order instead of discovery.
    pub files: Option<Vec<PathBuf>>,
    pub pattern: String,
    pub recursive: bool,
    pub ignore: Ignore,
    pub sink: Sink,
    pub encoding: String,
    /// Headers show paths relative to this directory.
    pub working_dir: PathBuf,
}

impl ConcatOptions {
    /// Build options from configuration defaults.
    pub fn from_config(config: &Config, base_dir: PathBuf, working_dir: PathBuf) -> Self {
        let sink = config.concat.sink().parse().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to clipboard output");
            Sink::Clipboard
        });
        Self {
            base_dir,
            files: None,
            pattern: config.concat.pattern(),
            recursive: config.concat.recursive(),
            ignore: config.ignore.clone(),
            sink,
            encoding: config.concat.encoding(),
            working_dir,
        }
    }

    fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            root: self.base_dir.clone(),
            pattern: self.pattern.clone(),
            recursive: self.recursive,
            ignore: self.ignore.clone(),
        }
    }
}

/// A file whose contents could not be read or decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadWarning {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a concatenation run.
#[derive(Debug, Clone)]
pub struct ConcatReport {
    pub result: ConcatenationResult,
    pub warnings: Vec<ReadWarning>,
    pub delivery: Delivery,
}

/// Annotate a single file. Read failures yield an empty body plus a warning.
pub fn annotate(
    path: &Path,
    working_dir: &Path,
    decoder: &TextDecoder,
) -> (AnnotatedBlock, Option<ReadWarning>) {
    let record = FileRecord::new(path, working_dir);
    match decoder.read_file(&record.path) {
        Ok(content) => (AnnotatedBlock::from_record(&record, Some(&content)), None),
        Err(err) => {
            let reason = format!("{err:#}");
            tracing::warn!(
                path = %record.path.display(),
                encoding = decoder.name(),
                error = %reason,
                "could not read file; emitting empty block"
            );
            let warning = ReadWarning {
                path: record.path.clone(),
                reason,
            };
            (AnnotatedBlock::from_record(&record, None), Some(warning))
        }
    }
}

/// Annotate `files` in order.
pub fn concatenate(
    files: &[PathBuf],
    working_dir: &Path,
    decoder: &TextDecoder,
) -> (ConcatenationResult, Vec<ReadWarning>) {
    let mut blocks = Vec::with_capacity(files.len());
    let mut warnings = Vec::new();
    for path in files {
        let (block, warning) = annotate(path, working_dir, decoder);
        blocks.push(block);
        warnings.extend(warning);
    }
    (ConcatenationResult::new(blocks), warnings)
}

/// Runs concatenations against a fixed clipboard strategy.
#[derive(Debug)]
pub struct Concatenator {
    scanner: Scanner,
    exporter: Exporter,
}

impl Concatenator {
    /// Detect the platform clipboard once and reuse it.
    pub fn new() -> Self {
        Self::with_clipboard(Clipboard::detect())
    }

    pub fn with_clipboard(clipboard: Clipboard) -> Self {
        Self {
            scanner: Scanner::new(),
            exporter: Exporter::new(clipboard),
        }
    }

    /// Run with console output going to stdout.
    pub fn run(&mut self, options: &ConcatOptions) -> Result<ConcatReport> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.run_with_console(options, &mut lock)
    }

    pub fn run_with_console(
        &mut self,
        options: &ConcatOptions,
        console: &mut dyn Write,
    ) -> Result<ConcatReport> {
        let decoder = TextDecoder::for_label(&options.encoding)?;

        let files = match &options.files {
            Some(files) => files.clone(),
            None => self
                .scanner
                .scan(&options.scanner_config())
                .context("failed to discover scripts")?,
        };

        if files.is_empty() {
            tracing::info!(
                dir = %options.base_dir.display(),
                pattern = %options.pattern,
                "no matching files found"
            );
            return Ok(ConcatReport {
                result: ConcatenationResult::default(),
                warnings: Vec::new(),
                delivery: Delivery::Skipped,
            });
        }

        let (result, warnings) = concatenate(&files, &options.working_dir, &decoder);
        let delivery = self.exporter.deliver(&result, &options.sink, console)?;

        Ok(ConcatReport {
            result,
            warnings,
            delivery,
        })
    }
}

impl Default for Concatenator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unreadable_file_keeps_header_and_fences() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("bad.R");
        fs::write(&path, b"x <- \xff\xfe")?;

        let (block, warning) = annotate(&path, temp.path(), &TextDecoder::default());

        assert_eq!(block.header, "## File: [bad.R]");
        assert_eq!(block.fence_open, "```r");
        assert!(block.body_lines.is_empty());
        let warning = warning.expect("warning for bad file");
        assert_eq!(warning.path, path);
        Ok(())
    }

    #[test]
    fn missing_file_degrades_to_empty_block() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("vanished.qmd");

        let (block, warning) = annotate(&path, temp.path(), &TextDecoder::default());

        assert_eq!(block.fence_open, "```qmd");
        assert!(block.body_lines.is_empty());
        assert!(warning.is_some());
    }

    #[test]
    fn unknown_encoding_fails_before_reading() {
        let temp = tempfile::tempdir().unwrap();
        let mut options = ConcatOptions::from_config(
            &Config::default(),
            temp.path().to_path_buf(),
            temp.path().to_path_buf(),
        );
        options.encoding = "not-an-encoding".into();
        options.sink = Sink::Console;

        let mut out = Vec::new();
        let result = Concatenator::with_clipboard(Clipboard::unavailable())
            .run_with_console(&options, &mut out);
        assert!(result.is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn options_fall_back_to_clipboard_for_unknown_sink() {
        let mut config = Config::default();
        config.concat = toml::from_str("sink = \"fax\"").unwrap();
        let options = ConcatOptions::from_config(&config, PathBuf::from("."), PathBuf::from("."));
        assert_eq!(options.sink, Sink::Clipboard);
    }
}
