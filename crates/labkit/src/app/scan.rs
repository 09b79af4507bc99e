//! Script discovery.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use regex::{Regex, RegexBuilder};

use crate::domain::errors::DomainError;
use crate::infra::config::Ignore;

/// Configuration inputs for the scanner.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub root: PathBuf,
    pub pattern: String,
    pub recursive: bool,
    pub ignore: Ignore,
}

/// Walks a directory and returns the files whose names match a case-insensitive pattern.
#[derive(Debug, Default)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    /// Matching files in walk order: sorted by name within each directory, depth first.
    pub fn scan(&self, cfg: &ScannerConfig) -> Result<Vec<PathBuf>> {
        if !cfg.root.is_dir() {
            bail!("search directory does not exist: {}", cfg.root.display());
        }

        let pattern = compile_pattern(&cfg.pattern)?;
        let matcher = build_ignore_matcher(&cfg.ignore)?;

        let mut builder = WalkBuilder::new(&cfg.root);
        builder
            .standard_filters(false)
            .hidden(true)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b));
        if !cfg.recursive {
            builder.max_depth(Some(1));
        }

        let root = cfg.root.clone();
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            !matcher.should_skip(rel)
        });

        let mut files = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if pattern.is_match(&name) {
                files.push(entry.into_path());
            }
        }

        tracing::debug!(
            root = %cfg.root.display(),
            matched = files.len(),
            "script discovery finished"
        );
        Ok(files)
    }
}

/// Compile a file-name pattern, always case-insensitive.
pub fn compile_pattern(pattern: &str) -> Result<Regex, DomainError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| DomainError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })
}

#[derive(Debug, Clone)]
struct IgnoreMatcher {
    globs: GlobSet,
}

impl IgnoreMatcher {
    fn should_skip(&self, rel: &Path) -> bool {
        self.globs.is_match(rel)
    }
}

fn build_ignore_matcher(ignore: &Ignore) -> Result<IgnoreMatcher> {
    let mut builder = GlobSetBuilder::new();

    for pattern in &ignore.paths {
        for expanded in expand_dir_pattern(pattern) {
            let glob = Glob::new(&expanded).context("invalid ignore path pattern")?;
            builder.add(glob);
        }
    }

    for glob in &ignore.globs {
        let glob = Glob::new(glob).context("invalid ignore glob")?;
        builder.add(glob);
    }

    let globs = builder.build().context("failed to build ignore matcher")?;
    Ok(IgnoreMatcher { globs })
}

fn expand_dir_pattern(raw: &str) -> Vec<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    vec![
        trimmed.to_owned(),
        format!("{trimmed}/**"),
        format!("**/{trimmed}"),
        format!("**/{trimmed}/**"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::Config;
    use std::fs;

    impl ScannerConfig {
        fn from_root(root: PathBuf, config: &Config) -> Self {
            Self {
                root,
                pattern: config.concat.pattern(),
                recursive: config.concat.recursive(),
                ignore: config.ignore.clone(),
            }
        }

        fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
            self.pattern = pattern.into();
            self
        }

        fn with_recursive(mut self, recursive: bool) -> Self {
            self.recursive = recursive;
            self
        }
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|path| {
                path.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn matches_default_extensions_case_insensitively() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("sub"))?;
        fs::write(root.join("a.R"), "x <- 1")?;
        fs::write(root.join("b.rmd"), "text")?;
        fs::write(root.join("c.QMD"), "text")?;
        fs::write(root.join("notes.txt"), "skip")?;
        fs::write(root.join("sub/d.r"), "y <- 2")?;

        let cfg = ScannerConfig::from_root(root.to_path_buf(), &Config::default());
        let files = Scanner::new().scan(&cfg)?;

        assert_eq!(names(root, &files), ["a.R", "b.rmd", "c.QMD", "sub/d.r"]);
        Ok(())
    }

    #[test]
    fn non_recursive_stays_at_top_level() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("nested"))?;
        fs::write(root.join("top.R"), "")?;
        fs::write(root.join("nested/deep.R"), "")?;

        let cfg = ScannerConfig::from_root(root.to_path_buf(), &Config::default())
            .with_recursive(false);
        let files = Scanner::new().scan(&cfg)?;

        assert_eq!(names(root, &files), ["top.R"]);
        Ok(())
    }

    #[test]
    fn respects_ignore_paths_and_globs() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::create_dir_all(root.join("renv/library"))?;
        fs::create_dir_all(root.join("scripts"))?;
        fs::write(root.join("renv/library/pkg.R"), "")?;
        fs::write(root.join("scripts/clean.R"), "")?;
        fs::write(root.join("scripts/clean_old.R"), "")?;

        let mut config = Config::default();
        config.ignore.paths.push("renv/".into());
        config.ignore.globs.push("**/*_old.R".into());

        let cfg = ScannerConfig::from_root(root.to_path_buf(), &config);
        let files = Scanner::new().scan(&cfg)?;

        assert_eq!(names(root, &files), ["scripts/clean.R"]);
        Ok(())
    }

    #[test]
    fn custom_pattern_and_empty_result() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path();
        fs::write(root.join("model.py"), "")?;

        let cfg = ScannerConfig::from_root(root.to_path_buf(), &Config::default());
        assert!(Scanner::new().scan(&cfg)?.is_empty());

        let cfg = cfg.with_pattern(r"\.PY$");
        assert_eq!(names(root, &Scanner::new().scan(&cfg)?), ["model.py"]);
        Ok(())
    }

    #[test]
    fn missing_root_and_bad_pattern_are_errors() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let missing = ScannerConfig::from_root(temp.path().join("nope"), &Config::default());
        assert!(Scanner::new().scan(&missing).is_err());

        let err = compile_pattern("(unclosed").unwrap_err();
        assert!(matches!(err, DomainError::InvalidPattern { .. }));
        Ok(())
    }
}
