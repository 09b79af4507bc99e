//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".labkit/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub concat: Concat,
    #[serde(default)]
    pub ignore: Ignore,
    #[serde(default)]
    pub link: Link,
    #[serde(default)]
    pub scaffold: Scaffold,
}

/// Defaults for `labkit concat`. Unset fields fall back to built-in values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Concat {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    recursive: Option<bool>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    sink: Option<String>,
}

impl Concat {
    fn default_pattern() -> &'static str {
        r"\.(r|rmd|qmd)$"
    }

    fn default_encoding() -> &'static str {
        "UTF-8"
    }

    fn default_sink() -> &'static str {
        "clipboard"
    }

    pub fn pattern(&self) -> String {
        self.pattern
            .clone()
            .unwrap_or_else(|| Self::default_pattern().to_owned())
    }

    pub fn recursive(&self) -> bool {
        self.recursive.unwrap_or(true)
    }

    pub fn encoding(&self) -> String {
        self.encoding
            .clone()
            .unwrap_or_else(|| Self::default_encoding().to_owned())
    }

    pub fn sink(&self) -> String {
        self.sink
            .clone()
            .unwrap_or_else(|| Self::default_sink().to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Ignore {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub globs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Link {
    #[serde(default)]
    pub storage_root: Option<PathBuf>,
    #[serde(default)]
    default_name: Option<String>,
}

impl Link {
    pub fn default_name(&self) -> String {
        self.default_name
            .clone()
            .unwrap_or_else(|| "shared".to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Scaffold {
    #[serde(default)]
    directories: Option<Vec<String>>,
    #[serde(default)]
    pub author: Option<String>,
}

impl Scaffold {
    fn default_directories() -> Vec<String> {
        [
            "data/raw",
            "data/processed",
            "scripts",
            "output/figures",
            "output/tables",
            "docs",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect()
    }

    pub fn directories(&self) -> Vec<String> {
        self.directories
            .clone()
            .unwrap_or_else(Self::default_directories)
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    pattern: Option<String>,
    encoding: Option<String>,
    sink: Option<String>,
    storage_root: Option<PathBuf>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            pattern: env::var("LABKIT_PATTERN").ok(),
            encoding: env::var("LABKIT_ENCODING").ok(),
            sink: env::var("LABKIT_SINK").ok(),
            storage_root: env::var_os("LABKIT_STORAGE_ROOT").map(PathBuf::from),
        }
    }

    #[cfg(test)]
    fn for_tests(encoding: &str, sink: &str) -> Self {
        Self {
            encoding: Some(encoding.to_owned()),
            sink: Some(sink.to_owned()),
            ..Self::default()
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading global config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            tracing::debug!(path = %workspace_path.display(), "loading workspace config");
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data).with_context(|| format!("in config file {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            concat: merge_concat(self.concat, other.concat),
            ignore: merge_ignore(self.ignore, other.ignore),
            link: merge_link(self.link, other.link),
            scaffold: merge_scaffold(self.scaffold, other.scaffold),
        }
    }
}

fn merge_concat(base: Concat, overlay: Concat) -> Concat {
    Concat {
        pattern: overlay.pattern.or(base.pattern),
        recursive: overlay.recursive.or(base.recursive),
        encoding: overlay.encoding.or(base.encoding),
        sink: overlay.sink.or(base.sink),
    }
}

fn merge_ignore(base: Ignore, overlay: Ignore) -> Ignore {
    let mut paths: BTreeSet<String> = base.paths.into_iter().collect();
    paths.extend(overlay.paths);

    let mut globs: BTreeSet<String> = base.globs.into_iter().collect();
    globs.extend(overlay.globs);

    Ignore {
        paths: paths.into_iter().collect(),
        globs: globs.into_iter().collect(),
    }
}

fn merge_link(base: Link, overlay: Link) -> Link {
    Link {
        storage_root: overlay.storage_root.or(base.storage_root),
        default_name: overlay.default_name.or(base.default_name),
    }
}

fn merge_scaffold(base: Scaffold, overlay: Scaffold) -> Scaffold {
    Scaffold {
        directories: overlay.directories.or(base.directories),
        author: overlay.author.or(base.author),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("labkit/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(pattern) = env.pattern {
        config.concat.pattern = Some(pattern);
    }
    if let Some(encoding) = env.encoding {
        config.concat.encoding = Some(encoding);
    }
    if let Some(sink) = env.sink {
        config.concat.sink = Some(sink);
    }
    if let Some(root) = env.storage_root {
        config.link.storage_root = Some(root);
    }
    config
}
