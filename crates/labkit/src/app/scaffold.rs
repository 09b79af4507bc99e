//! New project scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use minijinja::Environment;
use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::domain::errors::DomainError;
use crate::infra::config::Config;

/// Inputs for creating a project tree.
#[derive(Debug, Clone)]
pub struct ScaffoldOptions {
    pub root: PathBuf,
    pub name: String,
    pub author: Option<String>,
    pub directories: Vec<String>,
    pub force: bool,
}

impl ScaffoldOptions {
    /// Build options for `root`, naming the project after its final path component unless
    /// `name` is given. Paths such as `.` are resolved first.
    pub fn from_config(config: &Config, root: PathBuf, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| directory_name(&root));
        Self {
            root,
            name,
            author: config.scaffold.author.clone(),
            directories: config.scaffold.directories(),
            force: false,
        }
    }
}

/// Paths touched by a scaffold run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaffoldReport {
    pub created_dirs: Vec<PathBuf>,
    pub written_files: Vec<PathBuf>,
    pub skipped_files: Vec<PathBuf>,
}

/// Renders the built-in project templates.
pub struct Scaffolder {
    env: Environment<'static>,
}

impl Scaffolder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: default_environment()?,
        })
    }

    pub fn scaffold(&self, options: &ScaffoldOptions) -> Result<ScaffoldReport> {
        validate_name(&options.name)?;

        let mut report = ScaffoldReport::default();
        ensure_dir(&options.root, &mut report)?;
        for dir in &options.directories {
            ensure_dir(&options.root.join(dir), &mut report)?;
        }

        let context = TemplateContext {
            name: options.name.clone(),
            author: options.author.clone(),
            created: today()?,
            directories: options.directories.clone(),
        };

        for (template, relative) in project_files(&options.name) {
            let path = options.root.join(&relative);
            if path.exists() && !options.force {
                tracing::warn!(path = %path.display(), "file exists; leaving it untouched");
                report.skipped_files.push(path);
                continue;
            }

            let rendered = self
                .env
                .get_template(template)
                .and_then(|tpl| tpl.render(&context))
                .map_err(|err| anyhow!("failed to render template '{template}': {err}"))?;
            if let Some(parent) = path.parent() {
                ensure_dir(parent, &mut report)?;
            }
            fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            report.written_files.push(path);
        }

        tracing::info!(
            root = %options.root.display(),
            dirs = report.created_dirs.len(),
            files = report.written_files.len(),
            skipped = report.skipped_files.len(),
            "project scaffolded"
        );
        Ok(report)
    }
}

fn directory_name(root: &Path) -> String {
    fs::canonicalize(root)
        .or_else(|_| std::path::absolute(root))
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    let invalid = name.trim().is_empty()
        || name.contains(['/', '\\'])
        || name == "."
        || name == "..";
    if invalid {
        return Err(DomainError::InvalidProjectName(name.to_owned()));
    }
    Ok(())
}

fn ensure_dir(path: &Path, report: &mut ScaffoldReport) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory {}", path.display()))?;
    report.created_dirs.push(path.to_path_buf());
    Ok(())
}

fn today() -> Result<String> {
    let format = format_description!("[year]-[month]-[day]");
    OffsetDateTime::now_utc()
        .format(&format)
        .context("failed to format scaffold date")
}

fn project_files(name: &str) -> [(&'static str, String); 4] {
    [
        ("readme", "README.md".to_owned()),
        ("gitignore", ".gitignore".to_owned()),
        ("rproj", format!("{name}.Rproj")),
        ("labkit_config", ".labkit/config.toml".to_owned()),
    ]
}

fn default_environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    for (name, source) in [
        ("readme", README_TEMPLATE),
        ("gitignore", GITIGNORE_TEMPLATE),
        ("rproj", RPROJ_TEMPLATE),
        ("labkit_config", LABKIT_CONFIG_TEMPLATE),
    ] {
        env.add_template(name, source)
            .map_err(|err| anyhow!("failed to register template '{name}': {err}"))?;
    }
    Ok(env)
}

#[derive(Serialize)]
struct TemplateContext {
    name: String,
    author: Option<String>,
    created: String,
    directories: Vec<String>,
}

const README_TEMPLATE: &str = r#"# {{ name }}

Created {{ created }}{% if author %} by {{ author }}{% endif %}.

## Layout

{% for dir in directories %}
- `{{ dir }}/`
{% endfor %}

Raw data in `data/raw` is read-only; scripts write derived data to `data/processed`.
"#;

const GITIGNORE_TEMPLATE: &str = r#".Rproj.user/
.Rhistory
.RData
.Ruserdata
renv/library/
data/raw/
output/
*.html
"#;

const RPROJ_TEMPLATE: &str = r#"Version: 1.0

RestoreWorkspace: No
SaveWorkspace: No
AlwaysSaveHistory: Default

EnableCodeIndexing: Yes
UseSpacesForTab: Yes
NumSpacesForTab: 2
Encoding: UTF-8

AutoAppendNewline: Yes
StripTrailingWhitespace: Yes
"#;

const LABKIT_CONFIG_TEMPLATE: &str = r#"# labkit settings for {{ name }}

[concat]
pattern = '\.(r|rmd|qmd)$'
recursive = true
encoding = "UTF-8"

[ignore]
paths = ["data/", "output/"]
"#;
