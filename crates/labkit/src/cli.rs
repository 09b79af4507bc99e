//! Command-line interface.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::app::concat::{ConcatOptions, Concatenator};
use crate::app::export::{Delivery, Sink};
use crate::app::link::{LinkOutcome, LinkRequest, create_link};
use crate::app::scaffold::{ScaffoldOptions, Scaffolder};
use crate::infra::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "labkit",
    author,
    version,
    about = "Lab productivity utilities",
    long_about = None
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `LABKIT_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Concatenate scripts into one annotated document
    Concat(ConcatArgs),
    /// Link a project directory to shared network storage
    Link(LinkArgs),
    /// Create a new project directory structure
    Scaffold(ScaffoldArgs),
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
#[command(group = clap::ArgGroup::new("sink").multiple(false))]
pub struct ConcatArgs {
    /// Directory to search for scripts
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Explicit files to concatenate, in order; disables directory search
    #[arg(short, long = "file", value_name = "FILE", num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Case-insensitive regex matched against file names
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Only search the top-level directory
    #[arg(long)]
    pub no_recursive: bool,

    /// Text encoding of the scripts (e.g. UTF-8, latin1)
    #[arg(short, long)]
    pub encoding: Option<String>,

    /// Copy the result to the clipboard
    #[arg(long, group = "sink")]
    pub clipboard: bool,

    /// Write the result to a file
    #[arg(short, long, value_name = "PATH", group = "sink")]
    pub output: Option<PathBuf>,

    /// Print the result to stdout
    #[arg(long, group = "sink")]
    pub console: bool,
}

impl ConcatArgs {
    fn sink(&self) -> Option<Sink> {
        if self.clipboard {
            Some(Sink::Clipboard)
        } else if let Some(path) = &self.output {
            Some(Sink::File(path.clone()))
        } else if self.console {
            Some(Sink::Console)
        } else {
            None
        }
    }

    fn into_options(self, config: &Config, working_dir: PathBuf) -> ConcatOptions {
        let sink = self.sink();
        let mut options = ConcatOptions::from_config(config, self.dir, working_dir);
        if !self.files.is_empty() {
            options.files = Some(self.files);
        }
        if let Some(pattern) = self.pattern {
            options.pattern = pattern;
        }
        if self.no_recursive {
            options.recursive = false;
        }
        if let Some(encoding) = self.encoding {
            options.encoding = encoding;
        }
        if let Some(sink) = sink {
            options.sink = sink;
        }
        options
    }
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Shared storage path; defaults to `link.storage_root`
    pub target: Option<PathBuf>,

    /// Name of the link; defaults to the target's directory name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Directory in which to create the link
    #[arg(long, default_value = ".")]
    pub into: PathBuf,

    /// Replace an existing file or link at the destination
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ScaffoldArgs {
    /// Project directory to create
    pub path: PathBuf,

    /// Project name; defaults to the directory name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Author recorded in generated files
    #[arg(short, long)]
    pub author: Option<String>,

    /// Overwrite existing template files
    #[arg(short, long)]
    pub force: bool,
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let config = Config::load().context("failed to load configuration")?;

    match cli.command {
        Commands::Concat(args) => {
            let cwd = std::env::current_dir().context("unable to determine working directory")?;
            let options = args.into_options(&config, cwd);
            let report = Concatenator::new().run(&options)?;
            for warning in &report.warnings {
                tracing::debug!(
                    path = %warning.path.display(),
                    reason = %warning.reason,
                    "skipped content"
                );
            }
            if let Delivery::Clipboard { copied: false } = report.delivery {
                tracing::warn!("re-run with --console or --output to capture the result");
            }
        }
        Commands::Link(args) => {
            let request =
                LinkRequest::resolve(&config, args.target, args.name, args.into, args.force)?;
            if create_link(&request)? == LinkOutcome::AlreadyLinked {
                tracing::debug!(link = %request.link_path.display(), "nothing to do");
            }
        }
        Commands::Scaffold(args) => {
            let mut options = ScaffoldOptions::from_config(&config, args.path, args.name);
            if args.author.is_some() {
                options.author = args.author;
            }
            options.force = args.force;
            Scaffolder::new()?.scaffold(&options)?;
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}
