use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest for the labkit crate
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Check formatting and run clippy with warnings denied
    Lint,
    /// Accept pending insta snapshots
    Snapshots,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile, release)?,
        Commands::Lint => run_lint()?,
        Commands::Snapshots => cargo(&["insta", "accept", "--workspace"])?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool) -> Result<()> {
    let mut args = vec!["nextest", "run", "-p", "labkit"];
    if let Some(profile) = profile.as_deref() {
        args.extend(["--profile", profile]);
    }
    if release {
        args.push("--release");
    }
    cargo(&args)
}

fn run_lint() -> Result<()> {
    cargo(&["fmt", "--all", "--", "--check"])?;
    cargo(&[
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ])
}

fn cargo(args: &[&str]) -> Result<()> {
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("cargo {} failed", args.join(" "));
    }
    Ok(())
}
