use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = labkit::cli::Cli::parse();
    labkit::init(cli.verbose);

    labkit::cli::run(cli)
}
