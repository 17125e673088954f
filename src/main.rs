use anyhow::Result;
use clap::Parser;
use justmark::cli::{self, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::run(&cli)
}
