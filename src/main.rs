use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = user_vault::cli::Cli::parse();
    cli.run()
}
