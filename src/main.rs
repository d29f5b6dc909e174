use anyhow::Result;
use clap::Parser;
use nlblocks_core::cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();
    nlblocks_core::init_logging(args.verbose)?;
    nlblocks_core::run_cli(&args)
}
