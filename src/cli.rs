use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nlblocks-rs",
    about = "Generates agent-based model source from a saved block-editor project."
)]
pub struct Args {
    #[arg(value_name = "INPUT", help = "Project JSON (registries + workspace).")]
    pub input: Option<PathBuf>,

    #[arg(value_name = "OUTPUT", help = "Write generated source here instead of stdout.")]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = 2, help = "Spaces per indentation level.")]
    pub indent: usize,

    #[arg(long, help = "Omit the globals/breed declaration prefix.")]
    pub no_prefix: bool,

    #[arg(long, help = "List every block type in the catalog and exit.")]
    pub list_blocks: bool,

    #[arg(short, long, help = "Log registry and generator activity (RUST_LOG overrides).")]
    pub verbose: bool,
}
