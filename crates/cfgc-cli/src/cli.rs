use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cfgc",
    about = "Compile XML configuration definitions into fixed-record configuration stores",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log every record written
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compile a definition document into a store directory
    Compile(CompileArgs),
    /// Count the records a definition document compiles to
    Count(CountArgs),
    /// Print the contents of a compiled store
    Dump(DumpArgs),
}

#[derive(Args)]
pub struct CompileArgs {
    /// Definition document
    #[arg(short, long)]
    pub input: PathBuf,
    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,
    /// TOML file overriding record sizes
    #[arg(long)]
    pub layout: Option<PathBuf>,
    /// Replace an existing output directory
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CountArgs {
    /// Definition document
    #[arg(short, long)]
    pub input: PathBuf,
    /// TOML file overriding record sizes
    #[arg(long)]
    pub layout: Option<PathBuf>,
}

#[derive(Args)]
pub struct DumpArgs {
    /// Store directory
    pub store: PathBuf,
}
