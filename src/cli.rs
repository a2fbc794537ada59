use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable counts
    Summary,
    /// Full handle lists and batch statistics as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "modmap")]
#[command(about = "Parse a Python codebase into a deduplicated AST store", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse stubs and sources and report the resulting handle sets
    Ingest {
        /// Project source root
        path: PathBuf,

        /// Typeshed-style stub root; each top-level subdirectory is one stub package
        #[arg(long)]
        typeshed: Option<PathBuf>,

        /// Additional search-path root (repeatable, precedence order)
        #[arg(long = "search-path")]
        search_paths: Vec<PathBuf>,

        /// Glob pattern excluded from every scan (repeatable)
        #[arg(long = "ignore")]
        ignore_patterns: Vec<String>,

        /// Optional TOML config file; flags override file values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Disable the parallel scheduler
        #[arg(long)]
        sequential: bool,

        /// Worker threads for the parallel scheduler
        #[arg(long)]
        jobs: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "summary")]
        format: OutputFormat,
    },
}
