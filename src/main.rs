use anyhow::Result;
use clap::Parser;
use modmap::cli::{Cli, Commands, OutputFormat};
use modmap::config::ModmapConfig;
use modmap::pipeline::Ingestor;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest {
            path,
            typeshed,
            search_paths,
            ignore_patterns,
            config,
            sequential,
            jobs,
            format,
        } => run_ingest(
            path,
            typeshed,
            search_paths,
            ignore_patterns,
            config,
            sequential,
            jobs,
            format,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_ingest(
    path: PathBuf,
    typeshed: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    ignore_patterns: Vec<String>,
    config_file: Option<PathBuf>,
    sequential: bool,
    jobs: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let mut config = match config_file {
        Some(config_path) => ModmapConfig::from_file(&config_path)?,
        None => ModmapConfig::new(&path),
    };
    config.source_root = path;
    if typeshed.is_some() {
        config.typeshed = typeshed;
    }
    config.search_paths.extend(search_paths);
    config.ignore_patterns.extend(ignore_patterns);
    if sequential {
        config.parallel.enabled = false;
    }
    if jobs.is_some() {
        config.parallel.max_concurrency = jobs;
    }

    let ingestor = Ingestor::new(config)?;
    let result = ingestor.parse_all()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Summary => {
            println!(
                "stubs: {} handles ({} discovered, {} failed)",
                result.stubs.len(),
                result.stub_stats.discovered,
                result.stub_stats.unparsed()
            );
            println!(
                "sources: {} handles ({} discovered, {} failed)",
                result.sources.len(),
                result.source_stats.discovered,
                result.source_stats.unparsed()
            );
        }
    }
    Ok(())
}
