use std::path::PathBuf;
use std::time::Instant;

use clap::ArgGroup;
use clap::Parser;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(target_env = "msvc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use ivrflow_cli::{CliOptions, FileConfig, GraphvizCommand, IvrflowOptions, OutputFormat};
use ivrflow_cli::{run_main, run_single};
use ivrflow_core::Result;

#[derive(Parser, Debug)]
#[command(
    name = "ivrflow",
    about = "ivrflow: turn IVR call-flow XML into DOT, SVG, Mermaid and PlantUML diagrams",
    version,
    group = ArgGroup::new("inputs").required(true).multiple(true).args(["files", "dirs"])
)]
pub struct Cli {
    #[command(flatten)]
    options: CliOptions,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the batch report as JSON to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Compile a single document and print one format to stdout instead of writing files
    #[arg(long, value_name = "FORMAT")]
    stdout: Option<String>,
}

pub fn run(args: Cli) -> Result<()> {
    let total_start = Instant::now();

    // Initialize tracing subscriber for logging
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let config = match &args.config {
        Some(path) => FileConfig::from_path(path)?,
        None => FileConfig::default(),
    };
    let opts = IvrflowOptions::resolve(&args.options, config)?;
    let delegate = GraphvizCommand::from_config(&opts.render);

    if let Some(name) = &args.stdout {
        let format = OutputFormat::parse(name)?;
        print!("{}", run_single(&opts, format, &delegate)?);
        return Ok(());
    }

    let report = run_main(&opts, &delegate)?;
    print!("{}", report.summary());

    if let Some(path) = &args.report {
        std::fs::write(path, report.to_json()?)?;
        tracing::info!(path = %path.display(), "report written");
    }

    let total_secs = total_start.elapsed().as_secs_f64();
    tracing::info!(total_secs, "complete");
    eprintln!("Total time: {total_secs:.2}s");

    if report.failed > 0 {
        return Err(format!(
            "{} of {} documents failed",
            report.failed,
            report.documents.len()
        )
        .into());
    }
    Ok(())
}

pub fn main() -> Result<()> {
    let args = Cli::parse();
    run(args)
}
