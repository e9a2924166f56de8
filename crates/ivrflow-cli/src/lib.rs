//! ivrflow command-line interface.
//!
pub mod config;
pub mod discovery;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod render;

use std::path::PathBuf;

use ivrflow_core::{Error, Result};

pub use config::{FileConfig, RenderConfig};
pub use options::{CliOptions, InputOptions, OutputOptions, ProcessingOptions};
pub use output::{Artifact, OutputFormat};
pub use pipeline::{BatchReport, DocumentFailure, DocumentOutcome, Stage, process_files};
pub use render::{GraphvizCommand, RenderDelegate};

const DEFAULT_OUTPUT_DIR: &str = "out";

/// Options for running ivrflow, after merging command line and config file.
#[derive(Debug, Clone)]
pub struct IvrflowOptions {
    pub files: Vec<String>,
    pub dirs: Vec<String>,
    pub formats: Vec<OutputFormat>,
    pub output_dir: PathBuf,
    pub stamp: bool,
    pub parallel: bool,
    pub annotate_source: bool,
    pub render: RenderConfig,
}

impl Default for IvrflowOptions {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            dirs: Vec::new(),
            formats: output::DEFAULT_FORMATS.to_vec(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            stamp: false,
            parallel: false,
            annotate_source: false,
            render: RenderConfig::default(),
        }
    }
}

impl IvrflowOptions {
    /// Command-line values win; the config file fills whatever they leave
    /// unset. Switches are on if either source turns them on.
    pub fn resolve(cli: &CliOptions, config: FileConfig) -> Result<Self> {
        let defaults = Self::default();

        let formats = if !cli.output.formats.is_empty() {
            output::parse_formats(&cli.output.formats)?
        } else if let Some(names) = &config.formats {
            output::parse_formats(names).map_err(|err| {
                Error::config_invalid(err.message().to_string()).with_context("key", "formats")
            })?
        } else {
            defaults.formats
        };
        if formats.is_empty() {
            return Err(Error::config_invalid("at least one output format is required")
                .with_context("key", "formats"));
        }

        let mut render = config.render;
        if let Some(program) = &cli.processing.dot_program {
            render.program = program.clone();
        }

        Ok(Self {
            files: cli.input.files.clone(),
            dirs: cli.input.dirs.clone(),
            formats,
            output_dir: cli
                .output
                .output_dir
                .clone()
                .or(config.output_dir)
                .unwrap_or(defaults.output_dir),
            stamp: cli.output.stamp || config.stamp.unwrap_or(false),
            parallel: cli.processing.parallel || config.parallel.unwrap_or(false),
            annotate_source: cli.output.annotate_source || config.annotate_source.unwrap_or(false),
            render,
        })
    }
}

/// Main entry point: discover the documents and process them all.
pub fn run_main(opts: &IvrflowOptions, delegate: &dyn RenderDelegate) -> Result<BatchReport> {
    let files = discovery::discover_files(opts)?;
    process_files(opts, &files, delegate)
}

/// Compile exactly one input document and return one format's text.
pub fn run_single(
    opts: &IvrflowOptions,
    format: OutputFormat,
    delegate: &dyn RenderDelegate,
) -> Result<String> {
    let files = discovery::discover_files(opts)?;
    let [path] = files.as_slice() else {
        return Err(Error::invalid_argument(format!(
            "--stdout needs exactly one input document, found {}",
            files.len()
        ))
        .with_operation("run_single"));
    };
    pipeline::render_single(path, format, opts, delegate)
}
