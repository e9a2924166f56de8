//! Command-line options for the ivrflow binary.
//!
//! Every option here is optional on the command line; anything left unset
//! falls back to `ivrflow.toml` and then to the built-in defaults (see
//! [`crate::IvrflowOptions::resolve`]).

use std::path::PathBuf;

use clap::Args;

/// Which documents to compile.
#[derive(Args, Debug, Clone, Default)]
pub struct InputOptions {
    /// Individual XML documents to compile (repeatable)
    #[arg(
        short = 'f',
        long = "file",
        value_name = "FILE",
        num_args = 1..,
        action = clap::ArgAction::Append
    )]
    pub files: Vec<String>,

    /// Directories to scan recursively for `.xml` documents (repeatable)
    #[arg(
        short = 'd',
        long = "dir",
        value_name = "DIR",
        num_args = 1..,
        action = clap::ArgAction::Append
    )]
    pub dirs: Vec<String>,
}

/// Which artifacts to produce and where.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputOptions {
    /// Output format: 'dot', 'svg', 'mermaid' (or 'mmd'), 'plantuml' (or 'puml').
    /// Repeatable; defaults to all four.
    #[arg(long = "format", value_name = "FORMAT", action = clap::ArgAction::Append)]
    pub formats: Vec<String>,

    /// Directory that receives the artifacts
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Append a millisecond timestamp to every artifact name
    #[arg(long)]
    pub stamp: bool,

    /// Add a note with the source file name to DOT and SVG output
    #[arg(long = "annotate-source")]
    pub annotate_source: bool,
}

/// How documents are processed.
#[derive(Args, Debug, Clone, Default)]
pub struct ProcessingOptions {
    /// Process documents in parallel (output order stays stable)
    #[arg(long)]
    pub parallel: bool,

    /// Graphviz program used to render SVG
    #[arg(long = "dot-program", value_name = "PROGRAM")]
    pub dot_program: Option<String>,
}

/// Everything that shapes a batch run.
#[derive(Args, Debug, Clone, Default)]
pub struct CliOptions {
    #[command(flatten)]
    pub input: InputOptions,

    #[command(flatten)]
    pub output: OutputOptions,

    #[command(flatten)]
    pub processing: ProcessingOptions,
}

impl CliOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.output_dir = Some(dir.into());
        self
    }
}
