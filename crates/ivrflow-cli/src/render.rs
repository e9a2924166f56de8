//! SVG rendering through an external layout engine.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use ivrflow_core::{Error, Result};
use tracing::debug;

use crate::config::RenderConfig;

const RENDER_OP: &str = "render::render_svg";

/// Turns DOT text into SVG text.
///
/// Passed explicitly to the pipeline; one delegate serves every document of a
/// batch, possibly from several threads at once.
pub trait RenderDelegate: Send + Sync {
    fn render_svg(&self, dot: &str) -> Result<String>;
}

/// Runs a Graphviz program once per document, DOT on stdin and SVG on stdout.
#[derive(Debug, Clone)]
pub struct GraphvizCommand {
    program: String,
    args: Vec<String>,
}

impl GraphvizCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.program.clone(), config.args.iter().cloned())
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for GraphvizCommand {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl RenderDelegate for GraphvizCommand {
    fn render_svg(&self, dot: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                Error::render_unavailable(&self.program)
                    .with_operation(RENDER_OP)
                    .set_source(err)
            })?;

        // Large graphs fill the stdout pipe before stdin is drained, so feed
        // stdin from its own thread while this one collects the output.
        let stdin = child.stdin.take();
        let (output, fed) = thread::scope(|scope| {
            let feeder = stdin.map(|mut stdin| scope.spawn(move || stdin.write_all(dot.as_bytes())));
            let output = child.wait_with_output();
            let fed = match feeder {
                Some(handle) => handle
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked"))),
                None => Ok(()),
            };
            (output, fed)
        });

        let output = output.map_err(|err| {
            Error::render_failed(format!("waiting for '{}' failed", self.program))
                .with_operation(RENDER_OP)
                .set_source(err)
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::render_failed(format!(
                "'{}' exited with {}",
                self.program, output.status
            ))
            .with_operation(RENDER_OP)
            .with_context("program", self.program.as_str())
            .with_context("stderr", stderr));
        }

        if let Err(err) = fed {
            return Err(Error::render_failed("could not write DOT to the render program")
                .with_operation(RENDER_OP)
                .with_context("program", self.program.as_str())
                .set_source(err));
        }

        let svg = String::from_utf8(output.stdout).map_err(|err| {
            Error::render_failed("render output is not valid UTF-8")
                .with_operation(RENDER_OP)
                .with_context("program", self.program.as_str())
                .set_source(err)
        })?;
        debug!(program = %self.program, bytes = svg.len(), "rendered svg");
        Ok(svg)
    }
}
