//! Text emitters for compiled IVR graphs.
//!
//! Each emitter reads only the [`GraphModel`] and owns its own identifier and
//! escaping rules.
//!
//! # Module Structure
//!
//! - [`dot`]: Graphviz DOT, the input of the SVG render step
//! - [`mermaid`]: Mermaid flowchart
//! - [`plantuml`]: PlantUML state diagram
//! - [`format`]: format names, aliases and file extensions

pub mod dot;
pub mod format;
pub mod mermaid;
pub mod plantuml;

use ivrflow_core::{GraphModel, Result};
use tracing::debug;

pub use dot::{DotBuilder, render_dot};
pub use format::{TextFormat, parse_format};
pub use mermaid::render_mermaid;
pub use plantuml::render_plantuml;

/// Knobs shared by all emitters. Only DOT has any today.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions {
    /// Add a note node with the model's source name (DOT only).
    pub annotate_source: bool,
}

/// Emit `graph` in `format` with default options.
pub fn emit(graph: &GraphModel, format: TextFormat) -> String {
    emit_with(graph, format, &EmitOptions::default())
}

pub fn emit_with(graph: &GraphModel, format: TextFormat, options: &EmitOptions) -> String {
    let text = match format {
        TextFormat::Dot => render_dot(graph, options.annotate_source),
        TextFormat::Mermaid => render_mermaid(graph),
        TextFormat::PlantUml => render_plantuml(graph),
    };
    debug!(%format, bytes = text.len(), "emitted");
    text
}

/// Emit by format name; unknown names fail with `UnsupportedFormat`.
pub fn emit_named(graph: &GraphModel, format: &str) -> Result<String> {
    Ok(emit(graph, parse_format(format)?))
}
