//! Output formats and artifact files.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::debug;

use ivrflow_core::{Error, Result};
use ivrflow_emit::{TextFormat, parse_format};

/// Anything the batch driver can write: an emitter's text or rendered SVG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Text(TextFormat),
    Svg,
}

/// What a run produces when neither the command line nor the config file
/// names any format.
pub const DEFAULT_FORMATS: [OutputFormat; 4] = [
    OutputFormat::Text(TextFormat::Dot),
    OutputFormat::Svg,
    OutputFormat::Text(TextFormat::Mermaid),
    OutputFormat::Text(TextFormat::PlantUml),
];

impl OutputFormat {
    pub fn parse(name: &str) -> Result<Self> {
        if name.trim().eq_ignore_ascii_case("svg") {
            return Ok(OutputFormat::Svg);
        }
        parse_format(name).map(OutputFormat::Text)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text(format) => format.extension(),
            OutputFormat::Svg => "svg",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, OutputFormat::Text(_))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text(format) => write!(f, "{format}"),
            OutputFormat::Svg => f.write_str("svg"),
        }
    }
}

/// Parse format names, keeping the first occurrence of each format.
pub fn parse_formats<I, S>(names: I) -> Result<Vec<OutputFormat>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut formats = Vec::new();
    for name in names {
        let format = OutputFormat::parse(name.as_ref())?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

/// One file written for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub format: String,
    pub path: PathBuf,
}

/// Milliseconds since the Unix epoch, used to keep repeated runs apart.
pub fn stamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// `<file stem>[_<millis>]` for a source document.
pub fn artifact_stem(source: &Path, stamp: Option<u128>) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    match stamp {
        Some(millis) => format!("{stem}_{millis}"),
        None => stem,
    }
}

/// One stem per source, in input order, unique within the batch.
///
/// Sources sharing a file stem (`a/main.xml`, `b/main.xml`) get `_2`, `_3`, ...
/// after the first one. Every stem carries the same `stamp`.
pub fn assign_stems(sources: &[PathBuf], stamp: Option<u128>) -> Vec<String> {
    let mut claimed = HashSet::with_capacity(sources.len());
    sources
        .iter()
        .map(|source| {
            let base = artifact_stem(source, stamp);
            let mut stem = base.clone();
            let mut counter = 2;
            while !claimed.insert(stem.clone()) {
                stem = format!("{base}_{counter}");
                counter += 1;
            }
            if counter > 2 {
                debug!(source = %source.display(), %stem, "artifact stem already taken");
            }
            stem
        })
        .collect()
}

/// Writes artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Create the writer, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            Error::from(err)
                .with_operation("output::create_dir")
                .with_context("dir", dir.display().to_string())
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, stem: &str, format: OutputFormat, contents: &str) -> Result<Artifact> {
        let path = self.dir.join(format!("{stem}.{}", format.extension()));
        fs::write(&path, contents).map_err(|err| {
            Error::from(err)
                .with_operation("output::write_artifact")
                .with_context("path", path.display().to_string())
        })?;
        debug!(path = %path.display(), bytes = contents.len(), "artifact written");
        Ok(Artifact {
            format: format.to_string(),
            path,
        })
    }
}
