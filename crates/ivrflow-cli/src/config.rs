//! `ivrflow.toml` loading.

use std::fs;
use std::path::{Path, PathBuf};

use ivrflow_core::{Error, Result};
use serde::Deserialize;

/// Settings read from a configuration file. Unset keys stay `None` so the
/// command line can tell "not configured" apart from "configured off".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub formats: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub stamp: Option<bool>,
    pub parallel: Option<bool>,
    pub annotate_source: Option<bool>,
    #[serde(default)]
    pub render: RenderConfig,
}

/// The external Graphviz invocation used for SVG output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    #[serde(default = "RenderConfig::default_program")]
    pub program: String,
    #[serde(default = "RenderConfig::default_args")]
    pub args: Vec<String>,
}

impl RenderConfig {
    fn default_program() -> String {
        "dot".to_string()
    }

    fn default_args() -> Vec<String> {
        vec!["-Tsvg".to_string()]
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            program: Self::default_program(),
            args: Self::default_args(),
        }
    }
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| {
            Error::config_invalid(err.message().to_string())
                .with_operation("config::parse")
                .set_source(err)
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            Error::from(err)
                .with_operation("config::from_path")
                .with_context("path", path.display().to_string())
        })?;
        Self::parse(&text).map_err(|err| err.with_context("path", path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivrflow_core::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_file() {
        let config = FileConfig::parse(
            r#"
formats = ["svg", "mermaid"]
output_dir = "diagrams"
stamp = true
parallel = true

[render]
program = "/usr/local/bin/dot"
"#,
        )
        .unwrap();

        assert_eq!(
            config.formats,
            Some(vec!["svg".to_string(), "mermaid".to_string()])
        );
        assert_eq!(config.output_dir, Some(PathBuf::from("diagrams")));
        assert_eq!(config.stamp, Some(true));
        assert_eq!(config.annotate_source, None);
        assert_eq!(config.render.program, "/usr/local/bin/dot");
        assert_eq!(config.render.args, vec!["-Tsvg".to_string()]);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::parse("colour = true\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let err = FileConfig::parse("[render]\nengine = \"neato\"\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = FileConfig::parse("stamp = \"yes\"\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = FileConfig::from_path("/nonexistent/ivrflow.toml").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.context_value("path"), Some("/nonexistent/ivrflow.toml"));
    }
}
