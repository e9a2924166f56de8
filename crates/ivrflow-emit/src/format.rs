//! Output format names.

use std::str::FromStr;

use ivrflow_core::{Error, Result};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Text formats an emitter can produce directly from a graph model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum TextFormat {
    #[strum(to_string = "dot", serialize = "gv")]
    Dot,
    #[strum(to_string = "mermaid", serialize = "mmd")]
    Mermaid,
    #[strum(to_string = "plantuml", serialize = "puml", serialize = "uml")]
    PlantUml,
}

impl TextFormat {
    /// File extension for artifacts in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            TextFormat::Dot => "dot",
            TextFormat::Mermaid => "mmd",
            TextFormat::PlantUml => "puml",
        }
    }
}

/// Parse a user-supplied format name.
pub fn parse_format(name: &str) -> Result<TextFormat> {
    TextFormat::from_str(name.trim())
        .map_err(|_| Error::unsupported_format(name).with_operation("emit::parse_format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivrflow_core::ErrorKind;
    use strum::IntoEnumIterator;

    #[test]
    fn names_and_aliases() {
        assert_eq!(parse_format("dot").unwrap(), TextFormat::Dot);
        assert_eq!(parse_format("GV").unwrap(), TextFormat::Dot);
        assert_eq!(parse_format("mmd").unwrap(), TextFormat::Mermaid);
        assert_eq!(parse_format(" uml ").unwrap(), TextFormat::PlantUml);
        assert_eq!(TextFormat::PlantUml.to_string(), "plantuml");
    }

    #[test]
    fn unknown_format_is_unsupported() {
        let err = parse_format("png").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(err.context_value("format"), Some("png"));
    }

    #[test]
    fn extensions_are_distinct() {
        let mut extensions: Vec<&str> = TextFormat::iter().map(|f| f.extension()).collect();
        extensions.dedup();
        assert_eq!(extensions, vec!["dot", "mmd", "puml"]);
    }
}
