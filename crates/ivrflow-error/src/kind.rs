//! Error kinds for ivrflow operations

use strum_macros::{Display, IntoStaticStr};

/// The kind of error that occurred.
///
/// Callers match on the kind to tell a bad input document apart from a
/// misconfigured tool or a failing rendering backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration file or values
    ConfigInvalid,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Compile errors
    // =========================================================================
    /// The input text is not well-formed XML
    MalformedInput,

    /// Well-formed XML that lacks the expected module collection
    SchemaError,

    // =========================================================================
    // Emit errors
    // =========================================================================
    /// An output format name the emitters do not implement
    UnsupportedFormat,

    /// Serialization of a report or snapshot failed
    SerializationFailed,

    // =========================================================================
    // Render errors
    // =========================================================================
    /// The rendering backend ran but rejected the graph
    RenderFailed,

    /// The rendering backend could not be started
    RenderUnavailable,

    // =========================================================================
    // File/IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Directory traversal failed
    TraversalFailed,

    /// Timeout occurred
    Timeout,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::IoFailed | ErrorKind::RenderUnavailable
        )
    }

    /// The document itself is at fault (not well-formed, or wrong shape).
    pub fn is_input_error(&self) -> bool {
        matches!(self, ErrorKind::MalformedInput | ErrorKind::SchemaError)
    }

    /// The rendering backend is at fault, not the document.
    pub fn is_render_error(&self) -> bool {
        matches!(self, ErrorKind::RenderFailed | ErrorKind::RenderUnavailable)
    }
}
