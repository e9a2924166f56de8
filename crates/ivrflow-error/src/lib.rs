//! # ivrflow-error
//!
//! Unified error handling for ivrflow.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g., MalformedInput, RenderFailed)
//! - **ErrorStatus**: Decide whether the caller may retry it
//! - **Error Context**: Carry the document name, stage and other key/value hints
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use ivrflow_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::SchemaError, "expected top-level module collection missing")
//!         .with_operation("extract::extract_modules")
//!         .with_context("document", "main_menu.xml"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, ivrflow_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - An error is classified once, callers further up only append context

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the ivrflow Error
pub type Result<T> = std::result::Result<T, Error>;
