//! Input document discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ignore::WalkBuilder;
use tracing::{debug, info};

use ivrflow_core::{Error, ErrorKind, Result};

use crate::IvrflowOptions;

/// Directories that never hold call-flow exports.
fn should_skip_dir(name: &str) -> bool {
    matches!(
        name,
        // Build output directories
        "target"
            | "build"
            | "dist"
            // Vendor/dependency directories
            | "vendor"
            | "node_modules"
    )
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

fn walk_dir(dir: &str) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(dir);
    builder
        .standard_filters(true)
        .follow_links(false)
        .filter_entry(|entry| {
            // Always include root
            if entry.depth() == 0 {
                return true;
            }
            let Some(file_type) = entry.file_type() else {
                return true;
            };
            if !file_type.is_dir() {
                return true;
            }
            let Some(name) = entry.file_name().to_str() else {
                return true;
            };
            !should_skip_dir(&name.to_ascii_lowercase())
        });

    let mut found = Vec::new();
    for entry in builder.build() {
        let entry = entry.map_err(|e| {
            Error::new(ErrorKind::TraversalFailed, e.to_string())
                .with_operation("discovery::walk_dir")
                .with_context("dir", dir)
        })?;

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        if is_xml(entry.path()) {
            found.push(entry.into_path());
        }
    }

    // The walker yields directory order, which differs between filesystems.
    found.sort();
    Ok(found)
}

/// Collect the documents to process.
///
/// Explicit `files` come first, in the order given, and are taken as-is even
/// without an `.xml` extension; a missing file surfaces later as a read
/// failure of that one document. Each of `dirs` then contributes its `.xml`
/// files in sorted order. Duplicates are dropped.
pub fn discover_files(opts: &IvrflowOptions) -> Result<Vec<PathBuf>> {
    let discovery_start = Instant::now();

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut add_path = |path: PathBuf| {
        if seen.insert(path.clone()) {
            files.push(path);
        } else {
            debug!(path = %path.display(), "duplicate input skipped");
        }
    };

    for file in &opts.files {
        add_path(PathBuf::from(file));
    }
    for dir in &opts.dirs {
        for path in walk_dir(dir)? {
            add_path(path);
        }
    }

    info!(
        "File discovery: {:.2}s ({} files)",
        discovery_start.elapsed().as_secs_f64(),
        files.len()
    );

    if files.is_empty() {
        return Err(Error::invalid_argument(
            "No input files found. Check that the directory contains .xml documents.",
        )
        .with_operation("discovery::discover_files"));
    }

    Ok(files)
}
