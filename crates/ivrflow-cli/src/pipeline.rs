//! Batch pipeline: read → compile → emit → render → write, one document at a time.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use strum_macros::{Display, IntoStaticStr};
use tracing::{info, warn};

use ivrflow_core::{Error, ErrorKind, GraphModel, Result, compile};
use ivrflow_emit::{EmitOptions, emit_with, render_dot};

use crate::IvrflowOptions;
use crate::output::{Artifact, ArtifactWriter, OutputFormat, assign_stems, stamp_millis};
use crate::render::RenderDelegate;

/// Where a document's processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Read,
    Compile,
    Render,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub stage: Stage,
    pub kind: String,
    pub message: String,
}

impl DocumentFailure {
    fn new(stage: Stage, err: &Error) -> Self {
        Self {
            stage,
            kind: err.kind().as_str().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of one document. Artifacts written before a failure are kept.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub source: PathBuf,
    pub artifacts: Vec<Artifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<DocumentFailure>,
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Per-document results of a batch, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub documents: Vec<DocumentOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn from_outcomes(documents: Vec<DocumentOutcome>) -> Self {
        let failed = documents.iter().filter(|d| !d.is_success()).count();
        Self {
            succeeded: documents.len() - failed,
            failed,
            documents,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| {
            Error::new(ErrorKind::SerializationFailed, err.to_string())
                .with_operation("pipeline::report_json")
                .set_source(err)
        })
    }

    /// Human-readable listing, one block per document.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for doc in &self.documents {
            match &doc.failure {
                None => {
                    let _ = writeln!(out, "ok      {}", doc.source.display());
                }
                Some(failure) => {
                    let _ = writeln!(
                        out,
                        "FAILED  {} [{}] {}",
                        doc.source.display(),
                        failure.stage,
                        failure.message
                    );
                }
            }
            for artifact in &doc.artifacts {
                let _ = writeln!(out, "        -> {}", artifact.path.display());
            }
        }
        let _ = writeln!(
            out,
            "{} documents, {} succeeded, {} failed",
            self.documents.len(),
            self.succeeded,
            self.failed
        );
        out
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read and compile one document, tagging the failing stage.
pub fn load_graph(path: &Path) -> std::result::Result<GraphModel, (Stage, Error)> {
    let text = fs::read_to_string(path).map_err(|err| {
        let err = Error::from(err)
            .with_operation("pipeline::read")
            .with_context("path", path.display().to_string());
        (Stage::Read, err)
    })?;
    let graph = compile(&text).map_err(|err| {
        (
            Stage::Compile,
            err.with_context("document", path.display().to_string()),
        )
    })?;
    Ok(graph.with_source(source_name(path)))
}

/// Produce one format for a compiled graph.
pub fn produce(
    graph: &GraphModel,
    format: OutputFormat,
    options: &EmitOptions,
    delegate: &dyn RenderDelegate,
) -> Result<String> {
    match format {
        OutputFormat::Text(text_format) => Ok(emit_with(graph, text_format, options)),
        OutputFormat::Svg => delegate.render_svg(&render_dot(graph, options.annotate_source)),
    }
}

fn run_document(
    path: &Path,
    stem: &str,
    opts: &IvrflowOptions,
    delegate: &dyn RenderDelegate,
    writer: &ArtifactWriter,
    artifacts: &mut Vec<Artifact>,
) -> std::result::Result<(), (Stage, Error)> {
    let graph = load_graph(path)?;
    let emit_options = EmitOptions {
        annotate_source: opts.annotate_source,
    };

    // Text formats first: they cannot fail, so a broken render engine still
    // leaves them on disk.
    let text_formats = opts.formats.iter().filter(|f| f.is_text());
    let rendered_formats = opts.formats.iter().filter(|f| !f.is_text());
    for &format in text_formats.chain(rendered_formats) {
        let stage = if format.is_text() {
            Stage::Compile
        } else {
            Stage::Render
        };
        let body = produce(&graph, format, &emit_options, delegate)
            .map_err(|err| (stage, err.with_context("document", path.display().to_string())))?;
        let artifact = writer
            .write(stem, format, &body)
            .map_err(|err| (Stage::Write, err))?;
        artifacts.push(artifact);
    }
    Ok(())
}

/// Process one document, writing `<stem>.<ext>` files. Never fails; failures
/// are recorded in the outcome.
pub fn process_document(
    path: &Path,
    stem: &str,
    opts: &IvrflowOptions,
    delegate: &dyn RenderDelegate,
    writer: &ArtifactWriter,
) -> DocumentOutcome {
    let start = Instant::now();
    let mut artifacts = Vec::new();
    let failure = match run_document(path, stem, opts, delegate, writer, &mut artifacts) {
        Ok(()) => {
            info!(
                "Processed {}: {:.3}s ({} artifacts)",
                path.display(),
                start.elapsed().as_secs_f64(),
                artifacts.len()
            );
            None
        }
        Err((stage, err)) => {
            warn!(path = %path.display(), %stage, error = %err, "document failed");
            Some(DocumentFailure::new(stage, &err))
        }
    };

    DocumentOutcome {
        source: path.to_path_buf(),
        artifacts,
        failure,
    }
}

/// Process every file; one document's failure never stops the others.
///
/// Only an unusable output directory fails the whole batch.
pub fn process_files(
    opts: &IvrflowOptions,
    files: &[PathBuf],
    delegate: &dyn RenderDelegate,
) -> Result<BatchReport> {
    let batch_start = Instant::now();
    let writer = ArtifactWriter::new(&opts.output_dir)?;
    info!(
        "Processing {} documents into {}",
        files.len(),
        writer.dir().display()
    );

    // Stems are claimed before any work starts so parallel runs stay stable.
    let stems = assign_stems(files, opts.stamp.then(stamp_millis));
    let outcomes: Vec<DocumentOutcome> = if opts.parallel {
        files
            .par_iter()
            .zip(stems.par_iter())
            .map(|(path, stem)| process_document(path, stem, opts, delegate, &writer))
            .collect()
    } else {
        files
            .iter()
            .zip(&stems)
            .map(|(path, stem)| process_document(path, stem, opts, delegate, &writer))
            .collect()
    };

    let report = BatchReport::from_outcomes(outcomes);
    info!(
        "Batch: {:.2}s ({} succeeded, {} failed)",
        batch_start.elapsed().as_secs_f64(),
        report.succeeded,
        report.failed
    );
    Ok(report)
}

/// Compile one document and return a single format's text.
pub fn render_single(
    path: &Path,
    format: OutputFormat,
    opts: &IvrflowOptions,
    delegate: &dyn RenderDelegate,
) -> Result<String> {
    let graph = load_graph(path).map_err(|(_, err)| err)?;
    let options = EmitOptions {
        annotate_source: opts.annotate_source,
    };
    produce(&graph, format, &options, delegate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivrflow_emit::TextFormat;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FLOW: &str = r#"<ivrScript><modules>
  <incomingCall><moduleId>A</moduleId><moduleName>Start</moduleName><singleDescendant>B</singleDescendant></incomingCall>
  <play><moduleId>B</moduleId><moduleName>Welcome</moduleName></play>
</modules></ivrScript>"#;

    /// Wraps the DOT text so tests can see what was rendered.
    #[derive(Default)]
    struct FakeSvg {
        calls: AtomicUsize,
    }

    impl RenderDelegate for FakeSvg {
        fn render_svg(&self, dot: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("<svg><!-- {} --></svg>", dot.lines().count()))
        }
    }

    struct BrokenEngine;

    impl RenderDelegate for BrokenEngine {
        fn render_svg(&self, _dot: &str) -> Result<String> {
            Err(Error::render_failed("layout crashed"))
        }
    }

    fn options(out: &Path, formats: &[&str]) -> IvrflowOptions {
        IvrflowOptions {
            formats: crate::output::parse_formats(formats).unwrap(),
            output_dir: out.to_path_buf(),
            ..IvrflowOptions::default()
        }
    }

    fn file_names(outcome: &DocumentOutcome) -> Vec<String> {
        outcome
            .artifacts
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn writes_every_requested_format() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("main.xml");
        fs::write(&input, FLOW).unwrap();
        let out = tmp.path().join("out");
        let delegate = FakeSvg::default();

        let report = process_files(
            &options(&out, &["svg", "dot", "mermaid", "plantuml"]),
            &[input],
            &delegate,
        )
        .unwrap();

        assert_eq!((report.succeeded, report.failed), (1, 0));
        assert_eq!(
            file_names(&report.documents[0]),
            vec!["main.dot", "main.mmd", "main.puml", "main.svg"]
        );
        assert_eq!(delegate.calls.load(Ordering::SeqCst), 1);
        let dot = fs::read_to_string(out.join("main.dot")).unwrap();
        assert!(dot.contains(r#"  "A" -> "B";"#));
    }

    #[test]
    fn failures_stay_with_their_document() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.xml");
        let malformed = tmp.path().join("malformed.xml");
        let no_modules = tmp.path().join("no_modules.xml");
        let missing = tmp.path().join("missing.xml");
        fs::write(&good, FLOW).unwrap();
        fs::write(&malformed, "<ivrScript><modules>").unwrap();
        fs::write(&no_modules, "<ivrScript><settings/></ivrScript>").unwrap();

        let files = vec![malformed, good, missing, no_modules];
        let report = process_files(
            &options(&tmp.path().join("out"), &["dot"]),
            &files,
            &FakeSvg::default(),
        )
        .unwrap();

        assert_eq!((report.succeeded, report.failed), (1, 3));
        let failures: Vec<(Stage, &str)> = report
            .documents
            .iter()
            .filter_map(|d| d.failure.as_ref())
            .map(|f| (f.stage, f.kind.as_str()))
            .collect();
        assert_eq!(
            failures,
            vec![
                (Stage::Compile, "MalformedInput"),
                (Stage::Read, "FileNotFound"),
                (Stage::Compile, "SchemaError"),
            ]
        );
        assert!(report.documents[1].is_success());
    }

    #[test]
    fn render_failure_keeps_text_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("flow.xml");
        fs::write(&input, FLOW).unwrap();

        let report = process_files(
            &options(&tmp.path().join("out"), &["svg", "mermaid"]),
            &[input],
            &BrokenEngine,
        )
        .unwrap();

        let doc = &report.documents[0];
        let failure = doc.failure.as_ref().unwrap();
        assert_eq!(failure.stage, Stage::Render);
        assert_eq!(failure.kind, "RenderFailed");
        assert_eq!(file_names(doc), vec!["flow.mmd"]);
        assert!(doc.artifacts[0].path.exists());
    }

    #[test]
    fn parallel_keeps_input_order() {
        let tmp = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..16)
            .map(|i| {
                let path = tmp.path().join(format!("doc{i:02}.xml"));
                let body = if i % 3 == 0 { "not xml" } else { FLOW };
                fs::write(&path, body).unwrap();
                path
            })
            .collect();

        let sequential = process_files(
            &options(&tmp.path().join("seq"), &["plantuml"]),
            &files,
            &FakeSvg::default(),
        )
        .unwrap();
        let parallel = process_files(
            &IvrflowOptions {
                parallel: true,
                ..options(&tmp.path().join("par"), &["plantuml"])
            },
            &files,
            &FakeSvg::default(),
        )
        .unwrap();

        let order = |r: &BatchReport| -> Vec<(PathBuf, bool)> {
            r.documents
                .iter()
                .map(|d| (d.source.clone(), d.is_success()))
                .collect()
        };
        assert_eq!(order(&sequential), order(&parallel));
        assert_eq!(parallel.failed, 6);
    }

    #[test]
    fn stamped_names_share_one_stamp() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("menu.xml");
        fs::write(&input, FLOW).unwrap();

        let opts = IvrflowOptions {
            stamp: true,
            ..options(&tmp.path().join("out"), &["dot", "mermaid"])
        };
        let report = process_files(&opts, &[input], &FakeSvg::default()).unwrap();
        let names = file_names(&report.documents[0]);

        let stems: Vec<&str> = names.iter().map(|n| n.rsplit_once('.').unwrap().0).collect();
        assert_eq!(stems[0], stems[1]);
        let millis = stems[0].strip_prefix("menu_").unwrap();
        assert!(!millis.is_empty() && millis.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn same_file_name_in_two_dirs_keeps_both() {
        let tmp = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = ["a", "b"]
            .iter()
            .map(|dir| {
                let path = tmp.path().join("in").join(dir).join("main.xml");
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                let id = format!("FROM_{}", dir.to_uppercase());
                fs::write(
                    &path,
                    format!("<s><modules><play><moduleId>{id}</moduleId></play></modules></s>"),
                )
                .unwrap();
                path
            })
            .collect();

        for parallel in [false, true] {
            let out = tmp.path().join(format!("out-{parallel}"));
            let opts = IvrflowOptions {
                parallel,
                stamp: parallel,
                ..options(&out, &["dot"])
            };
            let report = process_files(&opts, &files, &FakeSvg::default()).unwrap();
            assert_eq!(report.succeeded, 2);

            let first = &report.documents[0].artifacts[0].path;
            let second = &report.documents[1].artifacts[0].path;
            assert_ne!(first, second);
            assert!(fs::read_to_string(first).unwrap().contains("FROM_A"));
            assert!(fs::read_to_string(second).unwrap().contains("FROM_B"));
        }
    }

    #[test]
    fn report_json_omits_failure_on_success() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("ok.xml");
        fs::write(&input, FLOW).unwrap();
        let report = process_files(
            &options(&tmp.path().join("out"), &["dot"]),
            &[input, tmp.path().join("gone.xml")],
            &FakeSvg::default(),
        )
        .unwrap();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["failed"], 1);
        assert!(json["documents"][0].get("failure").is_none());
        assert_eq!(json["documents"][0]["artifacts"][0]["format"], "dot");
        assert_eq!(json["documents"][1]["failure"]["stage"], "read");
        assert_eq!(json["documents"][1]["failure"]["kind"], "FileNotFound");

        let summary = report.summary();
        assert!(summary.contains("FAILED"));
        assert!(summary.ends_with("2 documents, 1 succeeded, 1 failed\n"));
    }

    #[test]
    fn single_document_output() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("main.xml");
        fs::write(&input, FLOW).unwrap();
        let opts = IvrflowOptions::default();

        let mermaid = render_single(
            &input,
            OutputFormat::Text(TextFormat::Mermaid),
            &opts,
            &FakeSvg::default(),
        )
        .unwrap();
        assert!(mermaid.starts_with("flowchart TD\n"));

        let err = render_single(&input, OutputFormat::Svg, &opts, &BrokenEngine).unwrap_err();
        assert!(err.kind().is_render_error());
    }
}
