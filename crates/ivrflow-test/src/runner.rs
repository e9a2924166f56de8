use std::fmt::Write as _;

use anyhow::{Context, Result, anyhow, bail};
use similar::TextDiff;

use ivrflow_core::{CompiledDocument, Edge, EdgeStyle, Module, compile_document};
use ivrflow_emit::{EmitOptions, TextFormat, emit_with};

use crate::corpus::{Corpus, CorpusCase, CorpusFile, TestFile};

/// Expectation kinds a case may declare.
pub const EXPECTATION_KINDS: &[&str] = &[
    "modules",
    "edges",
    "graph",
    "dot",
    "dot-annotated",
    "mermaid",
    "plantuml",
    "error",
];

#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub filter: Option<String>,
    pub update: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    Failed,
    Updated,
    NoExpectations,
}

#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub id: String,
    pub status: CaseStatus,
    pub message: Option<String>,
}

pub fn run_cases(corpus: &mut Corpus, config: RunnerConfig) -> Result<Vec<CaseOutcome>> {
    let mut outcomes = Vec::new();
    let mut matched = 0usize;

    for file in corpus.files_mut() {
        outcomes.extend(run_cases_in_file(file, &config, &mut matched)?);
    }

    if matched == 0 {
        bail!("no ivrflow-test cases matched filter {:?}", config.filter);
    }
    Ok(outcomes)
}

fn run_cases_in_file(
    file: &mut CorpusFile,
    config: &RunnerConfig,
    matched: &mut usize,
) -> Result<Vec<CaseOutcome>> {
    let mut outcomes = Vec::new();
    for idx in 0..file.cases.len() {
        if let Some(term) = &config.filter
            && !file.cases[idx].id().contains(term.as_str())
        {
            continue;
        }
        *matched += 1;

        let (outcome, mutated) = evaluate_case(&mut file.cases[idx], config.update)?;
        if mutated {
            file.mark_dirty();
        }
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Per-case settings taken from the `args:` line.
#[derive(Debug, Default)]
struct CaseArgs {
    /// Source name given to annotated DOT; defaults to the file path.
    source: Option<String>,
}

fn parse_case_args(case: &CorpusCase) -> Result<CaseArgs> {
    let mut parsed = CaseArgs::default();
    let mut args = case.args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--source" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--source needs a value in case {}", case.id()))?;
                parsed.source = Some(value.clone());
            }
            other => bail!("unknown argument '{other}' in case {}", case.id()),
        }
    }
    Ok(parsed)
}

fn evaluate_case(case: &mut CorpusCase, update: bool) -> Result<(CaseOutcome, bool)> {
    let case_id = case.id();

    if case.expectations.is_empty() {
        return Ok((
            CaseOutcome {
                id: case_id,
                status: CaseStatus::NoExpectations,
                message: Some("no expectation blocks declared".to_string()),
            },
            false,
        ));
    }

    let args = parse_case_args(case)?;
    let documents: Vec<Compiled<'_>> = case
        .files
        .iter()
        .map(|file| Compiled {
            file,
            result: compile_document(&file.contents),
        })
        .collect();

    let mut rendered = Vec::with_capacity(case.expectations.len());
    for expect in &case.expectations {
        let actual = render_expectation(&expect.kind, &documents, &args)
            .with_context(|| format!("case {case_id}"))?;
        rendered.push(actual);
    }
    drop(documents);

    let mut mutated = false;
    let mut status = CaseStatus::Passed;
    let mut failures = Vec::new();
    for (expect, actual) in case.expectations.iter_mut().zip(rendered) {
        let expected_norm = normalize(&expect.value);
        let actual_norm = normalize(&actual);
        if expected_norm == actual_norm {
            continue;
        }

        if update {
            expect.value = ensure_trailing_newline(actual);
            mutated = true;
            status = CaseStatus::Updated;
        } else {
            status = CaseStatus::Failed;
            failures.push(format_expectation_diff(&expect.kind, &expected_norm, &actual_norm));
        }
    }

    let message = (!failures.is_empty()).then(|| failures.join("\n"));
    Ok((
        CaseOutcome {
            id: case_id,
            status,
            message,
        },
        mutated,
    ))
}

struct Compiled<'a> {
    file: &'a TestFile,
    result: ivrflow_core::Result<CompiledDocument>,
}

fn render_expectation(kind: &str, documents: &[Compiled<'_>], args: &CaseArgs) -> Result<String> {
    if !EXPECTATION_KINDS.contains(&kind) {
        bail!("unknown expectation kind '{kind}'");
    }

    let mut buf = String::new();
    for doc in documents {
        if documents.len() > 1 {
            let _ = writeln!(buf, "# {}", doc.file.path);
        }
        let section = match (&doc.result, kind) {
            (Err(err), "error") => format!("{} at {}\n", err.kind(), err.operation()),
            (Err(err), _) => format!("compile failed: {err}\n"),
            (Ok(_), "error") => "ok\n".to_string(),
            (Ok(compiled), "modules") => render_modules(&compiled.modules),
            (Ok(compiled), "edges") => render_edges(&compiled.edges),
            (Ok(compiled), "graph") => {
                let mut json = serde_json::to_string_pretty(&compiled.graph)?;
                json.push('\n');
                json
            }
            (Ok(compiled), "dot-annotated") => {
                let source = args.source.clone().unwrap_or_else(|| doc.file.path.clone());
                let graph = compiled.graph.clone().with_source(source);
                let options = EmitOptions {
                    annotate_source: true,
                };
                emit_with(&graph, TextFormat::Dot, &options)
            }
            (Ok(compiled), format) => {
                let format: TextFormat = format
                    .parse()
                    .map_err(|_| anyhow!("unknown expectation kind '{format}'"))?;
                emit_with(&compiled.graph, format, &EmitOptions::default())
            }
        };
        buf.push_str(&section);
    }
    Ok(buf)
}

fn render_modules(modules: &[Module]) -> String {
    let mut buf = String::new();
    for module in modules {
        let payload = &module.payload;
        let _ = write!(buf, "{} {} {:?}", module.id, module.kind.tag(), module.display_name);
        if let Some(next) = &payload.single_next {
            let _ = write!(buf, " next={next}");
        }
        if let Some(next) = &payload.exception_next {
            let _ = write!(buf, " exception={next}");
        }
        if !payload.ascendants.is_empty() {
            let _ = write!(buf, " ascendants=[{}]", payload.ascendants.join(", "));
        }
        buf.push('\n');

        for entry in &payload.branches {
            let _ = writeln!(
                buf,
                "  branch {} [{}] -> [{}]",
                entry.key.as_deref().unwrap_or("-"),
                entry.names.join(", "),
                entry.targets.join(", ")
            );
        }
    }
    buf
}

fn render_edges(edges: &[Edge]) -> String {
    let mut buf = String::new();
    for edge in edges {
        let _ = write!(buf, "{} -> {}", edge.from, edge.to);
        if let Some(label) = &edge.label {
            let _ = write!(buf, " {label:?}");
        }
        if edge.style == EdgeStyle::Exception {
            buf.push_str(" (exception)");
        }
        buf.push('\n');
    }
    buf
}

fn format_expectation_diff(kind: &str, expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut buf = String::new();
    let _ = writeln!(buf, "Expectation '{kind}' mismatch:");
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            similar::ChangeTag::Delete => "-",
            similar::ChangeTag::Insert => "+",
            similar::ChangeTag::Equal => " ",
        };
        let _ = write!(buf, "{sign}{change}");
        if change.missing_newline() {
            buf.push('\n');
        }
    }
    buf
}

/// Line endings and trailing blank lines are not significant.
fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").trim_end_matches('\n').to_string()
}

fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
