use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use shell_words::{join, split};
use walkdir::WalkDir;

const CORPUS_EXTENSION: &str = "ivrflow";
const CASE_BANNER: &str =
    "===============================================================================";

fn slugify_case_name(raw: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(ch.to_ascii_lowercase());
            pending_dash = false;
        } else if !slug.is_empty() {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "case".to_string()
    } else {
        slug
    }
}

/// All `.ivrflow` files found under one directory (e.g. `tests/corpus`).
pub struct Corpus {
    files: Vec<CorpusFile>,
}

impl Corpus {
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            bail!("corpus root {} does not exist", root.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|res| res.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some(CORPUS_EXTENSION) {
                continue;
            }
            files.push(CorpusFile::load(root, entry.path())?);
        }

        Ok(Self { files })
    }

    pub fn files(&self) -> &[CorpusFile] {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut [CorpusFile] {
        &mut self.files
    }

    pub fn write_updates(&mut self) -> Result<()> {
        for file in self.files.iter_mut().filter(|f| f.dirty) {
            fs::write(&file.path, file.render())
                .with_context(|| format!("failed to update {}", file.path.display()))?;
            file.dirty = false;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct CorpusFile {
    pub path: PathBuf,
    /// Path below the corpus root without extension, e.g. `branching/menu`.
    pub suite: String,
    pub cases: Vec<CorpusCase>,
    pub(crate) dirty: bool,
}

impl CorpusFile {
    fn load(root: &Path, path: &Path) -> Result<Self> {
        let rel = path.strip_prefix(root).unwrap_or(path);
        let suite = rel.with_extension("").to_string_lossy().replace('\\', "/");
        let canonical = path
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        let content = fs::read_to_string(&canonical)
            .with_context(|| format!("failed to read {}", canonical.display()))?;
        let cases = CaseParser::new(&suite, &canonical).parse(&content)?;
        Ok(Self {
            path: canonical,
            suite,
            cases,
            dirty: false,
        })
    }

    pub fn cases(&self) -> &[CorpusCase] {
        &self.cases
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn render(&self) -> String {
        let rendered: Vec<String> = self
            .cases
            .iter()
            .map(|case| case.render().trim_end_matches('\n').to_string())
            .collect();
        let mut buf = rendered.join("\n\n\n");
        buf.push('\n');
        buf
    }
}

/// One named case: input documents plus the expected output per kind.
#[derive(Debug, Clone)]
pub struct CorpusCase {
    pub suite: String,
    pub name: String,
    pub args: Vec<String>,
    pub files: Vec<TestFile>,
    pub expectations: Vec<CorpusCaseExpectation>,
    /// `$//` lines kept above the case banner.
    pub comments: Vec<String>,
}

impl CorpusCase {
    fn new(suite: &str, name: String, comments: Vec<String>) -> Self {
        Self {
            suite: suite.to_string(),
            name,
            args: Vec::new(),
            files: Vec::new(),
            expectations: Vec::new(),
            comments,
        }
    }

    pub fn id(&self) -> String {
        format!("{}::{}", self.suite, self.name)
    }

    pub fn expectation(&self, kind: &str) -> Option<&str> {
        self.expectations
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.value.as_str())
    }

    pub fn render(&self) -> String {
        let mut buf = String::new();
        for comment in &self.comments {
            buf.push_str(comment);
            buf.push('\n');
        }
        buf.push_str(CASE_BANNER);
        buf.push('\n');
        buf.push_str(&self.name);
        buf.push('\n');
        buf.push_str(CASE_BANNER);
        buf.push_str("\n\n");
        if !self.args.is_empty() {
            buf.push_str(&format!("args: {}\n\n", join(&self.args)));
        }

        let sections = self
            .files
            .iter()
            .map(|file| (format!("file: {}", file.path), &file.contents))
            .chain(
                self.expectations
                    .iter()
                    .map(|expect| (format!("expect:{}", expect.kind), &expect.value)),
            );
        for (header, body) in sections {
            buf.push_str(&format!("--- {header} ---\n"));
            buf.push_str(body);
            if !body.ends_with('\n') {
                buf.push('\n');
            }
            buf.push('\n');
        }

        buf
    }
}

#[derive(Debug, Clone)]
pub struct TestFile {
    pub path: String,
    pub contents: String,
}

#[derive(Debug, Clone)]
pub struct CorpusCaseExpectation {
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone)]
enum SectionHeader {
    File { path: String },
    Expect { kind: String },
}

fn parse_section_header(line: &str) -> Option<SectionHeader> {
    if !line.starts_with("---") || !line.ends_with("---") || line.len() < 6 {
        return None;
    }

    let inner = line.trim_start_matches('-').trim_end_matches('-').trim();
    if let Some(rest) = inner.strip_prefix("file:") {
        return Some(SectionHeader::File {
            path: rest.trim().to_string(),
        });
    }
    if let Some(rest) = inner.strip_prefix("expect:") {
        return Some(SectionHeader::Expect {
            kind: rest.trim().to_string(),
        });
    }
    None
}

fn is_banner_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 5 && trimmed.chars().all(|ch| ch == '=')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Banner {
    Outside,
    AwaitingName,
    AwaitingClose,
}

/// Line-oriented parser for one corpus file.
///
/// A case opens with a banner / name / banner triple; `--- file: ---` and
/// `--- expect: ---` sections run until the next header or banner, blank
/// lines included.
struct CaseParser<'a> {
    suite: &'a str,
    path: &'a Path,
    cases: Vec<CorpusCase>,
    current: Option<CorpusCase>,
    section: Option<(SectionHeader, Vec<String>)>,
    comments: Vec<String>,
    banner: Banner,
}

impl<'a> CaseParser<'a> {
    fn new(suite: &'a str, path: &'a Path) -> Self {
        Self {
            suite,
            path,
            cases: Vec::new(),
            current: None,
            section: None,
            comments: Vec::new(),
            banner: Banner::Outside,
        }
    }

    fn parse(mut self, content: &str) -> Result<Vec<CorpusCase>> {
        for raw_line in content.lines() {
            self.line(raw_line.trim_end_matches('\r'))?;
        }

        self.close_section()?;
        if self.banner != Banner::Outside {
            bail!(
                "unterminated banner in {} (missing case name or closing separator)",
                self.path.display()
            );
        }
        self.close_case();

        if self.cases.is_empty() {
            bail!("corpus file {} does not contain any cases", self.path.display());
        }
        if let Some(case) = self.cases.iter().find(|case| case.files.is_empty()) {
            bail!(
                "case {} in {} does not declare any files",
                case.id(),
                self.path.display()
            );
        }
        Ok(self.cases)
    }

    fn line(&mut self, line: &str) -> Result<()> {
        let trimmed = line.trim();

        if trimmed.starts_with("$//") {
            self.comments.push(line.to_string());
            return Ok(());
        }

        match self.banner {
            Banner::AwaitingClose => {
                if trimmed.is_empty() {
                    return Ok(());
                }
                if !is_banner_line(line) {
                    bail!(
                        "expected closing banner after case '{}' in {}",
                        self.current.as_ref().map_or("unknown", |c| c.name.as_str()),
                        self.path.display()
                    );
                }
                self.banner = Banner::Outside;
                return Ok(());
            }
            Banner::AwaitingName => {
                if trimmed.is_empty() {
                    return Ok(());
                }
                let comments = std::mem::take(&mut self.comments);
                self.current = Some(CorpusCase::new(self.suite, slugify_case_name(trimmed), comments));
                self.banner = Banner::AwaitingClose;
                return Ok(());
            }
            Banner::Outside => {}
        }

        if is_banner_line(line) {
            self.close_section()?;
            self.close_case();
            self.banner = Banner::AwaitingName;
            return Ok(());
        }

        if let Some(header) = parse_section_header(line) {
            self.close_section()?;
            self.section = Some((header, Vec::new()));
            return Ok(());
        }

        if let Some((_, lines)) = self.section.as_mut() {
            lines.push(line.to_string());
            return Ok(());
        }

        if trimmed.is_empty() {
            return Ok(());
        }
        self.metadata(line)
    }

    fn metadata(&mut self, line: &str) -> Result<()> {
        let path = self.path;
        let case = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow!("content encountered before case header in {}", path.display()))?;

        match line.trim().split_once(':') {
            Some(("args", value)) => {
                case.args = split(value.trim())
                    .map_err(|err| anyhow!("invalid args in {}: {err}", path.display()))?;
                Ok(())
            }
            Some((other, _)) => Err(anyhow!(
                "unsupported metadata '{}' in {} case {}",
                other.trim(),
                path.display(),
                case.name
            )),
            None => Err(anyhow!(
                "unexpected line '{line}' in {} (within case {})",
                path.display(),
                case.name
            )),
        }
    }

    fn close_section(&mut self) -> Result<()> {
        let Some((header, lines)) = self.section.take() else {
            return Ok(());
        };
        let case = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow!("section declared before any case header in {}", self.path.display()))?;

        let mut content = lines.join("\n");
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }

        match header {
            SectionHeader::File { path } => case.files.push(TestFile {
                path,
                contents: content,
            }),
            SectionHeader::Expect { kind } => case.expectations.push(CorpusCaseExpectation {
                kind,
                value: content,
            }),
        }
        Ok(())
    }

    fn close_case(&mut self) {
        if let Some(case) = self.current.take() {
            self.cases.push(case);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
$// exception edges
===============================================================================
Entry with exception
===============================================================================

args: --source 'main menu.xml'

--- file: main.xml ---
<s><modules/></s>

--- expect:dot ---
digraph ivr {

  \"A\" -> \"B\";
}

--- expect:error ---
ok
";

    fn parse(content: &str) -> Result<Vec<CorpusCase>> {
        CaseParser::new("suite", Path::new("suite.ivrflow")).parse(content)
    }

    #[test]
    fn parses_sections_and_metadata() {
        let cases = parse(SAMPLE).unwrap();
        assert_eq!(cases.len(), 1);
        let case = &cases[0];
        assert_eq!(case.id(), "suite::entry-with-exception");
        assert_eq!(case.args, vec!["--source", "main menu.xml"]);
        assert_eq!(case.comments, vec!["$// exception edges"]);
        assert_eq!(case.files[0].path, "main.xml");
        assert_eq!(case.files[0].contents, "<s><modules/></s>\n");
        assert_eq!(
            case.expectation("dot"),
            Some("digraph ivr {\n\n  \"A\" -> \"B\";\n}\n")
        );
        assert_eq!(case.expectation("error"), Some("ok\n"));
    }

    #[test]
    fn render_round_trips() {
        let cases = parse(SAMPLE).unwrap();
        let rendered = cases[0].render();
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed[0].render(), rendered);
    }

    #[test]
    fn rejects_cases_without_files() {
        let err = parse("=====\nlonely\n=====\n--- expect:dot ---\nx\n").unwrap_err();
        assert!(err.to_string().contains("does not declare any files"));
    }

    #[test]
    fn rejects_unknown_metadata() {
        let err = parse("=====\nc\n=====\nlang: rust\n--- file: a.xml ---\n<a/>\n").unwrap_err();
        assert!(err.to_string().contains("unsupported metadata 'lang'"));
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify_case_name("Case: two entries, one target!"), "case-two-entries-one-target");
        assert_eq!(slugify_case_name("***"), "case");
    }
}
