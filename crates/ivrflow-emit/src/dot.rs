//! Graphviz DOT emitter.

use std::fmt::Write;

use ivrflow_core::{GraphModel, ModuleKind};

/// Id of the cosmetic node that carries the source file name.
pub const SOURCE_NODE_ID: &str = "__source__";

const EXCEPTION_ATTRS: [(&str, &str); 3] = [
    ("color", "red"),
    ("fontcolor", "red"),
    ("style", "dashed,bold"),
];

/// Map a module kind to a DOT shape. `box` is the graph default.
pub fn shape_for_kind(kind: &ModuleKind) -> &'static str {
    match kind {
        kind if kind.is_entry() => "ellipse",
        kind if kind.is_branching() => "diamond",
        kind if kind.is_transfer() => "cds",
        ModuleKind::Hangup => "octagon",
        _ => "box",
    }
}

/// Escape special characters for DOT quoted strings.
pub fn escape_label(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Module ids are arbitrary text; DOT sees them only as quoted strings.
pub fn quote_id(id: &str) -> String {
    format!("\"{}\"", escape_label(id))
}

/// Write indentation to output.
pub fn write_indent(output: &mut String, level: usize) {
    for _ in 0..level {
        output.push_str("  ");
    }
}

fn write_attrs(output: &mut String, attrs: &[(&str, &str)]) {
    output.push('[');
    for (i, (key, value)) in attrs.iter().enumerate() {
        if i > 0 {
            output.push_str(", ");
        }
        let _ = write!(output, "{}=\"{}\"", key, escape_label(value));
    }
    output.push(']');
}

/// A DOT graph builder for constructing valid DOT output.
pub struct DotBuilder {
    output: String,
    indent: usize,
}

impl DotBuilder {
    /// Create a new DOT graph with the given name.
    pub fn new(name: &str) -> Self {
        let mut output = String::with_capacity(4096);
        let _ = writeln!(output, "digraph {name} {{");
        Self { output, indent: 1 }
    }

    /// Add a graph attribute.
    pub fn attr(&mut self, key: &str, value: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "{}=\"{}\";", key, escape_label(value));
        self
    }

    /// Add a node style default.
    pub fn node_style(&mut self, attrs: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "node [{attrs}];");
        self
    }

    /// Add an edge style default.
    pub fn edge_style(&mut self, attrs: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "edge [{attrs}];");
        self
    }

    /// Add a blank line for readability.
    pub fn blank(&mut self) -> &mut Self {
        self.output.push('\n');
        self
    }

    /// Add a node; `id` is quoted and escaped.
    pub fn node(&mut self, id: &str, attrs: &[(&str, &str)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        self.output.push_str(&quote_id(id));
        if !attrs.is_empty() {
            self.output.push(' ');
            write_attrs(&mut self.output, attrs);
        }
        self.output.push_str(";\n");
        self
    }

    /// Add an edge, with attributes when any are given.
    pub fn edge(&mut self, from: &str, to: &str, attrs: &[(&str, &str)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = write!(self.output, "{} -> {}", quote_id(from), quote_id(to));
        if !attrs.is_empty() {
            self.output.push(' ');
            write_attrs(&mut self.output, attrs);
        }
        self.output.push_str(";\n");
        self
    }

    /// Finish building and return the DOT string.
    pub fn build(mut self) -> String {
        self.output.push_str("}\n");
        self.output
    }
}

/// [`SOURCE_NODE_ID`], extended with underscores while a module or an edge
/// endpoint already uses it.
fn source_node_id(graph: &GraphModel) -> String {
    let dangling = graph.dangling_ids();
    let mut id = SOURCE_NODE_ID.to_string();
    while graph.node(&id).is_some() || dangling.contains(&id.as_str()) {
        id.push('_');
    }
    id
}

/// Render a graph model as DOT.
///
/// With `annotate_source` and a model that knows its source, a note node
/// holding the file name is tied to the first module by an invisible edge so
/// the layout keeps it near the graph.
pub fn render_dot(graph: &GraphModel, annotate_source: bool) -> String {
    let mut dot = DotBuilder::new("ivr");
    dot.attr("rankdir", "TB")
        .node_style(r#"shape=box, style="rounded", fontname="Helvetica""#)
        .edge_style(r#"fontname="Helvetica", fontsize=10"#)
        .blank();

    for node in graph.nodes() {
        let shape = shape_for_kind(node.module_kind());
        if shape == "box" {
            dot.node(&node.id, &[("label", node.label.as_str())]);
        } else {
            dot.node(&node.id, &[("label", node.label.as_str()), ("shape", shape)]);
        }
    }

    let source = graph
        .source()
        .filter(|_| annotate_source)
        .map(|name| (name, source_node_id(graph)));
    if let Some((name, source_id)) = &source {
        dot.node(
            source_id,
            &[
                ("label", *name),
                ("shape", "note"),
                ("style", "filled"),
                ("fillcolor", "lightyellow"),
            ],
        );
    }

    dot.blank();

    if let Some((_, source_id)) = &source
        && let Some(first) = graph.nodes().first()
    {
        dot.edge(source_id, &first.id, &[("style", "invis")]);
    }

    for edge in graph.edges() {
        let label = edge.label();
        let mut attrs: Vec<(&str, &str)> = Vec::with_capacity(4);
        if !label.is_empty() {
            attrs.push(("label", label.as_str()));
        }
        if edge.is_exception() {
            attrs.extend(EXCEPTION_ATTRS);
        }
        dot.edge(&edge.from, &edge.to, &attrs);
    }

    dot.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivrflow_core::{Edge, Module, ModulePayload};
    use pretty_assertions::assert_eq;

    fn module(id: &str, kind: ModuleKind, name: &str) -> Module {
        Module {
            id: id.into(),
            kind,
            display_name: name.into(),
            payload: ModulePayload::default(),
        }
    }

    #[test]
    fn builder_quotes_and_escapes() {
        let mut dot = DotBuilder::new("g");
        dot.node(r#"a"b"#, &[("label", "x\ny")])
            .edge("a", "b", &[])
            .edge("a", "c", &[("label", r"back\slash")]);
        assert_eq!(
            dot.build(),
            "digraph g {\n  \"a\\\"b\" [label=\"x\\ny\"];\n  \"a\" -> \"b\";\n  \"a\" -> \"c\" [label=\"back\\\\slash\"];\n}\n"
        );
    }

    #[test]
    fn entry_with_exception_scenario() {
        let modules = [
            module("A", ModuleKind::IncomingCall, "Start"),
            module("B", ModuleKind::Play, "Welcome"),
            module("C", ModuleKind::Hangup, "Bye"),
        ];
        let edges = [Edge::plain("A", "B"), Edge::exception("A", "C")];
        let graph = GraphModel::build(&modules, &edges);

        let expected = r#"digraph ivr {
  rankdir="TB";
  node [shape=box, style="rounded", fontname="Helvetica"];
  edge [fontname="Helvetica", fontsize=10];

  "A" [label="incomingCall\nStart", shape="ellipse"];
  "B" [label="play\nWelcome"];
  "C" [label="hangup\nBye", shape="octagon"];

  "A" -> "B";
  "A" -> "C" [label="Exception", color="red", fontcolor="red", style="dashed,bold"];
}
"#;
        assert_eq!(render_dot(&graph, false), expected);
    }

    #[test]
    fn source_annotation() {
        let graph = GraphModel::build(&[module("A", ModuleKind::Play, "a")], &[])
            .with_source("main \"menu\".xml");
        let dot = render_dot(&graph, true);
        assert!(dot.contains(
            r#"  "__source__" [label="main \"menu\".xml", shape="note", style="filled", fillcolor="lightyellow"];"#
        ));
        assert!(dot.contains(r#"  "__source__" -> "A" [style="invis"];"#));

        // No annotation unless asked for.
        assert!(!render_dot(&graph, false).contains(SOURCE_NODE_ID));
    }

    #[test]
    fn annotation_steps_around_a_module_named_like_it() {
        let graph = GraphModel::build(
            &[
                module(SOURCE_NODE_ID, ModuleKind::Play, "Intro"),
                module("B", ModuleKind::Hangup, "Bye"),
            ],
            &[Edge::plain(SOURCE_NODE_ID, "B"), Edge::plain("B", "__source___")],
        )
        .with_source("main.xml");
        let dot = render_dot(&graph, true);

        assert!(dot.contains(r#"  "__source__" [label="play\nIntro"];"#));
        assert!(dot.contains(r#"  "__source____" [label="main.xml", shape="note""#));
        assert!(dot.contains(r#"  "__source____" -> "__source__" [style="invis"];"#));
        assert!(!dot.contains(r#""__source__" -> "__source__""#));
    }

    #[test]
    fn shapes_follow_kind_families() {
        assert_eq!(shape_for_kind(&ModuleKind::IncomingCall), "ellipse");
        assert_eq!(shape_for_kind(&ModuleKind::IfElse), "diamond");
        assert_eq!(shape_for_kind(&ModuleKind::ThirdPartyTransfer), "cds");
        assert_eq!(shape_for_kind(&ModuleKind::Hangup), "octagon");
        assert_eq!(shape_for_kind(&ModuleKind::from_tag("voiceBot")), "box");
    }

    #[test]
    fn annotation_without_modules_has_no_anchor_edge() {
        let graph = GraphModel::build(&[], &[]).with_source("empty.xml");
        let dot = render_dot(&graph, true);
        assert!(dot.contains(SOURCE_NODE_ID));
        assert!(!dot.contains("invis"));
    }

    #[test]
    fn dangling_targets_are_plain_edges() {
        let graph = GraphModel::build(
            &[module("A", ModuleKind::Play, "a")],
            &[Edge::plain("A", "missing")],
        );
        assert!(render_dot(&graph, false).contains(r#"  "A" -> "missing";"#));
    }
}
