//! Mermaid flowchart emitter.
//!
//! Mermaid node ids must be plain words, so every module id is mapped to a
//! safe id built from the step's display name. The mapping is private to this
//! emitter.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use ivrflow_core::GraphModel;

const INDENT: &str = "    ";
const EXCEPTION_LINK_STYLE: &str = "stroke:red,stroke-width:2px,color:red";

/// Words the flowchart lexer reads as statements or directives.
const RESERVED_IDS: &[&str] = &[
    "end",
    "graph",
    "flowchart",
    "subgraph",
    "direction",
    "style",
    "linkStyle",
    "classDef",
    "class",
    "click",
    "call",
    "href",
    "default",
    "interpolate",
];

/// Module id -> Mermaid node id, unique within one document.
#[derive(Debug, Default)]
pub struct MermaidIds {
    by_module: HashMap<String, String>,
    taken: HashSet<String>,
}

impl MermaidIds {
    /// Assign ids for every node, then for every dangling edge endpoint.
    pub fn for_graph(graph: &GraphModel) -> Self {
        let mut ids = Self::default();
        for node in graph.nodes() {
            ids.assign(&node.id, node.label_tail());
        }
        for id in graph.dangling_ids() {
            ids.assign(id, id);
        }
        ids
    }

    pub fn get(&self, module_id: &str) -> Option<&str> {
        self.by_module.get(module_id).map(String::as_str)
    }

    fn assign(&mut self, module_id: &str, display: &str) {
        if self.by_module.contains_key(module_id) {
            return;
        }

        let base = match sanitize(display) {
            base if base.is_empty() => "node".to_string(),
            base if is_reserved(&base) => format!("n_{base}"),
            base => base,
        };

        let mut candidate = base.clone();
        if self.taken.contains(&candidate) {
            let fragment: String = sanitize(module_id).chars().take(6).collect();
            candidate = format!("{base}_{fragment}");
            let mut counter = 2;
            while self.taken.contains(&candidate) {
                candidate = format!("{base}_{fragment}_{counter}");
                counter += 1;
            }
        }

        self.taken.insert(candidate.clone());
        self.by_module.insert(module_id.to_string(), candidate);
    }

    fn resolve<'a>(&'a self, module_id: &'a str) -> &'a str {
        // Every endpoint is assigned in `for_graph`.
        self.get(module_id).unwrap_or(module_id)
    }
}

fn is_reserved(id: &str) -> bool {
    RESERVED_IDS.iter().any(|word| word.eq_ignore_ascii_case(id))
}

fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn escape_node_label(input: &str) -> String {
    input.replace('"', "#quot;").replace('\n', "<br/>")
}

/// Pipes delimit edge labels; backticks open markdown strings.
fn escape_edge_label(input: &str) -> String {
    input
        .replace('|', "\u{00a6}")
        .replace('`', "'")
        .replace('"', "#quot;")
        .replace('\n', " ")
}

/// Render a graph model as a top-down Mermaid flowchart.
pub fn render_mermaid(graph: &GraphModel) -> String {
    let ids = MermaidIds::for_graph(graph);
    let mut output = String::with_capacity(graph.nodes().len() * 48 + graph.edges().len() * 40 + 16);
    output.push_str("flowchart TD\n");

    for node in graph.nodes() {
        let _ = writeln!(
            output,
            "{INDENT}{}[\"{}\"]",
            ids.resolve(&node.id),
            escape_node_label(&node.label)
        );
    }
    for id in graph.dangling_ids() {
        let _ = writeln!(output, "{INDENT}{}[\"{}\"]", ids.resolve(id), escape_node_label(id));
    }

    let mut exception_links = Vec::new();
    for (index, edge) in graph.edges().iter().enumerate() {
        let arrow = if edge.is_exception() {
            exception_links.push(index);
            "-.->"
        } else {
            "-->"
        };
        let label = edge.label();
        let from = ids.resolve(&edge.from);
        let to = ids.resolve(&edge.to);
        if label.is_empty() {
            let _ = writeln!(output, "{INDENT}{from} {arrow} {to}");
        } else {
            let _ = writeln!(
                output,
                "{INDENT}{from} {arrow}|\"{}\"| {to}",
                escape_edge_label(&label)
            );
        }
    }

    for index in exception_links {
        let _ = writeln!(output, "{INDENT}linkStyle {index} {EXCEPTION_LINK_STYLE}");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivrflow_core::{Edge, Module, ModuleKind, ModulePayload};
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
    fn entry_with_exception() {
        let graph = GraphModel::build(
            &[
                module("A", ModuleKind::IncomingCall, "Start"),
                module("B", ModuleKind::Play, "Main Menu"),
                module("C", ModuleKind::Hangup, "Bye"),
            ],
            &[Edge::plain("A", "B"), Edge::exception("A", "C")],
        );
        let expected = "flowchart TD
    Start[\"incomingCall<br/>Start\"]
    Main_Menu[\"play<br/>Main Menu\"]
    Bye[\"hangup<br/>Bye\"]
    Start --> Main_Menu
    Start -.->|\"Exception\"| Bye
    linkStyle 1 stroke:red,stroke-width:2px,color:red
";
        assert_eq!(render_mermaid(&graph), expected);
    }

    #[test]
    fn colliding_names_get_id_fragments() {
        let graph = GraphModel::build(
            &[
                module("p-1", ModuleKind::Play, "Prompt"),
                module("p-2", ModuleKind::Play, "Prompt"),
                module("x", ModuleKind::Play, "Prompt!"),
            ],
            &[],
        );
        let ids = MermaidIds::for_graph(&graph);
        assert_eq!(ids.get("p-1"), Some("Prompt"));
        assert_eq!(ids.get("p-2"), Some("Prompt_p_2"));
        assert_eq!(ids.get("x"), Some("Prompt_"));
    }

    #[test]
    fn fragment_collisions_fall_back_to_counter() {
        let graph = GraphModel::build(
            &[
                module("abcdefgh1", ModuleKind::Play, "Same"),
                module("abcdefgh2", ModuleKind::Play, "Same"),
                module("abcdefgh3", ModuleKind::Play, "Same"),
            ],
            &[],
        );
        let ids = MermaidIds::for_graph(&graph);
        let assigned: HashSet<&str> = ["abcdefgh1", "abcdefgh2", "abcdefgh3"]
            .iter()
            .filter_map(|id| ids.get(id))
            .collect();
        assert_eq!(assigned.len(), 3);
        assert_eq!(ids.get("abcdefgh3"), Some("Same_abcdef_2"));
    }

    #[test]
    fn reserved_words_are_avoided() {
        let names = ["end", "Style", "class", "click", "subgraph", "graph", "Classes"];
        let modules: Vec<Module> = names
            .iter()
            .enumerate()
            .map(|(i, name)| module(&format!("m{i}"), ModuleKind::Play, name))
            .collect();
        let graph = GraphModel::build(&modules, &[]);
        let ids = MermaidIds::for_graph(&graph);
        let assigned: Vec<&str> = (0..names.len())
            .filter_map(|i| ids.get(&format!("m{i}")))
            .collect();
        assert_eq!(
            assigned,
            vec!["n_end", "n_Style", "n_class", "n_click", "n_subgraph", "n_graph", "Classes"]
        );

        let rendered = render_mermaid(&GraphModel::build(
            &modules[..2],
            &[Edge::plain("m0", "m1")],
        ));
        assert!(rendered.contains("    n_end --> n_Style\n"));
    }

    #[test]
    fn edge_labels_are_escaped() {
        let graph = GraphModel::build(
            &[module("M", ModuleKind::Menu, "M"), module("T", ModuleKind::Play, "T")],
            &[Edge::labeled("M", "T", "a|b `c` \"d\"")],
        );
        let rendered = render_mermaid(&graph);
        assert!(rendered.contains("M -->|\"a\u{00a6}b 'c' #quot;d#quot;\"| T"));
    }

    #[test]
    fn dangling_endpoints_are_declared() {
        let graph = GraphModel::build(
            &[module("A", ModuleKind::Play, "A")],
            &[Edge::plain("A", "gone-1")],
        );
        let rendered = render_mermaid(&graph);
        assert!(rendered.contains("    gone_1[\"gone-1\"]\n"));
        assert!(rendered.contains("    A --> gone_1\n"));
    }
}
