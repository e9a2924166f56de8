//! PlantUML state-diagram emitter.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use ivrflow_core::GraphModel;

const EXCEPTION_ARROW: &str = "-[#red,dashed]->";

/// Module id -> PlantUML state name.
///
/// Derived independently of the Mermaid ids; the two grammars reserve
/// different things, and the two mappings are not required to agree.
#[derive(Debug, Default)]
pub struct StateIds {
    by_module: HashMap<String, String>,
    taken: HashSet<String>,
}

impl StateIds {
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

        let mut base: String = display
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if base.is_empty() {
            base.push_str("state");
        } else if base.starts_with(|c: char| c.is_ascii_digit()) {
            base.insert_str(0, "S_");
        }

        let name = if self.taken.contains(&base) {
            let fragment: String = module_id
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .take(6)
                .collect();
            let mut name = format!("{base}_{fragment}");
            let mut counter = 2;
            while self.taken.contains(&name) {
                name = format!("{base}_{fragment}_{counter}");
                counter += 1;
            }
            name
        } else {
            base
        };

        self.taken.insert(name.clone());
        self.by_module.insert(module_id.to_string(), name);
    }

    fn resolve<'a>(&'a self, module_id: &'a str) -> &'a str {
        self.get(module_id).unwrap_or(module_id)
    }
}

fn escape_description(input: &str) -> String {
    input.replace('"', "'").replace('\n', "\\n")
}

fn escape_transition(input: &str) -> String {
    input.replace('\n', "\\n")
}

/// Render a graph model as a PlantUML state diagram.
///
/// Every `incomingCall` module gets an initial `[*]` transition.
pub fn render_plantuml(graph: &GraphModel) -> String {
    let ids = StateIds::for_graph(graph);
    let mut output = String::new();
    output.push_str("@startuml\n");
    output.push_str("hide empty description\n");

    for node in graph.nodes() {
        let _ = writeln!(
            output,
            "state \"{}\" as {}",
            escape_description(&node.label),
            ids.resolve(&node.id)
        );
    }
    for id in graph.dangling_ids() {
        let _ = writeln!(
            output,
            "state \"{}\" as {}",
            escape_description(id),
            ids.resolve(id)
        );
    }

    for node in graph.nodes().iter().filter(|n| n.module_kind().is_entry()) {
        let _ = writeln!(output, "[*] --> {}", ids.resolve(&node.id));
    }

    for edge in graph.edges() {
        let arrow = if edge.is_exception() {
            EXCEPTION_ARROW
        } else {
            "-->"
        };
        let _ = write!(
            output,
            "{} {arrow} {}",
            ids.resolve(&edge.from),
            ids.resolve(&edge.to)
        );
        let label = edge.label();
        if !label.is_empty() {
            let _ = write!(output, " : {}", escape_transition(&label));
        }
        output.push('\n');
    }

    output.push_str("@enduml\n");
    finalize(output)
}

/// Storage-ready text: no byte-order mark, no leading whitespace.
fn finalize(text: String) -> String {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    if trimmed.len() == text.len() {
        text
    } else {
        trimmed.to_string()
    }
}
