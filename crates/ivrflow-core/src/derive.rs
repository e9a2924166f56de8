//! Edge derivation: one flat, possibly redundant list of transitions.
//!
//! Rules per module, in order, all of which may fire:
//!
//! 1. single-next reference -> unlabeled edge
//! 2. exceptional-next reference -> edge labeled [`EXCEPTION_LABEL`], exception style
//! 3. branch table (branching kinds only) -> one labeled edge per transition
//! 4. ascendants -> unlabeled edge from each predecessor into the module
//!
//! Redundant pairs are expected here; [`crate::graph::GraphModel`] merges them.

use serde::Serialize;
use strum_macros::{Display, IntoStaticStr};
use tracing::{debug, trace};

use crate::module::Module;

/// Label carried by every exceptional transition.
pub const EXCEPTION_LABEL: &str = "Exception";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Display, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    #[default]
    Plain,
    Exception,
}

/// One directed control-flow transition. `to` may name a module that does
/// not exist in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub style: EdgeStyle,
}

impl Edge {
    pub fn plain(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: None,
            style: EdgeStyle::Plain,
        }
    }

    pub fn labeled(from: impl Into<String>, to: impl Into<String>, label: &str) -> Self {
        Self {
            label: (!label.is_empty()).then(|| label.to_string()),
            ..Self::plain(from, to)
        }
    }

    pub fn exception(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            label: Some(EXCEPTION_LABEL.to_string()),
            style: EdgeStyle::Exception,
            ..Self::plain(from, to)
        }
    }
}

/// Apply every rule to every module, in module order.
pub fn derive_edges(modules: &[Module]) -> Vec<Edge> {
    let mut edges = Vec::new();
    for module in modules {
        let before = edges.len();
        derive_module_edges(module, &mut edges);
        for edge in &edges[before..] {
            trace!(from = %edge.from, to = %edge.to, label = ?edge.label, style = %edge.style, "edge");
        }
    }
    debug!(count = edges.len(), "edges derived");
    edges
}

fn derive_module_edges(module: &Module, edges: &mut Vec<Edge>) {
    let payload = &module.payload;

    if let Some(next) = &payload.single_next {
        edges.push(Edge::plain(&module.id, next));
    }

    if let Some(next) = &payload.exception_next {
        edges.push(Edge::exception(&module.id, next));
    }

    if module.kind.is_branching() {
        for entry in &payload.branches {
            let transitions = entry.transitions();
            if transitions.is_empty() {
                debug!(module = %module.id, key = ?entry.key, "dropping branch entry without target");
            }
            for (label, target) in transitions {
                edges.push(Edge::labeled(&module.id, target, label));
            }
        }
    }

    for predecessor in &payload.ascendants {
        edges.push(Edge::plain(predecessor, &module.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{BranchEntry, ModuleKind, ModulePayload};
    use pretty_assertions::assert_eq;

    fn module(id: &str, kind: ModuleKind, payload: ModulePayload) -> Module {
        Module {
            id: id.to_string(),
            display_name: kind.tag().to_string(),
            kind,
            payload,
        }
    }

    #[test]
    fn rules_fire_in_order() {
        let m = module(
            "M",
            ModuleKind::Menu,
            ModulePayload {
                single_next: Some("N".into()),
                exception_next: Some("E".into()),
                branches: vec![BranchEntry {
                    key: Some("1".into()),
                    names: vec![],
                    targets: vec!["B".into()],
                }],
                ascendants: vec!["P".into()],
            },
        );
        assert_eq!(
            derive_edges(&[m]),
            vec![
                Edge::plain("M", "N"),
                Edge::exception("M", "E"),
                Edge::labeled("M", "B", "1"),
                Edge::plain("P", "M"),
            ]
        );
    }

    #[test]
    fn exception_fires_for_any_kind() {
        let m = module(
            "U",
            ModuleKind::Unknown("future".into()),
            ModulePayload {
                exception_next: Some("E".into()),
                ..ModulePayload::default()
            },
        );
        let edges = derive_edges(&[m]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].style, EdgeStyle::Exception);
        assert_eq!(edges[0].label.as_deref(), Some(EXCEPTION_LABEL));
    }

    #[test]
    fn branches_ignored_for_non_branching_kinds() {
        let m = module(
            "P",
            ModuleKind::Play,
            ModulePayload {
                branches: vec![BranchEntry {
                    key: Some("x".into()),
                    names: vec![],
                    targets: vec!["T".into()],
                }],
                ..ModulePayload::default()
            },
        );
        assert!(derive_edges(&[m]).is_empty());
    }

    #[test]
    fn empty_branch_label_is_unlabeled() {
        let m = module(
            "C",
            ModuleKind::Case,
            ModulePayload {
                branches: vec![BranchEntry {
                    targets: vec!["T".into()],
                    ..BranchEntry::default()
                }],
                ..ModulePayload::default()
            },
        );
        assert_eq!(derive_edges(&[m]), vec![Edge::plain("C", "T")]);
    }

    #[test]
    fn module_without_payload_yields_nothing() {
        let m = module("H", ModuleKind::Hangup, ModulePayload::default());
        assert!(derive_edges(&[m]).is_empty());
    }
}
