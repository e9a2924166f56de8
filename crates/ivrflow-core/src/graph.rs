//! The merged, serialization-ready graph every emitter consumes.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::derive::{Edge, EdgeStyle};
use crate::module::{Module, ModuleKind};

/// Separator used when a merged edge displays several labels.
pub const LABEL_SEPARATOR: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub display_name: String,
    /// `"<type>\n<displayName>"` with quote characters removed.
    pub label: String,
    #[serde(skip)]
    module_kind: ModuleKind,
}

impl GraphNode {
    fn from_module(module: &Module) -> Self {
        let label = format!("{}\n{}", module.kind.tag(), module.display_name).replace('"', "");
        Self {
            id: module.id.clone(),
            kind: module.kind.tag().to_string(),
            display_name: module.display_name.clone(),
            label,
            module_kind: module.kind.clone(),
        }
    }

    pub fn module_kind(&self) -> &ModuleKind {
        &self.module_kind
    }

    /// Last line of the label, the part naming the step.
    pub fn label_tail(&self) -> &str {
        self.label.rsplit('\n').next().unwrap_or(&self.label)
    }
}

/// Every raw edge between one `(from, to)` pair, folded into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedEdge {
    pub from: String,
    pub to: String,
    /// Distinct non-empty labels in order of first appearance.
    pub labels: Vec<String>,
    pub style: EdgeStyle,
}

impl MergedEdge {
    fn new(edge: &Edge) -> Self {
        let mut merged = Self {
            from: edge.from.clone(),
            to: edge.to.clone(),
            labels: Vec::new(),
            style: EdgeStyle::Plain,
        };
        merged.absorb(edge);
        merged
    }

    fn absorb(&mut self, edge: &Edge) {
        if let Some(label) = edge.label.as_deref()
            && !label.is_empty()
            && !self.labels.iter().any(|existing| existing == label)
        {
            self.labels.push(label.to_string());
        }
        // Exception styling wins over plain regardless of arrival order.
        self.style = self.style.max(edge.style);
    }

    /// Labels joined for display; empty when the edge is unlabeled.
    pub fn label(&self) -> String {
        self.labels.join(LABEL_SEPARATOR)
    }

    pub fn is_exception(&self) -> bool {
        self.style == EdgeStyle::Exception
    }
}

/// Nodes in module order, merged edges in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    nodes: Vec<GraphNode>,
    edges: Vec<MergedEdge>,
    #[serde(skip)]
    node_index: HashMap<String, usize>,
    #[serde(skip)]
    edge_index: HashMap<(String, String), usize>,
}

impl GraphModel {
    /// Merge modules and raw edges.
    ///
    /// The first module with a given id owns its node entry; raw edges sharing
    /// a `(from, to)` pair collapse into one [`MergedEdge`].
    pub fn build(modules: &[Module], edges: &[Edge]) -> Self {
        let mut model = GraphModel::default();

        for module in modules {
            if model.node_index.contains_key(&module.id) {
                warn!(id = %module.id, "ignoring repeated module id for node label");
                continue;
            }
            model
                .node_index
                .insert(module.id.clone(), model.nodes.len());
            model.nodes.push(GraphNode::from_module(module));
        }

        for edge in edges {
            let key = (edge.from.clone(), edge.to.clone());
            match model.edge_index.get(&key) {
                Some(&idx) => model.edges[idx].absorb(edge),
                None => {
                    model.edge_index.insert(key, model.edges.len());
                    model.edges.push(MergedEdge::new(edge));
                }
            }
        }

        model
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Name of the document the graph was compiled from, if known.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[MergedEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&MergedEdge> {
        self.edge_index
            .get(&(from.to_string(), to.to_string()))
            .map(|&idx| &self.edges[idx])
    }

    /// Edge endpoints that do not name a module, in order of first reference.
    pub fn dangling_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.edges
            .iter()
            .flat_map(|edge| [edge.from.as_str(), edge.to.as_str()])
            .filter(|id| !self.node_index.contains_key(*id))
            .filter(|id| seen.insert(*id))
            .collect()
    }
}
