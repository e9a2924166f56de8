//! IVR call-flow compiler.
//!
//! XML text -> [`xml::XmlTree`] -> [`Module`]s -> [`Edge`]s -> [`GraphModel`].
//!
//! Every stage is a plain function over in-memory data; nothing here holds
//! global state, so documents can be compiled on as many threads as the
//! caller likes.

pub mod derive;
pub mod extract;
pub mod graph;
pub mod module;
pub mod xml;

pub use derive::{EXCEPTION_LABEL, Edge, EdgeStyle, derive_edges};
pub use extract::extract_modules;
pub use graph::{GraphModel, GraphNode, LABEL_SEPARATOR, MergedEdge};
pub use ivrflow_error::{Error, ErrorKind, Result};
pub use module::{BranchEntry, Module, ModuleKind, ModulePayload};
pub use xml::{XmlElement, XmlTree, parse_document};

/// All intermediate products of one compilation, kept for inspection.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub modules: Vec<Module>,
    pub edges: Vec<Edge>,
    pub graph: GraphModel,
}

/// Compile XML text into a [`GraphModel`].
///
/// Fails with `MalformedInput` for text that is not XML and `SchemaError` for
/// XML without a `modules` collection under its root.
pub fn compile(xml: &str) -> Result<GraphModel> {
    compile_document(xml).map(|document| document.graph)
}

/// Like [`compile`], but keeps the module and raw edge lists.
pub fn compile_document(xml: &str) -> Result<CompiledDocument> {
    let tree = parse_document(xml)?;
    let modules = extract_modules(&tree)?;
    let edges = derive_edges(&modules);
    let graph = GraphModel::build(&modules, &edges);
    Ok(CompiledDocument {
        modules,
        edges,
        graph,
    })
}
