//! Module extraction: nested XML tree -> flat list of [`Module`] records.

use tracing::{debug, warn};

use crate::module::{BranchEntry, Module, ModuleKind, ModulePayload};
use crate::xml::{XmlElement, XmlTree};
use crate::{Error, Result};

pub const MODULES_FIELD: &str = "modules";
pub const ID_FIELD: &str = "moduleId";
pub const NAME_FIELD: &str = "moduleName";
pub const SINGLE_NEXT_FIELD: &str = "singleDescendant";
pub const EXCEPTION_NEXT_FIELD: &str = "exceptionalDescendant";
pub const ASCENDANTS_FIELD: &str = "ascendants";

/// Walk `document.modules` and produce one [`Module`] per instance with an id.
///
/// Groups are visited in order of first appearance, instances in document
/// order. Instances without an id are skipped, not reported.
pub fn extract_modules(tree: &XmlTree) -> Result<Vec<Module>> {
    let root = tree.root();
    let modules = root.first(MODULES_FIELD).ok_or_else(|| {
        Error::schema("expected top-level module collection missing")
            .with_operation("extract::extract_modules")
            .with_context("root", root.name())
    })?;

    let mut extracted = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for (tag, instances) in modules.groups() {
        let kind = ModuleKind::from_tag(tag);
        for (position, instance) in instances.iter().enumerate() {
            let Some(module) = extract_module(&kind, instance) else {
                debug!(group = tag, position, "skipping module without an id");
                continue;
            };
            if !seen.insert(module.id.clone()) {
                warn!(id = %module.id, group = tag, "duplicate module id");
            }
            extracted.push(module);
        }
    }

    debug!(count = extracted.len(), "modules extracted");
    Ok(extracted)
}

fn extract_module(kind: &ModuleKind, element: &XmlElement) -> Option<Module> {
    let id = element.text_of(ID_FIELD)?.to_string();
    let display_name = element
        .text_of(NAME_FIELD)
        .unwrap_or_else(|| kind.tag())
        .to_string();

    let payload = ModulePayload {
        single_next: element.text_of(SINGLE_NEXT_FIELD).map(str::to_string),
        exception_next: element.text_of(EXCEPTION_NEXT_FIELD).map(str::to_string),
        branches: extract_branches(element),
        ascendants: extract_ascendants(element),
    };

    Some(Module {
        id,
        kind: kind.clone(),
        display_name,
        payload,
    })
}

/// Branch tables live at `data/branches/entry` or directly at `branches/entry`.
fn extract_branches(element: &XmlElement) -> Vec<BranchEntry> {
    let branches = element
        .path(&["data", "branches"])
        .or_else(|| element.first("branches"));
    let Some(branches) = branches else {
        return Vec::new();
    };

    branches
        .field("entry")
        .iter()
        .map(|entry| {
            let value = entry.first("value");
            let lookup = |name: &str| -> Vec<String> {
                let mut texts = entry.texts_of(name);
                if texts.is_empty()
                    && let Some(value) = value
                {
                    texts = value.texts_of(name);
                }
                texts.into_iter().map(str::to_string).collect()
            };

            BranchEntry {
                key: lookup("key").into_iter().next(),
                names: lookup("name"),
                targets: lookup("targetId"),
            }
        })
        .collect()
}

/// Predecessor ids, tolerating bare text, a `moduleId` child, or a wrapper
/// with one child element per predecessor.
fn extract_ascendants(element: &XmlElement) -> Vec<String> {
    let mut ids = Vec::new();
    for ascendant in element.field(ASCENDANTS_FIELD) {
        if let Some(id) = reference_id(ascendant) {
            ids.push(id.to_string());
            continue;
        }
        for (_, children) in ascendant.groups() {
            ids.extend(children.iter().filter_map(reference_id).map(str::to_string));
        }
    }
    ids
}

fn reference_id(element: &XmlElement) -> Option<&str> {
    if !element.text().is_empty() {
        return Some(element.text());
    }
    element.text_of(ID_FIELD)
}
