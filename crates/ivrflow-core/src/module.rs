//! Module records: one per IVR call-flow step.

use std::str::FromStr;

use strum_macros::{EnumString, IntoStaticStr};

/// Known module types, keyed by the group tag they appear under.
///
/// Anything else lands in [`ModuleKind::Unknown`] with its tag preserved, so
/// new module types flow through the compiler (as nodes without derived
/// branch edges) instead of failing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum ModuleKind {
    IncomingCall,
    Play,
    Menu,
    Case,
    IfElse,
    Input,
    GetDigits,
    Query,
    SetVariables,
    SkillTransfer,
    ThirdPartyTransfer,
    VoiceMail,
    Hangup,
    #[strum(default)]
    Unknown(String),
}

impl ModuleKind {
    pub fn from_tag(tag: &str) -> Self {
        // The default variant makes parsing infallible.
        ModuleKind::from_str(tag).unwrap_or_else(|_| ModuleKind::Unknown(tag.to_string()))
    }

    /// The group tag this kind was parsed from.
    pub fn tag(&self) -> &str {
        match self {
            ModuleKind::Unknown(tag) => tag,
            known => <&'static str>::from(known),
        }
    }

    /// Kinds whose branch table turns into labeled edges.
    pub fn is_branching(&self) -> bool {
        matches!(self, ModuleKind::Menu | ModuleKind::Case | ModuleKind::IfElse)
    }

    pub fn is_entry(&self) -> bool {
        matches!(self, ModuleKind::IncomingCall)
    }

    pub fn is_transfer(&self) -> bool {
        matches!(
            self,
            ModuleKind::SkillTransfer | ModuleKind::ThirdPartyTransfer
        )
    }
}

/// One row of a module's branch table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchEntry {
    pub key: Option<String>,
    pub names: Vec<String>,
    pub targets: Vec<String>,
}

impl BranchEntry {
    /// `(label, target)` pairs this entry contributes.
    ///
    /// A single target takes the key (or the first name); several targets pair
    /// with names by position, falling back to the first name, then the key.
    /// Entries without a target contribute nothing.
    pub fn transitions(&self) -> Vec<(&str, &str)> {
        let first_name = self.names.first().map(String::as_str);
        let key = self.key.as_deref();

        if let [target] = self.targets.as_slice() {
            let label = key.or(first_name).unwrap_or("");
            return vec![(label, target.as_str())];
        }

        self.targets
            .iter()
            .enumerate()
            .map(|(idx, target)| {
                let label = self
                    .names
                    .get(idx)
                    .map(String::as_str)
                    .or(first_name)
                    .or(key)
                    .unwrap_or("");
                (label, target.as_str())
            })
            .collect()
    }
}

/// Type-specific data the edge rules read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModulePayload {
    pub single_next: Option<String>,
    pub exception_next: Option<String>,
    pub branches: Vec<BranchEntry>,
    pub ascendants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: String,
    pub kind: ModuleKind,
    /// Presentation only; never used for identity.
    pub display_name: String,
    pub payload: ModulePayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_tags_round_trip() {
        for tag in ["incomingCall", "ifElse", "thirdPartyTransfer", "hangup", "case"] {
            let kind = ModuleKind::from_tag(tag);
            assert!(!matches!(kind, ModuleKind::Unknown(_)), "{tag}");
            assert_eq!(kind.tag(), tag);
        }
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let kind = ModuleKind::from_tag("webhookCall");
        assert_eq!(kind, ModuleKind::Unknown("webhookCall".to_string()));
        assert_eq!(kind.tag(), "webhookCall");
        assert!(!kind.is_branching());
    }

    #[test]
    fn branching_kinds() {
        assert!(ModuleKind::Menu.is_branching());
        assert!(ModuleKind::Case.is_branching());
        assert!(ModuleKind::IfElse.is_branching());
        assert!(!ModuleKind::Play.is_branching());
        assert!(ModuleKind::SkillTransfer.is_transfer());
    }

    #[test]
    fn single_target_prefers_key() {
        let entry = BranchEntry {
            key: Some("1".into()),
            names: vec!["Sales".into()],
            targets: vec!["S".into()],
        };
        assert_eq!(entry.transitions(), vec![("1", "S")]);

        let entry = BranchEntry {
            key: None,
            names: vec!["Sales".into()],
            targets: vec!["S".into()],
        };
        assert_eq!(entry.transitions(), vec![("Sales", "S")]);
    }

    #[test]
    fn multi_valued_pairs_by_position() {
        let entry = BranchEntry {
            key: Some("k".into()),
            names: vec!["a".into(), "b".into()],
            targets: vec!["T1".into(), "T2".into(), "T3".into()],
        };
        assert_eq!(
            entry.transitions(),
            vec![("a", "T1"), ("b", "T2"), ("a", "T3")]
        );
    }

    #[test]
    fn missing_label_and_missing_target() {
        let entry = BranchEntry {
            targets: vec!["T".into()],
            ..BranchEntry::default()
        };
        assert_eq!(entry.transitions(), vec![("", "T")]);

        let entry = BranchEntry {
            key: Some("orphan".into()),
            ..BranchEntry::default()
        };
        assert!(entry.transitions().is_empty());
    }
}
