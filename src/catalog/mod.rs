//! Opcode catalog: categories, parameters and branch slots per opcode.

mod builtin;
pub mod types;

pub use types::*;

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Catalog {
    specs: HashMap<String, OpcodeSpec>,
}

#[derive(Deserialize)]
struct CatalogFile {
    opcodes: Vec<OpcodeSpec>,
}

impl Catalog {
    pub fn new(specs: impl IntoIterator<Item = OpcodeSpec>) -> Self {
        Catalog {
            specs: specs.into_iter().map(|s| (s.opcode.clone(), s)).collect(),
        }
    }

    /// The catalog of opcodes shipped with the editor.
    pub fn builtin() -> Self {
        Catalog::new(builtin::specs())
    }

    /// Load a catalog from `{"opcodes": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(Catalog::new(file.opcodes))
    }

    /// Add or replace an opcode definition.
    pub fn register(&mut self, spec: OpcodeSpec) {
        self.specs.insert(spec.opcode.clone(), spec);
    }

    pub fn get(&self, opcode: &str) -> Option<&OpcodeSpec> {
        self.specs.get(opcode)
    }

    pub fn is_control_flow(&self, opcode: &str) -> bool {
        self.get(opcode).is_some_and(|s| s.is_control_flow())
    }

    /// Ordered branch slots of `opcode` given the branch names a node already has.
    pub fn branch_slots(&self, opcode: &str, present: &[&str]) -> Vec<String> {
        match self.get(opcode).and_then(|s| s.branches.as_ref()) {
            Some(slots) => branch_slots(slots, present),
            None => Vec::new(),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolve a slot definition against the branch names present on a node.
///
/// Dynamic slots expand to `max(min, count of prefixed names, highest ordinal)`
/// numbered entries, so a gap in the numbering still yields every slot up to
/// the highest one written. The highest ordinal only counts up to
/// `count of prefixed names + min`; a name numbered past that is not a slot.
pub fn branch_slots(slots: &BranchSlots, present: &[&str]) -> Vec<String> {
    match slots {
        BranchSlots::Fixed { names } => names.clone(),
        BranchSlots::Dynamic {
            leading,
            prefix,
            min,
            trailing,
        } => {
            let ordinals: Vec<usize> = present
                .iter()
                .filter_map(|name| ordinal_suffix(name, prefix))
                .collect();
            let highest = ordinals.iter().copied().max().unwrap_or(0);
            let count = (*min).max(ordinals.len()).max(highest.min(ordinals.len() + *min));

            let mut out = leading.clone();
            out.extend((1..=count).map(|i| format!("{prefix}{i}")));
            out.extend(trailing.iter().cloned());
            out
        }
    }
}
