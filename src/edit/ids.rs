//! Collision-free node ids.

use std::collections::HashSet;

use crate::error::EditError;
use crate::parse::{WorkflowDocument, load_document};

/// Smallest `prefix_N` (N ≥ 1) not used anywhere in the document.
///
/// Pure: the same text and prefix always give the same id.
pub fn generate_unique_id(text: &str, prefix: &str) -> Result<String, EditError> {
    let doc = load_document(text)?;
    let taken: HashSet<String> = doc.all_ids().into_iter().collect();
    Ok(unique_id(&taken, prefix))
}

/// Hands out ids that are unique in the document *and* among ids it already
/// handed out, so repeated calls against one unmodified text never collide.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    reserved: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, text: &str, prefix: &str) -> Result<String, EditError> {
        let doc = load_document(text)?;
        Ok(self.allocate_in(&doc, prefix))
    }

    pub(crate) fn allocate_in(&mut self, doc: &WorkflowDocument, prefix: &str) -> String {
        let mut taken: HashSet<String> = doc.all_ids().into_iter().collect();
        taken.extend(self.reserved.iter().cloned());
        let id = unique_id(&taken, prefix);
        self.reserved.insert(id.clone());
        id
    }
}

pub(crate) fn unique_id(taken: &HashSet<String>, prefix: &str) -> String {
    let base = id_base(prefix);
    let mut n = 1usize;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// `io_print_3` → `io_print`; anything outside `[A-Za-z0-9_]` becomes `_`.
fn id_base(prefix: &str) -> String {
    let cleaned: String = prefix
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let stripped = match cleaned.rsplit_once('_') {
        Some((head, tail)) if !head.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => {
            head.to_string()
        }
        _ => cleaned,
    };
    if stripped.is_empty() {
        "node".into()
    } else {
        stripped
    }
}
