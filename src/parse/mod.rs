//! Parse phase: document text → typed document → tree.

pub mod graph;
pub mod tree;
pub mod types;

pub use graph::{LinkGraph, LinkSlot};
pub use tree::{BranchNode, OrphanNode, Tree, TreeNode, WorkflowTree};
pub use types::*;

use crate::catalog::Catalog;
use crate::error::ParseError;

/// Load the raw document without resolving the tree.
pub fn load_document(text: &str) -> Result<WorkflowDocument, ParseError> {
    let root: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| ParseError::InvalidDocument(format!("Failed to parse document: {}", e)))?;
    WorkflowDocument::from_yaml(&root)
}

/// Parse document text into a tree using the built-in opcode catalog.
pub fn parse(text: &str) -> Result<Tree, ParseError> {
    parse_with_catalog(text, &Catalog::builtin())
}

pub fn parse_with_catalog(text: &str, catalog: &Catalog) -> Result<Tree, ParseError> {
    let doc = load_document(text)?;
    tree::build_tree(&doc, catalog)
}
