//! WASM entry points for browser use.
//!
//! Structured arguments arrive as JSON strings; results are plain objects
//! built from the DTOs at the bottom of this file.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::edit::{AddNode, DocumentEditor, Edit, Extraction};
use crate::error::{EditError, ParseError, Phase};
use crate::layout::{Geometry, LayoutConfig, LayoutOverrides};
use crate::parse::{LinkSlot, Tree};

/// Parse document text into the tree the canvas renders.
#[wasm_bindgen]
pub fn parse_workflows(text: &str) -> JsValue {
    to_js(&parse_workflows_inner(text))
}

fn parse_workflows_inner(text: &str) -> ParseResult<Tree> {
    match crate::parse::parse(text) {
        Ok(tree) => ParseResult::Success(tree),
        Err(e) => ParseResult::Errors(vec![ErrorDto::from(e)]),
    }
}

/// Parse and lay out. `overrides_json` and `config_json` may be empty.
#[wasm_bindgen]
pub fn layout_workflows(text: &str, overrides_json: &str, config_json: &str) -> JsValue {
    to_js(&layout_workflows_inner(text, overrides_json, config_json))
}

fn layout_workflows_inner(text: &str, overrides_json: &str, config_json: &str) -> ParseResult<Geometry> {
    let overrides: LayoutOverrides = match json_or_default(overrides_json, "layout overrides") {
        Ok(o) => o,
        Err(e) => return ParseResult::Errors(vec![e]),
    };
    let config: LayoutConfig = match json_or_default(config_json, "layout config") {
        Ok(c) => c,
        Err(e) => return ParseResult::Errors(vec![e]),
    };
    match crate::parse::parse(text) {
        Ok(tree) => ParseResult::Success(crate::layout::layout(&tree, &overrides, &config)),
        Err(e) => ParseResult::Errors(vec![ErrorDto::from(e)]),
    }
}

#[wasm_bindgen]
pub fn add_node(text: &str, args_json: &str) -> JsValue {
    to_js(&add_node_inner(text, args_json))
}

fn add_node_inner(text: &str, args_json: &str) -> EditResult {
    let args: AddNode = match serde_json::from_str(args_json) {
        Ok(a) => a,
        Err(e) => return EditResult::bad_args(text, "node", e),
    };
    EditResult::from_edit(text, editor().add_node(text, &args))
}

#[wasm_bindgen]
pub fn delete_node(text: &str, workflow: &str, node_id: &str) -> JsValue {
    to_js(&EditResult::from_edit(text, editor().delete_node(text, workflow, node_id)))
}

#[wasm_bindgen]
pub fn duplicate_node(text: &str, workflow: &str, node_id: &str) -> JsValue {
    to_js(&EditResult::from_edit(text, editor().duplicate_node(text, workflow, node_id)))
}

/// Link `from` to `to` on `next`, or on `branch` when given.
#[wasm_bindgen]
pub fn connect_nodes(text: &str, workflow: &str, from: &str, branch: Option<String>, to: &str) -> JsValue {
    to_js(&connect_nodes_inner(text, workflow, from, branch, to))
}

fn connect_nodes_inner(text: &str, workflow: &str, from: &str, branch: Option<String>, to: &str) -> EditResult {
    let slot = slot(branch);
    EditResult::from_edit(text, editor().connect(text, workflow, from, &slot, to))
}

#[wasm_bindgen]
pub fn disconnect_nodes(text: &str, workflow: &str, from: &str, branch: Option<String>) -> JsValue {
    let slot = slot(branch);
    to_js(&EditResult::from_edit(text, editor().disconnect(text, workflow, from, &slot)))
}

#[wasm_bindgen]
pub fn convert_orphan(text: &str, workflow: &str, orphan_id: &str, target_id: &str, input: &str) -> JsValue {
    to_js(&EditResult::from_edit(
        text,
        editor().convert_orphan_to_reporter(text, workflow, orphan_id, target_id, input),
    ))
}

/// `path_json` is the input-name path from the parent, e.g. `["STRING"]`.
#[wasm_bindgen]
pub fn delete_reporter(text: &str, workflow: &str, parent_id: &str, path_json: &str) -> JsValue {
    to_js(&delete_reporter_inner(text, workflow, parent_id, path_json))
}

fn delete_reporter_inner(text: &str, workflow: &str, parent_id: &str, path_json: &str) -> EditResult {
    let path: Vec<String> = match serde_json::from_str(path_json) {
        Ok(p) => p,
        Err(e) => return EditResult::bad_args(text, "input path", e),
    };
    EditResult::from_edit(text, editor().delete_reporter(text, workflow, parent_id, &path))
}

/// Check whether the selected ids form an extractable chain.
#[wasm_bindgen]
pub fn validate_chain(text: &str, workflow: &str, node_ids_json: &str) -> JsValue {
    to_js(&validate_chain_inner(text, workflow, node_ids_json))
}

fn validate_chain_inner(
    text: &str,
    workflow: &str,
    node_ids_json: &str,
) -> ParseResult<crate::validate::ChainValidation> {
    let ids: Vec<String> = match serde_json::from_str(node_ids_json) {
        Ok(ids) => ids,
        Err(e) => return ParseResult::Errors(vec![ErrorDto::json("node ids", e)]),
    };
    match crate::parse::parse(text) {
        Ok(tree) => ParseResult::Success(crate::validate::validate_linear_chain(&tree, &ids, workflow)),
        Err(e) => ParseResult::Errors(vec![ErrorDto::from(e)]),
    }
}

#[wasm_bindgen]
pub fn extract_workflow(text: &str, args_json: &str) -> JsValue {
    to_js(&extract_workflow_inner(text, args_json))
}

fn extract_workflow_inner(text: &str, args_json: &str) -> EditResult {
    let args: Extraction = match serde_json::from_str(args_json) {
        Ok(a) => a,
        Err(e) => return EditResult::bad_args(text, "extraction", e),
    };
    EditResult::from_edit(text, editor().extract_to_workflow(text, &args))
}

fn editor() -> DocumentEditor {
    DocumentEditor::default()
}

fn slot(branch: Option<String>) -> LinkSlot {
    match branch {
        Some(name) => LinkSlot::Branch(name),
        None => LinkSlot::Next,
    }
}

fn json_or_default<T: serde::de::DeserializeOwned + Default>(json: &str, what: &str) -> Result<T, ErrorDto> {
    if json.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(json).map_err(|e| ErrorDto::json(what, e))
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: String,
    phase: String,
    message: String,
    node_id: Option<String>,
}

impl ErrorDto {
    fn json(what: &str, e: serde_json::Error) -> Self {
        ErrorDto {
            code: "P001".into(),
            phase: Phase::Parse.to_string(),
            message: format!("Failed to parse {} JSON: {}", what, e),
            node_id: None,
        }
    }

    fn from_edit(e: &EditError) -> Vec<Self> {
        let phase = match e {
            EditError::Document(_) => Phase::Parse,
            _ => Phase::Edit,
        };
        e.messages()
            .into_iter()
            .map(|message| ErrorDto {
                code: e.code().into(),
                phase: phase.to_string(),
                message,
                node_id: e.node_id().map(str::to_string),
            })
            .collect()
    }
}

impl From<ParseError> for ErrorDto {
    fn from(e: ParseError) -> Self {
        ErrorDto {
            code: e.code().into(),
            phase: Phase::Parse.to_string(),
            message: e.to_string(),
            node_id: e.node_id().map(str::to_string),
        }
    }
}

/// Outcome of an edit. On failure `text` is the unchanged input.
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct EditResult {
    success: bool,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_id: Option<String>,
    errors: Vec<ErrorDto>,
}

impl EditResult {
    fn from_edit(text: &str, result: Result<Edit, EditError>) -> Self {
        match result {
            Ok(edit) => EditResult {
                success: true,
                text: edit.text,
                node_id: edit.node_id,
                errors: Vec::new(),
            },
            Err(e) => EditResult {
                success: false,
                text: text.to_string(),
                node_id: None,
                errors: ErrorDto::from_edit(&e),
            },
        }
    }

    fn bad_args(text: &str, what: &str, e: serde_json::Error) -> Self {
        EditResult {
            success: false,
            text: text.to_string(),
            node_id: None,
            errors: vec![ErrorDto::json(what, e)],
        }
    }
}

#[derive(serde::Serialize)]
#[serde(tag = "status", content = "data")]
enum ParseResult<T> {
    #[serde(rename = "success")]
    Success(T),
    #[serde(rename = "errors")]
    Errors(Vec<ErrorDto>),
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "workflows:\n  - name: main\n    nodes:\n      start:\n        opcode: workflow_start\n";

    #[test]
    fn failed_edit_returns_input_text() {
        let result = delete_node_result(DOC, "main", "start");
        assert!(!result.success);
        assert_eq!(result.text, DOC);
        assert_eq!(result.errors[0].code, "E010");
        assert_eq!(result.errors[0].node_id.as_deref(), Some("start"));
    }

    #[test]
    fn add_node_reports_new_id() {
        let result = add_node_inner(DOC, r#"{"workflow": "main", "opcode": "io_print"}"#);
        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.node_id.as_deref(), Some("io_print_1"));
    }

    #[test]
    fn bad_args_json_is_reported() {
        let result = add_node_inner(DOC, "{not json");
        assert!(!result.success);
        assert_eq!(result.errors[0].code, "P001");
    }

    fn delete_node_result(text: &str, workflow: &str, node_id: &str) -> EditResult {
        EditResult::from_edit(text, editor().delete_node(text, workflow, node_id))
    }
}
