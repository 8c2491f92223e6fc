//! Integration tests for document-level edits: variables, interface entries,
//! whole workflows and numbered slots.

use flowedit::edit::DocumentEditor;
use flowedit::parse::{self, InterfaceInput};
use flowedit::value::FormattedValue;
use serde_json::json;
use serde_yaml::Value;

const BRANCHING: &str = include_str!("fixtures/branching.yaml");
const CALLS: &str = include_str!("fixtures/calls.yaml");
const DYNAMIC: &str = include_str!("fixtures/dynamic.yaml");

fn variables(text: &str) -> Vec<(String, serde_json::Value)> {
    let tree = parse::parse(text).expect("Should parse");
    tree.workflow("main").unwrap().variables.clone()
}

fn interface(text: &str) -> parse::Interface {
    let tree = parse::parse(text).expect("Should parse");
    tree.workflow("main").unwrap().interface.clone()
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

#[test]
fn add_and_update_variables() {
    let editor = DocumentEditor::default();
    let added = editor
        .add_variable(BRANCHING, "main", "count", &Value::Number(3.into()))
        .unwrap();
    assert_eq!(
        variables(&added.text),
        vec![("total".to_string(), json!(0)), ("count".to_string(), json!(3))]
    );

    let list: Value = serde_yaml::from_str("[1, 2]").unwrap();
    let updated = editor.update_variable(&added.text, "main", "total", &list).unwrap();
    assert_eq!(
        variables(&updated.text),
        vec![("total".to_string(), json!([1, 2])), ("count".to_string(), json!(3))]
    );
}

#[test]
fn variable_name_errors() {
    let editor = DocumentEditor::default();
    let err = editor
        .add_variable(BRANCHING, "main", "total", &Value::Null)
        .unwrap_err();
    assert_eq!(err.code(), "E011");
    let err = editor
        .update_variable(BRANCHING, "main", "missing", &Value::Null)
        .unwrap_err();
    assert_eq!(err.code(), "E012");
}

#[test]
fn rename_variable_rewrites_references_and_assignments() {
    let editor = DocumentEditor::default();
    let edit = editor.rename_variable(BRANCHING, "main", "total", "count").unwrap();
    assert!(!edit.text.contains("total"));
    assert_eq!(variables(&edit.text), vec![("count".to_string(), json!(0))]);

    let tree = parse::parse(&edit.text).unwrap();
    let main = tree.workflow("main").unwrap();
    assert_eq!(
        main.find("done").unwrap().input("STRING"),
        Some(&FormattedValue::Variable { name: "count".into() })
    );
    assert_eq!(
        main.find("small").unwrap().input("VARIABLE"),
        Some(&FormattedValue::literal("count"))
    );
}

#[test]
fn delete_last_variable_collapses_block() {
    let editor = DocumentEditor::default();
    let edit = editor.delete_variable(BRANCHING, "main", "total").unwrap();
    assert!(edit.text.contains("    variables: {}\n"));
    assert!(variables(&edit.text).is_empty());
}

// ---------------------------------------------------------------------------
// Interface
// ---------------------------------------------------------------------------

#[test]
fn interface_inputs_round_trip() {
    let editor = DocumentEditor::default();
    let added = editor
        .add_interface_input(BRANCHING, "main", &InterfaceInput::new("limit", "int", true))
        .unwrap();
    assert_eq!(interface(&added.text).inputs, vec![InterfaceInput::new("limit", "int", true)]);

    let updated = editor
        .update_interface_input(&added.text, "main", "limit", &InterfaceInput::new("max", "float", false))
        .unwrap();
    assert_eq!(interface(&updated.text).inputs, vec![InterfaceInput::new("max", "float", false)]);

    let removed = editor.remove_interface_input(&updated.text, "main", "max").unwrap();
    assert!(interface(&removed.text).inputs.is_empty());
    assert!(removed.text.contains("      inputs: []\n"));
}

#[test]
fn interface_outputs_round_trip() {
    let editor = DocumentEditor::default();
    let added = editor.add_interface_output(BRANCHING, "main", "result").unwrap();
    assert_eq!(interface(&added.text).outputs, vec!["result"]);

    let err = editor.add_interface_output(&added.text, "main", "result").unwrap_err();
    assert_eq!(err.code(), "E011");

    let removed = editor.remove_interface_output(&added.text, "main", "result").unwrap();
    assert!(interface(&removed.text).outputs.is_empty());

    let err = editor.remove_interface_output(BRANCHING, "main", "nothing").unwrap_err();
    assert_eq!(err.code(), "E013");
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[test]
fn create_workflow_appends_start_only_item() {
    let editor = DocumentEditor::default();
    let edit = editor.create_workflow(BRANCHING, "helper").unwrap();
    assert_eq!(edit.node_id.as_deref(), Some("start"));

    let tree = parse::parse(&edit.text).unwrap();
    let names: Vec<&str> = tree.workflows.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["main", "helper"]);
    let helper = tree.workflow("helper").unwrap();
    assert_eq!(helper.nodes.len(), 1);
    assert_eq!(helper.nodes[0].id, "start");
    assert!(helper.orphans.is_empty());

    let err = editor.create_workflow(&edit.text, "helper").unwrap_err();
    assert_eq!(err.code(), "E011");
}

#[test]
fn create_workflow_in_empty_document() {
    let editor = DocumentEditor::default();
    let edit = editor.create_workflow("workflows: []\n", "main").unwrap();
    let tree = parse::parse(&edit.text).unwrap();
    assert_eq!(tree.workflows.len(), 1);
    assert_eq!(tree.workflows[0].nodes[0].opcode, "workflow_start");
}

#[test]
fn rename_workflow_updates_calls() {
    let editor = DocumentEditor::default();
    let edit = editor.rename_workflow(CALLS, "helper", "util").unwrap();
    let tree = parse::parse(&edit.text).unwrap();
    assert!(tree.workflow("util").is_some());
    assert!(tree.workflow("helper").is_none());
    let call = tree.workflow("main").unwrap().find("c").unwrap();
    assert!(matches!(
        call.input("CALL"),
        Some(FormattedValue::WorkflowCall { name, .. }) if name == "util"
    ));
}

#[test]
fn delete_workflow_leaves_calls_behind() {
    let editor = DocumentEditor::default();
    let edit = editor.delete_workflow(CALLS, "helper").unwrap();
    let doc = parse::load_document(&edit.text).unwrap();
    assert_eq!(doc.workflows.len(), 1);
    // the dangling call now surfaces as a parse error
    assert_eq!(parse::parse(&edit.text).unwrap_err().code(), "P009");
}

// ---------------------------------------------------------------------------
// Numbered slots
// ---------------------------------------------------------------------------

fn branch_names(text: &str, node: &str) -> Vec<String> {
    let tree = parse::parse(text).unwrap();
    let node = tree.workflow("main").unwrap().find(node).unwrap();
    node.children.iter().map(|b| b.name.clone()).collect()
}

#[test]
fn add_dynamic_branch_appends_next_ordinal() {
    let editor = DocumentEditor::default();
    let edit = editor.add_dynamic_branch(DYNAMIC, "main", "t").unwrap();
    assert_eq!(branch_names(&edit.text, "t"), vec!["TRY", "CATCH1", "CATCH2", "CATCH3", "FINALLY"]);
}

#[test]
fn remove_dynamic_branch_renumbers_and_deletes_contents() {
    let editor = DocumentEditor::default();
    let edit = editor.remove_dynamic_branch(DYNAMIC, "main", "t", "CATCH1").unwrap();
    assert_eq!(branch_names(&edit.text, "t"), vec!["TRY", "CATCH1", "FINALLY"]);

    let tree = parse::parse(&edit.text).unwrap();
    let t = tree.workflow("main").unwrap().find("t").unwrap();
    let heads: Vec<&str> = t.children[1].nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(heads, vec!["c"]);
    assert!(parse::load_document(&edit.text).unwrap().workflow("main").unwrap().node("b").is_none());

    let err = editor
        .remove_dynamic_branch(&edit.text, "main", "t", "CATCH1")
        .unwrap_err();
    assert_eq!(err.code(), "E015");
}

#[test]
fn dynamic_inputs_grow_and_shrink() {
    let editor = DocumentEditor::default();
    let grown = editor.add_dynamic_input(DYNAMIC, "main", "j").unwrap();
    let tree = parse::parse(&grown.text).unwrap();
    let j = &tree.workflow("main").unwrap().orphan("j").unwrap().node;
    assert_eq!(j.input("PART4"), Some(&FormattedValue::literal("")));

    let shrunk = editor.remove_dynamic_input(DYNAMIC, "main", "j", "PART1").unwrap();
    let tree = parse::parse(&shrunk.text).unwrap();
    let j = &tree.workflow("main").unwrap().orphan("j").unwrap().node;
    let inputs: Vec<(&str, &FormattedValue)> = j.inputs.iter().map(|s| (s.name.as_str(), &s.value)).collect();
    assert_eq!(
        inputs,
        vec![
            ("PART1", &FormattedValue::literal("y")),
            ("PART2", &FormattedValue::literal("z")),
        ]
    );

    let err = editor
        .remove_dynamic_input(&shrunk.text, "main", "j", "PART1")
        .unwrap_err();
    assert_eq!(err.code(), "E015");
}

#[test]
fn fixed_opcodes_have_no_numbered_slots() {
    let editor = DocumentEditor::default();
    assert_eq!(editor.add_dynamic_branch(DYNAMIC, "main", "a").unwrap_err().code(), "E014");
    assert_eq!(editor.add_dynamic_input(DYNAMIC, "main", "a").unwrap_err().code(), "E014");
}
