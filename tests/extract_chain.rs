//! Integration tests for chain validation and extraction into a new workflow.

use flowedit::edit::{DocumentEditor, Extraction};
use flowedit::parse;
use flowedit::validate::{analyze_chain_variables, validate_linear_chain};
use flowedit::value::FormattedValue;
use flowedit::Catalog;
use serde_json::json;

const BRANCHING: &str = include_str!("fixtures/branching.yaml");
const EXTRACT: &str = include_str!("fixtures/extract.yaml");

fn select(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn chain_ids(text: &str, workflow: &str) -> Vec<String> {
    let tree = parse::parse(text).expect("Should parse");
    tree.workflow(workflow)
        .unwrap()
        .nodes
        .iter()
        .map(|n| n.id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn control_node_with_all_branch_contents_is_valid() {
    let tree = parse::parse(BRANCHING).unwrap();
    let result = validate_linear_chain(&tree, &select(&["check", "big", "small"]), "main");
    assert!(result.is_valid, "{:?}", result.errors);
    assert_eq!(result.ordered_node_ids, vec!["check"]);
    assert_eq!(result.nested_ids, vec!["big", "small"]);
    assert_eq!(result.predecessor_id.as_deref(), Some("greet"));
    assert_eq!(result.successor_id.as_deref(), Some("done"));
}

#[test]
fn selection_leaking_into_a_branch_is_rejected() {
    let tree = parse::parse(BRANCHING).unwrap();
    let result = validate_linear_chain(&tree, &select(&["greet", "big"]), "main");
    assert!(!result.is_valid);
    assert_eq!(
        result.errors,
        vec!["Branch leakage: 'big' sits in branch THEN of 'check', outside the selected run"]
    );
}

#[test]
fn partly_selected_branches_are_rejected() {
    let tree = parse::parse(BRANCHING).unwrap();
    let result = validate_linear_chain(&tree, &select(&["check", "big"]), "main");
    assert!(!result.is_valid);
    assert_eq!(
        result.errors,
        vec!["Branch leakage: branch contents of 'check' are only partly selected"]
    );
}

#[test]
fn gaps_start_and_orphans_are_rejected() {
    let tree = parse::parse(BRANCHING).unwrap();

    let gap = validate_linear_chain(&tree, &select(&["greet", "done"]), "main");
    assert_eq!(gap.errors, vec!["Selection is not contiguous: gap between 'greet' and 'done'"]);

    let start = validate_linear_chain(&tree, &select(&["start"]), "main");
    assert!(!start.is_valid);
    assert!(start.errors[0].starts_with("Start node 'start' cannot be extracted"));
    assert_eq!(start.predecessor_id, None);

    let orphan = validate_linear_chain(&tree, &select(&["stray"]), "main");
    assert!(!orphan.is_valid);
    assert_eq!(orphan.errors, vec!["Node 'stray' is an orphan and not part of the chain"]);

    let missing = validate_linear_chain(&tree, &select(&["greet"]), "other");
    assert_eq!(missing.errors, vec!["Workflow 'other' not found"]);
}

#[test]
fn variable_flow_splits_inputs_outputs_and_locals() {
    let tree = parse::parse(EXTRACT).unwrap();
    let catalog = Catalog::builtin();

    let first = analyze_chain_variables(&tree, &catalog, "main", &select(&["a"]));
    assert!(first.inputs.is_empty());
    assert_eq!(first.outputs, vec!["total"]);

    let both = analyze_chain_variables(&tree, &catalog, "main", &select(&["a", "b"]));
    assert!(both.outputs.is_empty());
    assert_eq!(both.locals, vec!["total"]);

    let reader = analyze_chain_variables(&tree, &catalog, "main", &select(&["b"]));
    assert_eq!(reader.inputs, vec!["total"]);
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

fn extraction(ids: &[&str], name: &str) -> Extraction {
    Extraction {
        workflow: "main".into(),
        node_ids: select(ids),
        new_name: name.into(),
        interface: None,
    }
}

#[test]
fn extract_run_without_outputs() {
    let editor = DocumentEditor::default();
    let edit = editor
        .extract_to_workflow(EXTRACT, &extraction(&["a", "b"], "helper"))
        .unwrap();
    assert_eq!(edit.node_id.as_deref(), Some("call_1"));

    assert_eq!(chain_ids(&edit.text, "main"), vec!["start", "call_1", "c"]);
    assert_eq!(chain_ids(&edit.text, "helper"), vec!["start", "a", "b"]);

    let tree = parse::parse(&edit.text).unwrap();
    let call = tree.workflow("main").unwrap().find("call_1").unwrap();
    assert_eq!(call.opcode, "workflow_call");
    assert!(matches!(
        call.input("CALL"),
        Some(FormattedValue::WorkflowCall { name, .. }) if name == "helper"
    ));

    let helper = tree.workflow("helper").unwrap();
    assert_eq!(helper.variables, vec![("total".to_string(), json!(0))]);
    assert!(helper.orphans.is_empty());
    assert!(tree.workflow("main").unwrap().orphans.is_empty());
}

#[test]
fn extract_single_output_assigns_call_result() {
    let editor = DocumentEditor::default();
    let edit = editor
        .extract_to_workflow(EXTRACT, &extraction(&["a"], "helper"))
        .unwrap();

    assert_eq!(chain_ids(&edit.text, "main"), vec!["start", "call_1", "b", "c"]);
    assert_eq!(
        chain_ids(&edit.text, "helper"),
        vec!["start", "a", "workflow_return_1"]
    );

    let tree = parse::parse(&edit.text).unwrap();
    let call = tree.workflow("main").unwrap().find("call_1").unwrap();
    assert_eq!(call.opcode, "data_set_variable");
    assert_eq!(call.input("VARIABLE"), Some(&FormattedValue::literal("total")));
    assert!(matches!(call.input("VALUE"), Some(FormattedValue::WorkflowCall { .. })));

    let helper = tree.workflow("helper").unwrap();
    assert_eq!(helper.interface.outputs, vec!["total"]);
    let ret = helper.find("workflow_return_1").unwrap();
    assert_eq!(ret.input("VALUE"), Some(&FormattedValue::Variable { name: "total".into() }));
}

#[test]
fn extract_rejects_taken_names_and_bad_selections() {
    let editor = DocumentEditor::default();
    let err = editor
        .extract_to_workflow(EXTRACT, &extraction(&["a"], "main"))
        .unwrap_err();
    assert_eq!(err.code(), "E011");

    let err = editor
        .extract_to_workflow(BRANCHING, &extraction(&["greet", "done"], "helper"))
        .unwrap_err();
    assert_eq!(err.code(), "E016");
}

const SHARED_REPORTER: &str = "\
workflows:
  - name: main
    nodes:
      start:
        opcode: workflow_start
        next: p1
      p1:
        opcode: io_print
        inputs:
          STRING:
            node: r
        next: p2
      p2:
        opcode: io_print
        inputs:
          STRING:
            node: r
      r:
        opcode: io_input
        inputs:
          PROMPT:
            literal: \"name?\"
";

#[test]
fn extract_copies_reporters_shared_with_the_source() {
    let editor = DocumentEditor::default();
    let edit = editor
        .extract_to_workflow(SHARED_REPORTER, &extraction(&["p2"], "sub"))
        .unwrap();

    let tree = parse::parse(&edit.text).expect("extracted text still parses");
    assert_eq!(chain_ids(&edit.text, "main"), vec!["start", "p1", "call_1"]);
    assert_eq!(chain_ids(&edit.text, "sub"), vec!["start", "p2"]);

    let reporter_id = |workflow: &str, node: &str| match tree.workflow(workflow).unwrap().find(node).unwrap().input("STRING") {
        Some(FormattedValue::Reporter { id, opcode, .. }) => {
            assert_eq!(opcode, "io_input");
            id.clone()
        }
        other => panic!("expected reporter, got {:?}", other),
    };
    assert_eq!(reporter_id("main", "p1"), "r");
    assert_eq!(reporter_id("sub", "p2"), "r_1");
    assert!(tree.workflow("main").unwrap().orphans.is_empty());
    assert!(tree.workflow("sub").unwrap().orphans.is_empty());
}
