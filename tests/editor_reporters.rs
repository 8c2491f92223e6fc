//! Integration tests for orphan → reporter conversion and reporter removal.

use flowedit::edit::DocumentEditor;
use flowedit::parse;
use flowedit::value::FormattedValue;

const REPORTERS: &str = include_str!("fixtures/reporters.yaml");

fn show_string(text: &str) -> FormattedValue {
    let tree = parse::parse(text).expect("Should parse");
    tree.workflow("main")
        .unwrap()
        .find("show")
        .unwrap()
        .input("STRING")
        .cloned()
        .unwrap()
}

#[test]
fn orphan_becomes_inline_reporter_with_its_own_orphans() {
    let editor = DocumentEditor::default();
    let edit = editor
        .convert_orphan_to_reporter(REPORTERS, "main", "loose", "show", "STRING")
        .unwrap();

    match show_string(&edit.text) {
        FormattedValue::Reporter { opcode, id, inputs } => {
            assert_eq!(opcode, "str_concat");
            assert_eq!(id, "loose");
            assert_eq!(inputs[0].value, FormattedValue::literal("a"));
            assert!(matches!(
                &inputs[1].value,
                FormattedValue::Reporter { id, opcode, .. } if id == "inner" && opcode == "io_input"
            ));
        }
        other => panic!("expected reporter, got {:?}", other),
    }

    let doc = parse::load_document(&edit.text).unwrap();
    let main = doc.workflow("main").unwrap();
    assert!(main.node("loose").is_none());
    assert!(main.node("inner").is_none());

    // `len` lost its only user
    let tree = parse::parse(&edit.text).unwrap();
    assert_eq!(tree.workflow("main").unwrap().orphan_ids(), vec!["len"]);
}

#[test]
fn reachable_node_is_not_an_orphan() {
    let editor = DocumentEditor::default();
    let err = editor
        .convert_orphan_to_reporter(REPORTERS, "main", "len", "show", "STRING")
        .unwrap_err();
    assert_eq!(err.code(), "E009");
}

#[test]
fn target_must_accept_the_input() {
    let editor = DocumentEditor::default();
    let err = editor
        .convert_orphan_to_reporter(REPORTERS, "main", "loose", "show", "NOPE")
        .unwrap_err();
    assert_eq!(err.code(), "E004");
}

#[test]
fn converting_into_own_dependency_is_a_cycle() {
    let editor = DocumentEditor::default();
    let err = editor
        .convert_orphan_to_reporter(REPORTERS, "main", "loose", "inner", "PROMPT")
        .unwrap_err();
    assert_eq!(err.code(), "E005");
}

#[test]
fn delete_reporter_resets_slot_and_drops_entry() {
    let editor = DocumentEditor::default();
    let edit = editor
        .delete_reporter(REPORTERS, "main", "show", &["STRING".to_string()])
        .unwrap();
    assert_eq!(show_string(&edit.text), FormattedValue::literal(""));
    let doc = parse::load_document(&edit.text).unwrap();
    assert!(doc.workflow("main").unwrap().node("len").is_none());
}

#[test]
fn delete_nested_inline_reporter() {
    let editor = DocumentEditor::default();
    let text = include_str!("fixtures/branching.yaml");
    let path = vec!["VALUE".to_string(), "LEFT".to_string()];
    let edit = editor.delete_reporter(text, "main", "small", &path).unwrap();

    let tree = parse::parse(&edit.text).unwrap();
    let small = tree.workflow("main").unwrap().find("small").unwrap();
    match small.input("VALUE") {
        // operator_add LEFT is typed `any`, so it resets to null
        Some(FormattedValue::Reporter { inputs, .. }) => {
            assert_eq!(inputs[0].name, "LEFT");
            assert_eq!(inputs[0].value, FormattedValue::literal(serde_json::Value::Null));
        }
        other => panic!("expected reporter, got {:?}", other),
    }
}

#[test]
fn delete_reporter_on_missing_path_fails() {
    let editor = DocumentEditor::default();
    let err = editor
        .delete_reporter(REPORTERS, "main", "show", &["NOPE".to_string()])
        .unwrap_err();
    assert_eq!(err.code(), "E004");
}

const SHARED: &str = "\
workflows:
  - name: main
    nodes:
      start:
        opcode: workflow_start
        next: show
      show:
        opcode: io_print
        inputs:
          STRING:
            literal: \"\"
      a:
        opcode: operator_add
        inputs:
          LEFT:
            node: y
          RIGHT:
            literal: 1
      b:
        opcode: operator_add
        inputs:
          LEFT:
            node: y
          RIGHT:
            literal: 2
      y:
        opcode: io_input
        inputs:
          PROMPT:
            literal: \"n?\"
";

#[test]
fn shared_orphan_reference_stays_a_reference() {
    let editor = DocumentEditor::default();
    let edit = editor
        .convert_orphan_to_reporter(SHARED, "main", "a", "show", "STRING")
        .unwrap();

    let tree = parse::parse(&edit.text).expect("edited text still parses");
    let main = tree.workflow("main").unwrap();
    assert!(parse::load_document(&edit.text).unwrap().workflow("main").unwrap().node("y").is_some());
    match show_string(&edit.text) {
        FormattedValue::Reporter { id, inputs, .. } => {
            assert_eq!(id, "a");
            assert!(matches!(
                &inputs[0].value,
                FormattedValue::Reporter { id, .. } if id == "y"
            ));
        }
        other => panic!("expected reporter, got {:?}", other),
    }
    // `y` is now reachable through `show`, so only `b` is left over
    assert_eq!(main.orphan_ids(), vec!["b"]);
}

#[test]
fn references_to_converted_orphan_are_reset() {
    let text = SHARED.replace("          LEFT:\n            node: y\n          RIGHT:\n            literal: 2", "          LEFT:\n            node: a\n          RIGHT:\n            literal: 2");
    let editor = DocumentEditor::default();
    let edit = editor
        .convert_orphan_to_reporter(&text, "main", "a", "show", "STRING")
        .unwrap();
    let tree = parse::parse(&edit.text).expect("edited text still parses");
    let b = &tree.workflow("main").unwrap().orphan("b").unwrap().node;
    assert_eq!(b.input("LEFT"), Some(&FormattedValue::literal(serde_json::Value::Null)));
}
