//! Integration tests for node edits: add, delete, duplicate.

use flowedit::edit::{AddNode, DocumentEditor, IdAllocator, generate_unique_id};
use flowedit::parse::{self, LinkSlot};
use flowedit::value::FormattedValue;

const MAIN_HELLO: &str = include_str!("fixtures/main_hello.yaml");
const BRANCHING: &str = include_str!("fixtures/branching.yaml");
const REPORTERS: &str = include_str!("fixtures/reporters.yaml");

fn chain(text: &str) -> Vec<String> {
    let tree = parse::parse(text).expect("Should parse");
    tree.workflow("main").unwrap().nodes.iter().map(|n| n.id.clone()).collect()
}

fn orphans(text: &str) -> Vec<String> {
    let tree = parse::parse(text).expect("Should parse");
    tree.workflow("main")
        .unwrap()
        .orphan_ids()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[test]
fn main_hello_end_to_end() {
    let editor = DocumentEditor::default();

    let added = editor
        .add_node(MAIN_HELLO, &AddNode::new("main", "io_print"))
        .expect("add");
    let new_id = added.node_id.clone().expect("new id");
    assert_eq!(new_id, "io_print_1");
    assert_eq!(chain(&added.text), vec!["start", "hello", "io_print_1"]);
    assert!(orphans(&added.text).is_empty());
    assert!(added.text.contains("literal: \"Hello, LexFlow!\""));

    let deleted = editor.delete_node(&added.text, "main", "hello").expect("delete");
    assert_eq!(chain(&deleted.text), vec!["start", "io_print_1"]);
    assert!(!deleted.text.contains("hello:"));

    let duplicated = editor
        .duplicate_node(&deleted.text, "main", &new_id)
        .expect("duplicate");
    let copy_id = duplicated.node_id.clone().unwrap();
    assert_eq!(copy_id, "io_print_2");
    assert_eq!(chain(&duplicated.text), vec!["start", "io_print_1"]);
    assert_eq!(orphans(&duplicated.text), vec![copy_id.clone()]);

    let tree = parse::parse(&duplicated.text).unwrap();
    let main = tree.workflow("main").unwrap();
    let original = main.find("io_print_1").unwrap();
    let copy = &main.orphan(&copy_id).unwrap().node;
    assert_eq!(copy.opcode, original.opcode);
    assert_eq!(copy.inputs, original.inputs);

    let text = duplicated.text;
    insta::assert_snapshot!("main_hello_after_edits", text);
}

#[test]
fn repeated_adds_get_distinct_ids() {
    let editor = DocumentEditor::default();
    let first = editor.add_node(MAIN_HELLO, &AddNode::new("main", "io_print")).unwrap();
    let second = editor.add_node(&first.text, &AddNode::new("main", "io_print")).unwrap();
    assert_eq!(second.node_id.as_deref(), Some("io_print_2"));
    assert_eq!(chain(&second.text), vec!["start", "hello", "io_print_1", "io_print_2"]);
}

#[test]
fn add_into_branch_keeps_displaced_head_as_successor() {
    let editor = DocumentEditor::default();
    let args = AddNode::new("main", "io_print").after("check", LinkSlot::Branch("THEN".into()));
    let edit = editor.add_node(BRANCHING, &args).unwrap();

    let tree = parse::parse(&edit.text).unwrap();
    let check = tree.workflow("main").unwrap().find("check").unwrap();
    let then: Vec<&str> = check.children[0].nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(then, vec!["io_print_1", "big"]);
}

#[test]
fn add_with_explicit_successor() {
    let editor = DocumentEditor::default();
    let args = AddNode::new("main", "io_print")
        .after("greet", LinkSlot::Next)
        .successor("check");
    let edit = editor.add_node(BRANCHING, &args).unwrap();
    assert_eq!(chain(&edit.text), vec!["start", "greet", "io_print_1", "check", "done"]);
}

#[test]
fn add_writes_default_literals_for_params() {
    let editor = DocumentEditor::default();
    let edit = editor
        .add_node(MAIN_HELLO, &AddNode::new("main", "control_if"))
        .unwrap();
    let tree = parse::parse(&edit.text).unwrap();
    let node = tree.workflow("main").unwrap().find("control_if_1").unwrap();
    assert_eq!(node.input("CONDITION"), Some(&FormattedValue::literal(false)));
    assert_eq!(node.children.len(), 1);
    assert!(node.children[0].nodes.is_empty());
}

#[test]
fn add_rejects_unknown_opcode_and_branch() {
    let editor = DocumentEditor::default();
    let err = editor
        .add_node(MAIN_HELLO, &AddNode::new("main", "teleport"))
        .unwrap_err();
    assert_eq!(err.code(), "E008");

    let args = AddNode::new("main", "io_print").after("check", LinkSlot::Branch("MAYBE".into()));
    let err = editor.add_node(BRANCHING, &args).unwrap_err();
    assert_eq!(err.code(), "E007");
}

#[test]
fn delete_control_node_takes_its_branches() {
    let editor = DocumentEditor::default();
    let edit = editor.delete_node(BRANCHING, "main", "check").unwrap();
    assert_eq!(chain(&edit.text), vec!["start", "greet", "done"]);
    assert_eq!(orphans(&edit.text), vec!["stray"]);
    assert!(!edit.text.contains("big:"));
    assert!(!edit.text.contains("small:"));
}

#[test]
fn delete_leaves_no_dangling_pointers() {
    let editor = DocumentEditor::default();
    for id in ["greet", "big", "small", "done", "stray"] {
        let edit = editor.delete_node(BRANCHING, "main", id).unwrap();
        let doc = parse::load_document(&edit.text).unwrap();
        let graph = parse::LinkGraph::build(doc.workflow("main").unwrap());
        assert!(graph.is_ok(), "dangling pointer after deleting {}", id);
        assert!(parse::parse(&edit.text).is_ok());
    }
}

#[test]
fn delete_removes_exclusive_reporter_entries() {
    let editor = DocumentEditor::default();
    let edit = editor.delete_node(REPORTERS, "main", "show").unwrap();
    assert_eq!(chain(&edit.text), vec!["start"]);
    assert!(!edit.text.contains("len:"));
    assert_eq!(orphans(&edit.text), vec!["loose", "inner"]);
}

#[test]
fn delete_resets_references_to_removed_node() {
    let editor = DocumentEditor::default();
    let edit = editor.delete_node(REPORTERS, "main", "inner").unwrap();
    let tree = parse::parse(&edit.text).unwrap();
    let loose = &tree.workflow("main").unwrap().orphan("loose").unwrap().node;
    assert_eq!(loose.input("PART2"), Some(&FormattedValue::literal("")));
}

#[test]
fn start_node_is_protected() {
    let editor = DocumentEditor::default();
    assert_eq!(editor.delete_node(MAIN_HELLO, "main", "start").unwrap_err().code(), "E010");
    assert_eq!(editor.duplicate_node(MAIN_HELLO, "main", "start").unwrap_err().code(), "E010");
}

#[test]
fn missing_targets_are_reported() {
    let editor = DocumentEditor::default();
    let err = editor.delete_node(MAIN_HELLO, "main", "ghost").unwrap_err();
    assert_eq!(err.code(), "E003");
    assert_eq!(err.node_id(), Some("ghost"));
    let err = editor.delete_node(MAIN_HELLO, "other", "hello").unwrap_err();
    assert_eq!(err.code(), "E002");
}

#[test]
fn duplicate_copy_is_unlinked() {
    let editor = DocumentEditor::default();
    let edit = editor.duplicate_node(BRANCHING, "main", "check").unwrap();
    assert_eq!(edit.node_id.as_deref(), Some("control_if_else_1"));
    assert_eq!(chain(&edit.text), vec!["start", "greet", "check", "done"]);
    assert_eq!(orphans(&edit.text), vec!["control_if_else_1", "stray"]);
}

#[test]
fn locate_node_reports_line_range() {
    let editor = DocumentEditor::default();
    let loc = editor.locate_node(MAIN_HELLO, "main", "hello").unwrap();
    assert_eq!((loc.start, loc.end, loc.indent), (11, 16, 6));

    let item = editor.locate_workflow(MAIN_HELLO, "main").unwrap();
    assert_eq!((item.start, item.end, item.indent), (1, 16, 2));
    assert_eq!(editor.locate_workflow(MAIN_HELLO, "nope").unwrap_err().code(), "E002");
}

#[test]
fn id_allocator_never_repeats_on_one_text() {
    let mut ids = IdAllocator::new();
    let first = ids.allocate(MAIN_HELLO, "io_print").unwrap();
    let second = ids.allocate(MAIN_HELLO, "io_print").unwrap();
    assert_eq!(first, "io_print_1");
    assert_eq!(second, "io_print_2");

    let taken = parse::load_document(MAIN_HELLO).unwrap().all_ids();
    assert!(!taken.contains(&first));
    assert!(!taken.contains(&second));

    // the pure generator gives the same answer every time
    assert_eq!(generate_unique_id(MAIN_HELLO, "io_print").unwrap(), "io_print_1");
    assert_eq!(generate_unique_id(MAIN_HELLO, "io_print").unwrap(), "io_print_1");
}
