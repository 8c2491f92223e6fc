//! Lifting a linear run of nodes into a workflow of its own.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::locate::reindent;
use super::nodes::reset_references;
use super::workflows::{append_workflow, workflow_item};
use super::writer::{BlockWriter, render_key};
use super::{DocumentEditor, Edit, Session, deletion_set, reference_paths};
use crate::error::EditError;
use crate::parse::{InlineReporter, Interface, InterfaceInput, LinkSlot, RawValue, START_ID, START_OPCODE, Workflow, inputs_to_yaml};
use crate::parse::tree::build_tree;
use crate::validate::{analyze_chain_variables, validate_linear_chain};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub workflow: String,
    pub node_ids: Vec<String>,
    pub new_name: String,
    /// Interface of the new workflow; inferred from variable use when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<Interface>,
}

impl DocumentEditor {
    /// Move the run `node_ids` (with branch contents and reporters only it
    /// uses) into a new workflow, and put a call to it where the run was.
    pub fn extract_to_workflow(&self, text: &str, args: &Extraction) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(&args.workflow)?;
        let tree = build_tree(&session.doc, &self.catalog)?;

        let chain = validate_linear_chain(&tree, &args.node_ids, &args.workflow);
        if !chain.is_valid {
            return Err(EditError::InvalidChain(chain.errors));
        }
        if session.doc.workflow(&args.new_name).is_some() {
            return Err(EditError::NameCollision(args.new_name.clone()));
        }
        let (Some(first), Some(last), Some(predecessor)) =
            (chain.first_id.clone(), chain.last_id.clone(), chain.predecessor_id.clone())
        else {
            return Err(EditError::InvalidChain(vec!["Selection has no predecessor".into()]));
        };

        let vars = analyze_chain_variables(&tree, &self.catalog, &args.workflow, &args.node_ids);
        let interface: Interface = match &args.interface {
            Some(given) => given.clone(),
            None => Interface {
                inputs: vars
                    .inputs
                    .iter()
                    .map(|name| InterfaceInput::new(name, "any", true))
                    .collect(),
                outputs: vars.outputs.clone(),
            },
        };
        let locals: Vec<(String, Value)> = vars
            .locals
            .iter()
            .map(|name| (name.clone(), wf.variable(name).cloned().unwrap_or(Value::Null)))
            .collect();

        let graph = session.graph(&wf)?;
        let moved = deletion_set(&wf, &graph, &chain.ordered_node_ids);
        let moved_set: HashSet<&str> = moved.iter().map(String::as_str).collect();

        let mut blocks = Vec::new();
        for id in &moved {
            let loc = session.node_location(&wf.name, id)?;
            blocks.extend(reindent(&session.buf.slice(loc.start..loc.end), 0));
        }

        // Reporters the run shares with nodes left behind are copied over
        // under fresh ids; the source keeps its own.
        let mut copies: Vec<(String, String)> = Vec::new();
        for id in shared_reporters(&wf, &moved_set) {
            let copy = session.fresh_id(&id);
            let loc = session.node_location(&wf.name, &id)?;
            let mut block = reindent(&session.buf.slice(loc.start..loc.end), 0);
            if let Some(header) = block.first_mut() {
                *header = format!("{}:", render_key(&copy));
            }
            blocks.extend(block);
            copies.push((id, copy));
        }

        // Source side: one call node takes the run's place.
        let call_id = session.fresh_id("call");
        let call_block = call_node_block(&call_id, &args.new_name, &interface, chain.successor_id.as_deref());
        let entry_slot = graph
            .incoming(&first)
            .into_iter()
            .find(|(source, _)| *source == predecessor)
            .map(|(_, slot)| slot.clone())
            .unwrap_or(LinkSlot::Next);

        for id in &moved {
            for (source, slot) in graph.incoming(id) {
                if !moved_set.contains(source) && !(source == predecessor && *slot == entry_slot) {
                    session.set_pointer(&wf.name, source, slot, None)?;
                }
            }
        }
        reset_references(&mut session, &wf, &moved_set)?;
        session.insert_node_block(&wf.name, Some(predecessor.as_str()), call_block)?;
        session.set_pointer(&wf.name, &predecessor, &entry_slot, Some(&call_id))?;
        for id in &moved {
            session.remove_node_block(&wf.name, id)?;
        }

        // New workflow: start → run → return.
        let return_id = (!interface.outputs.is_empty()).then(|| session.fresh_id("workflow_return"));
        let mut nodes = BlockWriter::new();
        nodes.key_open(START_ID);
        nodes.field("opcode", &Value::String(START_OPCODE.into()));
        nodes.field("next", &Value::String(first.clone()));
        nodes.dedent();
        let mut node_lines = nodes.finish();
        node_lines.extend(blocks);
        if let Some(return_id) = &return_id {
            node_lines.extend(return_node_block(return_id, &interface.outputs));
        }

        let item = workflow_item(&args.new_name, &interface, &locals, node_lines);
        let source_line = session.workflow_line(&wf.name)?;
        append_workflow(&mut session.buf, Some(source_line), item);
        session.set_pointer(&args.new_name, &last, &LinkSlot::Next, return_id.as_deref())?;
        relink_copies(&mut session, &wf, &args.new_name, &moved, &copies)?;

        tracing::debug!(
            workflow = %wf.name,
            extracted = %args.new_name,
            moved = moved.len(),
            node_id = %call_id,
            "extracted chain into workflow"
        );
        session.commit(Some(call_id))
    }
}

/// By-reference reporters used by the moved nodes (directly or through other
/// such reporters) that are not moved themselves, in node-map order.
fn shared_reporters(workflow: &Workflow, moved: &HashSet<&str>) -> Vec<String> {
    let mut found: HashSet<String> = HashSet::new();
    let mut pending: Vec<String> = moved.iter().map(|id| id.to_string()).collect();
    while let Some(id) = pending.pop() {
        for reporter in workflow.reporter_refs(&id) {
            if !moved.contains(reporter.as_str()) && found.insert(reporter.clone()) {
                pending.push(reporter);
            }
        }
    }
    workflow
        .nodes
        .iter()
        .filter(|n| found.contains(&n.id))
        .map(|n| n.id.clone())
        .collect()
}

/// Point `{node: id}` references inside the new workflow at the copies, and
/// drop any `next` a copy carried over.
fn relink_copies(
    session: &mut Session<'_>,
    source: &Workflow,
    target: &str,
    moved: &[String],
    copies: &[(String, String)],
) -> Result<(), EditError> {
    if copies.is_empty() {
        return Ok(());
    }
    let renamed: HashMap<&str, &str> = copies.iter().map(|(o, c)| (o.as_str(), c.as_str())).collect();

    // The source definitions, seen under the new workflow's name and ids.
    let mut scope = source.clone();
    scope.name = target.to_string();
    for (original, copy) in copies {
        if let Some(def) = source.node(original) {
            let mut def = def.clone();
            def.id = copy.clone();
            scope.nodes.push(def);
        }
    }

    let owners = moved.iter().chain(copies.iter().map(|(_, copy)| copy));
    for owner in owners {
        for (path, referenced) in reference_paths(&scope, owner) {
            if let Some(copy) = renamed.get(referenced.as_str()) {
                session.set_reference(&scope, owner, &path, copy)?;
            }
        }
    }
    for (original, copy) in copies {
        if source.node(original).is_some_and(|def| def.next.is_some()) {
            session.set_pointer(target, copy, &LinkSlot::Next, None)?;
        }
    }
    Ok(())
}

/// `workflow_call` node, or `data_set_variable` holding the call when the
/// extracted workflow has exactly one output.
fn call_node_block(id: &str, workflow: &str, interface: &Interface, next: Option<&str>) -> Vec<String> {
    let call = RawValue::WorkflowCall {
        name: workflow.to_string(),
        args: interface
            .inputs
            .iter()
            .map(|input| (input.name.clone(), RawValue::variable(&input.name)))
            .collect(),
    };
    let inputs = match interface.outputs.as_slice() {
        [output] => vec![
            ("VARIABLE".to_string(), RawValue::literal(output.as_str())),
            ("VALUE".to_string(), call),
        ],
        _ => vec![("CALL".to_string(), call)],
    };
    let opcode = if interface.outputs.len() == 1 {
        "data_set_variable"
    } else {
        "workflow_call"
    };

    let mut w = BlockWriter::new();
    w.key_open(id);
    w.field("opcode", &Value::String(opcode.into()));
    w.field("inputs", &inputs_to_yaml(&inputs));
    if let Some(next) = next {
        w.field("next", &Value::String(next.to_string()));
    }
    w.finish()
}

fn return_node_block(id: &str, outputs: &[String]) -> Vec<String> {
    let value = match outputs {
        [single] => RawValue::variable(single),
        many => RawValue::Inline(InlineReporter {
            id: None,
            opcode: "data_dict_create".into(),
            inputs: many
                .iter()
                .map(|name| (name.clone(), RawValue::variable(name)))
                .collect(),
        }),
    };
    let mut w = BlockWriter::new();
    w.key_open(id);
    w.field("opcode", &Value::String("workflow_return".into()));
    w.field("inputs", &inputs_to_yaml(&[("VALUE".to_string(), value)]));
    w.finish()
}
