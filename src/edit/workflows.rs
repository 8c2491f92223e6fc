//! Creating, renaming and deleting whole workflows.

use serde_yaml::Value;

use super::locate::{TextBuffer, indent_lines, spaces};
use super::writer::{BlockWriter, render_key, render_string};
use super::{DocumentEditor, Edit};
use crate::error::EditError;
use crate::parse::{Interface, START_ID, START_OPCODE};

impl DocumentEditor {
    /// Append an empty workflow holding only a start node. Node ids are
    /// scoped per workflow, so the start node is always `start`.
    pub fn create_workflow(&self, text: &str, name: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        if session.doc.workflow(name).is_some() {
            return Err(EditError::NameCollision(name.to_string()));
        }

        let start = START_ID.to_string();
        let mut nodes = BlockWriter::new();
        nodes.key_open(&start);
        nodes.field("opcode", &Value::String(START_OPCODE.into()));
        let item = workflow_item(name, &Interface::default(), &[], nodes.finish());
        append_workflow(&mut session.buf, None, item);

        tracing::debug!(workflow = name, node_id = %start, "created workflow");
        session.commit(Some(start))
    }

    /// Rename a workflow and every `workflow_call` naming it.
    pub fn rename_workflow(&self, text: &str, old: &str, new: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        session.workflow(old)?;
        if old == new {
            return session.commit(None);
        }
        if session.doc.workflow(new).is_some() {
            return Err(EditError::NameCollision(new.to_string()));
        }

        let item = session.workflow_line(old)?;
        session.buf.set_scalar(item, "name", &render_string(new));
        for i in 0..session.buf.len() {
            rewrite_call(&mut session.buf, i, old, new);
        }

        tracing::debug!(workflow = old, renamed_to = new, "renamed workflow");
        session.commit(None)
    }

    /// Remove a workflow item. Calls to it elsewhere are left in place.
    pub fn delete_workflow(&self, text: &str, name: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let item = session.workflow_line(name)?;
        let end = session.buf.block_end(item);
        session.buf.remove(item..end);

        tracing::debug!(workflow = name, "deleted workflow");
        session.commit(None)
    }
}

/// Lines of a workflow item (`- name: ...`) relative to column 0.
/// `nodes` are the node-map entries, also relative to column 0.
pub(crate) fn workflow_item(
    name: &str,
    interface: &Interface,
    variables: &[(String, Value)],
    nodes: Vec<String>,
) -> Vec<String> {
    let mut w = BlockWriter::new();
    w.line(&format!("- name: {}", render_string(name)));
    w.indent();

    w.key_open("interface");
    if interface.inputs.is_empty() {
        w.line("inputs: []");
    } else {
        w.key_open("inputs");
        for input in &interface.inputs {
            w.line(&format!("- name: {}", render_string(&input.name)));
            w.line(&format!("  type: {}", render_string(&input.ty)));
            w.line(&format!("  required: {}", input.required));
        }
        w.dedent();
    }
    if interface.outputs.is_empty() {
        w.line("outputs: []");
    } else {
        w.key_open("outputs");
        for output in &interface.outputs {
            w.line(&format!("- {}", render_string(output)));
        }
        w.dedent();
    }
    w.dedent();

    if variables.is_empty() {
        w.line("variables: {}");
    } else {
        w.key_open("variables");
        for (key, value) in variables {
            w.field(key, value);
        }
        w.dedent();
    }

    w.key_open("nodes");
    let mut lines = w.finish();
    lines.extend(indent_lines(nodes, 4));
    lines
}

/// Insert a workflow item after the item at `after`, or at the end of the list.
pub(crate) fn append_workflow(buf: &mut TextBuffer, after: Option<usize>, item: Vec<String>) {
    let root = match buf.workflows_line() {
        Some(root) => root,
        None => {
            let at = buf.len();
            buf.insert(at, vec!["workflows:".to_string()]);
            at
        }
    };
    if buf.raw_value(root).is_some_and(|raw| !raw.is_empty()) {
        buf.set_line(root, "workflows:".to_string());
    }
    let column = buf
        .items(root)
        .first()
        .and_then(|&i| buf.indent(i))
        .unwrap_or(2);
    let at = match after {
        Some(item_line) => buf.block_end(item_line),
        None => buf.block_end(root),
    };
    buf.insert(at, indent_lines(item, column));
}

/// Rewrite `workflow_call: old` (block or flow form) on line `i`.
fn rewrite_call(buf: &mut TextBuffer, i: usize, old: &str, new: &str) {
    let indent = buf.indent(i).unwrap_or(0);
    if buf.key_at(i).as_deref() == Some("workflow_call") {
        if buf.scalar_value(i).as_deref() == Some(old) {
            buf.set_line(i, format!("{}workflow_call: {}", spaces(indent), render_string(new)));
        }
        return;
    }
    let Some(raw) = buf.raw_value(i) else {
        return;
    };
    if !raw.starts_with('{') {
        return;
    }
    let Ok(Value::Mapping(mut map)) = serde_yaml::from_str::<Value>(&raw) else {
        return;
    };
    if map.get("workflow_call") != Some(&Value::String(old.to_string())) {
        return;
    }
    map.insert("workflow_call".into(), Value::String(new.to_string()));
    let (Some(key), Ok(flow)) = (buf.key_at(i), serde_json::to_string(&map)) else {
        return;
    };
    buf.set_line(i, format!("{}{}: {}", spaces(indent), render_key(&key), flow));
}
