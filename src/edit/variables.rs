//! Workflow variables and interface entries.

use serde_yaml::Value;

use super::locate::{TextBuffer, indent_lines, spaces};
use super::writer::{BlockWriter, inline_scalar, render_key, render_string};
use super::{DocumentEditor, Edit, Session};
use crate::error::EditError;
use crate::parse::{InterfaceInput, RawValue};

impl DocumentEditor {
    pub fn add_variable(&self, text: &str, workflow: &str, name: &str, value: &Value) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        if wf.variable(name).is_some() {
            return Err(EditError::NameCollision(name.to_string()));
        }

        let wf_line = session.workflow_line(workflow)?;
        let vars = session.buf.ensure_block(wf_line, "variables");
        write_value(&mut session.buf, vars, name, value);

        tracing::debug!(workflow, variable = name, "added variable");
        session.commit(None)
    }

    pub fn update_variable(&self, text: &str, workflow: &str, name: &str, value: &Value) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        if wf.variable(name).is_none() {
            return Err(EditError::VariableNotFound(name.to_string()));
        }

        let wf_line = session.workflow_line(workflow)?;
        let vars = session.buf.ensure_block(wf_line, "variables");
        write_value(&mut session.buf, vars, name, value);

        tracing::debug!(workflow, variable = name, "updated variable");
        session.commit(None)
    }

    /// Rename a variable and every `variable:` reference to it in the workflow,
    /// including literal names held by assigning inputs.
    pub fn rename_variable(&self, text: &str, workflow: &str, old: &str, new: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        if wf.variable(old).is_none() {
            return Err(EditError::VariableNotFound(old.to_string()));
        }
        if old == new {
            return session.commit(None);
        }
        if wf.variable(new).is_some() {
            return Err(EditError::NameCollision(new.to_string()));
        }

        let wf_line = session.workflow_line(workflow)?;
        let vars = session.buf.ensure_block(wf_line, "variables");
        if let Some(entry) = session.buf.find_entry(vars, old) {
            session.buf.rename_key(entry, new);
        }

        let wf_line = session.workflow_line(workflow)?;
        let end = session.buf.block_end(wf_line);
        for i in wf_line..end {
            rewrite_variable_ref(&mut session.buf, i, old, new);
        }

        for node in &wf.nodes {
            let Some(param) = self.catalog.get(&node.opcode).and_then(|s| s.assigns.clone()) else {
                continue;
            };
            let assigned = match node.input(&param) {
                Some(RawValue::Literal { value: Value::String(s) }) => s == old,
                _ => false,
            };
            if assigned {
                let node_line = session.node_line(workflow, &node.id)?;
                let inputs = session.buf.ensure_block(node_line, "inputs");
                session
                    .buf
                    .set_block(inputs, &param, vec![format!("literal: {}", render_string(new))]);
            }
        }

        tracing::debug!(workflow, variable = old, renamed_to = new, "renamed variable");
        session.commit(None)
    }

    /// Drop a variable declaration. References to it are left in place.
    pub fn delete_variable(&self, text: &str, workflow: &str, name: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        if wf.variable(name).is_none() {
            return Err(EditError::VariableNotFound(name.to_string()));
        }

        let wf_line = session.workflow_line(workflow)?;
        let vars = session.buf.ensure_block(wf_line, "variables");
        session.buf.remove_entry(vars, name);
        collapse_if_empty(&mut session.buf, vars, "{}");

        tracing::debug!(workflow, variable = name, "deleted variable");
        session.commit(None)
    }

    // -------------------------------------------------------------------------
    // Interface
    // -------------------------------------------------------------------------

    pub fn add_interface_input(&self, text: &str, workflow: &str, input: &InterfaceInput) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        if wf.interface.inputs.iter().any(|i| i.name == input.name) {
            return Err(EditError::NameCollision(input.name.clone()));
        }

        let list = interface_list(&mut session, workflow, "inputs")?;
        append_item(&mut session.buf, list, input_item(input));

        tracing::debug!(workflow, input = %input.name, "added interface input");
        session.commit(None)
    }

    pub fn update_interface_input(
        &self,
        text: &str,
        workflow: &str,
        name: &str,
        input: &InterfaceInput,
    ) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        if !wf.interface.inputs.iter().any(|i| i.name == name) {
            return Err(EditError::InterfaceEntryNotFound(name.to_string()));
        }
        if input.name != name && wf.interface.inputs.iter().any(|i| i.name == input.name) {
            return Err(EditError::NameCollision(input.name.clone()));
        }

        let list = interface_list(&mut session, workflow, "inputs")?;
        let item = find_item(&session.buf, list, name)
            .ok_or_else(|| EditError::InterfaceEntryNotFound(name.to_string()))?;
        let indent = session.buf.indent(item).unwrap_or(0);
        let end = session.buf.block_end(item);
        session.buf.splice(item..end, indent_lines(input_item(input), indent));

        tracing::debug!(workflow, input = name, "updated interface input");
        session.commit(None)
    }

    pub fn remove_interface_input(&self, text: &str, workflow: &str, name: &str) -> Result<Edit, EditError> {
        self.remove_interface_entry(text, workflow, "inputs", name)
    }

    pub fn add_interface_output(&self, text: &str, workflow: &str, name: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        if wf.interface.outputs.iter().any(|o| o == name) {
            return Err(EditError::NameCollision(name.to_string()));
        }

        let list = interface_list(&mut session, workflow, "outputs")?;
        append_item(&mut session.buf, list, vec![format!("- {}", render_string(name))]);

        tracing::debug!(workflow, output = name, "added interface output");
        session.commit(None)
    }

    pub fn remove_interface_output(&self, text: &str, workflow: &str, name: &str) -> Result<Edit, EditError> {
        self.remove_interface_entry(text, workflow, "outputs", name)
    }

    fn remove_interface_entry(&self, text: &str, workflow: &str, key: &str, name: &str) -> Result<Edit, EditError> {
        let mut session = self.session(text)?;
        let wf = session.workflow(workflow)?;
        let present = match key {
            "inputs" => wf.interface.inputs.iter().any(|i| i.name == name),
            _ => wf.interface.outputs.iter().any(|o| o == name),
        };
        if !present {
            return Err(EditError::InterfaceEntryNotFound(name.to_string()));
        }

        let list = interface_list(&mut session, workflow, key)?;
        let item = find_item(&session.buf, list, name)
            .ok_or_else(|| EditError::InterfaceEntryNotFound(name.to_string()))?;
        let end = session.buf.block_end(item);
        session.buf.remove(item..end);
        collapse_if_empty(&mut session.buf, list, "[]");

        tracing::debug!(workflow, entry = name, list = key, "removed interface entry");
        session.commit(None)
    }
}

/// Line of `interface.<key>` in block form, created when missing.
fn interface_list(session: &mut Session<'_>, workflow: &str, key: &str) -> Result<usize, EditError> {
    let wf_line = session.workflow_line(workflow)?;
    let interface = session.buf.ensure_block(wf_line, "interface");
    Ok(session.buf.ensure_block(interface, key))
}

fn input_item(input: &InterfaceInput) -> Vec<String> {
    vec![
        format!("- name: {}", render_string(&input.name)),
        format!("  type: {}", render_string(&input.ty)),
        format!("  required: {}", input.required),
    ]
}

/// Sequence item under `list` whose name (or scalar) is `name`.
fn find_item(buf: &TextBuffer, list: usize, name: &str) -> Option<usize> {
    buf.items(list).into_iter().find(|&item| {
        let named = buf
            .find_entry(item, "name")
            .and_then(|line| buf.scalar_value(line));
        named.or_else(|| buf.item_scalar(item)).as_deref() == Some(name)
    })
}

fn append_item(buf: &mut TextBuffer, list: usize, lines: Vec<String>) {
    let column = buf
        .items(list)
        .first()
        .and_then(|&i| buf.indent(i))
        .unwrap_or(buf.indent(list).unwrap_or(0) + 2);
    let at = buf.block_end(list);
    buf.insert(at, indent_lines(lines, column));
}

/// Set `name` under block `block` to `value`, scalar or nested.
fn write_value(buf: &mut TextBuffer, block: usize, name: &str, value: &Value) {
    match inline_scalar(value) {
        Some(scalar) => buf.set_scalar(block, name, &scalar),
        None => {
            let mut w = BlockWriter::new();
            w.value(value);
            buf.set_block(block, name, w.finish());
        }
    }
}

/// Turn an emptied `key:` block back into `key: {}` / `key: []`.
fn collapse_if_empty(buf: &mut TextBuffer, line: usize, empty: &str) {
    if buf.block_end(line) == line + 1 && buf.raw_value(line).unwrap_or_default().is_empty() {
        let indent = buf.indent(line).unwrap_or(0);
        if let Some(key) = buf.key_at(line) {
            buf.set_line(line, format!("{}{}: {}", spaces(indent), render_key(&key), empty));
        }
    }
}

/// Rewrite `variable: old` (block or `{variable: old}` flow form) on line `i`.
fn rewrite_variable_ref(buf: &mut TextBuffer, i: usize, old: &str, new: &str) {
    if buf.key_at(i).as_deref() == Some("variable") {
        if buf.scalar_value(i).as_deref() == Some(old) {
            let indent = buf.indent(i).unwrap_or(0);
            buf.set_line(i, format!("{}variable: {}", spaces(indent), render_string(new)));
        }
        return;
    }
    let Some(raw) = buf.raw_value(i) else {
        return;
    };
    if !raw.starts_with('{') {
        return;
    }
    let Ok(Value::Mapping(map)) = serde_yaml::from_str::<Value>(&raw) else {
        return;
    };
    if map.len() == 1 && map.get("variable") == Some(&Value::String(old.to_string())) {
        if let Some(key) = buf.key_at(i) {
            let indent = buf.indent(i).unwrap_or(0);
            buf.set_line(
                i,
                format!("{}{}: {{variable: {}}}", spaces(indent), render_key(&key), render_string(new)),
            );
        }
    }
}
