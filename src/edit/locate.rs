//! Line-level view of the document: block extents, keys and splicing.
//!
//! Every structural edit goes through `TextBuffer`. A block is a line plus
//! every following line indented deeper than it (blank and comment lines are
//! carried along), so an entry's extent is found purely from indentation.

use std::ops::Range;

use serde::Serialize;
use serde_yaml::Value;

use super::writer::{BlockWriter, render_key};

/// Line range of a node entry. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeLocation {
    pub start: usize,
    pub end: usize,
    pub indent: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct TextBuffer {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl TextBuffer {
    pub fn new(text: &str) -> Self {
        TextBuffer {
            lines: text.lines().map(str::to_string).collect(),
            trailing_newline: text.is_empty() || text.ends_with('\n'),
        }
    }

    pub fn into_text(self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, i: usize) -> &str {
        &self.lines[i]
    }

    /// Lines `range`, verbatim.
    pub fn slice(&self, range: Range<usize>) -> Vec<String> {
        self.lines[range].to_vec()
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Indent of a content line; `None` for blank and comment lines.
    pub fn indent(&self, i: usize) -> Option<usize> {
        let line = &self.lines[i];
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            None
        } else {
            Some(line.len() - trimmed.len())
        }
    }

    /// Whether line `i` is a sequence item (`- ...`).
    pub fn is_item(&self, i: usize) -> bool {
        let trimmed = self.lines[i].trim_start();
        trimmed == "-" || trimmed.starts_with("- ")
    }

    /// Exclusive end of the block started by line `i`. Trailing blank lines
    /// stay outside the block.
    pub fn block_end(&self, start: usize) -> usize {
        let Some(base) = self.indent(start) else {
            return start + 1;
        };
        let item = self.is_item(start);
        let mut last = start;
        for i in start + 1..self.lines.len() {
            match self.indent(i) {
                None => continue,
                Some(ind) if ind > base => last = i,
                // indentless sequence under a key
                Some(ind) if ind == base && !item && self.is_item(i) => last = i,
                Some(_) => break,
            }
        }
        last + 1
    }

    /// Key of a `key: value` line.
    pub fn key_at(&self, i: usize) -> Option<String> {
        parse_entry(self.lines[i].trim_start()).map(|(k, _)| k)
    }

    /// Raw text after the colon of a `key: value` line (comments stripped).
    pub fn raw_value(&self, i: usize) -> Option<String> {
        let trimmed = self.lines[i].trim_start();
        let trimmed = trimmed.strip_prefix("- ").unwrap_or(trimmed);
        parse_entry(trimmed).map(|(_, v)| strip_comment(v).to_string())
    }

    /// Decoded scalar value of a `key: value` line; `None` when empty or null.
    pub fn scalar_value(&self, i: usize) -> Option<String> {
        let raw = self.raw_value(i)?;
        if raw.is_empty() {
            return None;
        }
        match serde_yaml::from_str::<Value>(&raw) {
            Ok(Value::Null) => None,
            Ok(Value::String(s)) => Some(s),
            Ok(Value::Number(n)) => Some(n.to_string()),
            Ok(Value::Bool(b)) => Some(b.to_string()),
            _ => Some(raw),
        }
    }

    /// Column at which entries nested under line `i` sit.
    pub fn entry_indent(&self, i: usize) -> usize {
        let base = self.indent(i).unwrap_or(0);
        if self.is_item(i) {
            return base + 2;
        }
        let end = self.block_end(i);
        (i + 1..end)
            .find_map(|j| self.indent(j))
            .filter(|c| *c > base && !self.is_child_item(i, *c))
            .unwrap_or(base + 2)
    }

    fn is_child_item(&self, i: usize, column: usize) -> bool {
        let end = self.block_end(i);
        (i + 1..end)
            .find(|&j| self.indent(j) == Some(column))
            .is_some_and(|j| self.is_item(j))
    }

    /// `(line, key)` of every entry directly under line `i`, including the
    /// inline first key of a `- key: value` item.
    pub fn entries(&self, i: usize) -> Vec<(usize, String)> {
        let end = self.block_end(i);
        let mut out = Vec::new();
        let column = if self.is_item(i) {
            let trimmed = self.lines[i].trim_start();
            if let Some((k, _)) = parse_entry(trimmed[1..].trim_start()) {
                out.push((i, k));
            }
            self.indent(i).unwrap_or(0) + 2
        } else {
            match (i + 1..end).find_map(|j| self.indent(j)) {
                Some(c) => c,
                None => return out,
            }
        };
        for j in i + 1..end {
            if self.indent(j) == Some(column) && !self.is_item(j) {
                if let Some(k) = self.key_at(j) {
                    out.push((j, k));
                }
            }
        }
        out
    }

    pub fn find_entry(&self, i: usize, key: &str) -> Option<usize> {
        self.entries(i)
            .into_iter()
            .find(|(_, k)| k == key)
            .map(|(j, _)| j)
    }

    /// Item lines of the sequence nested under key line `i`.
    pub fn items(&self, i: usize) -> Vec<usize> {
        let end = self.block_end(i);
        let Some(column) = (i + 1..end).find_map(|j| self.indent(j)) else {
            return Vec::new();
        };
        (i + 1..end)
            .filter(|&j| self.indent(j) == Some(column) && self.is_item(j))
            .collect()
    }

    /// Decoded scalar of a `- value` item line.
    pub fn item_scalar(&self, i: usize) -> Option<String> {
        let trimmed = self.lines[i].trim_start();
        let rest = trimmed.strip_prefix('-')?.trim();
        match serde_yaml::from_str::<Value>(strip_comment(rest)) {
            Ok(Value::String(s)) => Some(s),
            Ok(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Workflows and nodes
    // -------------------------------------------------------------------------

    pub fn workflows_line(&self) -> Option<usize> {
        (0..self.lines.len())
            .find(|&i| self.indent(i) == Some(0) && self.key_at(i).as_deref() == Some("workflows"))
    }

    /// `(item line, name)` for every workflow item.
    pub fn workflow_items(&self) -> Vec<(usize, String)> {
        let Some(root) = self.workflows_line() else {
            return Vec::new();
        };
        self.items(root)
            .into_iter()
            .filter_map(|item| {
                let name_line = self.find_entry(item, "name")?;
                Some((item, self.scalar_value(name_line)?))
            })
            .collect()
    }

    pub fn locate_workflow(&self, name: &str) -> Option<usize> {
        self.workflow_items()
            .into_iter()
            .find(|(_, n)| n == name)
            .map(|(i, _)| i)
    }

    pub fn locate_node(&self, workflow_line: usize, id: &str) -> Option<NodeLocation> {
        let nodes = self.find_entry(workflow_line, "nodes")?;
        let start = self.find_entry(nodes, id)?;
        Some(NodeLocation {
            start,
            end: self.block_end(start),
            indent: self.indent(start).unwrap_or(0),
        })
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    pub fn splice(&mut self, range: Range<usize>, lines: Vec<String>) {
        self.lines.splice(range, lines);
    }

    pub fn insert(&mut self, at: usize, lines: Vec<String>) {
        self.splice(at..at, lines);
    }

    pub fn remove(&mut self, range: Range<usize>) {
        self.splice(range, Vec::new());
    }

    pub fn set_line(&mut self, i: usize, text: String) {
        self.lines[i] = text;
    }

    /// Set `key: scalar` under block `i`, replacing any nested body it had.
    pub fn set_scalar(&mut self, i: usize, key: &str, scalar: &str) {
        match self.find_entry(i, key) {
            Some(j) if j == i => {
                let indent = self.indent(i).unwrap_or(0);
                self.set_line(i, format!("{}- {}: {}", spaces(indent), render_key(key), scalar));
            }
            Some(j) => {
                let end = self.block_end(j);
                let indent = self.indent(j).unwrap_or(0);
                self.splice(
                    j..end,
                    vec![format!("{}{}: {}", spaces(indent), render_key(key), scalar)],
                );
            }
            None => {
                let indent = self.entry_indent(i);
                let at = self.block_end(i);
                self.insert(at, vec![format!("{}{}: {}", spaces(indent), render_key(key), scalar)]);
            }
        }
    }

    /// Set `key:` under block `i` to a nested body given relative to column 0.
    pub fn set_block(&mut self, i: usize, key: &str, body: Vec<String>) {
        let existing = self.find_entry(i, key).filter(|j| *j != i);
        let indent = match existing {
            Some(j) => self.indent(j).unwrap_or(0),
            None => self.entry_indent(i),
        };
        let mut lines = vec![format!("{}{}:", spaces(indent), render_key(key))];
        lines.extend(indent_lines(body, indent + 2));
        match existing {
            Some(j) => {
                let end = self.block_end(j);
                self.splice(j..end, lines);
            }
            None => {
                let at = self.block_end(i);
                self.insert(at, lines);
            }
        }
    }

    /// Rewrite the key of entry line `i`, keeping its value and body.
    pub fn rename_key(&mut self, i: usize, key: &str) {
        let indent = self.indent(i).unwrap_or(0);
        let dash = if self.is_item(i) { "- " } else { "" };
        let value = self.raw_value(i).unwrap_or_default();
        let line = if value.is_empty() {
            format!("{}{}{}:", spaces(indent), dash, render_key(key))
        } else {
            format!("{}{}{}: {}", spaces(indent), dash, render_key(key), value)
        };
        self.set_line(i, line);
    }

    /// Remove entry `key` (and its body) under block `i`.
    pub fn remove_entry(&mut self, i: usize, key: &str) -> bool {
        match self.find_entry(i, key) {
            Some(j) if j != i => {
                let end = self.block_end(j);
                self.remove(j..end);
                true
            }
            _ => false,
        }
    }

    /// Line of entry `key` under block `i`, in block form (`key:` with the body
    /// on following lines). Created when missing; an inline flow value such as
    /// `{}` or `[a, b]` is expanded into block form first.
    pub fn ensure_block(&mut self, i: usize, key: &str) -> usize {
        match self.find_entry(i, key).filter(|j| *j != i) {
            Some(j) => {
                let raw = self.raw_value(j).unwrap_or_default();
                if raw.is_empty() {
                    return j;
                }
                let indent = self.indent(j).unwrap_or(0);
                let parsed = serde_yaml::from_str::<Value>(&raw).unwrap_or(Value::Null);
                let mut writer = BlockWriter::new();
                if matches!(parsed, Value::Mapping(_) | Value::Sequence(_)) {
                    writer.value(&parsed);
                }
                let mut lines = vec![format!("{}{}:", spaces(indent), render_key(key))];
                lines.extend(indent_lines(writer.finish(), indent + 2));
                self.splice(j..j + 1, lines);
                j
            }
            None => {
                let indent = self.entry_indent(i);
                let at = self.block_end(i);
                self.insert(at, vec![format!("{}{}:", spaces(indent), render_key(key))]);
                at
            }
        }
    }
}

pub(crate) fn spaces(n: usize) -> String {
    " ".repeat(n)
}

/// Prefix every non-empty line with `indent` spaces.
pub(crate) fn indent_lines(lines: Vec<String>, indent: usize) -> Vec<String> {
    let pad = spaces(indent);
    lines
        .into_iter()
        .map(|l| if l.is_empty() { l } else { format!("{}{}", pad, l) })
        .collect()
}

/// Shift a verbatim block so its first line sits at column `to`.
pub(crate) fn reindent(lines: &[String], to: usize) -> Vec<String> {
    let from = lines
        .iter()
        .find_map(|l| {
            let t = l.trim_start();
            (!t.is_empty()).then(|| l.len() - t.len())
        })
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            let t = l.trim_start();
            if t.is_empty() {
                return String::new();
            }
            let current = l.len() - t.len();
            let depth = current.saturating_sub(from);
            format!("{}{}", spaces(to + depth), t)
        })
        .collect()
}

/// Split `key: rest` into the decoded key and the raw rest.
fn parse_entry(text: &str) -> Option<(String, &str)> {
    let first = text.chars().next()?;
    if first == '"' || first == '\'' {
        let close = text[1..].find(first)? + 1;
        let key = text[1..close].to_string();
        let rest = text[close + 1..].strip_prefix(':')?;
        return Some((key, rest.trim()));
    }
    if matches!(first, '{' | '[' | '#') || text == "-" || text.starts_with("- ") {
        return None;
    }
    let pos = match text.find(": ") {
        Some(p) => p,
        None if text.ends_with(':') => text.len() - 1,
        None => return None,
    };
    let key = text[..pos].trim_end();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), text[pos + 1..].trim()))
}

fn strip_comment(value: &str) -> &str {
    if value.starts_with('"') || value.starts_with('\'') {
        return value;
    }
    match value.find(" #") {
        Some(p) => value[..p].trim_end(),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
workflows:
  - name: main
    variables: {}
    nodes:
      start:
        opcode: workflow_start
        next: hello

      hello:
        opcode: io_print
        inputs:
          STRING:
            literal: \"Hello\"
  - name: other
    nodes: {}
";

    #[test]
    fn finds_workflow_items() {
        let buf = TextBuffer::new(DOC);
        let items = buf.workflow_items();
        assert_eq!(items, vec![(1, "main".to_string()), (13, "other".to_string())]);
    }

    #[test]
    fn node_extent_excludes_trailing_blank() {
        let buf = TextBuffer::new(DOC);
        let wf = buf.locate_workflow("main").unwrap();
        let start = buf.locate_node(wf, "start").unwrap();
        assert_eq!((start.start, start.end, start.indent), (4, 7, 6));
        let hello = buf.locate_node(wf, "hello").unwrap();
        assert_eq!((hello.start, hello.end), (8, 13));
    }

    #[test]
    fn set_scalar_replaces_and_inserts() {
        let mut buf = TextBuffer::new(DOC);
        let wf = buf.locate_workflow("main").unwrap();
        let start = buf.locate_node(wf, "start").unwrap().start;
        buf.set_scalar(start, "next", "other_node");
        assert_eq!(buf.line(6), "        next: other_node");
        let hello = buf.locate_node(wf, "hello").unwrap().start;
        buf.set_scalar(hello, "next", "x");
        assert_eq!(buf.line(13), "        next: x");
    }

    #[test]
    fn ensure_block_expands_inline_flow() {
        let mut buf = TextBuffer::new(DOC);
        let wf = buf.locate_workflow("main").unwrap();
        let vars = buf.ensure_block(wf, "variables");
        assert_eq!(buf.line(vars), "    variables:");
        buf.set_scalar(vars, "total", "0");
        assert_eq!(buf.line(vars + 1), "      total: 0");
    }

    #[test]
    fn reindent_keeps_relative_depth() {
        let lines = vec!["      a:".to_string(), "        b: 1".to_string()];
        assert_eq!(reindent(&lines, 2), vec!["  a:", "    b: 1"]);
    }

    #[test]
    fn round_trip_preserves_text() {
        let buf = TextBuffer::new(DOC);
        assert_eq!(buf.into_text(), DOC);
    }
}
