//! Indent-aware line builder for YAML blocks spliced into the document.
//!
//! Documents use 2-space indentation. Lines are produced relative to column 0
//! and re-indented by the caller at the splice point.

use serde_yaml::Value;

pub(crate) struct BlockWriter {
    lines: Vec<String>,
    indent_level: usize,
}

impl BlockWriter {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            indent_level: 0,
        }
    }

    /// Write a complete line at the current indent.
    pub fn line(&mut self, text: &str) {
        self.lines
            .push(format!("{}{}", "  ".repeat(self.indent_level), text));
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Write `key:` and indent for the nested block.
    pub fn key_open(&mut self, key: &str) {
        self.line(&format!("{}:", render_key(key)));
        self.indent();
    }

    /// Write `key: value`, expanding collections into nested blocks.
    pub fn field(&mut self, key: &str, value: &Value) {
        match inline_scalar(value) {
            Some(scalar) => self.line(&format!("{}: {}", render_key(key), scalar)),
            None => {
                self.key_open(key);
                self.value(value);
                self.dedent();
            }
        }
    }

    /// Write the body of a value: mapping entries, sequence items or a scalar.
    pub fn value(&mut self, value: &Value) {
        match value {
            Value::Mapping(map) => {
                for (k, v) in map {
                    self.field(&key_text(k), v);
                }
            }
            Value::Sequence(items) => {
                for item in items {
                    self.item(item);
                }
            }
            other => {
                let scalar = inline_scalar(other).unwrap_or_else(|| "null".into());
                self.line(&scalar);
            }
        }
    }

    fn item(&mut self, value: &Value) {
        match inline_scalar(value) {
            Some(scalar) => self.line(&format!("- {}", scalar)),
            None => {
                let mut inner = BlockWriter::new();
                inner.value(value);
                for (n, l) in inner.finish().into_iter().enumerate() {
                    if n == 0 {
                        self.line(&format!("- {}", l));
                    } else {
                        self.line(&format!("  {}", l));
                    }
                }
            }
        }
    }

    pub fn finish(self) -> Vec<String> {
        self.lines
    }
}

impl Default for BlockWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-line form of `value`, or `None` when it needs a nested block.
pub(crate) fn inline_scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".into()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(render_string(s)),
        Value::Sequence(items) if items.is_empty() => Some("[]".into()),
        Value::Mapping(map) if map.is_empty() => Some("{}".into()),
        Value::Tagged(_) => serde_yaml::to_string(value)
            .ok()
            .map(|s| s.trim_end().to_string()),
        _ => None,
    }
}

/// Plain scalar when it reads back as the same string, JSON-quoted otherwise.
pub(crate) fn render_string(s: &str) -> String {
    if is_plain_safe(s) {
        s.to_string()
    } else {
        serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
    }
}

pub(crate) fn render_key(key: &str) -> String {
    render_string(key)
}

fn is_plain_safe(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with([' ', '-'])
        && !s.ends_with(' ')
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ' '))
        && serde_yaml::from_str::<Value>(s).ok() == Some(Value::String(s.to_string()))
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => inline_scalar(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn plain_and_quoted_strings() {
        assert_eq!(render_string("hello"), "hello");
        assert_eq!(render_string("io_print_1"), "io_print_1");
        assert_eq!(render_string("Hello, LexFlow!"), "\"Hello, LexFlow!\"");
        assert_eq!(render_string(""), "\"\"");
        assert_eq!(render_string("true"), "\"true\"");
        assert_eq!(render_string("42"), "\"42\"");
    }

    #[test]
    fn nested_mapping_block() {
        let mut w = BlockWriter::new();
        w.field("STRING", &yaml("literal: hi"));
        assert_eq!(w.finish(), vec!["STRING:", "  literal: hi"]);
    }

    #[test]
    fn sequence_of_mappings() {
        let mut w = BlockWriter::new();
        w.field("inputs", &yaml("[{name: x, type: int}]"));
        assert_eq!(w.finish(), vec!["inputs:", "  - name: x", "    type: int"]);
    }

    #[test]
    fn empty_collections_stay_inline() {
        let mut w = BlockWriter::new();
        w.field("variables", &yaml("{}"));
        w.field("outputs", &yaml("[]"));
        assert_eq!(w.finish(), vec!["variables: {}", "outputs: []"]);
    }

    #[test]
    fn key_open_and_dedent() {
        let mut w = BlockWriter::new();
        w.key_open("hello");
        w.line("opcode: io_print");
        w.dedent();
        w.dedent();
        w.line("x: 1");
        assert_eq!(w.finish(), vec!["hello:", "  opcode: io_print", "x: 1"]);
    }
}
