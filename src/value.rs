//! Resolved input values and their previews.
//!
//! A `FormattedValue` is what the parser produces for every input slot: a
//! literal, a variable reference, a nested reporter (recursively formatted) or
//! a call to another workflow.

use serde::Serialize;

/// Preview length used on node cards.
pub const SHORT_PREVIEW_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormattedValue {
    Literal {
        value: serde_json::Value,
    },
    Variable {
        name: String,
    },
    Reporter {
        opcode: String,
        id: String,
        inputs: Vec<InputSlot>,
    },
    WorkflowCall {
        name: String,
        args: Vec<InputSlot>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSlot {
    pub name: String,
    pub value: FormattedValue,
}

/// Sizes that drive nested reporter heights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PillMetrics {
    pub base: f64,
    pub row: f64,
    pub nested_padding: f64,
    pub max_rows: usize,
}

impl FormattedValue {
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        FormattedValue::Literal {
            value: value.into(),
        }
    }

    pub fn is_reporter(&self) -> bool {
        matches!(self, FormattedValue::Reporter { .. })
    }

    /// Nested slots of a reporter or call; empty for leaves.
    pub fn slots(&self) -> &[InputSlot] {
        match self {
            FormattedValue::Reporter { inputs, .. } => inputs,
            FormattedValue::WorkflowCall { args, .. } => args,
            _ => &[],
        }
    }

    /// Compact single-line preview, truncated to `max_len` characters.
    pub fn short_preview(&self, max_len: usize) -> String {
        let full = match self {
            FormattedValue::Reporter { opcode, .. } => format!("{}(…)", opcode),
            FormattedValue::WorkflowCall { name, .. } => format!("call {}(…)", name),
            other => other.long_preview(),
        };
        truncate(&full, max_len)
    }

    /// Full preview, nested reporters included.
    pub fn long_preview(&self) -> String {
        match self {
            FormattedValue::Literal { value } => literal_preview(value),
            FormattedValue::Variable { name } => format!("${}", name),
            FormattedValue::Reporter { opcode, inputs, .. } => {
                format!("{}({})", opcode, slots_preview(inputs))
            }
            FormattedValue::WorkflowCall { name, args } => {
                format!("call {}({})", name, slots_preview(args))
            }
        }
    }

    /// Height of this value drawn as a reporter pill; 0 for non-reporters.
    ///
    /// Post-order: every nested reporter is sized before its parent.
    pub fn nested_height(&self, metrics: &PillMetrics) -> f64 {
        let FormattedValue::Reporter { inputs, .. } = self else {
            return 0.0;
        };
        let regular = inputs.iter().filter(|s| !s.value.is_reporter()).count();
        let nested: f64 = inputs
            .iter()
            .filter(|s| s.value.is_reporter())
            .map(|s| s.value.nested_height(metrics) + metrics.nested_padding)
            .sum();
        metrics.base + regular.min(metrics.max_rows) as f64 * metrics.row + nested
    }

    /// Ids of every reporter in this value, children before parents.
    pub fn reporter_ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_reporter_ids(&mut out);
        out
    }

    fn collect_reporter_ids(&self, out: &mut Vec<String>) {
        for slot in self.slots() {
            slot.value.collect_reporter_ids(out);
        }
        if let FormattedValue::Reporter { id, .. } = self {
            out.push(id.clone());
        }
    }

    /// Variable names referenced anywhere in this value, in reading order.
    pub fn variable_refs(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variable_refs(&mut out);
        out
    }

    fn collect_variable_refs(&self, out: &mut Vec<String>) {
        if let FormattedValue::Variable { name } = self {
            out.push(name.clone());
        }
        for slot in self.slots() {
            slot.value.collect_variable_refs(out);
        }
    }

    /// The literal as a plain string, when it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FormattedValue::Literal {
                value: serde_json::Value::String(s),
            } => Some(s),
            _ => None,
        }
    }
}

fn slots_preview(slots: &[InputSlot]) -> String {
    slots
        .iter()
        .map(|s| format!("{}: {}", s.name, s.value.long_preview()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn literal_preview(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => format!("\"{}\"", s),
        serde_json::Value::Null => "null".into(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter(id: &str, inputs: Vec<(&str, FormattedValue)>) -> FormattedValue {
        FormattedValue::Reporter {
            opcode: "operator_add".into(),
            id: id.into(),
            inputs: inputs
                .into_iter()
                .map(|(n, v)| InputSlot {
                    name: n.into(),
                    value: v,
                })
                .collect(),
        }
    }

    const METRICS: PillMetrics = PillMetrics {
        base: 28.0,
        row: 20.0,
        nested_padding: 8.0,
        max_rows: 3,
    };

    #[test]
    fn literal_previews() {
        assert_eq!(FormattedValue::literal("hi").long_preview(), "\"hi\"");
        assert_eq!(FormattedValue::literal(3).long_preview(), "3");
        assert_eq!(
            FormattedValue::Literal {
                value: serde_json::Value::Null
            }
            .long_preview(),
            "null"
        );
    }

    #[test]
    fn variable_preview() {
        let v = FormattedValue::Variable { name: "x".into() };
        assert_eq!(v.long_preview(), "$x");
    }

    #[test]
    fn short_preview_truncates() {
        let v = FormattedValue::literal("Hello, LexFlow! This is long");
        assert_eq!(v.short_preview(10), "\"Hello, L…");
    }

    #[test]
    fn reporter_previews() {
        let v = reporter(
            "r1",
            vec![
                ("LEFT", FormattedValue::literal(1)),
                ("RIGHT", FormattedValue::Variable { name: "x".into() }),
            ],
        );
        assert_eq!(v.long_preview(), "operator_add(LEFT: 1, RIGHT: $x)");
        assert_eq!(v.short_preview(SHORT_PREVIEW_LEN), "operator_add(…)");
    }

    #[test]
    fn nested_height_is_post_order() {
        let inner = reporter("r2", vec![("LEFT", FormattedValue::literal(1))]);
        let outer = reporter(
            "r1",
            vec![("LEFT", inner), ("RIGHT", FormattedValue::literal(2))],
        );
        // inner: 28 + 1 row = 48; outer: 28 + 1 row + (48 + 8) = 104
        assert_eq!(outer.nested_height(&METRICS), 104.0);
        assert_eq!(outer.reporter_ids(), vec!["r2", "r1"]);
    }

    #[test]
    fn non_reporter_has_no_height() {
        assert_eq!(FormattedValue::literal(1).nested_height(&METRICS), 0.0);
    }
}
