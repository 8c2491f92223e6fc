//! Raw workflow document, as written in the text.
//!
//! These types mirror the YAML schema one-to-one. They are loaded from a
//! `serde_yaml::Value` by hand rather than derived so that a shape problem is
//! reported against the node that has it.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::ParseError;

/// Opcode of the entry node of every workflow.
pub const START_OPCODE: &str = "workflow_start";
/// Fallback id for the entry node when no `workflow_start` node exists.
pub const START_ID: &str = "start";

// =============================================================================
// DOCUMENT
// =============================================================================

#[derive(Debug, Clone, Serialize, Default)]
pub struct WorkflowDocument {
    pub workflows: Vec<Workflow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Workflow {
    pub name: String,
    pub interface: Interface,
    pub variables: Vec<(String, Value)>,
    pub nodes: Vec<NodeDefinition>,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize, Default, PartialEq)]
pub struct Interface {
    #[serde(default)]
    pub inputs: Vec<InterfaceInput>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct InterfaceInput {
    pub name: String,
    #[serde(rename = "type", default = "any_type")]
    pub ty: String,
    #[serde(default)]
    pub required: bool,
}

fn any_type() -> String {
    "any".into()
}

impl InterfaceInput {
    pub fn new(name: &str, ty: &str, required: bool) -> Self {
        InterfaceInput {
            name: name.to_string(),
            ty: ty.to_string(),
            required,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeDefinition {
    pub id: String,
    pub opcode: String,
    pub inputs: Vec<(String, RawValue)>,
    pub next: Option<String>,
    /// Branch name → head of the branch chain (None when empty).
    pub branches: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum RawValue {
    Literal { value: Value },
    Variable { name: String },
    /// Reporter kept as its own entry of the node map.
    NodeRef { id: String },
    Inline(InlineReporter),
    WorkflowCall {
        name: String,
        args: Vec<(String, RawValue)>,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineReporter {
    pub id: Option<String>,
    pub opcode: String,
    pub inputs: Vec<(String, RawValue)>,
}

// =============================================================================
// LOOKUPS
// =============================================================================

impl WorkflowDocument {
    pub fn workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.iter().find(|w| w.name == name)
    }

    /// Every id in use anywhere in the document: node ids and inline reporter ids.
    pub fn all_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for workflow in &self.workflows {
            for node in &workflow.nodes {
                ids.push(node.id.clone());
                for (_, value) in &node.inputs {
                    value.collect_inline_ids(&mut ids);
                }
            }
        }
        ids
    }
}

impl Workflow {
    pub fn node(&self, id: &str) -> Option<&NodeDefinition> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn start_id(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|n| n.opcode == START_OPCODE)
            .or_else(|| self.node(START_ID))
            .map(|n| n.id.as_str())
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Ids of map entries referenced through `{node: id}` by the given node.
    pub fn reporter_refs(&self, id: &str) -> Vec<String> {
        let mut refs = Vec::new();
        if let Some(node) = self.node(id) {
            for (_, value) in &node.inputs {
                value.collect_node_refs(&mut refs);
            }
        }
        refs
    }
}

impl NodeDefinition {
    pub fn input(&self, key: &str) -> Option<&RawValue> {
        self.inputs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn branch(&self, name: &str) -> Option<&Option<String>> {
        self.branches.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn branch_names(&self) -> Vec<&str> {
        self.branches.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl RawValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        RawValue::Literal {
            value: value.into(),
        }
    }

    pub fn variable(name: &str) -> Self {
        RawValue::Variable {
            name: name.to_string(),
        }
    }

    fn collect_inline_ids(&self, out: &mut Vec<String>) {
        match self {
            RawValue::Inline(inline) => {
                if let Some(id) = &inline.id {
                    out.push(id.clone());
                }
                for (_, value) in &inline.inputs {
                    value.collect_inline_ids(out);
                }
            }
            RawValue::WorkflowCall { args, .. } => {
                for (_, value) in args {
                    value.collect_inline_ids(out);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn collect_node_refs(&self, out: &mut Vec<String>) {
        match self {
            RawValue::NodeRef { id } => out.push(id.clone()),
            RawValue::Inline(inline) => {
                for (_, value) in &inline.inputs {
                    value.collect_node_refs(out);
                }
            }
            RawValue::WorkflowCall { args, .. } => {
                for (_, value) in args {
                    value.collect_node_refs(out);
                }
            }
            _ => {}
        }
    }

    /// Render back to the YAML value it was loaded from (modulo formatting).
    pub fn to_yaml(&self) -> Value {
        match self {
            RawValue::Literal { value } => single("literal", value.clone()),
            RawValue::Variable { name } => single("variable", Value::String(name.clone())),
            RawValue::NodeRef { id } => single("node", Value::String(id.clone())),
            RawValue::Inline(inline) => {
                let mut map = Mapping::new();
                if let Some(id) = &inline.id {
                    map.insert("id".into(), Value::String(id.clone()));
                }
                map.insert("opcode".into(), Value::String(inline.opcode.clone()));
                if !inline.inputs.is_empty() {
                    map.insert("inputs".into(), inputs_to_yaml(&inline.inputs));
                }
                Value::Mapping(map)
            }
            RawValue::WorkflowCall { name, args } => {
                let mut map = Mapping::new();
                map.insert("workflow_call".into(), Value::String(name.clone()));
                if !args.is_empty() {
                    map.insert("args".into(), inputs_to_yaml(args));
                }
                Value::Mapping(map)
            }
        }
    }
}

pub(crate) fn inputs_to_yaml(inputs: &[(String, RawValue)]) -> Value {
    let mut map = Mapping::new();
    for (key, value) in inputs {
        map.insert(Value::String(key.clone()), value.to_yaml());
    }
    Value::Mapping(map)
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Mapping::new();
    map.insert(key.into(), value);
    Value::Mapping(map)
}

// =============================================================================
// LOADING
// =============================================================================

impl WorkflowDocument {
    pub fn from_yaml(root: &Value) -> Result<Self, ParseError> {
        let workflows = match root {
            Value::Null => return Ok(WorkflowDocument::default()),
            Value::Mapping(map) => match map.get("workflows") {
                None | Some(Value::Null) => return Ok(WorkflowDocument::default()),
                Some(Value::Sequence(items)) => items,
                Some(_) => {
                    return Err(ParseError::InvalidDocument(
                        "'workflows' must be a list".into(),
                    ));
                }
            },
            _ => {
                return Err(ParseError::InvalidDocument(
                    "top level must be a mapping with a 'workflows' list".into(),
                ));
            }
        };

        let mut doc = WorkflowDocument::default();
        for item in workflows {
            let workflow = Workflow::from_yaml(item)?;
            if doc.workflow(&workflow.name).is_some() {
                return Err(ParseError::DuplicateWorkflow(workflow.name));
            }
            doc.workflows.push(workflow);
        }
        Ok(doc)
    }
}

impl Workflow {
    fn from_yaml(item: &Value) -> Result<Self, ParseError> {
        let Value::Mapping(map) = item else {
            return Err(ParseError::InvalidDocument(
                "each workflow must be a mapping".into(),
            ));
        };
        let name = match map.get("name") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => {
                return Err(ParseError::InvalidDocument(
                    "workflow is missing a 'name'".into(),
                ));
            }
        };

        let interface = match map.get("interface") {
            None | Some(Value::Null) => Interface::default(),
            Some(value) => Interface::from_yaml(&name, value)?,
        };

        let variables = match map.get("variables") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Mapping(vars)) => vars
                .iter()
                .map(|(k, v)| Ok((key_string(k, &name)?, v.clone())))
                .collect::<Result<_, ParseError>>()?,
            Some(_) => {
                return Err(ParseError::InvalidDocument(format!(
                    "variables of workflow '{}' must be a mapping",
                    name
                )));
            }
        };

        let mut nodes: Vec<NodeDefinition> = Vec::new();
        match map.get("nodes") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(entries)) => {
                for (key, entry) in entries {
                    let id = key_string(key, &name)?;
                    nodes.push(NodeDefinition::from_yaml(&id, entry)?);
                }
            }
            Some(_) => {
                return Err(ParseError::InvalidDocument(format!(
                    "nodes of workflow '{}' must be a mapping",
                    name
                )));
            }
        }

        Ok(Workflow {
            name,
            interface,
            variables,
            nodes,
        })
    }
}

impl Interface {
    fn from_yaml(workflow: &str, value: &Value) -> Result<Self, ParseError> {
        let Value::Mapping(map) = value else {
            return Err(ParseError::InvalidDocument(format!(
                "interface of workflow '{}' must be a mapping",
                workflow
            )));
        };
        let inputs = match map.get("inputs") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => serde_yaml::from_value::<Vec<InterfaceInput>>(v.clone()).map_err(|e| {
                ParseError::InvalidDocument(format!(
                    "interface inputs of workflow '{}': {}",
                    workflow, e
                ))
            })?,
        };
        let outputs = match map.get("outputs") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => serde_yaml::from_value::<Vec<String>>(v.clone()).map_err(|e| {
                ParseError::InvalidDocument(format!(
                    "interface outputs of workflow '{}': {}",
                    workflow, e
                ))
            })?,
        };
        Ok(Interface { inputs, outputs })
    }
}

impl NodeDefinition {
    fn from_yaml(id: &str, entry: &Value) -> Result<Self, ParseError> {
        let Value::Mapping(map) = entry else {
            return Err(ParseError::malformed(id, "node entry must be a mapping"));
        };

        let opcode = match map.get("opcode") {
            Some(Value::String(op)) if !op.is_empty() => op.clone(),
            _ => return Err(ParseError::malformed(id, "missing 'opcode'")),
        };

        let inputs = match map.get("inputs") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => load_inputs(id, v)?,
        };

        let next = optional_id(id, "next", map.get("next"))?;

        let mut branches = Vec::new();
        match map.get("branches") {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(entries)) => {
                for (key, head) in entries {
                    let name = key_string(key, id)?;
                    let head = optional_id(id, &name, Some(head))?;
                    branches.push((name, head));
                }
            }
            Some(_) => return Err(ParseError::malformed(id, "'branches' must be a mapping")),
        }

        Ok(NodeDefinition {
            id: id.to_string(),
            opcode,
            inputs,
            next,
            branches,
        })
    }
}

fn load_inputs(node_id: &str, value: &Value) -> Result<Vec<(String, RawValue)>, ParseError> {
    let Value::Mapping(map) = value else {
        return Err(ParseError::malformed(node_id, "'inputs' must be a mapping"));
    };
    map.iter()
        .map(|(k, v)| {
            let key = key_string(k, node_id)?;
            let value = load_value(node_id, &key, v)?;
            Ok((key, value))
        })
        .collect()
}

fn load_value(node_id: &str, key: &str, value: &Value) -> Result<RawValue, ParseError> {
    let Value::Mapping(map) = value else {
        return match value {
            Value::Sequence(_) => Err(ParseError::malformed(
                node_id,
                format!("input '{}' must be a scalar or a value block", key),
            )),
            other => Ok(RawValue::Literal {
                value: other.clone(),
            }),
        };
    };

    if let Some(literal) = map.get("literal") {
        return Ok(RawValue::Literal {
            value: literal.clone(),
        });
    }
    if let Some(var) = map.get("variable") {
        return match var {
            Value::String(name) => Ok(RawValue::Variable { name: name.clone() }),
            _ => Err(ParseError::malformed(
                node_id,
                format!("input '{}' has a non-string variable name", key),
            )),
        };
    }
    if let Some(target) = map.get("node") {
        return match target {
            Value::String(id) => Ok(RawValue::NodeRef { id: id.clone() }),
            _ => Err(ParseError::malformed(
                node_id,
                format!("input '{}' has a non-string node reference", key),
            )),
        };
    }
    if let Some(call) = map.get("workflow_call") {
        let Value::String(name) = call else {
            return Err(ParseError::malformed(
                node_id,
                format!("input '{}' names no workflow", key),
            ));
        };
        let args = match map.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(args) => load_inputs(node_id, args)?,
        };
        return Ok(RawValue::WorkflowCall {
            name: name.clone(),
            args,
        });
    }
    if let Some(opcode) = map.get("opcode") {
        let Value::String(opcode) = opcode else {
            return Err(ParseError::malformed(
                node_id,
                format!("reporter in input '{}' has a non-string opcode", key),
            ));
        };
        let id = match map.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(_) => {
                return Err(ParseError::malformed(
                    node_id,
                    format!("reporter in input '{}' has a non-string id", key),
                ));
            }
        };
        let inputs = match map.get("inputs") {
            None | Some(Value::Null) => Vec::new(),
            Some(inputs) => load_inputs(id.as_deref().unwrap_or(node_id), inputs)?,
        };
        return Ok(RawValue::Inline(InlineReporter {
            id,
            opcode: opcode.clone(),
            inputs,
        }));
    }

    Err(ParseError::malformed(
        node_id,
        format!("input '{}' has an unrecognized value block", key),
    ))
}

fn optional_id(node_id: &str, field: &str, value: Option<&Value>) -> Result<Option<String>, ParseError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ParseError::malformed(
            node_id,
            format!("'{}' must be a node id", field),
        )),
    }
}

fn key_string(key: &Value, owner: &str) -> Result<String, ParseError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ParseError::malformed(owner, "mapping keys must be scalars")),
    }
}
