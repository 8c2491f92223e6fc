//! Opcode catalog types.
//!
//! The catalog is consumed, never produced, by the engine: the parser reads
//! branch slots from it and the editor reads parameter lists and defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ControlFlow,
    Data,
    Io,
    Operator,
    WorkflowOp,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub required: bool,
}

/// Branch slots a control-flow opcode offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BranchSlots {
    Fixed {
        names: Vec<String>,
    },
    /// `leading`, then `prefix1..prefixN`, then `trailing`.
    Dynamic {
        #[serde(default)]
        leading: Vec<String>,
        prefix: String,
        #[serde(default)]
        min: usize,
        #[serde(default)]
        trailing: Vec<String>,
    },
}

/// Variadic inputs named `prefix1..prefixN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicInputs {
    pub prefix: String,
    #[serde(rename = "type", default = "any_type")]
    pub ty: String,
    #[serde(default)]
    pub min: usize,
}

fn any_type() -> String {
    "any".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpcodeSpec {
    pub opcode: String,
    pub category: Category,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub branches: Option<BranchSlots>,
    #[serde(default)]
    pub dynamic_inputs: Option<DynamicInputs>,
    /// Accepts input keys it does not declare (e.g. call arguments).
    #[serde(default)]
    pub extra_inputs: bool,
    /// Name of the input holding the variable this opcode writes.
    #[serde(default)]
    pub assigns: Option<String>,
    #[serde(default)]
    pub returns: Option<String>,
}

impl OpcodeSpec {
    pub fn new(opcode: &str, category: Category) -> Self {
        OpcodeSpec {
            opcode: opcode.to_string(),
            category,
            params: Vec::new(),
            branches: None,
            dynamic_inputs: None,
            extra_inputs: false,
            assigns: None,
            returns: None,
        }
    }

    pub fn param(mut self, name: &str, ty: &str, required: bool) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            ty: ty.to_string(),
            required,
        });
        self
    }

    pub fn fixed_branches(mut self, names: &[&str]) -> Self {
        self.branches = Some(BranchSlots::Fixed {
            names: names.iter().map(|n| n.to_string()).collect(),
        });
        self
    }

    pub fn dynamic_branches(
        mut self,
        leading: &[&str],
        prefix: &str,
        min: usize,
        trailing: &[&str],
    ) -> Self {
        self.branches = Some(BranchSlots::Dynamic {
            leading: leading.iter().map(|n| n.to_string()).collect(),
            prefix: prefix.to_string(),
            min,
            trailing: trailing.iter().map(|n| n.to_string()).collect(),
        });
        self
    }

    pub fn dynamic_inputs(mut self, prefix: &str, ty: &str, min: usize) -> Self {
        self.dynamic_inputs = Some(DynamicInputs {
            prefix: prefix.to_string(),
            ty: ty.to_string(),
            min,
        });
        self
    }

    pub fn extra_inputs(mut self) -> Self {
        self.extra_inputs = true;
        self
    }

    pub fn assigns(mut self, param: &str) -> Self {
        self.assigns = Some(param.to_string());
        self
    }

    pub fn returns(mut self, ty: &str) -> Self {
        self.returns = Some(ty.to_string());
        self
    }

    pub fn is_control_flow(&self) -> bool {
        self.category == Category::ControlFlow
    }

    pub fn param_spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether `key` is a legal input key for this opcode.
    pub fn accepts_input(&self, key: &str) -> bool {
        if self.extra_inputs || self.param_spec(key).is_some() {
            return true;
        }
        match &self.dynamic_inputs {
            Some(dynamic) => ordinal_suffix(key, &dynamic.prefix).is_some(),
            None => false,
        }
    }

    /// Type of the input `key`, if the opcode declares one.
    pub fn input_type(&self, key: &str) -> Option<&str> {
        if let Some(param) = self.param_spec(key) {
            return Some(&param.ty);
        }
        self.dynamic_inputs
            .as_ref()
            .filter(|d| ordinal_suffix(key, &d.prefix).is_some())
            .map(|d| d.ty.as_str())
    }
}

/// `CATCH3` with prefix `CATCH` → `Some(3)`. Ordinals start at 1.
pub fn ordinal_suffix(name: &str, prefix: &str) -> Option<usize> {
    let rest = name.strip_prefix(prefix)?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse::<usize>().ok().filter(|n| *n >= 1)
}

/// Default literal for a parameter type, as written into new node blocks.
pub fn default_literal(ty: &str) -> serde_yaml::Value {
    match ty {
        "int" => serde_yaml::Value::Number(0.into()),
        "float" | "number" => serde_yaml::Value::Number(serde_yaml::Number::from(0.0)),
        "bool" => serde_yaml::Value::Bool(false),
        "str" | "string" => serde_yaml::Value::String(String::new()),
        "list" => serde_yaml::Value::Sequence(Vec::new()),
        "dict" => serde_yaml::Value::Mapping(serde_yaml::Mapping::new()),
        _ => serde_yaml::Value::Null,
    }
}
