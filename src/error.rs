//! Error types shared by the parse and edit phases.
//!
//! Every error carries a stable code (`P0xx` for parsing, `E0xx` for edits) so
//! the host can key messages and highlights off it.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Parse,
    Edit,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Parse => write!(f, "Parse"),
            Phase::Edit => write!(f, "Edit"),
        }
    }
}

/// Failure to recover a tree from document text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Document is not a valid workflow document: {0}")]
    InvalidDocument(String),

    #[error("Workflow '{0}' is defined more than once")]
    DuplicateWorkflow(String),

    #[error("Workflow '{0}' has no start node")]
    MissingStart(String),

    #[error("Node '{node_id}' uses unknown opcode '{opcode}'")]
    UnknownOpcode { node_id: String, opcode: String },

    #[error("Node '{node_id}' links to missing node '{target}'")]
    DanglingLink { node_id: String, target: String },

    #[error("Reporter '{node_id}' references one of its own ancestors")]
    CyclicReporter { node_id: String },

    #[error("Node '{node_id}' is malformed: {message}")]
    MalformedInput { node_id: String, message: String },

    #[error("Node '{node_id}' has branch '{branch}' which its opcode does not define")]
    UnknownBranch { node_id: String, branch: String },

    #[error("Node '{node_id}' calls unknown workflow '{workflow}'")]
    UnknownWorkflow { node_id: String, workflow: String },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::InvalidDocument(_) => "P001",
            ParseError::DuplicateWorkflow(_) => "P002",
            ParseError::MissingStart(_) => "P003",
            ParseError::UnknownOpcode { .. } => "P004",
            ParseError::DanglingLink { .. } => "P005",
            ParseError::CyclicReporter { .. } => "P006",
            ParseError::MalformedInput { .. } => "P007",
            ParseError::UnknownBranch { .. } => "P008",
            ParseError::UnknownWorkflow { .. } => "P009",
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            ParseError::InvalidDocument(_)
            | ParseError::DuplicateWorkflow(_)
            | ParseError::MissingStart(_) => None,
            ParseError::UnknownOpcode { node_id, .. }
            | ParseError::DanglingLink { node_id, .. }
            | ParseError::CyclicReporter { node_id }
            | ParseError::MalformedInput { node_id, .. }
            | ParseError::UnknownBranch { node_id, .. }
            | ParseError::UnknownWorkflow { node_id, .. } => Some(node_id),
        }
    }

    pub(crate) fn malformed(node_id: &str, message: impl Into<String>) -> Self {
        ParseError::MalformedInput {
            node_id: node_id.to_string(),
            message: message.into(),
        }
    }
}

/// Failure of a structural edit. The input text is never modified on error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Document could not be loaded: {0}")]
    Document(#[from] ParseError),

    #[error("Workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("Node '{node_id}' not found in workflow '{workflow}'")]
    NodeNotFound { workflow: String, node_id: String },

    #[error("Node '{node_id}' has no input '{input}'")]
    TargetInputNotFound { node_id: String, input: String },

    #[error("Linking '{from}' to '{to}' would create a cycle")]
    WouldCreateCycle { from: String, to: String },

    #[error("Node '{node_id}' has nothing connected on '{slot}'")]
    LinkNotFound { node_id: String, slot: String },

    #[error("Node '{node_id}' has no branch '{branch}'")]
    UnknownBranch { node_id: String, branch: String },

    #[error("Unknown opcode '{0}'")]
    UnknownOpcode(String),

    #[error("Node '{0}' is not an orphan")]
    NotAnOrphan(String),

    #[error("Node '{0}' cannot be removed")]
    ProtectedNode(String),

    #[error("'{0}' already exists")]
    NameCollision(String),

    #[error("Variable '{0}' not found")]
    VariableNotFound(String),

    #[error("Interface entry '{0}' not found")]
    InterfaceEntryNotFound(String),

    #[error("Node '{node_id}' has no dynamic {what}")]
    NotDynamic { node_id: String, what: String },

    #[error("Node '{node_id}' must keep at least {min} {what}")]
    MinimumSlots {
        node_id: String,
        what: String,
        min: usize,
    },

    #[error("Selection cannot be extracted: {}", .0.join("; "))]
    InvalidChain(Vec<String>),

    #[error("Edit produced an unreadable document: {0}")]
    Corrupted(String),
}

impl EditError {
    pub fn code(&self) -> &'static str {
        match self {
            EditError::Document(_) => "E001",
            EditError::WorkflowNotFound(_) => "E002",
            EditError::NodeNotFound { .. } => "E003",
            EditError::TargetInputNotFound { .. } => "E004",
            EditError::WouldCreateCycle { .. } => "E005",
            EditError::LinkNotFound { .. } => "E006",
            EditError::UnknownBranch { .. } => "E007",
            EditError::UnknownOpcode(_) => "E008",
            EditError::NotAnOrphan(_) => "E009",
            EditError::ProtectedNode(_) => "E010",
            EditError::NameCollision(_) => "E011",
            EditError::VariableNotFound(_) => "E012",
            EditError::InterfaceEntryNotFound(_) => "E013",
            EditError::NotDynamic { .. } => "E014",
            EditError::MinimumSlots { .. } => "E015",
            EditError::InvalidChain(_) => "E016",
            EditError::Corrupted(_) => "E017",
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            EditError::Document(e) => e.node_id(),
            EditError::NodeNotFound { node_id, .. }
            | EditError::TargetInputNotFound { node_id, .. }
            | EditError::LinkNotFound { node_id, .. }
            | EditError::UnknownBranch { node_id, .. }
            | EditError::NotDynamic { node_id, .. }
            | EditError::MinimumSlots { node_id, .. } => Some(node_id),
            EditError::WouldCreateCycle { from, .. } => Some(from),
            EditError::NotAnOrphan(id) | EditError::ProtectedNode(id) => Some(id),
            _ => None,
        }
    }

    /// Human-readable messages; chain validation failures expand to one per problem.
    pub fn messages(&self) -> Vec<String> {
        match self {
            EditError::InvalidChain(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }

    pub(crate) fn node_not_found(workflow: &str, node_id: &str) -> Self {
        EditError::NodeNotFound {
            workflow: workflow.to_string(),
            node_id: node_id.to_string(),
        }
    }
}
