//! Selection checks run before a chain is extracted into its own workflow.

pub mod chain;
pub mod variables;

pub use chain::{ChainValidation, validate_linear_chain};
pub use variables::{ChainVariables, analyze_chain_variables};
