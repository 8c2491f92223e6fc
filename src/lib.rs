pub mod catalog;
pub mod config;
pub mod edit;
pub mod error;
pub mod history;
pub mod layout;
pub mod parse;
pub mod validate;
pub mod value;
pub mod wasm;

pub use catalog::Catalog;
pub use config::EngineConfig;
pub use edit::{DocumentEditor, Edit};
pub use error::{EditError, ParseError};
pub use history::History;
pub use layout::{Geometry, LayoutConfig, LayoutOverrides, layout};
pub use parse::{Tree, parse, parse_with_catalog};
