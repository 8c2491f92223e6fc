//! Engine-wide settings loadable from JSON.

use serde::{Deserialize, Serialize};

use crate::history::{DEFAULT_CAPACITY, History};
use crate::layout::LayoutConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            layout: LayoutConfig::default(),
            history_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn history(&self, initial: impl Into<String>) -> History {
        History::with_capacity(initial, self.history_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"historyCapacity": 5, "layout": {"hGap": 40}}"#).unwrap();
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.layout.h_gap, 40.0);
        assert_eq!(config.layout.node_width, 200.0);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }
}
