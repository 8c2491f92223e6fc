//! Card heights.

use super::config::LayoutConfig;
use crate::parse::TreeNode;

/// Height of a node card: header, capped preview rows for regular inputs,
/// one pill per reporter input (sized post-order) and, for control-flow
/// nodes, one port row per branch.
pub fn node_height(node: &TreeNode, config: &LayoutConfig) -> f64 {
    let metrics = config.pill_metrics();
    let regular = node.inputs.iter().filter(|s| !s.value.is_reporter()).count();
    let pills: f64 = node
        .inputs
        .iter()
        .filter(|s| s.value.is_reporter())
        .map(|s| s.value.nested_height(&metrics) + config.pill_padding)
        .sum();
    let ports = if node.is_control_flow() {
        node.children.len() as f64 * config.branch_port_height
    } else {
        0.0
    };
    config.header_height + regular.min(config.max_preview_rows) as f64 * config.input_row_height + pills + ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::parse::BranchNode;
    use crate::value::{FormattedValue, InputSlot};

    fn slot(name: &str, value: FormattedValue) -> InputSlot {
        InputSlot {
            name: name.into(),
            value,
        }
    }

    fn node(inputs: Vec<InputSlot>) -> TreeNode {
        TreeNode {
            id: "n".into(),
            opcode: "io_print".into(),
            kind: Category::Io,
            inputs,
            children: Vec::new(),
        }
    }

    #[test]
    fn plain_card() {
        let config = LayoutConfig::default();
        let n = node(vec![slot("STRING", FormattedValue::literal("hi"))]);
        assert_eq!(node_height(&n, &config), 60.0 + 22.0);
    }

    #[test]
    fn preview_rows_are_capped() {
        let config = LayoutConfig::default();
        let inputs = (0..7).map(|i| slot(&format!("I{}", i), FormattedValue::literal(i))).collect();
        assert_eq!(node_height(&node(inputs), &config), 60.0 + 4.0 * 22.0);
    }

    #[test]
    fn nested_reporters_add_pill_heights() {
        let config = LayoutConfig::default();
        let inner = FormattedValue::Reporter {
            opcode: "operator_add".into(),
            id: "inner".into(),
            inputs: vec![
                slot("LEFT", FormattedValue::literal(1)),
                slot("RIGHT", FormattedValue::literal(2)),
            ],
        };
        let outer = FormattedValue::Reporter {
            opcode: "str_length".into(),
            id: "outer".into(),
            inputs: vec![slot("VALUE", inner)],
        };
        // inner: 28 + 2×20 = 68; outer: 28 + (68 + 8) = 104; card: 60 + 104 + 8
        assert_eq!(node_height(&node(vec![slot("STRING", outer)]), &config), 172.0);
    }

    #[test]
    fn control_nodes_reserve_branch_rows() {
        let config = LayoutConfig::default();
        let mut n = node(Vec::new());
        n.kind = Category::ControlFlow;
        n.children = vec![
            BranchNode {
                name: "THEN".into(),
                nodes: Vec::new(),
            },
            BranchNode {
                name: "ELSE".into(),
                nodes: Vec::new(),
            },
        ];
        assert_eq!(node_height(&n, &config), 60.0 + 48.0);
    }
}
