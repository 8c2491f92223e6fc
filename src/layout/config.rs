use serde::{Deserialize, Serialize};

use crate::value::PillMetrics;

/// Every metric the layout engine uses, in canvas units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub header_height: f64,
    pub input_row_height: f64,
    /// Regular inputs previewed on a card (and on a pill) before capping.
    pub max_preview_rows: usize,
    pub pill_base_height: f64,
    pub pill_row_height: f64,
    /// Gap below each reporter pill, also the padding around nested pills.
    pub pill_padding: f64,
    pub branch_port_height: f64,
    pub h_gap: f64,
    pub branch_v_gap: f64,
    pub group_padding: f64,
    pub group_gap: f64,
    pub orphan_gap: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub curvature: f64,
    pub max_curve_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            node_width: 200.0,
            header_height: 60.0,
            input_row_height: 22.0,
            max_preview_rows: 4,
            pill_base_height: 28.0,
            pill_row_height: 20.0,
            pill_padding: 8.0,
            branch_port_height: 24.0,
            h_gap: 80.0,
            branch_v_gap: 40.0,
            group_padding: 40.0,
            group_gap: 120.0,
            orphan_gap: 80.0,
            zoom_min: 0.2,
            zoom_max: 2.5,
            curvature: 0.5,
            max_curve_offset: 120.0,
        }
    }
}

impl LayoutConfig {
    pub fn pill_metrics(&self) -> PillMetrics {
        PillMetrics {
            base: self.pill_base_height,
            row: self.pill_row_height,
            nested_padding: self.pill_padding,
            max_rows: self.max_preview_rows,
        }
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }
}
