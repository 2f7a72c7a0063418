use serde::{Deserialize, Serialize};

/// matplotlib's `tab10` property cycle.
pub const TAB10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub title_font_size: f32,
    pub text_color: String,
    pub background: String,
    pub axes_background: String,
    pub axes_edge_color: String,
    pub tick_color: String,
    pub grid_color: Option<String>,
    pub legend_background: String,
    pub legend_border: String,
    pub line_width: f32,
    pub marker_size: f32,
    pub color_cycle: Vec<String>,
}

impl Theme {
    /// Close to matplotlib's stock rcParams.
    pub fn matplotlib_default() -> Self {
        Self {
            font_family: "DejaVu Sans, Bitstream Vera Sans, Arial, sans-serif".to_string(),
            font_size: 10.0,
            title_font_size: 12.0,
            text_color: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
            axes_background: "#FFFFFF".to_string(),
            axes_edge_color: "#000000".to_string(),
            tick_color: "#000000".to_string(),
            grid_color: None,
            legend_background: "#FFFFFF".to_string(),
            legend_border: "#CCCCCC".to_string(),
            line_width: 1.5,
            marker_size: 6.0,
            color_cycle: TAB10.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 11.0,
            title_font_size: 14.0,
            text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
            axes_background: "#F8FAFF".to_string(),
            axes_edge_color: "#C7D2E5".to_string(),
            tick_color: "#7A8AA6".to_string(),
            grid_color: Some("#E3E9F3".to_string()),
            legend_background: "#FFFFFF".to_string(),
            legend_border: "#D7E0F0".to_string(),
            line_width: 1.8,
            marker_size: 6.0,
            color_cycle: [
                "#4e79a7", "#f28e2c", "#e15759", "#76b7b2", "#59a14f", "#edc949", "#af7aa1",
                "#ff9da7",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }

    /// Color for the `idx`-th automatically colored series.
    pub fn cycle_color(&self, idx: usize) -> &str {
        if self.color_cycle.is_empty() {
            return TAB10[idx % TAB10.len()];
        }
        &self.color_cycle[idx % self.color_cycle.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::matplotlib_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_wraps_and_survives_empty_palettes() {
        let mut theme = Theme::matplotlib_default();
        assert_eq!(theme.cycle_color(0), "#1f77b4");
        assert_eq!(theme.cycle_color(10), "#1f77b4");
        theme.color_cycle.clear();
        assert_eq!(theme.cycle_color(1), "#ff7f0e");
    }
}
