use crate::theme::Theme;
use crate::wire::DEFAULT_MAX_FRAME_BYTES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub poll_interval_ms: u64,
    pub max_frame_bytes: u64,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            poll_interval_ms: 50,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub dpi: f32,
    /// Default figure size in inches.
    pub figure_width: f32,
    pub figure_height: f32,
    /// Base directory for relative SaveFig paths.
    pub output_dir: Option<PathBuf>,
    /// When set, ShowFig writes `figure-N.svg` here instead of stdout.
    pub show_dir: Option<PathBuf>,
}

impl RenderConfig {
    /// Whole pixels for a length in inches.
    pub fn pixels(&self, inches: f64) -> f32 {
        (inches * self.dpi as f64).round().max(1.0) as f32
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: 100.0,
            figure_width: 6.4,
            figure_height: 4.8,
            output_dir: None,
            show_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub render: RenderConfig,
    pub theme: Theme,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    server: Option<ServerConfigFile>,
    render: Option<RenderConfigFile>,
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ServerConfigFile {
    host: Option<String>,
    port: Option<u16>,
    poll_interval_ms: Option<u64>,
    max_frame_bytes: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    dpi: Option<NumberOrString>,
    figure_width: Option<NumberOrString>,
    figure_height: Option<NumberOrString>,
    output_dir: Option<PathBuf>,
    show_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<NumberOrString>,
    title_font_size: Option<NumberOrString>,
    text_color: Option<String>,
    background: Option<String>,
    axes_background: Option<String>,
    axes_edge_color: Option<String>,
    tick_color: Option<String>,
    grid_color: Option<String>,
    legend_background: Option<String>,
    legend_border: Option<String>,
    line_width: Option<NumberOrString>,
    marker_size: Option<NumberOrString>,
    color_cycle: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

impl NumberOrString {
    fn as_f32(&self) -> Option<f32> {
        match self {
            NumberOrString::Number(val) => Some(*val),
            NumberOrString::String(val) => val.trim().trim_end_matches("px").parse::<f32>().ok(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = match serde_json::from_str(&contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(&contents)
            .map_err(|_| anyhow::anyhow!("invalid config file {}: {json_err}", path.display()))?,
    };

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "modern" => config.theme = Theme::modern(),
            "default" | "matplotlib" | "classic" => config.theme = Theme::matplotlib_default(),
            other => tracing::warn!(theme = other, "unknown theme name, keeping default"),
        }
    }

    if let Some(server) = parsed.server {
        if let Some(v) = server.host {
            config.server.host = v;
        }
        if let Some(v) = server.port {
            config.server.port = v;
        }
        if let Some(v) = server.poll_interval_ms {
            config.server.poll_interval_ms = v;
        }
        if let Some(v) = server.max_frame_bytes {
            config.server.max_frame_bytes = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.dpi.as_ref().and_then(NumberOrString::as_f32) {
            config.render.dpi = v.max(1.0);
        }
        if let Some(v) = render.figure_width.as_ref().and_then(NumberOrString::as_f32) {
            config.render.figure_width = v;
        }
        if let Some(v) = render.figure_height.as_ref().and_then(NumberOrString::as_f32) {
            config.render.figure_height = v;
        }
        if let Some(v) = render.output_dir {
            config.render.output_dir = Some(v);
        }
        if let Some(v) = render.show_dir {
            config.render.show_dir = Some(v);
        }
    }

    if let Some(vars) = parsed.theme_variables {
        apply_theme_variables(&mut config.theme, vars);
    }

    Ok(config)
}

fn apply_theme_variables(theme: &mut Theme, vars: ThemeVariables) {
    if let Some(v) = vars.font_family {
        theme.font_family = v;
    }
    if let Some(v) = vars.font_size.as_ref().and_then(NumberOrString::as_f32) {
        theme.font_size = v;
    }
    if let Some(v) = vars.title_font_size.as_ref().and_then(NumberOrString::as_f32) {
        theme.title_font_size = v;
    }
    if let Some(v) = vars.text_color {
        theme.text_color = v;
    }
    if let Some(v) = vars.background {
        theme.background = v;
    }
    if let Some(v) = vars.axes_background {
        theme.axes_background = v;
    }
    if let Some(v) = vars.axes_edge_color {
        theme.axes_edge_color = v;
    }
    if let Some(v) = vars.tick_color {
        theme.tick_color = v;
    }
    if let Some(v) = vars.grid_color {
        theme.grid_color = Some(v);
    }
    if let Some(v) = vars.legend_background {
        theme.legend_background = v;
    }
    if let Some(v) = vars.legend_border {
        theme.legend_border = v;
    }
    if let Some(v) = vars.line_width.as_ref().and_then(NumberOrString::as_f32) {
        theme.line_width = v;
    }
    if let Some(v) = vars.marker_size.as_ref().and_then(NumberOrString::as_f32) {
        theme.marker_size = v;
    }
    if let Some(v) = vars.color_cycle
        && !v.is_empty()
    {
        theme.color_cycle = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_match_the_stock_server() {
        let config = load_config(None).unwrap();
        assert_eq!(config.server.address(), "127.0.0.1:8080");
        assert_eq!(config.server.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.render.pixels(6.4), 640.0);
    }

    #[test]
    fn json_fields_override_defaults() {
        let file = write_config(
            r##"{
                "server": { "port": 9000, "pollIntervalMs": 0 },
                "render": { "dpi": "72", "outputDir": "/tmp/plots" },
                "theme": "modern",
                "themeVariables": { "fontSize": 14, "colorCycle": ["#000000"] }
            }"##,
        );
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.poll_interval_ms, 0);
        assert_eq!(config.render.dpi, 72.0);
        assert_eq!(config.render.output_dir, Some(PathBuf::from("/tmp/plots")));
        assert_eq!(config.theme.font_size, 14.0);
        assert_eq!(config.theme.color_cycle, vec!["#000000".to_string()]);
        assert_eq!(config.theme.axes_edge_color, Theme::modern().axes_edge_color);
    }

    #[test]
    fn json5_is_accepted_as_a_fallback() {
        let file = write_config("{ server: { port: 7001 }, // trailing comment\n }");
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 7001);
    }

    #[test]
    fn garbage_is_an_error() {
        let file = write_config("port = 8080");
        assert!(load_config(Some(file.path())).is_err());
    }
}
