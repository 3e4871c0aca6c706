use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    demo::FilterType, CheckboxDescriptor, ControlDescriptor, ControlPanel, RangeDescriptor, Result,
    SelectDescriptor,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub plot: PlotConfig,
    #[serde(default = "default_controls")]
    pub controls: Vec<ControlDescriptor>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            plot: PlotConfig::default(),
            controls: default_controls(),
        }
    }
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(?path, controls = config.controls.len(), "loaded configuration");
        Ok(config)
    }

    /// Declares every configured control on a fresh panel.
    pub fn panel(&self) -> Result<ControlPanel> {
        ControlPanel::from_descriptors(self.controls.iter().cloned())
    }
}

/// Size of the rendered response plot, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 300.0,
        }
    }
}

/// Controls of the filter response page.
fn default_controls() -> Vec<ControlDescriptor> {
    vec![
        SelectDescriptor::new("type", FilterType::ALL.iter().map(|kind| kind.name()))
            .with_label("Type")
            .into(),
        RangeDescriptor::new("freq", 0.001, 0.499, 0.001, 0.1)
            .with_label("Frequency")
            .into(),
        RangeDescriptor::new("octaves", 0.1, 4.0, 0.1, 1.0)
            .with_label("Bandwidth (octaves)")
            .into(),
        RangeDescriptor::new("db", -24.0, 24.0, 0.5, 6.0)
            .with_label("Gain (dB)")
            .into(),
        CheckboxDescriptor::new("logFreq", true)
            .with_label("Log frequency")
            .into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn default_panel_declares_filter_controls() {
        let state = AppConfig::default().panel().unwrap().state();
        assert_eq!(state.text("type").unwrap(), "lowpass");
        assert_eq!(state.number("freq").unwrap(), 0.1);
        assert_eq!(state.get("logFreq"), Some(&Value::Bool(true)));
    }

    #[test]
    fn parses_tagged_controls_from_json() {
        let config = AppConfig::from_json_str(
            r#"{
                "plot": { "width": 200, "height": 100 },
                "controls": [
                    { "kind": "range", "key": "k", "min": 0, "max": 100, "step": 1, "initial": 75 },
                    { "kind": "checkbox", "key": "on", "label": "Enabled" },
                    { "kind": "select", "key": "mode", "options": ["a", "b"], "initial": "b" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.plot.width, 200.0);
        let state = config.panel().unwrap().state();
        assert_eq!(state.number("k").unwrap(), 75.0);
        assert!(!state.flag("on").unwrap());
        assert_eq!(state.text("mode").unwrap(), "b");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        assert!(AppConfig::from_json_str(r#"{ "controls": [{ "kind": "dial" }] }"#).is_err());

        let duplicated = AppConfig::from_json_str(
            r#"{ "controls": [
                { "kind": "checkbox", "key": "x" },
                { "kind": "checkbox", "key": "x" }
            ] }"#,
        )
        .unwrap();
        assert!(duplicated.panel().is_err());
    }
}
