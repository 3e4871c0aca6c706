use serde::{Deserialize, Serialize};

use crate::{Result, Value, WasmPanelError};

/// Declarative description of a slider with a mirrored numeric text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDescriptor {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub initial: f64,
}

impl RangeDescriptor {
    pub fn new(key: impl Into<String>, min: f64, max: f64, step: f64, initial: f64) -> Self {
        Self {
            key: key.into(),
            label: None,
            min,
            max,
            step,
            initial,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn validate(&self) -> Result<()> {
        let key = self.key.as_str();
        if ![self.min, self.max, self.step, self.initial]
            .iter()
            .all(|value| value.is_finite())
        {
            return Err(WasmPanelError::invalid_control(key, "bounds must be finite"));
        }
        if self.step <= 0.0 {
            return Err(WasmPanelError::invalid_control(key, "step must be positive"));
        }
        if self.min > self.max {
            return Err(WasmPanelError::invalid_control(key, "min exceeds max"));
        }
        if self.initial < self.min || self.initial > self.max {
            return Err(WasmPanelError::invalid_control(
                key,
                format!("initial value {} outside [{}, {}]", self.initial, self.min, self.max),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckboxDescriptor {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub initial: bool,
}

impl CheckboxDescriptor {
    pub fn new(key: impl Into<String>, initial: bool) -> Self {
        Self {
            key: key.into(),
            label: None,
            initial,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Drop-down choice between fixed options. Without an explicit `initial`
/// the first option is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectDescriptor {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
}

impl SelectDescriptor {
    pub fn new<I, S>(key: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            label: None,
            options: options.into_iter().map(Into::into).collect(),
            initial: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_initial(mut self, initial: impl Into<String>) -> Self {
        self.initial = Some(initial.into());
        self
    }
}

/// Any declarable control, tagged by kind for configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ControlDescriptor {
    Range(RangeDescriptor),
    Checkbox(CheckboxDescriptor),
    Select(SelectDescriptor),
}

impl ControlDescriptor {
    pub fn key(&self) -> &str {
        match self {
            Self::Range(range) => &range.key,
            Self::Checkbox(checkbox) => &checkbox.key,
            Self::Select(select) => &select.key,
        }
    }
}

impl From<RangeDescriptor> for ControlDescriptor {
    fn from(value: RangeDescriptor) -> Self {
        Self::Range(value)
    }
}

impl From<CheckboxDescriptor> for ControlDescriptor {
    fn from(value: CheckboxDescriptor) -> Self {
        Self::Checkbox(value)
    }
}

impl From<SelectDescriptor> for ControlDescriptor {
    fn from(value: SelectDescriptor) -> Self {
        Self::Select(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Widget {
    Range {
        min: f64,
        max: f64,
        step: f64,
        initial: f64,
        value: f64,
        text: String,
    },
    Checkbox {
        initial: bool,
        checked: bool,
    },
    Select {
        options: Vec<String>,
        initial: String,
        selected: String,
    },
}

/// A declared control together with its live widget state.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Control {
    pub(crate) key: String,
    pub(crate) label: String,
    pub(crate) widget: Widget,
}

impl Control {
    pub(crate) fn from_descriptor(descriptor: ControlDescriptor) -> Result<Self> {
        if descriptor.key().is_empty() {
            return Err(WasmPanelError::invalid_control("", "key must not be empty"));
        }

        let control = match descriptor {
            ControlDescriptor::Range(range) => {
                range.validate()?;
                Self {
                    label: range.label.unwrap_or_else(|| range.key.clone()),
                    key: range.key,
                    widget: Widget::Range {
                        min: range.min,
                        max: range.max,
                        step: range.step,
                        initial: range.initial,
                        value: range.initial,
                        text: format_number(range.initial),
                    },
                }
            }
            ControlDescriptor::Checkbox(checkbox) => Self {
                label: checkbox.label.unwrap_or_else(|| checkbox.key.clone()),
                key: checkbox.key,
                widget: Widget::Checkbox {
                    initial: checkbox.initial,
                    checked: checkbox.initial,
                },
            },
            ControlDescriptor::Select(select) => {
                let initial = match select.initial {
                    Some(initial) if select.options.contains(&initial) => initial,
                    Some(initial) => {
                        return Err(WasmPanelError::invalid_control(
                            &select.key,
                            format!("initial option `{initial}` is not one of the options"),
                        ))
                    }
                    None => select.options.first().cloned().ok_or_else(|| {
                        WasmPanelError::invalid_control(&select.key, "select needs at least one option")
                    })?,
                };
                Self {
                    label: select.label.unwrap_or_else(|| select.key.clone()),
                    key: select.key,
                    widget: Widget::Select {
                        options: select.options,
                        selected: initial.clone(),
                        initial,
                    },
                }
            }
        };
        Ok(control)
    }

    /// Live value as it appears in a state snapshot.
    pub(crate) fn value(&self) -> Value {
        match &self.widget {
            Widget::Range { value, .. } => Value::Number(*value),
            Widget::Checkbox { checked, .. } => Value::Bool(*checked),
            Widget::Select { selected, .. } => Value::Text(selected.clone()),
        }
    }

    /// Contents of the numeric text field mirroring a range slider.
    pub(crate) fn text(&self) -> Option<&str> {
        match &self.widget {
            Widget::Range { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Drags the slider. The text mirror follows.
    pub(crate) fn slide(&mut self, requested: f64) -> Result<()> {
        let key = self.key.as_str();
        match &mut self.widget {
            Widget::Range {
                min,
                max,
                step,
                value,
                text,
                ..
            } => {
                if !requested.is_finite() {
                    return Err(WasmPanelError::invalid_value(key, requested));
                }
                *value = sanitize(requested, *min, *max, *step);
                *text = format_number(*value);
                Ok(())
            }
            _ => Err(WasmPanelError::invalid_control(key, "not a range control")),
        }
    }

    /// Commits an edit of the text mirror; the slider moves to match.
    pub(crate) fn commit_text(&mut self, raw: &str) -> Result<()> {
        if !matches!(self.widget, Widget::Range { .. }) {
            return Err(WasmPanelError::invalid_control(&self.key, "not a range control"));
        }
        let parsed: f64 = raw
            .trim()
            .parse()
            .map_err(|_| WasmPanelError::invalid_value(&self.key, raw))?;
        self.slide(parsed)
    }

    pub(crate) fn set_checked(&mut self, value: bool) -> Result<()> {
        match &mut self.widget {
            Widget::Checkbox { checked, .. } => {
                *checked = value;
                Ok(())
            }
            _ => Err(WasmPanelError::invalid_control(&self.key, "not a checkbox")),
        }
    }

    pub(crate) fn choose(&mut self, option: &str) -> Result<()> {
        let key = self.key.as_str();
        match &mut self.widget {
            Widget::Select {
                options, selected, ..
            } => {
                if !options.iter().any(|candidate| candidate == option) {
                    return Err(WasmPanelError::invalid_value(key, option));
                }
                *selected = option.to_string();
                Ok(())
            }
            _ => Err(WasmPanelError::invalid_control(key, "not a select control")),
        }
    }

    /// Applies a textual edit in whatever form the control's kind accepts.
    pub(crate) fn apply(&mut self, raw: &str) -> Result<()> {
        match self.widget {
            Widget::Range { .. } => self.commit_text(raw),
            Widget::Checkbox { .. } => {
                let value = parse_flag(raw).ok_or_else(|| WasmPanelError::invalid_value(&self.key, raw))?;
                self.set_checked(value)
            }
            Widget::Select { .. } => self.choose(raw),
        }
    }

    /// Restores the declared initial value.
    pub(crate) fn reset(&mut self) {
        match &mut self.widget {
            Widget::Range {
                initial,
                value,
                text,
                ..
            } => {
                *value = *initial;
                *text = format_number(*initial);
            }
            Widget::Checkbox { initial, checked } => *checked = *initial,
            Widget::Select {
                initial, selected, ..
            } => *selected = initial.clone(),
        }
    }
}

/// Clamps to the bounds and snaps to the nearest step counted from `min`,
/// stepping down when the snapped value would overshoot `max`.
fn sanitize(requested: f64, min: f64, max: f64, step: f64) -> f64 {
    let clamped = requested.clamp(min, max);
    let mut snapped = min + ((clamped - min) / step).round() * step;
    if snapped > max {
        snapped -= step;
    }
    tidy(snapped)
}

// Drops floating point noise left over from the step arithmetic.
fn tidy(value: f64) -> f64 {
    const SCALE: f64 = 1e12;
    let tidied = (value * SCALE).round() / SCALE;
    if tidied.is_finite() {
        tidied
    } else {
        value
    }
}

pub(crate) fn format_number(value: f64) -> String {
    format!("{value}")
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(key: &str) -> Control {
        Control::from_descriptor(RangeDescriptor::new(key, 0.0, 100.0, 1.0, 75.0).into()).unwrap()
    }

    #[test]
    fn rejects_bad_range_descriptors() {
        let bad = [
            RangeDescriptor::new("k", 0.0, 100.0, 0.0, 50.0),
            RangeDescriptor::new("k", 0.0, 100.0, 1.0, 150.0),
            RangeDescriptor::new("k", 10.0, 0.0, 1.0, 5.0),
            RangeDescriptor::new("k", 0.0, f64::INFINITY, 1.0, 5.0),
        ];
        for descriptor in bad {
            let err = Control::from_descriptor(descriptor.into()).unwrap_err();
            assert!(matches!(err, WasmPanelError::InvalidControl { .. }));
        }
    }

    #[test]
    fn label_defaults_to_key() {
        assert_eq!(range("gain").label, "gain");
        let labelled = Control::from_descriptor(
            RangeDescriptor::new("gain", 0.0, 1.0, 0.1, 0.5)
                .with_label("Gain")
                .into(),
        )
        .unwrap();
        assert_eq!(labelled.label, "Gain");
    }

    #[test]
    fn slider_clamps_and_snaps() {
        let mut control = range("k");
        control.slide(42.4).unwrap();
        assert_eq!(control.value(), Value::Number(42.0));
        assert_eq!(control.text(), Some("42"));

        control.slide(250.0).unwrap();
        assert_eq!(control.value(), Value::Number(100.0));
        assert!(control.slide(f64::NAN).is_err());
    }

    #[test]
    fn fractional_steps_stay_tidy() {
        let mut control =
            Control::from_descriptor(RangeDescriptor::new("freq", 0.001, 0.5, 0.001, 0.1).into()).unwrap();
        control.commit_text("0.1004").unwrap();
        assert_eq!(control.text(), Some("0.1"));

        let mut coarse = Control::from_descriptor(RangeDescriptor::new("k", 0.0, 10.0, 3.0, 3.0).into()).unwrap();
        coarse.slide(10.0).unwrap();
        assert_eq!(coarse.value(), Value::Number(9.0));
    }

    #[test]
    fn text_commit_moves_slider() {
        let mut control = range("k");
        control.commit_text(" 42 ").unwrap();
        assert_eq!(control.value(), Value::Number(42.0));
        assert_eq!(control.text(), Some("42"));

        let err = control.commit_text("forty").unwrap_err();
        assert!(matches!(err, WasmPanelError::InvalidControlValue { .. }));
        assert_eq!(control.value(), Value::Number(42.0));
    }

    #[test]
    fn reset_restores_initial_value() {
        let mut control = range("k");
        control.slide(3.0).unwrap();
        control.reset();
        assert_eq!(control.value(), Value::Number(75.0));
        assert_eq!(control.text(), Some("75"));
    }

    #[test]
    fn select_and_checkbox_edits() {
        let mut select = Control::from_descriptor(SelectDescriptor::new("type", ["lowpass", "highpass"]).into()).unwrap();
        assert_eq!(select.value(), Value::from("lowpass"));
        select.apply("highpass").unwrap();
        assert_eq!(select.value(), Value::from("highpass"));
        assert!(select.choose("allpass").is_err());

        let mut checkbox = Control::from_descriptor(CheckboxDescriptor::new("log", false).into()).unwrap();
        checkbox.apply("on").unwrap();
        assert_eq!(checkbox.value(), Value::Bool(true));
        assert!(checkbox.apply("maybe").is_err());
        assert!(checkbox.slide(1.0).is_err());
    }

    #[test]
    fn select_needs_a_valid_initial_option() {
        let empty = SelectDescriptor::new("type", Vec::<String>::new());
        assert!(Control::from_descriptor(empty.into()).is_err());

        let stray = SelectDescriptor::new("type", ["a", "b"]).with_initial("c");
        assert!(Control::from_descriptor(stray.into()).is_err());
    }
}
