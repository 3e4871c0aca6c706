//! Headless control panel bound to a [`WasmApi`].
//!
//! Controls are declared up front on a [`ControlPanel`]. Running the panel
//! loads the module, fires the change handler once with `first == true`, and
//! hands back a [`LivePanel`] whose edit methods each fire it again.

mod control;
mod html;

use std::{collections::BTreeMap, fmt, future::Future};

use serde::Serialize;

use crate::{ForeignModule, Result, Value, WasmApi, WasmPanelError};

pub use control::{CheckboxDescriptor, ControlDescriptor, RangeDescriptor, SelectDescriptor};
use control::Control;

/// Snapshot of every control's live value, keyed by control name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ControlState(BTreeMap<String, Value>);

impl ControlState {
    fn capture(controls: &[Control]) -> Self {
        Self(
            controls
                .iter()
                .map(|control| (control.key.clone(), control.value()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Result<f64> {
        let value = self.require(key)?;
        value
            .as_f64()
            .ok_or_else(|| WasmPanelError::invalid_value(key, value))
    }

    pub fn flag(&self, key: &str) -> Result<bool> {
        let value = self.require(key)?;
        value
            .as_bool()
            .ok_or_else(|| WasmPanelError::invalid_value(key, value))
    }

    pub fn text(&self, key: &str) -> Result<&str> {
        let value = self.require(key)?;
        value
            .as_str()
            .ok_or_else(|| WasmPanelError::invalid_value(key, value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, key: &str) -> Result<&Value> {
        self.0
            .get(key)
            .ok_or_else(|| WasmPanelError::UnknownControl(key.to_string()))
    }
}

/// Set of declared controls, before the module is attached.
#[derive(Debug, Default, Clone)]
pub struct ControlPanel {
    controls: Vec<Control>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a panel from a list of descriptors, in order.
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self>
    where
        I: IntoIterator<Item = ControlDescriptor>,
    {
        let mut panel = Self::new();
        for descriptor in descriptors {
            panel.declare(descriptor)?;
        }
        Ok(panel)
    }

    /// Declares a control. Keys must be unique within the panel.
    pub fn declare(&mut self, descriptor: impl Into<ControlDescriptor>) -> Result<&mut Self> {
        let descriptor = descriptor.into();
        if self.controls.iter().any(|control| control.key == descriptor.key()) {
            return Err(WasmPanelError::DuplicateControl(descriptor.key().to_string()));
        }
        let control = Control::from_descriptor(descriptor)?;
        tracing::debug!(key = %control.key, "declared control");
        self.controls.push(control);
        Ok(self)
    }

    /// Declares a slider with a mirrored numeric text field.
    pub fn declare_range(&mut self, descriptor: RangeDescriptor) -> Result<&mut Self> {
        self.declare(descriptor)
    }

    pub fn declare_checkbox(&mut self, descriptor: CheckboxDescriptor) -> Result<&mut Self> {
        self.declare(descriptor)
    }

    pub fn declare_select(&mut self, descriptor: SelectDescriptor) -> Result<&mut Self> {
        self.declare(descriptor)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.controls.iter().map(|control| control.key.as_str())
    }

    /// Current values, which before `run` are the declared initial values.
    pub fn state(&self) -> ControlState {
        ControlState::capture(&self.controls)
    }

    pub fn render_html(&self) -> String {
        html::render_table(&self.controls)
    }

    /// Loads the module from `factory`, then calls `on_change` once with
    /// `first == true` before any edit can be made.
    ///
    /// Errors from the factory or from that first call are returned here;
    /// the panel is not retained in that case.
    pub async fn run<M, F, Fut, H>(self, factory: F, on_change: H) -> Result<LivePanel<M, H>>
    where
        M: ForeignModule,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<M>>,
        H: FnMut(&WasmApi<M>, &ControlState, bool) -> Result<()>,
    {
        let api = WasmApi::load(factory).await?;
        let mut live = LivePanel {
            api,
            controls: self.controls,
            on_change,
            first_update: true,
            updates: 0,
        };
        live.update()?;
        Ok(live)
    }
}

/// A running panel. Every edit refreshes the state snapshot and calls the
/// change handler exactly once, returning whatever it returned.
pub struct LivePanel<M, H> {
    api: WasmApi<M>,
    controls: Vec<Control>,
    on_change: H,
    first_update: bool,
    updates: usize,
}

impl<M, H> LivePanel<M, H>
where
    M: ForeignModule,
    H: FnMut(&WasmApi<M>, &ControlState, bool) -> Result<()>,
{
    pub fn api(&self) -> &WasmApi<M> {
        &self.api
    }

    pub fn state(&self) -> ControlState {
        ControlState::capture(&self.controls)
    }

    /// Number of times the change handler has been called.
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Contents of the text field mirroring the range control `key`.
    pub fn text(&self, key: &str) -> Result<&str> {
        let control = self
            .controls
            .iter()
            .find(|control| control.key == key)
            .ok_or_else(|| WasmPanelError::UnknownControl(key.to_string()))?;
        control
            .text()
            .ok_or_else(|| WasmPanelError::invalid_control(key, "not a range control"))
    }

    /// Drags the range slider `key` to `value`.
    pub fn slide(&mut self, key: &str, value: f64) -> Result<()> {
        self.control_mut(key)?.slide(value)?;
        self.update()
    }

    /// Commits an edit of the text field mirroring the range control `key`.
    pub fn edit_text(&mut self, key: &str, raw: &str) -> Result<()> {
        self.control_mut(key)?.commit_text(raw)?;
        self.update()
    }

    /// Double-click: restores the declared initial value.
    pub fn reset(&mut self, key: &str) -> Result<()> {
        self.control_mut(key)?.reset();
        self.update()
    }

    pub fn set_checked(&mut self, key: &str, checked: bool) -> Result<()> {
        self.control_mut(key)?.set_checked(checked)?;
        self.update()
    }

    pub fn choose(&mut self, key: &str, option: &str) -> Result<()> {
        self.control_mut(key)?.choose(option)?;
        self.update()
    }

    /// Applies a textual edit, interpreted according to the control's kind.
    pub fn apply(&mut self, key: &str, raw: &str) -> Result<()> {
        self.control_mut(key)?.apply(raw)?;
        self.update()
    }

    pub fn render_html(&self) -> String {
        html::render_table(&self.controls)
    }

    pub fn into_api(self) -> WasmApi<M> {
        self.api
    }

    fn control_mut(&mut self, key: &str) -> Result<&mut Control> {
        self.controls
            .iter_mut()
            .find(|control| control.key == key)
            .ok_or_else(|| WasmPanelError::UnknownControl(key.to_string()))
    }

    fn update(&mut self) -> Result<()> {
        let state = ControlState::capture(&self.controls);
        let first = std::mem::replace(&mut self.first_update, false);
        self.updates += 1;
        tracing::debug!(first, controls = state.len(), "controls changed");
        (self.on_change)(&self.api, &state, first)
    }
}

impl<M, H> fmt::Debug for LivePanel<M, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivePanel")
            .field("api", &self.api)
            .field("controls", &self.controls.len())
            .field("updates", &self.updates)
            .finish()
    }
}
