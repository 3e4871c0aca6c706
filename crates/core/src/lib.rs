//! Core library for driving compiled modules from a control panel.
//!
//! [`WasmApi`] wraps the public exports of an instantiated module so callers
//! get results back the same way whether the export returns them directly,
//! leaves them in the shared result slot, or hands them to a callback.
//! [`ControlPanel`] keeps a set of declared controls in sync with a change
//! handler that calls into that API.

pub mod adapter;
pub mod config;
pub mod demo;
pub mod error;
pub mod module;
pub mod panel;
pub mod value;

pub use adapter::{Delivery, WasmApi, WrappedFunction};
pub use config::{AppConfig, PlotConfig};
pub use demo::FilterResponses;
pub use error::{Result, WasmPanelError};
pub use module::{ForeignModule, HeapRelay, EXPORT_MARKER};
pub use panel::{
    CheckboxDescriptor, ControlDescriptor, ControlPanel, ControlState, LivePanel, RangeDescriptor,
    SelectDescriptor,
};
pub use value::{Arg, HeapArray, ResultCallback, Value};
