//! Boundary between the adapter and an already-instantiated compiled module.
//!
//! A module exposes a flat set of members. Public exports carry a single
//! leading [`EXPORT_MARKER`]; everything else (doubled markers, memories,
//! heap views) is internal and never wrapped.

use crate::{value::ResultCallback, Result, Value, WasmPanelError};

/// Leading character that marks a member as a public export.
pub const EXPORT_MARKER: char = '_';

/// Returns the wrapped name for `member` if it is a public export.
pub fn public_export_name(member: &str) -> Option<&str> {
    let rest = member.strip_prefix(EXPORT_MARKER)?;
    match rest.chars().next() {
        Some(next) if next != EXPORT_MARKER => Some(rest),
        _ => None,
    }
}

/// An instantiated foreign module.
///
/// Exports hand complex results back through the [`HeapRelay`] rather than
/// their return value: long-lived results go into the shared result slot,
/// short-lived ones are passed to the caller's callback before returning.
pub trait ForeignModule {
    /// Every member name the module exposes, internal ones included.
    fn member_names(&self) -> Vec<String>;

    /// Runs the raw export `name`. `Ok(None)` means the export produced no
    /// direct value. Errors are opaque to the adapter and passed through.
    fn invoke(&mut self, name: &str, args: &[Value], heap: &mut HeapRelay<'_, '_>) -> Result<Option<Value>>;
}

/// The two shared result slots, as seen by an export for the duration of one
/// invocation.
pub struct HeapRelay<'slot, 'cb> {
    result: &'slot mut Option<Value>,
    callback: Option<ResultCallback<'cb>>,
}

impl<'slot, 'cb> HeapRelay<'slot, 'cb> {
    pub(crate) fn new(result: &'slot mut Option<Value>, callback: Option<ResultCallback<'cb>>) -> Self {
        Self { result, callback }
    }

    /// Publishes a result that outlives the call. The caller reads it once
    /// the export returns without a direct value.
    pub fn set_result(&mut self, value: impl Into<Value>) {
        *self.result = Some(value.into());
    }

    /// Hands a short-lived result to the installed callback. The callback
    /// clears itself, so a second delivery fails.
    pub fn deliver(&mut self, value: impl Into<Value>) -> Result<()> {
        let callback = self
            .callback
            .take()
            .ok_or(WasmPanelError::NoCallbackRegistered)?;
        callback(value.into());
        Ok(())
    }

    /// Whether a callback is installed and still waiting for its result.
    pub fn callback_pending(&self) -> bool {
        self.callback.is_some()
    }
}
