/// Result alias that carries the custom [`WasmPanelError`] type.
pub type Result<T> = std::result::Result<T, WasmPanelError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum WasmPanelError {
    /// A callback was supplied but the export returned without firing it.
    #[error("function `{function}` did not deliver its result via callback though one was supplied")]
    ProtocolViolation { function: String },
    /// A wrapped function was called while another invocation still owned the
    /// result slots, typically from inside a result callback.
    #[error("cannot invoke `{function}` while `{pending}` is still in progress")]
    Busy { function: String, pending: String },
    #[error("module has no public export named `{0}`")]
    UnknownExport(String),
    #[error("argument {position} of `{function}` is a callback but only the last argument may be one")]
    CallbackNotTrailing { function: String, position: usize },
    /// Raised on the module side when it tries to deliver a short-lived
    /// result and nobody is listening.
    #[error("no result callback registered")]
    NoCallbackRegistered,
    #[error("control `{key}` is invalid: {reason}")]
    InvalidControl { key: String, reason: String },
    #[error("a control named `{0}` is already declared")]
    DuplicateControl(String),
    #[error("no control named `{0}`")]
    UnknownControl(String),
    #[error("`{value}` is not a valid value for control `{key}`")]
    InvalidControlValue { key: String, value: String },
    /// Opaque failure raised by a module export. The adapter passes it
    /// through untouched.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl WasmPanelError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn invalid_control(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidControl {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(key: &str, value: impl ToString) -> Self {
        Self::InvalidControlValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

impl From<&str> for WasmPanelError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for WasmPanelError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
