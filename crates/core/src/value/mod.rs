use std::fmt;

use serde::{Deserialize, Serialize};

/// Dynamic value passed into and returned from module exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
    Array(HeapArray),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Number(value) => Some(*value != 0.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&HeapArray> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Array(array) => write!(f, "{}[{}]", array.type_code(), array.len()),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<HeapArray> for Value {
    fn from(value: HeapArray) -> Self {
        Self::Array(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Self::Array(HeapArray::F64(value))
    }
}

impl From<Vec<f32>> for Value {
    fn from(value: Vec<f32>) -> Self {
        Self::Array(HeapArray::F32(value))
    }
}

/// Copy of a typed region of module memory, one variant per element type a
/// module can publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HeapArray {
    #[serde(rename = "8")]
    I8(Vec<i8>),
    #[serde(rename = "16")]
    I16(Vec<i16>),
    #[serde(rename = "32")]
    I32(Vec<i32>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl HeapArray {
    /// Short element type code, matching the heap view it was read from.
    pub fn type_code(&self) -> &'static str {
        match self {
            Self::I8(_) => "8",
            Self::I16(_) => "16",
            Self::I32(_) => "32",
            Self::U8(_) => "U8",
            Self::U16(_) => "U16",
            Self::U32(_) => "U32",
            Self::F32(_) => "F32",
            Self::F64(_) => "F64",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::I8(data) => data.len(),
            Self::I16(data) => data.len(),
            Self::I32(data) => data.len(),
            Self::U8(data) => data.len(),
            Self::U16(data) => data.len(),
            Self::U32(data) => data.len(),
            Self::F32(data) => data.len(),
            Self::F64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widens every element to `f64`.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Self::I8(data) => data.iter().map(|&v| v.into()).collect(),
            Self::I16(data) => data.iter().map(|&v| v.into()).collect(),
            Self::I32(data) => data.iter().map(|&v| v.into()).collect(),
            Self::U8(data) => data.iter().map(|&v| v.into()).collect(),
            Self::U16(data) => data.iter().map(|&v| v.into()).collect(),
            Self::U32(data) => data.iter().map(|&v| v.into()).collect(),
            Self::F32(data) => data.iter().map(|&v| v.into()).collect(),
            Self::F64(data) => data.clone(),
        }
    }
}

/// One-shot receiver for a result delivered through the callback path.
pub type ResultCallback<'cb> = Box<dyn FnOnce(Value) + 'cb>;

/// Single argument of a wrapped call.
pub enum Arg<'cb> {
    Value(Value),
    Callback(ResultCallback<'cb>),
}

impl<'cb> Arg<'cb> {
    /// Wraps a closure as a result callback argument.
    pub fn callback(callback: impl FnOnce(Value) + 'cb) -> Self {
        Self::Callback(Box::new(callback))
    }

    pub fn is_callback(&self) -> bool {
        matches!(self, Self::Callback(_))
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Callback(_) => f.write_str("Callback"),
        }
    }
}

macro_rules! arg_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg<'_> {
                fn from(value: $ty) -> Self {
                    Self::Value(value.into())
                }
            }
        )*
    };
}

arg_from!(Value, f64, i32, bool, &str, String, HeapArray);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_scalars() {
        assert_eq!(Value::from(true).as_f64(), Some(1.0));
        assert_eq!(Value::from(0.0).as_bool(), Some(false));
        assert_eq!(Value::from("svg").as_str(), Some("svg"));
        assert!(Value::from(3).as_str().is_none());
    }

    #[test]
    fn heap_arrays_report_type_codes() {
        let array = HeapArray::U16(vec![1, 2, 3]);
        assert_eq!(array.type_code(), "U16");
        assert_eq!(array.to_f64_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(Value::from(array).to_string(), "U16[3]");
    }

    #[test]
    fn callback_args_are_detected() {
        let arg = Arg::callback(|_| {});
        assert!(arg.is_callback());
        assert!(!Arg::from(1.5).is_callback());
    }
}
