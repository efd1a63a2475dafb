//! phpser - PHP `serialize()` wire format (the legacy serialized-object format).
//!
//! - parse.rs  - recursive-descent `unserialize` over raw bytes, returns `Result`, never panics
//! - encode.rs - `serialize` for `SerValue` (placeholder value, test fixtures)
//!
//! Grammar handled:
//!   N;  b:0;  i:-12;  d:0.5;  d:INF;  s:3:"abc";  S:1:"\61";
//!   a:<n>:{<key><value>...}   keys are i: or s:
//!   O:<len>:"<class>":<n>:{<key><value>...}
//!   C:<len>:"<class>":<len>:{<raw bytes>}
//!   E:<len>:"<class>:<case>";
//!   r:<n>;  R:<n>;   back references, 1-based into values seen so far

use std::fmt;

pub mod encode;
pub mod parse;

pub use encode::{empty_string_placeholder, serialize, serialize_str};
pub use parse::{is_valid, unserialize, Parser};

/// Array / object key.
#[derive(Clone, Debug, PartialEq)]
pub enum SerKey {
    Int(i64),
    Str(Vec<u8>),
}

/// Decoded value tree.
#[derive(Clone, Debug, PartialEq)]
pub enum SerValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Vec<u8>),
    Array(Vec<(SerKey, SerValue)>),
    Object {
        class: String,
        props: Vec<(SerKey, SerValue)>,
    },
    /// `C:` - class with its own Serializable payload, kept opaque.
    Custom {
        class: String,
        data: Vec<u8>,
    },
    Enum {
        class: String,
        case: String,
    },
    /// `r:` - object/value reference.
    Ref(usize),
    /// `R:` - PHP reference (`&$x`).
    RefHard(usize),
}

impl SerValue {
    pub fn str<S: AsRef<[u8]>>(s: S) -> Self {
        SerValue::Str(s.as_ref().to_vec())
    }
}

/// Failure of `unserialize`. The Display text is what ends up in the validation report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnserializeError {
    /// Grammar violation; `offset` is where the failing element starts.
    Malformed { offset: usize, len: usize },
    /// A complete value followed by extra bytes.
    TrailingData { offset: usize, len: usize },
    /// Nesting deeper than the parser's limit.
    DepthExceeded {
        max_depth: usize,
        offset: usize,
        len: usize,
    },
}

impl UnserializeError {
    pub fn offset(&self) -> usize {
        match *self {
            UnserializeError::Malformed { offset, .. }
            | UnserializeError::TrailingData { offset, .. }
            | UnserializeError::DepthExceeded { offset, .. } => offset,
        }
    }
}

impl fmt::Display for UnserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            UnserializeError::Malformed { offset, len } => {
                write!(f, "unserialize(): Error at offset {} of {} bytes", offset, len)
            }
            UnserializeError::TrailingData { offset, len } => write!(
                f,
                "unserialize(): Extra data starting at offset {} of {} bytes",
                offset, len
            ),
            UnserializeError::DepthExceeded {
                max_depth,
                offset,
                len,
            } => write!(
                f,
                "unserialize(): Maximum depth of {} exceeded at offset {} of {} bytes",
                max_depth, offset, len
            ),
        }
    }
}

impl std::error::Error for UnserializeError {}
