//! Row model: an ordered column -> value mapping as returned by a table store.

use std::fmt;

/// One cell value.
///
/// `Missing` is the false-sentinel: the column was requested but the store did not
/// return it for this row.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Missing,
    Text(String),
    Integer(i64),
    Real(f64),
    Blob(Vec<u8>),
}

impl Value {
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// NULL, the false-sentinel and "" are all "empty" for classification.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null | Value::Missing => true,
            Value::Text(s) => s.is_empty(),
            Value::Blob(b) => b.is_empty(),
            Value::Integer(_) | Value::Real(_) => false,
        }
    }

    /// Raw bytes used by the classifier. Numbers go through their text rendering.
    pub fn to_bytes(&self) -> Option<std::borrow::Cow<'_, [u8]>> {
        use std::borrow::Cow;
        match self {
            Value::Null | Value::Missing => None,
            Value::Text(s) => Some(Cow::Borrowed(s.as_bytes())),
            Value::Blob(b) => Some(Cow::Borrowed(b.as_slice())),
            Value::Integer(_) | Value::Real(_) => Some(Cow::Owned(self.to_string().into_bytes())),
        }
    }
}

/// Renders the value the way it appears in report lines (NULL and missing print as "").
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Missing => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Blob(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Ordered column -> value mapping. Column order is the order the store returned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append (used by stores and test fixtures).
    pub fn with<V: Into<Value>>(mut self, column: &str, value: V) -> Self {
        self.set(column, value.into());
        self
    }

    /// Value of `column`; `Value::Missing` when the row has no such column.
    pub fn get(&self, column: &str) -> &Value {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
            .unwrap_or(&Value::Missing)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|(c, _)| c == column)
    }

    /// Replace an existing column in place or append a new one.
    pub fn set(&mut self, column: &str, value: Value) {
        match self.columns.iter_mut().find(|(c, _)| c == column) {
            Some((_, v)) => *v = value,
            None => self.columns.push((column.to_string(), value)),
        }
    }

    /// Copy of this row with `column` replaced; the original stays untouched.
    pub fn replaced(&self, column: &str, value: Value) -> Row {
        let mut out = self.clone();
        out.set(column, value);
        out
    }

    /// Copy restricted to `columns`, in that order. Absent columns become `Missing`.
    pub fn project(&self, columns: &[&str]) -> Row {
        Row {
            columns: columns
                .iter()
                .map(|c| (c.to_string(), self.get(c).clone()))
                .collect(),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
