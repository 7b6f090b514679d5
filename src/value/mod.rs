//! The UCL document model: a tagged value tree with insertion-ordered
//! objects, implicit arrays for duplicate keys, and deep comparison.

mod map;

use std::fmt;
use std::sync::Arc;

pub use map::ObjectMap;

/// Highest priority a value may carry; used by include merging.
pub const MAX_PRIORITY: u8 = 15;

/// String storage for parsed values.
///
/// `Owned` holds its own buffer; `Shared` references a range of the
/// parser's input, which is what zero-copy parsing produces for string
/// slices that need no unescaping.
#[derive(Clone)]
pub enum UclStr {
    Owned(Box<str>),
    Shared {
        src: Arc<str>,
        start: usize,
        end: usize,
    },
}

impl UclStr {
    pub fn owned(s: impl Into<String>) -> Self {
        UclStr::Owned(s.into().into_boxed_str())
    }

    pub(crate) fn shared(src: Arc<str>, start: usize, end: usize) -> Self {
        debug_assert!(src.get(start..end).is_some());
        UclStr::Shared { src, start, end }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UclStr::Owned(s) => s,
            UclStr::Shared { src, start, end } => &src[*start..*end],
        }
    }

    /// True when the buffer is borrowed from parser input.
    pub fn is_shared(&self) -> bool {
        matches!(self, UclStr::Shared { .. })
    }
}

impl fmt::Debug for UclStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for UclStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for UclStr {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for UclStr {}

impl From<&str> for UclStr {
    fn from(s: &str) -> Self {
        UclStr::owned(s)
    }
}

impl From<String> for UclStr {
    fn from(s: String) -> Self {
        UclStr::Owned(s.into_boxed_str())
    }
}

/// Hook for opaque host data carried inside a document tree. The parser
/// never produces these; hosts attach them and the emitter calls
/// [`Userdata::emit`] to serialize them as a string.
pub trait Userdata: fmt::Debug + Send + Sync {
    fn emit(&self) -> String;
}

/// The tag and payload of a value.
#[derive(Debug, Clone)]
pub enum ValueKind {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Time span in seconds; numerically a float with a distinct tag.
    Time(f64),
    String(UclStr),
    Array(Vec<Value>),
    Object(ObjectMap),
    Userdata(Arc<dyn Userdata>),
}

/// A node of the document tree: a [`ValueKind`] plus the merge priority
/// assigned by the chunk it was parsed from.
#[derive(Debug, Clone)]
pub struct Value {
    pub(crate) kind: ValueKind,
    pub(crate) priority: u8,
}

impl Value {
    pub fn null() -> Self {
        ValueKind::Null.into()
    }

    pub fn string(s: impl Into<UclStr>) -> Self {
        ValueKind::String(s.into()).into()
    }

    pub fn time(seconds: f64) -> Self {
        ValueKind::Time(seconds).into()
    }

    pub fn array(items: Vec<Value>) -> Self {
        ValueKind::Array(items).into()
    }

    pub fn object(map: ObjectMap) -> Self {
        ValueKind::Object(map).into()
    }

    pub fn userdata(data: Arc<dyn Userdata>) -> Self {
        ValueKind::Userdata(data).into()
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.min(MAX_PRIORITY);
        self
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ValueKind::Null => "null",
            ValueKind::Bool(_) => "boolean",
            ValueKind::Int(_) => "integer",
            ValueKind::Float(_) => "number",
            ValueKind::Time(_) => "time",
            ValueKind::String(_) => "string",
            ValueKind::Array(_) => "array",
            ValueKind::Object(_) => "object",
            ValueKind::Userdata(_) => "userdata",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, ValueKind::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ValueKind::Array(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, ValueKind::String(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Numeric view across `Int`, `Float` and `Time`.
    pub fn as_f64(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Int(i) => Some(i as f64),
            ValueKind::Float(f) | ValueKind::Time(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match &self.kind {
            ValueKind::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectMap> {
        match &mut self.kind {
            ValueKind::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Tag-dependent length: string byte count, array element count,
    /// object distinct-key count; zero for scalars.
    pub fn len(&self) -> usize {
        match &self.kind {
            ValueKind::String(s) => s.as_str().len(),
            ValueKind::Array(items) => items.len(),
            ValueKind::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descend objects along a dot-separated path of keys.
    pub fn lookup_path(&self, path: &str) -> Option<&Value> {
        let mut cur = self;
        for segment in path.split('.') {
            if segment.is_empty() {
                return None;
            }
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }
}

impl From<ValueKind> for Value {
    fn from(kind: ValueKind) -> Self {
        Value { kind, priority: 0 }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        ValueKind::Bool(b).into()
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        ValueKind::Int(i).into()
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        ValueKind::Int(i as i64).into()
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        ValueKind::Float(f).into()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

/// Deep structural equality. `Int`, `Float` and `Time` compare
/// numerically across tags; objects compare by key set and chains;
/// arrays element-wise. This is the relation used by `enum` and
/// `uniqueItems` in schema validation.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::Null, ValueKind::Null) => true,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            (ValueKind::Array(a), ValueKind::Array(b)) => a == b,
            (ValueKind::Object(a), ValueKind::Object(b)) => a == b,
            (ValueKind::Userdata(a), ValueKind::Userdata(b)) => Arc::ptr_eq(a, b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    fn test_accessors_dispatch_on_tag() {
        let v = Value::from(42);
        assert_eq!(v.as_i64(), Some(42));
        assert_eq!(v.as_f64(), Some(42.0));
        assert!(v.as_str().is_none());
        assert_eq!(v.type_name(), "integer");

        let v = Value::time(0.2);
        assert_eq!(v.type_name(), "time");
        assert_eq!(v.as_f64(), Some(0.2));
        assert!(v.as_i64().is_none());

        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.len(), 5);
    }

    #[rstest::rstest]
    fn test_priority_is_clamped() {
        let v = Value::null().with_priority(200);
        assert_eq!(v.priority(), MAX_PRIORITY);
    }

    #[rstest::rstest]
    fn test_numeric_tags_compare_across_kinds() {
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_eq!(Value::time(600.0), Value::from(600));
        assert_ne!(Value::from(1), Value::from(2.0));
        assert_ne!(Value::from(1), Value::from("1"));
    }

    #[rstest::rstest]
    fn test_deep_equality_of_containers() {
        let a = Value::array(vec![Value::from(1), Value::from("x")]);
        let b = Value::array(vec![Value::from(1.0), Value::from("x")]);
        assert_eq!(a, b);

        let mut m1 = ObjectMap::new();
        m1.insert("k", a);
        let mut m2 = ObjectMap::new();
        m2.insert("k", b);
        assert_eq!(Value::object(m1), Value::object(m2));
    }

    #[rstest::rstest]
    fn test_lookup_path() {
        let mut inner = ObjectMap::new();
        inner.insert("port", Value::from(8080));
        let mut outer = ObjectMap::new();
        outer.insert("server", Value::object(inner));
        let root = Value::object(outer);

        assert_eq!(
            root.lookup_path("server.port").and_then(|v| v.as_i64()),
            Some(8080)
        );
        assert!(root.lookup_path("server.host").is_none());
        assert!(root.lookup_path("").is_none());
    }

    #[rstest::rstest]
    fn test_shared_str_reads_from_source() {
        let src: Arc<str> = Arc::from("key = value");
        let s = UclStr::shared(src, 6, 11);
        assert_eq!(s.as_str(), "value");
        assert!(s.is_shared());
        assert_eq!(s, UclStr::owned("value"));
    }
}
