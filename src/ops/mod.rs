//! Operation metadata and the registry seam.
//!
//! Operations themselves live in the host; the engine sees only
//! [`OperationDescriptor`] records and an opaque [`OperationRegistry::invoke`]
//! handle.  The registry must be deterministic: the same (name, args, input)
//! always yields the same output.  Host failures surface as [`OpError`] and
//! are never fatal to a search.

pub mod builtin;

use std::fmt;

use regex::bytes::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::buffer::ByteBuffer;

// ── Data types ───────────────────────────────────────────────────────────────

/// The declared input/output type of an operation, and the observed type of
/// a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    RawBytes,
    Utf8String,
    NumberString,
    ByteList,
}

impl DataType {
    /// Whether an operation declaring `self` as input accepts a buffer
    /// observed as `node`.  Raw bytes accept everything; text accepts text
    /// and numeric strings; the narrower types accept only themselves.
    pub fn accepts(self, node: DataType) -> bool {
        match self {
            DataType::RawBytes     => true,
            DataType::Utf8String   => matches!(node, DataType::Utf8String | DataType::NumberString),
            DataType::NumberString => node == DataType::NumberString,
            DataType::ByteList     => node == DataType::ByteList,
        }
    }

    /// Observe a buffer's type: a digit string with separators, arbitrary
    /// UTF-8 text, or raw bytes.
    pub fn detect(b: &ByteBuffer) -> DataType {
        match b.try_as_utf8() {
            None => DataType::RawBytes,
            Some(text) => {
                let mut saw_digit = false;
                let numberish = text.chars().all(|c| {
                    if c.is_ascii_digit() {
                        saw_digit = true;
                        true
                    } else {
                        c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':' | '+' | '-')
                    }
                });
                if saw_digit && numberish {
                    DataType::NumberString
                } else {
                    DataType::Utf8String
                }
            }
        }
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

/// One typed operation argument.  Opaque to the engine; only the host's
/// handler interprets it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OpArg {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl OpArg {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OpArg::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            OpArg::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for OpArg {
    fn from(s: &str) -> Self {
        OpArg::Str(s.to_string())
    }
}

impl From<i64> for OpArg {
    fn from(i: i64) -> Self {
        OpArg::Int(i)
    }
}

impl From<bool> for OpArg {
    fn from(b: bool) -> Self {
        OpArg::Bool(b)
    }
}

impl fmt::Display for OpArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpArg::Str(s)  => write!(f, "{s}"),
            OpArg::Int(i)  => write!(f, "{i}"),
            OpArg::Bool(b) => write!(f, "{b}"),
        }
    }
}

// ── Hints and descriptors ────────────────────────────────────────────────────

/// A catalogue-declared shortcut: when `pattern` matches a buffer, `args` is
/// a promising argument vector for the operation.  A useful hint also makes
/// a non-magic-useful operation worth exploring outside intensive mode.
#[derive(Debug, Clone)]
pub struct PatternHint {
    pub pattern: Regex,
    pub args:    Vec<OpArg>,
    pub useful:  bool,
}

impl PatternHint {
    pub fn new(pattern: &str, args: Vec<OpArg>, useful: bool) -> Result<Self, regex::Error> {
        Ok(Self { pattern: Regex::new(pattern)?, args, useful })
    }
}

/// Immutable catalogue entry for one operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    pub name:         String,
    pub input:        DataType,
    pub output:       DataType,
    pub default_args: Vec<OpArg>,
    /// Whether the operation is worth trying blind, without a hint match.
    pub magic_useful: bool,
    pub hints:        Vec<PatternHint>,
}

impl OperationDescriptor {
    pub fn new(name: &str, input: DataType, output: DataType) -> Self {
        Self {
            name: name.to_string(),
            input,
            output,
            default_args: Vec::new(),
            magic_useful: false,
            hints: Vec::new(),
        }
    }

    pub fn with_default_args(mut self, args: Vec<OpArg>) -> Self {
        self.default_args = args;
        self
    }

    pub fn useful(mut self, yes: bool) -> Self {
        self.magic_useful = yes;
        self
    }

    pub fn with_hint(mut self, hint: PatternHint) -> Self {
        self.hints.push(hint);
        self
    }

    /// The hints whose patterns match `bytes`, in declaration order.
    pub fn fired_hints(&self, bytes: &[u8]) -> Vec<&PatternHint> {
        self.hints.iter().filter(|h| h.pattern.is_match(bytes)).collect()
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum OpError {
    #[error("operation failed: {0}")]
    Failed(String),
    #[error("unsupported arguments: {0}")]
    UnsupportedArgs(String),
    #[error("input is not valid UTF-8")]
    NotUtf8,
    #[error("unknown operation: {0}")]
    Unknown(String),
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// The single seam between the engine and the host's operation set.
///
/// `descriptors()` must return a stable, ordered slice; registration order
/// is a ranking tiebreak.  `invoke` must be deterministic and must not
/// panic; failures are reported as [`OpError`] and cost the engine one
/// discarded child, nothing more.
pub trait OperationRegistry {
    fn descriptors(&self) -> &[OperationDescriptor];

    fn invoke(&self, name: &str, args: &[OpArg], input: &ByteBuffer)
        -> Result<ByteBuffer, OpError>;

    /// Operations whose declared input accepts a buffer of type `t`, with
    /// their registration indices.
    fn list_by_input_type(&self, t: DataType) -> Vec<(usize, &OperationDescriptor)> {
        self.descriptors()
            .iter()
            .enumerate()
            .filter(|(_, d)| d.input.accepts(t))
            .collect()
    }

    /// The default argument vector for `name`; stable across calls.
    fn default_args(&self, name: &str) -> Option<Vec<OpArg>> {
        self.descriptors()
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.default_args.clone())
    }

    /// Argument vectors implied by pattern hints firing against `input`.
    fn matching_hints(&self, name: &str, input: &ByteBuffer) -> Vec<Vec<OpArg>> {
        self.descriptors()
            .iter()
            .find(|d| d.name == name)
            .map(|d| {
                d.fired_hints(input.as_bytes())
                    .into_iter()
                    .map(|h| h.args.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Handler signature for [`TableRegistry`] operations.
pub type OpHandler = Box<dyn Fn(&[OpArg], &ByteBuffer) -> Result<ByteBuffer, OpError> + Send + Sync>;

/// A concrete registry backed by descriptor/handler pairs in registration
/// order.  Hosts with their own operation machinery implement
/// [`OperationRegistry`] directly instead.
#[derive(Default)]
pub struct TableRegistry {
    descriptors: Vec<OperationDescriptor>,
    handlers:    Vec<OpHandler>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, descriptor: OperationDescriptor, handler: F)
    where
        F: Fn(&[OpArg], &ByteBuffer) -> Result<ByteBuffer, OpError> + Send + Sync + 'static,
    {
        self.descriptors.push(descriptor);
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl OperationRegistry for TableRegistry {
    fn descriptors(&self) -> &[OperationDescriptor] {
        &self.descriptors
    }

    fn invoke(&self, name: &str, args: &[OpArg], input: &ByteBuffer)
        -> Result<ByteBuffer, OpError>
    {
        let idx = self
            .descriptors
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| OpError::Unknown(name.to_string()))?;
        (self.handlers[idx])(args, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_compat_matrix() {
        use DataType::*;
        assert!(RawBytes.accepts(RawBytes));
        assert!(RawBytes.accepts(Utf8String));
        assert!(RawBytes.accepts(ByteList));
        assert!(Utf8String.accepts(NumberString));
        assert!(!Utf8String.accepts(RawBytes));
        assert!(!NumberString.accepts(Utf8String));
        assert!(ByteList.accepts(ByteList));
        assert!(!ByteList.accepts(RawBytes));
    }

    #[test]
    fn detect_buffer_types() {
        assert_eq!(DataType::detect(&ByteBuffer::from("41 42 43 44 45")), DataType::NumberString);
        assert_eq!(DataType::detect(&ByteBuffer::from("hello world")), DataType::Utf8String);
        assert_eq!(DataType::detect(&ByteBuffer::from("")), DataType::Utf8String);
        assert_eq!(DataType::detect(&ByteBuffer::new(vec![0xFF, 0x00])), DataType::RawBytes);
        assert_eq!(DataType::detect(&ByteBuffer::from("de ad be ef")), DataType::Utf8String);
    }

    #[test]
    fn hints_fire_in_order() {
        let desc = OperationDescriptor::new("op", DataType::Utf8String, DataType::RawBytes)
            .with_hint(PatternHint::new("^aaa", vec!["first".into()], true).unwrap())
            .with_hint(PatternHint::new("aaa$", vec!["second".into()], false).unwrap());
        let fired = desc.fired_hints(b"aaa");
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].args[0], OpArg::Str("first".into()));
        assert!(fired[0].useful);
        assert!(!fired[1].useful);
    }

    #[test]
    fn table_registry_dispatch() {
        let mut reg = TableRegistry::new();
        reg.register(
            OperationDescriptor::new("Reverse", DataType::RawBytes, DataType::RawBytes)
                .useful(true),
            |_args, input| {
                let mut v = input.as_bytes().to_vec();
                v.reverse();
                Ok(ByteBuffer::new(v))
            },
        );

        let out = reg
            .invoke("Reverse", &[], &ByteBuffer::from("abc"))
            .unwrap();
        assert_eq!(out.as_bytes(), b"cba");

        assert!(matches!(
            reg.invoke("Missing", &[], &ByteBuffer::from("x")),
            Err(OpError::Unknown(_))
        ));

        let listed = reg.list_by_input_type(DataType::NumberString);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, 0);
        assert_eq!(reg.default_args("Reverse"), Some(Vec::new()));
    }
}
