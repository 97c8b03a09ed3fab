//! Decoder for Ruby Marshal 4.8 streams, the serialization used by `.rvdata`/`.rvdata2` files.
//!
//! The decoder produces a plain [`Node`] tree. Classes are not instantiated: a typed object is
//! its class name plus its instance variables, and `_dump`-style blobs (e.g. `Table`) keep their
//! raw bytes.

mod reader;

pub use self::reader::{MAX_DEPTH, load};

use crate::utils::decode_legacy_text;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Raw string bytes; see [`Node::text`].
    String(Vec<u8>),
    Symbol(String),
    Array(Vec<Node>),
    /// Entries in stream order.
    Hash(Vec<(Node, Node)>),
    Object(RubyObject),
    UserData(UserData),
}

/// An object with named instance variables (names keep their `@` prefix).
#[derive(Debug, Clone, PartialEq)]
pub struct RubyObject {
    pub class_name: String,
    pub attributes: Vec<(String, Node)>,
}

/// Opaque bytes produced by a class's `_dump`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserData {
    pub class_name: String,
    pub data: Vec<u8>,
}

/// Named-attribute lookup shared by typed objects and hashes.
///
/// `name` matches either the bare name or its `@`-prefixed instance-variable form.
pub trait Attributes {
    fn attr(&self, name: &str) -> Option<&Node>;
}

fn matches_attr(candidate: &str, name: &str) -> bool {
    candidate == name || candidate.strip_prefix('@') == Some(name)
}

impl Attributes for RubyObject {
    fn attr(&self, name: &str) -> Option<&Node> {
        self.attributes
            .iter()
            .find(|(k, _)| matches_attr(k, name))
            .map(|(_, v)| v)
    }
}

impl Attributes for [(Node, Node)] {
    fn attr(&self, name: &str) -> Option<&Node> {
        self.iter()
            .find(|(k, _)| match k {
                Node::Symbol(s) => matches_attr(s, name),
                Node::String(raw) => matches_attr(&decode_legacy_text(raw), name),
                _ => false,
            })
            .map(|(_, v)| v)
    }
}

impl Attributes for Node {
    fn attr(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Object(obj) => obj.attr(name),
            Node::Hash(entries) => entries.as_slice().attr(name),
            _ => None,
        }
    }
}

impl Node {
    pub fn is_nil(&self) -> bool {
        matches!(self, Node::Nil)
    }

    /// Objects and hashes: anything with named attributes.
    pub fn is_record(&self) -> bool {
        matches!(self, Node::Object(_) | Node::Hash(_))
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Node::Object(obj) => Some(&obj.class_name),
            Node::UserData(data) => Some(&data.class_name),
            _ => None,
        }
    }

    /// Integer view: floats truncate, booleans are 0/1, numeric strings parse.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Node::Int(i) => Some(*i),
            Node::Float(f) if f.is_finite() => Some(*f as i64),
            Node::Bool(b) => Some(i64::from(*b)),
            Node::String(raw) => decode_legacy_text(raw).trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Node::Float(f) => Some(*f),
            Node::Int(i) => Some(*i as f64),
            Node::Bool(b) => Some(f64::from(u8::from(*b))),
            Node::String(raw) => decode_legacy_text(raw).trim().parse().ok(),
            _ => None,
        }
    }

    /// Truthiness of a flag field: `nil`, `false` and `0` are false.
    pub fn truthy(&self) -> bool {
        match self {
            Node::Nil | Node::Bool(false) => false,
            Node::Int(i) => *i != 0,
            _ => true,
        }
    }

    /// Text of strings (charset fallback applied) and symbols.
    pub fn text(&self) -> Option<String> {
        match self {
            Node::String(raw) => Some(decode_legacy_text(raw)),
            Node::Symbol(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(items) => Some(items),
            _ => None,
        }
    }
}
