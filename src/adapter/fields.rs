//! Attribute lookup with alias lists and defaults, plus the generic node → JSON conversion.

use serde_json::{Map, Number, Value};

use crate::marshal::{Attributes, Node};
use crate::utils::bytes;

/// First alias whose value is present and not `nil`.
pub(crate) fn first<'a>(node: &'a Node, names: &[&str]) -> Option<&'a Node> {
    names
        .iter()
        .filter_map(|name| node.attr(name))
        .find(|v| !v.is_nil())
}

pub(crate) fn int(node: &Node, names: &[&str], default: i64) -> i64 {
    first(node, names).and_then(Node::as_int).unwrap_or(default)
}

pub(crate) fn float(node: &Node, names: &[&str], default: f64) -> f64 {
    first(node, names).and_then(Node::as_float).unwrap_or(default)
}

pub(crate) fn flag(node: &Node, names: &[&str], default: bool) -> bool {
    first(node, names).map(Node::truthy).unwrap_or(default)
}

pub(crate) fn text(node: &Node, names: &[&str], default: &str) -> String {
    match first(node, names) {
        Some(v) => v.text().unwrap_or_else(|| plain_scalar_text(v)),
        None => default.to_owned(),
    }
}

fn plain_scalar_text(node: &Node) -> String {
    match node {
        Node::Int(i) => i.to_string(),
        Node::Float(f) => f.to_string(),
        Node::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Array attribute, or an empty slice.
pub(crate) fn list<'a>(node: &'a Node, names: &[&str]) -> &'a [Node] {
    first(node, names).and_then(Node::as_array).unwrap_or(&[])
}

/// Integer list from an array or a `Table` blob.
pub(crate) fn int_list(node: &Node, names: &[&str]) -> Vec<i64> {
    match first(node, names) {
        Some(Node::Array(items)) => items.iter().filter_map(Node::as_int).collect(),
        Some(Node::UserData(blob)) if blob.class_name == "Table" => decode_table(&blob.data),
        _ => Vec::new(),
    }
}

pub(crate) fn text_list(node: &Node, names: &[&str]) -> Vec<String> {
    list(node, names)
        .iter()
        .map(|v| v.text().unwrap_or_default())
        .collect()
}

pub(crate) fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Decodes a `Table` blob: five little-endian `u32` header fields, the last being the element
/// count, followed by that many `i16` samples.
///
/// A blob shorter than its header claims yields as many samples as it actually holds.
pub fn decode_table(data: &[u8]) -> Vec<i64> {
    const HEADER_LEN: usize = 20;

    let Some(declared) = bytes::read_u32_le(data, 16) else {
        return Vec::new();
    };

    let available = (data.len() - HEADER_LEN) / 2;
    let count = (declared as usize).min(available);

    (0..count)
        .filter_map(|i| bytes::read_i16_le(data, HEADER_LEN + i * 2))
        .map(i64::from)
        .collect()
}

fn plain_key(key: &Node) -> String {
    match key {
        Node::String(_) | Node::Symbol(_) => key.text().unwrap_or_default(),
        Node::Int(i) => i.to_string(),
        other => to_plain(other).to_string(),
    }
}

/// Generic conversion for tables without a dedicated converter.
///
/// Objects become maps keyed by attribute name without the `@`, hashes become maps with
/// stringified keys, `Table` blobs become integer arrays and other blobs become `null`.
pub fn to_plain(node: &Node) -> Value {
    match node {
        Node::Nil => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Int(i) => Value::from(*i),
        Node::Float(f) => float_value(*f),
        Node::String(_) | Node::Symbol(_) => Value::String(node.text().unwrap_or_default()),
        Node::Array(items) => Value::Array(items.iter().map(to_plain).collect()),
        Node::Hash(entries) => Value::Object(
            entries
                .iter()
                .map(|(k, v)| (plain_key(k), to_plain(v)))
                .collect::<Map<_, _>>(),
        ),
        Node::Object(obj) => Value::Object(
            obj.attributes
                .iter()
                .map(|(k, v)| (k.trim_start_matches('@').to_owned(), to_plain(v)))
                .collect::<Map<_, _>>(),
        ),
        Node::UserData(blob) if blob.class_name == "Table" => {
            Value::Array(decode_table(&blob.data).into_iter().map(Value::from).collect())
        }
        Node::UserData(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::{RubyObject, UserData};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table(header_count: u32, samples: &[i16]) -> Vec<u8> {
        let mut data = Vec::new();
        for field in [2u32, samples.len() as u32, 1, 1, header_count] {
            data.extend(field.to_le_bytes());
        }
        for s in samples {
            data.extend(s.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_decode_table() {
        assert_eq!(decode_table(&table(3, &[1, -2, 300])), vec![1, -2, 300]);
        // Header claims more than the blob holds.
        assert_eq!(decode_table(&table(10, &[7, 8])), vec![7, 8]);
        assert_eq!(decode_table(&[0u8; 12]), Vec::<i64>::new());
    }

    #[test]
    fn test_alias_lookup_prefers_earlier_names() {
        let node = Node::Object(RubyObject {
            class_name: "RPG::Skill".into(),
            attributes: vec![
                ("@success_rate".into(), Node::Nil),
                ("@hit".into(), Node::Int(95)),
                ("@name".into(), Node::String(b"Fire".to_vec())),
            ],
        });
        assert_eq!(int(&node, &["success_rate", "successRate", "hit"], 100), 95);
        assert_eq!(int(&node, &["repeats"], 1), 1);
        assert_eq!(text(&node, &["name"], ""), "Fire");
        assert_eq!(text(&node, &["description"], "?"), "?");
    }

    #[test]
    fn test_to_plain() {
        let node = Node::Object(RubyObject {
            class_name: "RPG::Map".into(),
            attributes: vec![
                ("@width".into(), Node::Int(2)),
                (
                    "@data".into(),
                    Node::UserData(UserData {
                        class_name: "Table".into(),
                        data: table(2, &[5, 6]),
                    }),
                ),
                (
                    "@events".into(),
                    Node::Hash(vec![(Node::Int(1), Node::Symbol("x".into()))]),
                ),
                ("@rate".into(), Node::Float(f64::NAN)),
            ],
        });
        assert_eq!(
            to_plain(&node),
            json!({"width": 2, "data": [5, 6], "events": {"1": "x"}, "rate": null})
        );
    }
}
