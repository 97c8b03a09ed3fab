use log::trace;

use crate::err::{DeserializationError, DeserializationResult};
use crate::marshal::{Node, RubyObject, UserData};
use crate::utils::{ByteCursor, decode_legacy_text};

/// Deepest nesting accepted before a stream is rejected.
pub const MAX_DEPTH: usize = 256;

/// Most nodes a stream may expand to, counting every copy an object link produces.
pub const MAX_NODES: usize = 4_000_000;

const MAJOR_VERSION: u8 = 4;
const MAX_MINOR_VERSION: u8 = 8;

/// Decodes a complete Marshal stream.
pub fn load(data: &[u8]) -> DeserializationResult<Node> {
    let mut reader = MarshalReader::new(data);
    reader.read_header()?;
    reader.read_value(0)
}

struct MarshalReader<'a> {
    cursor: ByteCursor<'a>,
    symbols: Vec<String>,
    /// Objects in registration order with their node counts; `None` while still being decoded.
    objects: Vec<Option<(Node, usize)>>,
    nodes: usize,
}

impl<'a> MarshalReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        MarshalReader {
            cursor: ByteCursor::new(data),
            symbols: Vec::new(),
            objects: Vec::new(),
            nodes: 0,
        }
    }

    fn read_header(&mut self) -> DeserializationResult<()> {
        let major = self.cursor.u8_named("marshal major version")?;
        let minor = self.cursor.u8_named("marshal minor version")?;
        if major != MAJOR_VERSION || minor > MAX_MINOR_VERSION {
            return Err(DeserializationError::UnsupportedVersion { major, minor });
        }
        Ok(())
    }

    fn reserve(&mut self) -> usize {
        self.objects.push(None);
        self.objects.len() - 1
    }

    /// `start` is the node count before the object's tag was read.
    fn register(&mut self, index: usize, start: usize, node: Node) -> Node {
        self.objects[index] = Some((node.clone(), self.nodes - start));
        node
    }

    fn resolve_link(&mut self, index: i64, offset: u64) -> DeserializationResult<Node> {
        let slot = usize::try_from(index)
            .ok()
            .filter(|&i| i < self.objects.len())
            .ok_or(DeserializationError::InvalidObjectLink { index, offset })?;
        // Self-referencing structure, still under construction.
        let Some(size) = self.objects[slot].as_ref().map(|(_, size)| *size) else {
            return Ok(Node::Nil);
        };
        self.charge(size, offset)?;
        Ok(self.objects[slot]
            .as_ref()
            .map_or(Node::Nil, |(node, _)| node.clone()))
    }

    fn charge(&mut self, count: usize, offset: u64) -> DeserializationResult<()> {
        self.nodes = self.nodes.saturating_add(count);
        if self.nodes > MAX_NODES {
            return Err(DeserializationError::TooLarge {
                offset,
                limit: MAX_NODES,
            });
        }
        Ok(())
    }

    fn read_fixnum(&mut self) -> DeserializationResult<i64> {
        let c = self.cursor.i8_named("fixnum")?;
        let value = match c {
            0 => 0,
            5..=127 => i64::from(c) - 5,
            -128..=-5 => i64::from(c) + 5,
            1..=4 => self
                .cursor
                .take_bytes(c as usize, "fixnum bytes")?
                .iter()
                .rev()
                .fold(0i64, |acc, &b| (acc << 8) | i64::from(b)),
            _ => {
                let n = c.unsigned_abs() as usize;
                let unsigned = self
                    .cursor
                    .take_bytes(n, "fixnum bytes")?
                    .iter()
                    .rev()
                    .fold(0i64, |acc, &b| (acc << 8) | i64::from(b));
                unsigned - (1i64 << (8 * n))
            }
        };
        Ok(value)
    }

    fn read_len(&mut self, what: &'static str) -> DeserializationResult<usize> {
        let offset = self.cursor.position();
        let len = self.read_fixnum()?;
        usize::try_from(len).map_err(|_| DeserializationError::NegativeLength {
            what,
            length: len,
            offset,
        })
    }

    fn read_bytes(&mut self, what: &'static str) -> DeserializationResult<&'a [u8]> {
        let len = self.read_fixnum()?;
        self.cursor.take_len_prefixed(len, what)
    }

    fn read_symbol_body(&mut self) -> DeserializationResult<String> {
        let name = decode_legacy_text(self.read_bytes("symbol")?);
        self.symbols.push(name.clone());
        Ok(name)
    }

    fn read_symbol_link(&mut self) -> DeserializationResult<String> {
        let offset = self.cursor.position();
        let index = self.read_fixnum()?;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.symbols.get(i))
            .cloned()
            .ok_or(DeserializationError::InvalidSymbolLink { index, offset })
    }

    /// Reads a symbol in a position where only a symbol may appear (class and ivar names).
    fn read_symbol(&mut self, depth: usize) -> DeserializationResult<String> {
        let offset = self.cursor.position();
        match self.cursor.u8_named("symbol tag")? {
            b':' => self.read_symbol_body(),
            b';' => self.read_symbol_link(),
            b'I' => {
                let name = self.read_symbol(depth)?;
                self.skip_ivars(depth)?;
                Ok(name)
            }
            tag => Err(DeserializationError::ExpectedSymbol { tag, offset }),
        }
    }

    fn skip_ivars(&mut self, depth: usize) -> DeserializationResult<()> {
        let count = self.read_len("instance variable count")?;
        for _ in 0..count {
            self.read_symbol(depth)?;
            self.read_value(depth + 1)?;
        }
        Ok(())
    }

    fn read_pairs(&mut self, depth: usize) -> DeserializationResult<Vec<(String, Node)>> {
        let count = self.read_len("attribute count")?;
        let mut attributes = Vec::with_capacity(count.min(self.cursor.remaining()));
        for _ in 0..count {
            let name = self.read_symbol(depth)?;
            let value = self.read_value(depth + 1)?;
            attributes.push((name, value));
        }
        Ok(attributes)
    }

    fn read_float(&mut self) -> DeserializationResult<f64> {
        let offset = self.cursor.position();
        let raw = self.read_bytes("float")?;
        // Old streams append mantissa bytes after a NUL.
        let raw = raw.split(|&b| b == 0).next().unwrap_or(raw);
        let text = String::from_utf8_lossy(raw);

        match text.as_ref() {
            "nan" => Ok(f64::NAN),
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            s => s.parse().map_err(|_| DeserializationError::InvalidFloat {
                text: s.to_owned(),
                offset,
            }),
        }
    }

    fn read_bignum(&mut self) -> DeserializationResult<Node> {
        let sign = self.cursor.u8_named("bignum sign")?;
        let shorts = self.read_len("bignum length")?;
        let bytes = self
            .cursor
            .take_bytes(shorts.saturating_mul(2), "bignum bytes")?;

        let magnitude = bytes
            .iter()
            .rev()
            .fold(0f64, |acc, &b| acc * 256.0 + f64::from(b));
        let magnitude = if sign == b'-' { -magnitude } else { magnitude };

        if magnitude.abs() < 9.007_199_254_740_992e15 {
            Ok(Node::Int(magnitude as i64))
        } else {
            Ok(Node::Float(magnitude))
        }
    }

    fn read_value(&mut self, depth: usize) -> DeserializationResult<Node> {
        let offset = self.cursor.position();
        if depth > MAX_DEPTH {
            return Err(DeserializationError::TooDeep {
                offset,
                limit: MAX_DEPTH,
            });
        }

        let start = self.nodes;
        self.charge(1, offset)?;

        let tag = self.cursor.u8_named("type tag")?;
        let node = match tag {
            b'0' => Node::Nil,
            b'T' => Node::Bool(true),
            b'F' => Node::Bool(false),
            b'i' => Node::Int(self.read_fixnum()?),
            b':' => Node::Symbol(self.read_symbol_body()?),
            b';' => Node::Symbol(self.read_symbol_link()?),
            b'@' => {
                let index = self.read_fixnum()?;
                self.resolve_link(index, offset)?
            }
            b'I' => {
                let node = self.read_value(depth + 1)?;
                self.skip_ivars(depth)?;
                node
            }
            b'e' | b'C' => {
                let _wrapper = self.read_symbol(depth)?;
                self.read_value(depth + 1)?
            }
            b'"' => {
                let index = self.reserve();
                let raw = self.read_bytes("string")?.to_vec();
                self.register(index, start, Node::String(raw))
            }
            b'f' => {
                let index = self.reserve();
                let value = self.read_float()?;
                self.register(index, start, Node::Float(value))
            }
            b'l' => {
                let index = self.reserve();
                let value = self.read_bignum()?;
                self.register(index, start, value)
            }
            b'/' => {
                let index = self.reserve();
                let source = self.read_bytes("regexp")?.to_vec();
                let _options = self.cursor.u8_named("regexp options")?;
                self.register(index, start, Node::String(source))
            }
            b'c' | b'm' | b'M' => {
                let index = self.reserve();
                let name = decode_legacy_text(self.read_bytes("class name")?);
                self.register(index, start, Node::Symbol(name))
            }
            b'[' => {
                let index = self.reserve();
                let count = self.read_len("array length")?;
                let mut items = Vec::with_capacity(count.min(self.cursor.remaining()));
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                self.register(index, start, Node::Array(items))
            }
            b'{' | b'}' => {
                let index = self.reserve();
                let count = self.read_len("hash length")?;
                let mut entries = Vec::with_capacity(count.min(self.cursor.remaining()));
                for _ in 0..count {
                    let key = self.read_value(depth + 1)?;
                    let value = self.read_value(depth + 1)?;
                    entries.push((key, value));
                }
                if tag == b'}' {
                    let _default = self.read_value(depth + 1)?;
                }
                self.register(index, start, Node::Hash(entries))
            }
            b'o' | b'S' => {
                let index = self.reserve();
                let class_name = self.read_symbol(depth)?;
                let attributes = self.read_pairs(depth)?;
                self.register(
                    index,
                    start,
                    Node::Object(RubyObject {
                        class_name,
                        attributes,
                    }),
                )
            }
            b'u' => {
                let class_name = self.read_symbol(depth)?;
                let data = self.read_bytes("user data")?.to_vec();
                let index = self.reserve();
                self.register(index, start, Node::UserData(UserData { class_name, data }))
            }
            b'U' | b'd' => {
                let index = self.reserve();
                let class_name = self.read_symbol(depth)?;
                let data = self.read_value(depth + 1)?;
                self.register(
                    index,
                    start,
                    Node::Object(RubyObject {
                        class_name,
                        attributes: vec![("data".to_owned(), data)],
                    }),
                )
            }
            tag => return Err(DeserializationError::UnknownTag { tag, offset }),
        };

        trace!("offset {offset}: tag `{}`", tag as char);
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::Attributes;
    use pretty_assertions::assert_eq;

    fn marshal(body: &[u8]) -> Vec<u8> {
        let mut out = vec![4, 8];
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_empty_array() {
        assert_eq!(load(b"\x04\x08[\x00").unwrap(), Node::Array(vec![]));
    }

    #[test]
    fn test_fixnum_encodings() {
        let cases: &[(&[u8], i64)] = &[
            (b"i\x00", 0),
            (b"i\x06", 1),
            (b"i\xfa", -1),
            (b"i\x7f", 122),
            (b"i\x01\xc8", 200),
            (b"i\xff\x38", -200),
            (b"i\x02\xe8\x03", 1000),
            (b"i\xfe\x18\xfc", -1000),
        ];
        for (body, expected) in cases {
            assert_eq!(load(&marshal(body)).unwrap(), Node::Int(*expected), "{body:?}");
        }
    }

    #[test]
    fn test_typed_object_with_encoded_string() {
        let node =
            load(&marshal(b"o:\x0eRPG::Item\x07:\x08@idi\x06:\x0a@nameI\"\x0bPotion\x06:\x06ET"))
                .unwrap();

        assert_eq!(node.class_name(), Some("RPG::Item"));
        assert_eq!(node.attr("id"), Some(&Node::Int(1)));
        assert_eq!(node.attr("name").and_then(Node::text).as_deref(), Some("Potion"));
    }

    #[test]
    fn test_symbol_and_object_links() {
        assert_eq!(
            load(&marshal(b"[\x07:\x06a;\x00")).unwrap(),
            Node::Array(vec![Node::Symbol("a".into()), Node::Symbol("a".into())])
        );
        assert_eq!(
            load(&marshal(b"[\x07I\"\x06a\x06:\x06ET@\x06")).unwrap(),
            Node::Array(vec![Node::String(b"a".to_vec()), Node::String(b"a".to_vec())])
        );
    }

    #[test]
    fn test_sparse_hash_and_user_data() {
        let node = load(&marshal(b"{\x07i\x0ai\x06i\x07i\x07")).unwrap();
        assert_eq!(
            node,
            Node::Hash(vec![(Node::Int(5), Node::Int(1)), (Node::Int(2), Node::Int(2))])
        );

        let node = load(&marshal(b"u:\x0aTable\x0a\x01\x02\x03\x04\x05")).unwrap();
        assert_eq!(
            node,
            Node::UserData(UserData {
                class_name: "Table".into(),
                data: vec![1, 2, 3, 4, 5]
            })
        );
    }

    #[test]
    fn test_floats() {
        assert_eq!(load(&marshal(b"f\x081.5")).unwrap(), Node::Float(1.5));
        assert_eq!(load(&marshal(b"f\x08inf")).unwrap(), Node::Float(f64::INFINITY));
        assert!(matches!(
            load(&marshal(b"f\x08abc")),
            Err(DeserializationError::InvalidFloat { .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_streams() {
        assert!(matches!(
            load(b"\x04\x09[\x00"),
            Err(DeserializationError::UnsupportedVersion { major: 4, minor: 9 })
        ));
        assert!(matches!(
            load(&marshal(b"[\x07i\x06")),
            Err(DeserializationError::Truncated { .. })
        ));
        assert!(matches!(
            load(&marshal(b"Z")),
            Err(DeserializationError::UnknownTag { tag: b'Z', .. })
        ));
        assert!(matches!(
            load(&marshal(b";\x06")),
            Err(DeserializationError::InvalidSymbolLink { index: 1, .. })
        ));

        let mut deep = b"[\x06".repeat(MAX_DEPTH + 8);
        deep.push(b'0');
        assert!(matches!(
            load(&marshal(&deep)),
            Err(DeserializationError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_rejects_link_amplification() {
        // a0 = [], a_k = [a_{k-1}, a_{k-1}] through object links; object 0 is the outer array.
        let levels = 24u8;
        let mut body = vec![b'[', levels + 1 + 5, b'[', 0];
        for k in 1..=levels {
            body.extend_from_slice(&[b'[', 7, b'@', k + 5]);
        }
        assert!(matches!(
            load(&marshal(&body)),
            Err(DeserializationError::TooLarge { limit: MAX_NODES, .. })
        ));

        // A few levels of sharing stay well within the limit.
        let node = load(&marshal(b"[\x08[\x00[\x07@\x06@\x06[\x07@\x07@\x07")).unwrap();
        match node {
            Node::Array(items) => assert_eq!(items[2], Node::Array(vec![items[1].clone(), items[1].clone()])),
            other => panic!("expected an array, got {other:?}"),
        }
    }
}
