pub(crate) mod byte_cursor;
pub(crate) mod bytes;
mod json;
mod text;

pub(crate) use self::byte_cursor::ByteCursor;
pub use self::json::ValueExt;
pub use self::text::decode_legacy_text;

/// Hash map used for id and name tables.
pub type FastMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// Hash set counterpart of [`FastMap`].
pub type FastSet<K> = hashbrown::HashSet<K, ahash::RandomState>;
