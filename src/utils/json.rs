use serde_json::Value;

/// Lenient accessors over canonical JSON records.
///
/// Project exports are frequently inconsistent (floats where ints are expected, `null`
/// placeholders), so every accessor folds a missing or mistyped field into a default.
pub trait ValueExt {
    /// Interprets the value itself as an integer.
    fn as_int(&self) -> Option<i64>;

    /// A field that is present and not `null`.
    fn field(&self, key: &str) -> Option<&Value>;

    fn int_field(&self, key: &str) -> Option<i64> {
        self.field(key).and_then(ValueExt::as_int)
    }

    fn int_or(&self, key: &str, default: i64) -> i64 {
        self.int_field(key).unwrap_or(default)
    }

    fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.field(key).and_then(Value::as_str).unwrap_or(default)
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.field(key) {
            Some(Value::Bool(b)) => *b,
            Some(v) => v.as_int().map(|i| i != 0).unwrap_or(default),
            None => default,
        }
    }

    /// An array field, or an empty slice.
    fn list(&self, key: &str) -> &[Value] {
        self.field(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl ValueExt for Value {
    fn as_int(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_u64().map(|u| u as i64))
                .or_else(|| n.as_f64().map(|f| f as i64)),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_null())
    }
}
