use serde_json::Value;

use crate::utils::ValueExt;

/// Display form of a parameter as it would appear in a line of text.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(" / "),
        other => other.to_string(),
    }
}

/// Positional access to a command's parameter list with defaults for absent slots.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a>(&'a [Value]);

impl<'a> Params<'a> {
    pub fn new(values: &'a [Value]) -> Self {
        Params(values)
    }

    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.0.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The slot as an integer, when present and numeric.
    pub fn exact_int(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(ValueExt::as_int)
    }

    pub fn int_or(&self, index: usize, default: i64) -> i64 {
        self.exact_int(index).unwrap_or(default)
    }

    pub fn int(&self, index: usize) -> i64 {
        self.int_or(index, 0)
    }

    /// `true` when the slot is absent or zero; most toggles encode "on"/"add" as 0.
    pub fn is_zero(&self, index: usize) -> bool {
        self.int(index) == 0
    }

    pub fn truthy(&self, index: usize) -> bool {
        match self.get(index) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(v) => v.as_int().is_some_and(|i| i != 0),
            None => false,
        }
    }

    /// Rendered text of a present slot.
    pub fn text(&self, index: usize) -> Option<String> {
        self.get(index).map(render)
    }

    pub fn text_or(&self, index: usize, default: &str) -> String {
        self.text(index).unwrap_or_else(|| default.to_owned())
    }

    /// Name of an audio record (`{name, volume, pitch, pan}`), `?` when it has none.
    pub fn audio_name(&self, index: usize) -> Option<String> {
        self.get(index)
            .filter(|v| v.is_object())
            .map(|audio| audio.str_or("name", "?").to_owned())
    }

    /// A fixed-size integer tuple such as a tone or color, or `default` when the slot is not a list.
    pub fn ints<const N: usize>(&self, index: usize, default: [i64; N]) -> [i64; N] {
        let Some(Value::Array(items)) = self.get(index) else {
            return default;
        };
        let mut out = default;
        for (slot, value) in out.iter_mut().zip(items) {
            *slot = value.as_int().unwrap_or(0);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_absent_slots() {
        let raw = json!([1, "Hero", [10, -20, 30, 0], {"name": "Battle1"}, {"volume": 90}]);
        let p = Params::new(raw.as_array().unwrap());

        assert_eq!(p.int(0), 1);
        assert_eq!(p.int_or(9, 7), 7);
        assert!(p.is_zero(9));
        assert_eq!(p.text(1).as_deref(), Some("Hero"));
        assert_eq!(p.text(9), None);
        assert_eq!(p.ints(2, [0; 4]), [10, -20, 30, 0]);
        assert_eq!(p.ints(1, [255, 255, 255]), [255, 255, 255]);
        assert_eq!(p.audio_name(3).as_deref(), Some("Battle1"));
        assert_eq!(p.audio_name(4).as_deref(), Some("?"));
        assert_eq!(p.audio_name(1), None);
    }

    #[test]
    fn test_render_joins_lists() {
        assert_eq!(render(&json!(["Yes", "No"])), "Yes / No");
        assert_eq!(render(&json!(3)), "3");
        assert_eq!(render(&Value::Null), "");
    }
}
