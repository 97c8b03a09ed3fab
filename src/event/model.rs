//! Typed views of canonical event records.
//!
//! Construction is lenient: a malformed command or page is skipped, a missing field takes its
//! default.

use serde_json::Value;

use crate::event::opcode::Opcode;
use crate::utils::ValueExt;

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub code: i64,
    pub indent: i64,
    pub parameters: Vec<Value>,
}

impl Command {
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Some(Command {
            code: value.int_or("code", 0),
            indent: value.int_or("indent", 0),
            parameters: value.list("parameters").to_vec(),
        })
    }

    pub fn opcode(&self) -> Opcode {
        Opcode::from_code(self.code)
    }

    pub fn list_from_value(list: &[Value]) -> Vec<Command> {
        list.iter().filter_map(Command::from_value).collect()
    }
}

/// Page appearance predicates. Each is `None` when inactive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Conditions {
    pub switch1: Option<i64>,
    pub switch2: Option<i64>,
    /// `(variable id, minimum value)`
    pub variable: Option<(i64, i64)>,
    pub self_switch: Option<String>,
    pub item: Option<i64>,
    pub actor: Option<i64>,
}

impl Conditions {
    pub fn from_value(value: &Value) -> Self {
        let active = |key: &str| value.bool_or(key, false);
        Conditions {
            switch1: active("switch1Valid").then(|| value.int_or("switch1Id", 0)),
            switch2: active("switch2Valid").then(|| value.int_or("switch2Id", 0)),
            variable: active("variableValid")
                .then(|| (value.int_or("variableId", 0), value.int_or("variableValue", 0))),
            self_switch: active("selfSwitchValid")
                .then(|| value.str_or("selfSwitchCh", "A").to_owned()),
            item: active("itemValid").then(|| value.int_or("itemId", 0)),
            actor: active("actorValid").then(|| value.int_or("actorId", 0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Conditions::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub trigger: i64,
    pub conditions: Conditions,
    /// The raw `image` record; snake_case keys from hand-converted data are accepted too.
    pub image: Value,
    pub list: Vec<Command>,
}

impl Page {
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Some(Page {
            trigger: value.int_or("trigger", 0),
            conditions: value
                .field("conditions")
                .map(Conditions::from_value)
                .unwrap_or_default(),
            image: value.field("image").cloned().unwrap_or(Value::Null),
            list: Command::list_from_value(value.list("list")),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub x: i64,
    pub y: i64,
    /// Pages by position; an unreadable page keeps its slot so numbering is preserved.
    pub pages: Vec<Option<Page>>,
}

impl Event {
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Some(Event {
            id: value.int_or("id", 0),
            name: value.str_or("name", "").to_owned(),
            x: value.int_or("x", 0),
            y: value.int_or("y", 0),
            pages: value.list("pages").iter().map(Page::from_value).collect(),
        })
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.pages.iter().flatten().flat_map(|page| page.list.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_from_value() {
        let raw = json!({
            "id": 4, "name": "Chest", "x": 1.0, "y": 2,
            "pages": [
                {"trigger": 0, "conditions": {"selfSwitchValid": true, "selfSwitchCh": "B"},
                 "list": [{"code": 125, "indent": 0, "parameters": [0, 0, 50]}, "junk"]},
                null
            ]
        });
        let event = Event::from_value(&raw).unwrap();

        assert_eq!(event.x, 1);
        assert_eq!(event.pages.len(), 2);
        assert!(event.pages[1].is_none());
        let page = event.pages[0].as_ref().unwrap();
        assert_eq!(page.conditions.self_switch.as_deref(), Some("B"));
        assert_eq!(page.conditions.switch1, None);
        assert_eq!(page.list.len(), 1);
        assert_eq!(page.list[0].opcode(), Opcode::ChangeGold);
    }
}
