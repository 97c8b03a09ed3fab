//! Map files and the event structures shared with common events.

use log::warn;
use serde_json::{Map, Value, json};

use crate::adapter::fields::{first, flag, int, list, text, to_plain};
use crate::marshal::Node;

/// `RPG::EventCommand` list → `[{code, indent, parameters}]`.
pub(crate) fn convert_commands(raw: &[Node]) -> Value {
    raw.iter()
        .filter(|cmd| cmd.is_record())
        .map(|cmd| {
            let parameters = match first(cmd, &["parameters"]).map(to_plain) {
                Some(Value::Array(params)) => params,
                _ => Vec::new(),
            };
            json!({
                "code": int(cmd, &["code"], 0),
                "indent": int(cmd, &["indent"], 0),
                "parameters": parameters,
            })
        })
        .collect()
}

fn convert_conditions(cond: Option<&Node>) -> Value {
    let cond = cond.unwrap_or(&Node::Nil);
    json!({
        "switch1Valid": flag(cond, &["switch1_valid", "switch1Valid"], false),
        "switch2Valid": flag(cond, &["switch2_valid", "switch2Valid"], false),
        "variableValid": flag(cond, &["variable_valid", "variableValid"], false),
        "selfSwitchValid": flag(cond, &["self_switch_valid", "selfSwitchValid"], false),
        "itemValid": flag(cond, &["item_valid", "itemValid"], false),
        "actorValid": flag(cond, &["actor_valid", "actorValid"], false),
        "switch1Id": int(cond, &["switch1_id", "switch1Id"], 0),
        "switch2Id": int(cond, &["switch2_id", "switch2Id"], 0),
        "variableId": int(cond, &["variable_id", "variableId"], 0),
        "variableValue": int(cond, &["variable_value", "variableValue"], 0),
        "selfSwitchCh": text(cond, &["self_switch_ch", "selfSwitchCh"], "A"),
        "itemId": int(cond, &["item_id", "itemId"], 0),
        "actorId": int(cond, &["actor_id", "actorId"], 0),
    })
}

fn convert_page_image(page: &Node) -> Value {
    let graphic = first(page, &["graphic", "image"]).unwrap_or(&Node::Nil);
    let character_name = text(graphic, &["character_name", "characterName"], "");
    let is_big = character_name.starts_with('$');
    json!({
        "tileId": int(graphic, &["tile_id", "tileId"], 0),
        "characterName": character_name,
        "characterIndex": int(graphic, &["character_index", "characterIndex"], 0),
        "direction": int(graphic, &["direction"], 2),
        "pattern": int(graphic, &["pattern"], 0),
        "isBigCharacter": is_big,
        "faceName": "",
        "faceIndex": 0,
    })
}

fn convert_page(page: &Node) -> Value {
    json!({
        "trigger": int(page, &["trigger"], 0),
        "conditions": convert_conditions(first(page, &["condition", "conditions"])),
        "image": convert_page_image(page),
        "list": convert_commands(list(page, &["list"])),
    })
}

fn convert_event(event: &Node) -> Value {
    let pages: Vec<Value> = list(event, &["pages"])
        .iter()
        .filter(|p| p.is_record())
        .map(convert_page)
        .collect();
    json!({
        "id": int(event, &["id"], 0),
        "name": text(event, &["name"], ""),
        "x": int(event, &["x"], 0),
        "y": int(event, &["y"], 0),
        "pages": pages,
    })
}

/// Highest id a sparse table may use; the editors cap every table far below this.
pub(crate) const MAX_SPARSE_ID: usize = 65_535;

/// Turns a sparse `id => record` hash into an array indexed by id.
///
/// Slot 0 and ids without a record are `null`. The hash key wins over the record's own id;
/// entries whose id is not positive or above [`MAX_SPARSE_ID`] are dropped.
pub(crate) fn sparse_to_dense(raw: &Node, convert: impl Fn(i64, &Node) -> Value) -> Value {
    let Node::Hash(entries) = raw else {
        return Value::Array(Vec::new());
    };

    let mut by_id: Vec<(usize, Value)> = Vec::with_capacity(entries.len());
    for (key, record) in entries {
        if !record.is_record() {
            continue;
        }
        let id = key.as_int().unwrap_or_else(|| int(record, &["id"], 0));
        let Ok(slot) = usize::try_from(id) else {
            continue;
        };
        if slot == 0 {
            continue;
        }
        if slot > MAX_SPARSE_ID {
            warn!("dropping record with out-of-range id {id}");
            continue;
        }
        by_id.push((slot, convert(id, record)));
    }

    let len = by_id.iter().map(|(slot, _)| slot + 1).max().unwrap_or(0);
    let mut dense = vec![Value::Null; len];
    for (slot, value) in by_id {
        dense[slot] = value;
    }
    Value::Array(dense)
}

pub(crate) fn convert_events(raw: &Node) -> Value {
    sparse_to_dense(raw, |id, event| {
        let mut converted = convert_event(event);
        converted["id"] = Value::from(id);
        converted
    })
}

fn convert_audio(raw: Option<&Node>) -> Value {
    match raw {
        Some(audio) if audio.is_record() => json!({
            "name": text(audio, &["name"], ""),
            "volume": int(audio, &["volume"], 100),
            "pitch": int(audio, &["pitch"], 100),
        }),
        _ => json!({"name": ""}),
    }
}

fn convert_encounters(raw: &Node) -> Value {
    list(raw, &["encounter_list", "encounterList"])
        .iter()
        .filter(|e| e.is_record())
        .map(|e| {
            let region_set = match first(e, &["region_set", "regionSet"]).map(to_plain) {
                Some(Value::Array(regions)) => regions,
                _ => Vec::new(),
            };
            json!({
                "troopId": int(e, &["troop_id", "troopId"], 0),
                "weight": int(e, &["weight"], 1),
                "regionSet": region_set,
            })
        })
        .collect()
}

/// `RPG::Map` → canonical map record.
pub(crate) fn convert_map(raw: &Node) -> Value {
    if !raw.is_record() {
        return Value::Object(Map::new());
    }

    let data = match first(raw, &["data"]).map(to_plain) {
        Some(Value::Array(tiles)) => tiles,
        _ => Vec::new(),
    };

    json!({
        "width": int(raw, &["width"], 0),
        "height": int(raw, &["height"], 0),
        "bgm": convert_audio(first(raw, &["bgm"])),
        "parallaxName": text(raw, &["parallax_name", "parallaxName"], ""),
        "tilesetId": int(raw, &["tileset_id", "tilesetId"], 0),
        "encounterStep": int(raw, &["encounter_step", "encounterStep"], 0),
        "encounterList": convert_encounters(raw),
        "events": convert_events(first(raw, &["events"]).unwrap_or(&Node::Nil)),
        "data": data,
    })
}
