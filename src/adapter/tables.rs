//! Converters for the database tables (`Items`, `Skills`, `System`, ...).

use serde_json::{Map, Value, json};

use crate::adapter::fields::{
    first, flag, float, float_value, int, int_list, list, text, text_list, to_plain,
};
use crate::adapter::map::{convert_commands, sparse_to_dense};
use crate::marshal::Node;

type Record = Map<String, Value>;

pub(crate) const DEFAULT_EQUIP_TYPES: [&str; 6] =
    ["", "Weapon", "Shield", "Head", "Body", "Accessory"];

/// Scalar stat names, in the order of the 8-slot `params` vector.
const PARAM_ALIASES: [&[&str]; 8] = [
    &["maxhp", "mhp"],
    &["maxsp", "maxmp", "mmp"],
    &["atk", "str"],
    &["def", "vit"],
    &["mat", "spi", "int"],
    &["mdf"],
    &["agi", "dex"],
    &["luk"],
];

fn base_record(item: &Node, index: usize) -> Record {
    let mut record = Map::new();
    record.insert("id".into(), int(item, &["id"], index as i64).into());
    record.insert("name".into(), text(item, &["name"], "").into());
    record.insert("description".into(), text(item, &["description"], "").into());
    record.insert(
        "iconIndex".into(),
        int(item, &["icon_index", "iconIndex"], 0).into(),
    );
    record.insert("note".into(), text(item, &["note"], "").into());
    record
}

fn extend(record: &mut Record, extra: Value) {
    if let Value::Object(extra) = extra {
        record.extend(extra);
    }
}

/// Converts an array table slot by slot. `nil` slots stay `null`, records get the common
/// fields plus whatever `extra` returns.
fn named_list(raw: &Node, extra: impl Fn(&Node) -> Value) -> Value {
    let Some(items) = raw.as_array() else {
        return Value::Array(Vec::new());
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Node::Nil => Value::Null,
            item if item.is_record() => {
                let mut record = base_record(item, index);
                extend(&mut record, extra(item));
                Value::Object(record)
            }
            other => to_plain(other),
        })
        .collect()
}

/// The 8-slot stat vector, synthesized from scalar fields when no vector is stored.
pub(crate) fn params(item: &Node) -> Vec<i64> {
    let mut values = int_list(item, &["params"]);
    if !values.is_empty() {
        values.resize(8, 0);
        return values;
    }
    PARAM_ALIASES
        .iter()
        .map(|names| int(item, names, 0))
        .collect()
}

fn traits(item: &Node) -> Value {
    list(item, &["features", "traits"])
        .iter()
        .filter(|t| t.is_record())
        .map(|t| {
            json!({
                "code": int(t, &["code"], 0),
                "dataId": int(t, &["data_id", "dataId"], 0),
                "value": float_value(float(t, &["value"], 0.0)),
            })
        })
        .collect()
}

fn effects(item: &Node) -> Value {
    list(item, &["effects"])
        .iter()
        .filter(|e| e.is_record())
        .map(|e| {
            json!({
                "code": int(e, &["code"], 0),
                "dataId": int(e, &["data_id", "dataId"], 0),
                "value1": float_value(float(e, &["value1"], 0.0)),
                "value2": float_value(float(e, &["value2"], 0.0)),
            })
        })
        .collect()
}

fn plain_list(node: Option<&Node>) -> Value {
    match node.map(to_plain) {
        Some(list @ Value::Array(_)) => list,
        _ => Value::Array(Vec::new()),
    }
}

pub(crate) fn convert_items(raw: &Node) -> Value {
    named_list(raw, |item| {
        let mut itype_id = int(item, &["itype_id", "itypeId"], 0);
        if itype_id <= 0 {
            itype_id = if int(item, &["kind"], 0) == 1 { 2 } else { 1 };
        }
        json!({
            "price": int(item, &["price"], 0),
            "itypeId": itype_id,
            "consumable": flag(item, &["consumable"], true),
            "scope": int(item, &["scope"], 0),
            "effects": effects(item),
            "params": params(item),
            "traits": traits(item),
        })
    })
}

pub(crate) fn convert_weapons(raw: &Node) -> Value {
    named_list(raw, |item| {
        json!({
            "price": int(item, &["price"], 0),
            "wtypeId": int(item, &["wtype_id", "wtypeId"], 0),
            "etypeId": int(item, &["etype_id", "etypeId"], 1),
            "params": params(item),
            "traits": traits(item),
        })
    })
}

pub(crate) fn convert_armors(raw: &Node) -> Value {
    named_list(raw, |item| {
        json!({
            "price": int(item, &["price"], 0),
            "atypeId": int(item, &["atype_id", "atypeId"], 0),
            "etypeId": int(item, &["etype_id", "etypeId"], 2),
            "params": params(item),
            "traits": traits(item),
        })
    })
}

fn convert_drop(drop: &Node) -> Value {
    let kind = int(drop, &["kind"], 0);
    // Older drops keep a separate id field per kind.
    let legacy_id = match kind {
        1 => "item_id",
        2 => "weapon_id",
        3 => "armor_id",
        _ => "",
    };
    json!({
        "kind": kind,
        "dataId": int(drop, &["data_id", "dataId", legacy_id], 0),
        "denominator": int(drop, &["denominator"], 1).max(1),
    })
}

/// Structured drop list first, then the older `drop_item1`/`drop_item2` fields.
fn drop_items(item: &Node) -> Value {
    let structured = list(item, &["drop_items", "dropItems"])
        .iter()
        .filter(|d| d.is_record());
    let legacy = ["drop_item1", "drop_item2"]
        .into_iter()
        .filter_map(|name| first(item, &[name]))
        .filter(|d| d.is_record());

    structured.chain(legacy).map(convert_drop).collect()
}

fn enemy_actions(item: &Node) -> Value {
    list(item, &["actions"])
        .iter()
        .filter(|a| a.is_record())
        .map(|a| {
            json!({
                "skillId": int(a, &["skill_id", "skillId"], 0),
                "rating": int(a, &["rating"], 5),
                "conditionType": int(a, &["condition_type", "conditionType"], 0),
                "conditionParam1": float_value(float(a, &["condition_param1", "conditionParam1"], 0.0)),
                "conditionParam2": float_value(float(a, &["condition_param2", "conditionParam2"], 0.0)),
            })
        })
        .collect()
}

pub(crate) fn convert_enemies(raw: &Node) -> Value {
    named_list(raw, |item| {
        json!({
            "params": params(item),
            "exp": int(item, &["exp"], 0),
            "gold": int(item, &["gold"], 0),
            "battlerName": text(item, &["battler_name", "battlerName"], ""),
            "battlerHue": int(item, &["battler_hue", "battlerHue"], 0),
            "dropItems": drop_items(item),
            "actions": enemy_actions(item),
            "traits": traits(item),
        })
    })
}

pub(crate) fn convert_skills(raw: &Node) -> Value {
    named_list(raw, |item| {
        let damage = first(item, &["damage"]).filter(|d| d.is_record());
        let legacy_damage = match damage {
            Some(_) => Value::Null,
            None => json!({
                "baseDamage": int(item, &["base_damage", "baseDamage"], 0),
                "atkF": int(item, &["atk_f", "atkF"], 0),
                "spiF": int(item, &["spi_f", "mat_f", "spiF"], 0),
                "variance": int(item, &["variance"], 0),
                "elementSet": plain_list(first(item, &["element_set", "elementSet"])),
            }),
        };
        let damage = match damage {
            Some(d) => json!({
                "type": int(d, &["type"], 0),
                "elementId": int(d, &["element_id", "elementId"], 0),
                "formula": text(d, &["formula"], ""),
                "variance": int(d, &["variance"], 0),
                "critical": flag(d, &["critical"], false),
            }),
            None => json!({}),
        };

        json!({
            "stypeId": int(item, &["stype_id", "stypeId"], 0),
            "scope": int(item, &["scope"], 0),
            "mpCost": int(item, &["mp_cost", "mpCost"], 0),
            "tpCost": int(item, &["tp_cost", "tpCost"], 0),
            "tpGain": int(item, &["tp_gain", "tpGain"], 0),
            "speed": int(item, &["speed"], 0),
            "repeats": int(item, &["repeats"], 1),
            "successRate": int(item, &["success_rate", "successRate", "hit"], 100),
            "hitType": int(item, &["hit_type", "hitType"], 0),
            "occasion": int(item, &["occasion"], 0),
            "damage": damage,
            "legacyDamage": legacy_damage,
            "effects": effects(item),
        })
    })
}

pub(crate) fn convert_states(raw: &Node) -> Value {
    named_list(raw, |item| json!({ "traits": traits(item) }))
}

pub(crate) fn convert_troops(raw: &Node) -> Value {
    named_list(raw, |item| {
        let members: Vec<Value> = list(item, &["members"])
            .iter()
            .filter(|m| m.is_record())
            .map(|m| {
                json!({
                    "enemyId": int(m, &["enemy_id", "enemyId"], 0),
                    "hidden": flag(m, &["hidden"], false),
                })
            })
            .collect();
        json!({ "members": members })
    })
}

pub(crate) fn convert_common_events(raw: &Node) -> Value {
    named_list(raw, |item| {
        json!({
            "trigger": int(item, &["trigger"], 0),
            "switchId": int(item, &["switch_id", "switchId"], 0),
            "list": convert_commands(list(item, &["list"])),
        })
    })
}

pub(crate) fn convert_map_infos(raw: &Node) -> Value {
    sparse_to_dense(raw, |id, info| {
        json!({
            "id": id,
            "name": text(info, &["name"], &format!("Map #{id}")),
            "parentId": int(info, &["parent_id", "parentId"], 0),
            "order": int(info, &["order"], 0),
        })
    })
}

pub(crate) fn convert_system(raw: &Node) -> Value {
    if !raw.is_record() {
        return json!({});
    }

    let mut equip_types = plain_list(first(raw, &["equip_types", "equipTypes"]));
    if equip_types.as_array().is_none_or(Vec::is_empty) {
        equip_types = json!(DEFAULT_EQUIP_TYPES);
    }

    json!({
        "gameTitle": text(raw, &["game_title", "gameTitle"], ""),
        "switches": plain_list(first(raw, &["switches"])),
        "variables": plain_list(first(raw, &["variables"])),
        "elements": plain_list(first(raw, &["elements"])),
        "weaponTypes": plain_list(first(raw, &["weapon_types", "weaponTypes"])),
        "armorTypes": plain_list(first(raw, &["armor_types", "armorTypes"])),
        "equipTypes": equip_types,
        "skillTypes": plain_list(first(raw, &["skill_types", "skillTypes"])),
    })
}

fn trimmed_names(item: &Node, names: &[&str]) -> Vec<String> {
    text_list(item, names)
        .into_iter()
        .map(|s| s.trim().to_owned())
        .collect()
}

/// Always emits a 9-slot `tilesetNames`. Legacy tilesets only carry up to five autotile sheets
/// and one main sheet; those map to slots 0-4 and 5.
pub(crate) fn convert_tilesets(raw: &Node) -> Value {
    named_list(raw, |item| {
        let autotile_names = trimmed_names(item, &["autotile_names", "autotileNames"]);
        let tileset_name = text(item, &["tileset_name", "tilesetName"], "")
            .trim()
            .to_owned();

        let mut tileset_names = trimmed_names(item, &["tileset_names", "tilesetNames"]);
        if tileset_names.is_empty() {
            tileset_names = vec![String::new(); 9];
            for (slot, name) in autotile_names.iter().take(5).enumerate() {
                tileset_names[slot] = name.clone();
            }
            if !tileset_name.is_empty() {
                tileset_names[5] = tileset_name.clone();
            }
        } else {
            tileset_names.resize(9, String::new());
        }

        json!({
            "tilesetNames": tileset_names,
            "tilesetName": tileset_name,
            "autotileNames": autotile_names,
            "flags": int_list(item, &["flags", "passages"]),
        })
    })
}
