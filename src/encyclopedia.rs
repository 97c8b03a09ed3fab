//! A readable catalog of weapons, armors, items, enemies and skills.

use serde::Serialize;
use serde_json::Value;

use crate::database::Database;
use crate::utils::ValueExt;

pub const PARAM_NAMES: [&str; 8] = [
    "Max HP",
    "Max MP",
    "Attack",
    "Defense",
    "M.Attack",
    "M.Defense",
    "Agility",
    "Luck",
];

const XPARAM_NAMES: [&str; 10] = [
    "Hit Rate",
    "Evasion Rate",
    "Critical Rate",
    "Critical Evasion",
    "Magic Evasion",
    "Magic Reflection",
    "Counter Attack",
    "HP Regeneration",
    "MP Regeneration",
    "TP Regeneration",
];

const SPARAM_NAMES: [&str; 10] = [
    "Target Rate",
    "Guard Effect",
    "Recovery Effect",
    "Pharmacology",
    "MP Cost Rate",
    "TP Charge Rate",
    "Physical Damage",
    "Magical Damage",
    "Floor Damage",
    "Experience",
];

fn named<'a>(names: &'a [&'a str], index: i64) -> Option<&'a str> {
    usize::try_from(index).ok().and_then(|i| names.get(i)).copied()
}

fn param_name(index: i64) -> &'static str {
    named(&PARAM_NAMES, index).unwrap_or("?")
}

fn percent(value: f64) -> i64 {
    (value * 100.0) as i64
}

fn float_field(value: &Value, key: &str) -> f64 {
    value.field(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Entry of a type list from `System` (skill/weapon/armor/equip types).
fn type_name(list: &[String], id: i64, fallback: impl FnOnce() -> String) -> String {
    match usize::try_from(id).ok().and_then(|i| list.get(i)) {
        Some(name) if !name.trim().is_empty() => name.trim().to_owned(),
        _ => fallback(),
    }
}

fn scope_name(scope: i64) -> &'static str {
    match scope {
        0 => "None",
        1 => "One Enemy",
        2 => "All Enemies",
        3 => "1-2 Enemies",
        4 => "2 Random Enemies",
        5 => "3 Random Enemies",
        6 => "4 Random Enemies",
        7 => "One Ally",
        8 => "All Allies",
        9 => "One Dead Ally",
        10 => "All Dead Allies",
        11 => "The User",
        _ => "?",
    }
}

/// Readable text for one trait (`{code, dataId, value}`).
pub fn translate_trait(t: &Value, db: &Database) -> String {
    let code = t.int_or("code", 0);
    let data_id = t.int_or("dataId", 0);
    let value = float_field(t, "value");

    let listed = |list: &[String]| type_name(list, data_id, || format!("#{data_id}"));

    match code {
        11 => format!("{} rate {}%", db.element_name(data_id), percent(value)),
        12 => format!("{} debuff rate {}%", param_name(data_id), percent(value)),
        13 => format!("{} rate {}%", db.state_name(data_id), percent(value)),
        14 => format!("Resist {}", db.state_name(data_id)),
        21 => format!("{} x{}%", param_name(data_id), percent(value)),
        22 => {
            let name = named(&XPARAM_NAMES, data_id)
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Ex-Parameter {data_id}"));
            let sign = if value >= 0.0 { "+" } else { "" };
            format!("{name} {sign}{:.0}%", value * 100.0)
        }
        23 => {
            let name = named(&SPARAM_NAMES, data_id)
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Sp-Parameter {data_id}"));
            format!("{name} x{}%", percent(value))
        }
        31 => format!("Attack Element: {}", db.element_name(data_id)),
        32 => format!("Attack State: {} {}%", db.state_name(data_id), percent(value)),
        33 => {
            let sign = if value >= 0.0 { "+" } else { "" };
            format!("Attack Speed {sign}{}", value as i64)
        }
        34 => format!("Attack Times +{}", value as i64),
        41 => format!("Add Skill Type: {}", listed(db.skill_types())),
        42 => format!("Seal Skill Type: {}", listed(db.skill_types())),
        43 => format!("Add Skill: {}", db.skill_name(data_id)),
        44 => format!("Seal Skill: {}", db.skill_name(data_id)),
        51 => format!("Equip Weapon: {}", listed(db.weapon_types())),
        52 => format!("Equip Armor: {}", listed(db.armor_types())),
        53 => format!("Lock Equip: {}", listed(db.equip_types())),
        54 => format!("Seal Equip: {}", listed(db.equip_types())),
        55 if data_id == 1 => "Dual Wield".to_owned(),
        55 => format!("Slot Type {data_id}"),
        61 => format!("Action Times +{}%", percent(value)),
        62 => match data_id {
            0 => "Auto Battle".to_owned(),
            1 => "Guard".to_owned(),
            2 => "Substitute".to_owned(),
            3 => "Preserve TP".to_owned(),
            other => format!("Special Flag {other}"),
        },
        63 => {
            let effect = match data_id {
                0 => "Normal".to_owned(),
                1 => "Boss".to_owned(),
                2 => "Instant".to_owned(),
                3 => "No Disappear".to_owned(),
                other => format!("#{other}"),
            };
            format!("Collapse Effect: {effect}")
        }
        64 => match data_id {
            0 => "Encounter Half".to_owned(),
            1 => "Encounter None".to_owned(),
            2 => "Cancel Surprise".to_owned(),
            3 => "Raise Preemptive".to_owned(),
            4 => "Gold Double".to_owned(),
            5 => "Drop Item Double".to_owned(),
            other => format!("Party Ability {other}"),
        },
        _ => format!("Trait [{code},{data_id},{}]", render_number(value)),
    }
}

fn render_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Readable text for one usage effect (`{code, dataId, value1, value2}`).
pub fn translate_effect(e: &Value, db: &Database) -> String {
    let code = e.int_or("code", 0);
    let data_id = e.int_or("dataId", 0);
    let value1 = float_field(e, "value1");
    let value2 = float_field(e, "value2");

    let recover = |what: &str| {
        let mut parts = Vec::new();
        if value1 != 0.0 {
            parts.push(format!("{}%", percent(value1)));
        }
        if value2 != 0.0 {
            parts.push(format!("{}", value2 as i64));
        }
        if parts.is_empty() {
            format!("Recover {what}")
        } else {
            format!("Recover {what} {}", parts.join("+"))
        }
    };

    match code {
        11 => recover("HP"),
        12 => recover("MP"),
        13 => format!("Gain TP {}", value1 as i64),
        21 => format!("Add {} {}%", db.state_name(data_id), percent(value1)),
        22 => format!("Remove {} {}%", db.state_name(data_id), percent(value1)),
        31 => format!("Buff {} {} turns", param_name(data_id), value1 as i64),
        32 => format!("Debuff {} {} turns", param_name(data_id), value1 as i64),
        33 => format!("Remove Buff {}", param_name(data_id)),
        34 => format!("Remove Debuff {}", param_name(data_id)),
        41 if data_id == 0 => "Escape".to_owned(),
        41 => format!("Special Effect {data_id}"),
        42 => format!("Grow {} +{}", param_name(data_id), value1 as i64),
        43 => format!("Learn {}", db.skill_name(data_id)),
        44 => format!("Common Event #{data_id}"),
        _ => format!("Effect [{code},{data_id}]"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamEntry {
    pub name: &'static str,
    pub value: i64,
}

/// Non-zero stats of an 8-slot `params` vector.
fn param_entries(record: &Value) -> Vec<ParamEntry> {
    record
        .list("params")
        .iter()
        .take(8)
        .enumerate()
        .filter_map(|(i, v)| {
            let value = v.as_int()?;
            (value != 0).then_some(ParamEntry {
                name: PARAM_NAMES[i],
                value,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponEntry {
    pub id: i64,
    pub name: String,
    pub desc: String,
    pub price: i64,
    pub wtype: String,
    pub icon_index: i64,
    pub params: Vec<ParamEntry>,
    pub traits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmorEntry {
    pub id: i64,
    pub name: String,
    pub desc: String,
    pub price: i64,
    pub atype: String,
    pub etype: String,
    pub icon_index: i64,
    pub params: Vec<ParamEntry>,
    pub traits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEntry {
    pub id: i64,
    pub name: String,
    pub desc: String,
    pub price: i64,
    pub icon_index: i64,
    pub itype: String,
    pub consumable: bool,
    pub scope: String,
    pub effects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyAction {
    pub skill: String,
    pub skill_id: i64,
    pub rating: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyEntry {
    pub id: i64,
    pub name: String,
    pub params: Vec<ParamEntry>,
    pub exp: i64,
    pub gold: i64,
    pub drops: Vec<String>,
    pub actions: Vec<EnemyAction>,
    pub traits: Vec<String>,
    pub icon_index: i64,
    pub battler_name: String,
    pub battler_hue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDamage {
    pub base_damage: i64,
    pub atk_f: i64,
    pub spi_f: i64,
    pub variance: i64,
}

/// How a skill's damage is computed: a formula, or the older base-damage record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageSummary {
    pub damage_type: String,
    pub damage_element: String,
    pub damage_variance: i64,
    pub damage_critical: bool,
    pub formula: String,
    pub formula_pretty: String,
    pub formula_tips: Vec<&'static str>,
    pub legacy_damage: Option<LegacyDamage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEntry {
    pub id: i64,
    pub name: String,
    pub desc: String,
    pub icon_index: i64,
    pub stype: String,
    pub scope: String,
    pub occasion: String,
    pub hit_type: String,
    pub mp_cost: i64,
    pub tp_cost: i64,
    pub tp_gain: i64,
    pub speed: i64,
    pub repeats: i64,
    pub success_rate: i64,
    pub effects: Vec<String>,
    #[serde(flatten)]
    pub damage: DamageSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Encyclopedia {
    pub weapons: Vec<WeaponEntry>,
    pub armors: Vec<ArmorEntry>,
    pub items: Vec<ItemEntry>,
    pub enemies: Vec<EnemyEntry>,
    pub skills: Vec<SkillEntry>,
}

/// Named records of a table. Unnamed slots and separator rows (`--`, `ーー`) are skipped.
fn listed_records(table: &Value) -> impl Iterator<Item = (&Value, String)> {
    table
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or(&[])
        .iter()
        .filter(|record| record.is_object())
        .filter_map(|record| {
            let name = record.str_or("name", "").trim();
            if name.is_empty() || name.starts_with("--") || name.starts_with("ーー") {
                return None;
            }
            Some((record, name.to_owned()))
        })
}

fn translate_all(list: &[Value], db: &Database, f: fn(&Value, &Database) -> String) -> Vec<String> {
    list.iter()
        .filter(|v| v.is_object())
        .map(|v| f(v, db))
        .collect()
}

/// Spells out the battler and variable shorthands of a damage formula.
fn formula_pretty(formula: &str) -> String {
    formula
        .replace("a.", "user.")
        .replace("b.", "target.")
        .replace("v [", "var[")
        .replace("v[", "var[")
}

fn skill_damage(skill: &Value, db: &Database) -> DamageSummary {
    if let Some(damage) = skill.field("damage").filter(|d| d.as_object().is_some_and(|m| !m.is_empty())) {
        let damage_type = damage.int_or("type", 0);
        let formula = damage.str_or("formula", "").trim().to_owned();
        let element_id = damage.int_or("elementId", -1);
        let damage_element = match element_id {
            -1 => "Normal Attack".to_owned(),
            0 => "None".to_owned(),
            id => db.element_name(id),
        };
        let damage_type = match damage_type {
            0 => "None".to_owned(),
            1 => "HP Damage".to_owned(),
            2 => "MP Damage".to_owned(),
            3 => "HP Recover".to_owned(),
            4 => "MP Recover".to_owned(),
            5 => "HP Drain".to_owned(),
            6 => "MP Drain".to_owned(),
            other => format!("Type #{other}"),
        };
        return DamageSummary {
            damage_type,
            damage_element,
            damage_variance: damage.int_or("variance", 0),
            damage_critical: damage.bool_or("critical", false),
            formula_pretty: formula_pretty(&formula),
            formula_tips: if formula.is_empty() {
                Vec::new()
            } else {
                vec!["a = user, b = target", "var[n] is game variable n (v[n] in the formula)"]
            },
            formula,
            legacy_damage: None,
        };
    }

    if let Some(legacy) = skill.field("legacyDamage").filter(|l| l.is_object()) {
        let elements: Vec<String> = legacy
            .list("elementSet")
            .iter()
            .filter_map(ValueExt::as_int)
            .map(|id| db.element_name(id))
            .collect();
        let variance = legacy.int_or("variance", 0);
        return DamageSummary {
            damage_type: "Legacy base damage".to_owned(),
            damage_element: if elements.is_empty() {
                "Skill element".to_owned()
            } else {
                elements.join(", ")
            },
            damage_variance: variance,
            damage_critical: false,
            formula: String::new(),
            formula_pretty: String::new(),
            formula_tips: vec![
                "Legacy skills usually have no formula script",
                "Damage is base damage plus attack and spirit factors, with variance",
            ],
            legacy_damage: Some(LegacyDamage {
                base_damage: legacy.int_or("baseDamage", 0),
                atk_f: legacy.int_or("atkF", 0),
                spi_f: legacy.int_or("spiF", 0),
                variance,
            }),
        };
    }

    DamageSummary {
        damage_type: "Unknown".to_owned(),
        damage_element: "?".to_owned(),
        damage_variance: 0,
        damage_critical: false,
        formula: String::new(),
        formula_pretty: String::new(),
        formula_tips: Vec::new(),
        legacy_damage: None,
    }
}

fn drop_text(drop: &Value, db: &Database) -> Option<String> {
    let data_id = drop.int_or("dataId", 0);
    let (label, name) = match drop.int_or("kind", 0) {
        0 => return None,
        1 => ("Item", db.item_name(data_id)),
        2 => ("Weapon", db.weapon_name(data_id)),
        3 => ("Armor", db.armor_name(data_id)),
        _ => ("?", format!("#{data_id}")),
    };
    let denominator = drop.int_or("denominator", 1);
    let rate = if denominator > 1 {
        format!("1/{denominator}")
    } else {
        "100%".to_owned()
    };
    Some(format!("{label}: {name} ({rate})"))
}

pub fn build_encyclopedia(db: &Database) -> Encyclopedia {
    let weapons = listed_records(db.weapons())
        .map(|(w, name)| WeaponEntry {
            id: w.int_or("id", 0),
            name,
            desc: w.str_or("description", "").to_owned(),
            price: w.int_or("price", 0),
            wtype: type_name(db.weapon_types(), w.int_or("wtypeId", 0), || "?".to_owned()),
            icon_index: w.int_or("iconIndex", 0),
            params: param_entries(w),
            traits: translate_all(w.list("traits"), db, translate_trait),
        })
        .collect();

    let armors = listed_records(db.armors())
        .map(|(a, name)| ArmorEntry {
            id: a.int_or("id", 0),
            name,
            desc: a.str_or("description", "").to_owned(),
            price: a.int_or("price", 0),
            atype: type_name(db.armor_types(), a.int_or("atypeId", 0), || "?".to_owned()),
            etype: type_name(db.equip_types(), a.int_or("etypeId", 0), || "?".to_owned()),
            icon_index: a.int_or("iconIndex", 0),
            params: param_entries(a),
            traits: translate_all(a.list("traits"), db, translate_trait),
        })
        .collect();

    let items = listed_records(db.items())
        .map(|(it, name)| ItemEntry {
            id: it.int_or("id", 0),
            name,
            desc: it.str_or("description", "").to_owned(),
            price: it.int_or("price", 0),
            icon_index: it.int_or("iconIndex", 0),
            itype: match it.int_or("itypeId", 1) {
                1 => "Regular Item",
                2 => "Key Item",
                3 => "Hidden Item A",
                4 => "Hidden Item B",
                _ => "Item",
            }
            .to_owned(),
            consumable: it.bool_or("consumable", true),
            scope: scope_name(it.int_or("scope", 0)).to_owned(),
            effects: translate_all(it.list("effects"), db, translate_effect),
        })
        .collect();

    let enemies = listed_records(db.enemies())
        .map(|(en, name)| EnemyEntry {
            id: en.int_or("id", 0),
            name,
            params: param_entries(en),
            exp: en.int_or("exp", 0),
            gold: en.int_or("gold", 0),
            drops: en
                .list("dropItems")
                .iter()
                .filter_map(|d| drop_text(d, db))
                .collect(),
            actions: en
                .list("actions")
                .iter()
                .filter(|a| a.is_object())
                .map(|a| {
                    let skill_id = a.int_or("skillId", 0);
                    EnemyAction {
                        skill: db.skill_name(skill_id),
                        skill_id,
                        rating: a.int_or("rating", 5),
                    }
                })
                .collect(),
            traits: translate_all(en.list("traits"), db, translate_trait),
            icon_index: en.int_or("iconIndex", 0),
            battler_name: en.str_or("battlerName", "").to_owned(),
            battler_hue: en.int_or("battlerHue", 0),
        })
        .collect();

    let skills = listed_records(db.skills())
        .map(|(sk, name)| {
            let stype_id = sk.int_or("stypeId", 0);
            SkillEntry {
                id: sk.int_or("id", 0),
                name,
                desc: sk.str_or("description", "").to_owned(),
                icon_index: sk.int_or("iconIndex", 0),
                stype: type_name(db.skill_types(), stype_id, || format!("Type #{stype_id}")),
                scope: scope_name(sk.int_or("scope", 0)).to_owned(),
                occasion: match sk.int_or("occasion", 0) {
                    0 => "Always",
                    1 => "Battle Screen",
                    2 => "Menu Screen",
                    3 => "Never",
                    _ => "?",
                }
                .to_owned(),
                hit_type: match sk.int_or("hitType", 0) {
                    0 => "Certain Hit",
                    1 => "Physical Attack",
                    2 => "Magical Attack",
                    _ => "?",
                }
                .to_owned(),
                mp_cost: sk.int_or("mpCost", 0),
                tp_cost: sk.int_or("tpCost", 0),
                tp_gain: sk.int_or("tpGain", 0),
                speed: sk.int_or("speed", 0),
                repeats: sk.int_or("repeats", 1),
                success_rate: sk.int_or("successRate", 100),
                effects: translate_all(sk.list("effects"), db, translate_effect),
                damage: skill_damage(sk, db),
            }
        })
        .collect();

    Encyclopedia {
        weapons,
        armors,
        items,
        enemies,
        skills,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{DataLoader, Engine};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    fn database(tables: &[(&str, Value)]) -> Database {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in tables {
            fs::write(dir.path().join(name), value.to_string()).unwrap();
        }
        Database::load(&DataLoader::new(dir.path(), Engine::Mv))
    }

    #[test]
    fn test_traits_and_effects() {
        let db = database(&[
            ("System.json", json!({"elements": ["", "Fire"], "skillTypes": ["", "Magic"]})),
            ("States.json", json!([null, {"id": 1, "name": "Poison"}])),
        ]);
        let trait_text = |t: Value| translate_trait(&t, &db);
        assert_eq!(trait_text(json!({"code": 11, "dataId": 1, "value": 0.5})), "Fire rate 50%");
        assert_eq!(trait_text(json!({"code": 14, "dataId": 1, "value": 0})), "Resist Poison");
        assert_eq!(trait_text(json!({"code": 22, "dataId": 0, "value": 0.05})), "Hit Rate +5%");
        assert_eq!(trait_text(json!({"code": 41, "dataId": 1, "value": 0})), "Add Skill Type: Magic");
        assert_eq!(trait_text(json!({"code": 41, "dataId": 4, "value": 0})), "Add Skill Type: #4");
        assert_eq!(trait_text(json!({"code": 55, "dataId": 1, "value": 0})), "Dual Wield");
        assert_eq!(trait_text(json!({"code": 99, "dataId": 2, "value": 1})), "Trait [99,2,1]");

        let effect_text = |e: Value| translate_effect(&e, &db);
        assert_eq!(
            effect_text(json!({"code": 11, "dataId": 0, "value1": 0.25, "value2": 50})),
            "Recover HP 25%+50"
        );
        assert_eq!(effect_text(json!({"code": 12, "dataId": 0, "value1": 0, "value2": 0})), "Recover MP");
        assert_eq!(
            effect_text(json!({"code": 21, "dataId": 1, "value1": 1.0, "value2": 0})),
            "Add Poison 100%"
        );
        assert_eq!(effect_text(json!({"code": 41, "dataId": 0})), "Escape");
    }

    #[test]
    fn test_build_skips_unnamed_and_separators() {
        let db = database(&[
            ("Items.json", json!([null, {"id": 1, "name": "Potion", "itypeId": 1, "scope": 7,
                "effects": [{"code": 11, "dataId": 0, "value1": 0, "value2": 500}]},
                {"id": 2, "name": "  "}, {"id": 3, "name": "--- Key items ---"}])),
            ("Enemies.json", json!([null, {"id": 1, "name": "Slime", "params": [50, 0, 12, 0, 0, 0, 0, 0],
                "dropItems": [{"kind": 1, "dataId": 1, "denominator": 4}, {"kind": 0, "dataId": 0, "denominator": 1}],
                "actions": [{"skillId": 1, "rating": 5}]}, {"id": 2, "name": "ーーBoss"}])),
            ("Skills.json", json!([null,
                {"id": 1, "name": "Attack", "damage": {"type": 1, "elementId": -1, "formula": "a.atk * 4 - b.def * 2", "variance": 20, "critical": true}},
                {"id": 2, "name": "Old Fire", "damage": null, "legacyDamage": {"baseDamage": 100, "atkF": 0, "spiF": 50, "variance": 20, "elementSet": []}}
            ])),
        ]);
        let book = build_encyclopedia(&db);

        assert_eq!(book.items.len(), 1);
        assert_eq!(book.items[0].scope, "One Ally");
        assert_eq!(book.items[0].effects, vec!["Recover HP 500"]);

        assert_eq!(book.enemies.len(), 1);
        let slime = &book.enemies[0];
        assert_eq!(
            slime.params,
            vec![
                ParamEntry { name: "Max HP", value: 50 },
                ParamEntry { name: "Attack", value: 12 },
            ]
        );
        assert_eq!(slime.drops, vec!["Item: Potion (1/4)"]);
        assert_eq!(slime.actions[0].skill, "Attack");

        assert_eq!(book.skills[0].damage.damage_element, "Normal Attack");
        assert_eq!(book.skills[0].damage.damage_type, "HP Damage");
        assert!(book.skills[0].damage.legacy_damage.is_none());
        assert_eq!(book.skills[0].damage.formula_pretty, "user.atk * 4 - target.def * 2");
        assert_eq!(book.skills[0].damage.formula_tips.len(), 2);
        let legacy = book.skills[1].damage.legacy_damage.as_ref().unwrap();
        assert_eq!(legacy.spi_f, 50);
        assert_eq!(book.skills[1].damage.damage_element, "Skill element");
        assert!(book.skills[1].damage.formula_pretty.is_empty());
    }

    #[test]
    fn test_formula_pretty_rewrites_shorthands() {
        assert_eq!(formula_pretty("v[3] + v [4] * a.mat"), "var[3] + var[4] * user.mat");
        assert_eq!(formula_pretty(""), "");
    }
}
