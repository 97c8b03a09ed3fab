#![allow(dead_code)]
use std::fs;
use std::path::{Path, PathBuf};

use rpgdata::archive::{advance_key, decrypt_payload, v3_index_mask};
use serde_json::{Value, json};
use std::sync::Once;

static LOGGER_INIT: Once = Once::new();

// Rust runs the tests concurrently, so unless we synchronize logging access
// it will crash when attempting to run `cargo test` with some logging facilities.
#[cfg(test)]
pub fn ensure_env_logger_initialized() {
    use std::io::Write;

    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .init();
    });
}

/// Builds a version 1 archive (`Game.rgssad` / `Game.rgss2a` layout).
pub fn build_legacy_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = b"RGSSAD\0\x01".to_vec();
    let mut key: u32 = 0xDEAD_CAFE;
    for (name, payload) in entries {
        out.extend((name.len() as u32 ^ key).to_le_bytes());
        key = advance_key(key);
        for b in name.bytes() {
            out.push(b ^ (key & 0xFF) as u8);
            key = advance_key(key);
        }
        out.extend((payload.len() as u32 ^ key).to_le_bytes());
        key = advance_key(key);

        let mut data = payload.to_vec();
        decrypt_payload(&mut data, key);
        out.extend(data);
    }
    out
}

/// Builds a version 3 archive (`Game.rgss3a` layout) with a zero terminator record.
pub fn build_v3_archive(seed: u32, entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mask = v3_index_mask(seed);
    let mask_bytes = mask.to_le_bytes();
    let mut out = b"RGSSAD\0\x03".to_vec();
    out.extend(seed.to_le_bytes());

    let index_len: usize = entries.iter().map(|(n, _)| 16 + n.len()).sum::<usize>() + 16;
    let mut offset = 12 + index_len;
    let mut payloads = Vec::new();

    for (i, (name, payload)) in entries.iter().enumerate() {
        let key = 0x1357_9BDF_u32.wrapping_add(i as u32 * 97);
        for field in [offset as u32, payload.len() as u32, key, name.len() as u32] {
            out.extend((field ^ mask).to_le_bytes());
        }
        out.extend(name.bytes().enumerate().map(|(i, b)| b ^ mask_bytes[i % 4]));

        let mut data = payload.to_vec();
        decrypt_payload(&mut data, key);
        payloads.extend(data);
        offset += payload.len();
    }
    for _ in 0..4 {
        out.extend(mask.to_le_bytes());
    }
    out.extend(payloads);
    out
}

/// Minimal Marshal 4.8 writer for the value shapes project files use.
pub mod marshal {
    pub fn document(body: Vec<u8>) -> Vec<u8> {
        let mut out = vec![4, 8];
        out.extend(body);
        out
    }

    pub fn fixnum(n: i64) -> Vec<u8> {
        match n {
            0 => vec![0],
            1..=122 => vec![(n + 5) as u8],
            -123..=-1 => vec![(n - 5) as i8 as u8],
            _ => {
                let bytes = n.to_le_bytes();
                let mut len = 8;
                while len > 1 {
                    let fill = if n < 0 { 0xFF } else { 0 };
                    if bytes[len - 1] != fill {
                        break;
                    }
                    len -= 1;
                }
                let mut out = vec![if n < 0 { (-(len as i8)) as u8 } else { len as u8 }];
                out.extend_from_slice(&bytes[..len]);
                out
            }
        }
    }

    pub fn nil() -> Vec<u8> {
        b"0".to_vec()
    }

    pub fn boolean(b: bool) -> Vec<u8> {
        if b { b"T".to_vec() } else { b"F".to_vec() }
    }

    pub fn int(n: i64) -> Vec<u8> {
        let mut out = b"i".to_vec();
        out.extend(fixnum(n));
        out
    }

    pub fn symbol(name: &str) -> Vec<u8> {
        let mut out = b":".to_vec();
        out.extend(fixnum(name.len() as i64));
        out.extend(name.as_bytes());
        out
    }

    /// A UTF-8 tagged string, as written by Ruby 1.9+.
    pub fn string(text: &str) -> Vec<u8> {
        let mut out = b"I\"".to_vec();
        out.extend(fixnum(text.len() as i64));
        out.extend(text.as_bytes());
        out.extend(fixnum(1));
        out.extend(symbol("E"));
        out.extend(b"T");
        out
    }

    pub fn array(items: Vec<Vec<u8>>) -> Vec<u8> {
        let mut out = b"[".to_vec();
        out.extend(fixnum(items.len() as i64));
        for item in items {
            out.extend(item);
        }
        out
    }

    pub fn hash(pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<u8> {
        let mut out = b"{".to_vec();
        out.extend(fixnum(pairs.len() as i64));
        for (k, v) in pairs {
            out.extend(k);
            out.extend(v);
        }
        out
    }

    /// An object with `@`-prefixed instance variables.
    pub fn object(class_name: &str, ivars: Vec<(&str, Vec<u8>)>) -> Vec<u8> {
        let mut out = b"o".to_vec();
        out.extend(symbol(class_name));
        out.extend(fixnum(ivars.len() as i64));
        for (name, value) in ivars {
            out.extend(symbol(&format!("@{name}")));
            out.extend(value);
        }
        out
    }
}

pub fn command(code: i64, parameters: Value) -> Value {
    json!({"code": code, "indent": 0, "parameters": parameters})
}

pub fn page(list: Vec<Value>) -> Value {
    let mut list = list;
    list.push(command(0, json!([])));
    json!({
        "trigger": 0,
        "conditions": {},
        "image": {"characterName": "", "characterIndex": 0, "direction": 2, "pattern": 0, "tileId": 0},
        "list": list,
    })
}

pub fn event(id: i64, name: &str, x: i64, y: i64, pages: Vec<Value>) -> Value {
    json!({"id": id, "name": name, "x": x, "y": y, "pages": pages})
}

fn write_json(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(name), value.to_string()).unwrap();
}

/// Writes a small MV project into `root/www/data` and returns the data directory.
///
/// Map 1 "Village" holds a chest (id 1), a door (id 2), a talking guard that starts a fixed
/// battle (id 3) and a plain villager (id 4). Map 2 "Field" has a random encounter table.
pub fn write_mv_project(root: &Path) -> PathBuf {
    let data = root.join("www").join("data");
    fs::create_dir_all(&data).unwrap();

    write_json(
        &data,
        "MapInfos.json",
        &json!([null,
            {"id": 1, "name": "Village", "parentId": 0, "order": 1},
            {"id": 2, "name": "Field", "parentId": 1, "order": 2}]),
    );
    write_json(
        &data,
        "Items.json",
        &json!([null,
            {"id": 1, "name": "Potion", "description": "Heals 500 HP", "iconIndex": 176, "itypeId": 1,
             "price": 50, "consumable": true, "scope": 7,
             "effects": [{"code": 11, "dataId": 0, "value1": 0, "value2": 500}]},
            {"id": 2, "name": "Bronze Key", "itypeId": 2, "price": 0, "consumable": false, "scope": 0, "effects": []}]),
    );
    write_json(
        &data,
        "Weapons.json",
        &json!([null, {"id": 1, "name": "Sword", "wtypeId": 2, "etypeId": 1, "price": 300,
            "params": [0, 0, 10, 0, 0, 0, 0, 0],
            "traits": [{"code": 31, "dataId": 1, "value": 0}]}]),
    );
    write_json(&data, "Armors.json", &json!([null]));
    write_json(
        &data,
        "Enemies.json",
        &json!([null,
            {"id": 1, "name": "Slime", "params": [30, 0, 8, 4, 0, 0, 5, 5], "exp": 3, "gold": 5,
             "dropItems": [{"kind": 1, "dataId": 1, "denominator": 2}],
             "actions": [{"skillId": 1, "rating": 5, "conditionType": 0}], "traits": []},
            {"id": 2, "name": "Bat", "params": [20, 0, 6, 2, 0, 0, 9, 5], "exp": 2, "gold": 3,
             "dropItems": [], "actions": [], "traits": []}]),
    );
    write_json(
        &data,
        "Skills.json",
        &json!([null, {"id": 1, "name": "Attack", "stypeId": 0, "scope": 1,
            "damage": {"type": 1, "elementId": -1, "formula": "a.atk * 4 - b.def * 2", "variance": 20, "critical": true},
            "effects": []}]),
    );
    write_json(&data, "States.json", &json!([null, {"id": 1, "name": "Knockout"}]));
    write_json(
        &data,
        "Troops.json",
        &json!([null,
            {"id": 1, "name": "Slime x2", "members": [{"enemyId": 1, "hidden": false}, {"enemyId": 1, "hidden": false}]},
            {"id": 2, "name": "Bats", "members": [{"enemyId": 2, "hidden": false}, {"enemyId": 2, "hidden": true}]}]),
    );
    write_json(
        &data,
        "CommonEvents.json",
        &json!([null, {"id": 1, "name": "Inn", "trigger": 0, "switchId": 1, "list": []}]),
    );
    write_json(
        &data,
        "System.json",
        &json!({
            "gameTitle": "Fixture Quest",
            "switches": ["", "Gate Open"],
            "variables": ["", "Steps"],
            "elements": ["", "Physical", "Fire"],
            "weaponTypes": ["", "Dagger", "Sword"],
            "armorTypes": ["", "Shield"],
            "equipTypes": ["", "Weapon", "Shield"],
            "skillTypes": ["", "Magic"],
        }),
    );

    let village = json!({
        "width": 10, "height": 8, "tilesetId": 1, "encounterStep": 30, "encounterList": [],
        "data": [],
        "events": [
            null,
            event(1, "Chest", 2, 3, vec![page(vec![
                command(126, json!([1, 0, 0, 2])),
                command(125, json!([0, 0, 100])),
                command(123, json!(["A", 0])),
            ])]),
            event(2, "Door", 5, 0, vec![page(vec![
                command(201, json!([0, 2, 4, 7, 2, 0])),
            ])]),
            event(3, "Guard", 6, 6, vec![page(vec![
                command(101, json!(["", 0, 0, 2])),
                command(401, json!(["Halt!"])),
                command(301, json!([0, 1, true, false])),
            ])]),
            event(4, "Villager", 1, 1, vec![page(vec![
                command(101, json!(["", 0, 0, 2])),
                command(401, json!(["Nice weather."])),
            ])]),
        ]
    });
    write_json(&data, "Map001.json", &village);

    let field = json!({
        "width": 20, "height": 20, "tilesetId": 1, "encounterStep": 25,
        "encounterList": [
            {"troopId": 1, "weight": 10, "regionSet": []},
            {"troopId": 2, "weight": 5, "regionSet": [1, 2]},
        ],
        "data": [],
        "events": [null],
    });
    write_json(&data, "Map002.json", &field);

    data
}
