//! Name resolution and table lookups over the canonical schema of one project.

use std::sync::Arc;

use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::loader::DataLoader;
use crate::utils::{FastMap, FastSet, ValueExt};

/// A node of the map hierarchy as shown in a project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapTreeNode {
    pub id: i64,
    pub name: String,
    pub children: Vec<MapTreeNode>,
}

/// `id => name` for a record table. Records with a blank name get `"<kind> #<id>"`.
fn name_map(table: &Value, kind: &str) -> FastMap<i64, String> {
    let mut names = FastMap::default();
    for record in table.as_array().map(Vec::as_slice).unwrap_or(&[]) {
        if !record.is_object() {
            continue;
        }
        let Some(id) = record.int_field("id") else {
            continue;
        };
        let name = record.str_or("name", "").trim();
        let name = if name.is_empty() {
            format!("{kind} #{id}")
        } else {
            name.to_owned()
        };
        names.insert(id, name);
    }
    names
}

/// `index => name` for switch/variable arrays. Index 0 is never a real entry.
fn index_map(list: &[Value], kind: &str) -> FastMap<i64, String> {
    list.iter()
        .enumerate()
        .skip(1)
        .map(|(idx, name)| {
            let idx = idx as i64;
            let name = match name.as_str().map(str::trim) {
                Some(n) if !n.is_empty() => n.to_owned(),
                _ => format!("{kind} #{idx}"),
            };
            (idx, name)
        })
        .collect()
}

fn string_list(list: &[Value]) -> Vec<String> {
    list.iter()
        .map(|v| v.as_str().unwrap_or_default().to_owned())
        .collect()
}

fn find_by_id(table: &Value, id: i64) -> Option<&Value> {
    table
        .as_array()?
        .iter()
        .find(|record| record.is_object() && record.int_field("id") == Some(id))
}

fn empty_table() -> Arc<Value> {
    Arc::new(Value::Array(Vec::new()))
}

/// Typed lookups over one project's tables, built once per session.
#[derive(Debug)]
pub struct Database {
    items: FastMap<i64, String>,
    item_types: FastMap<i64, i64>,
    weapons: FastMap<i64, String>,
    armors: FastMap<i64, String>,
    enemies: FastMap<i64, String>,
    skills: FastMap<i64, String>,
    states: FastMap<i64, String>,
    troops: FastMap<i64, String>,
    common_event_names: FastMap<i64, String>,
    switches: FastMap<i64, String>,
    variables: FastMap<i64, String>,

    elements: Vec<String>,
    weapon_types: Vec<String>,
    armor_types: Vec<String>,
    equip_types: Vec<String>,
    skill_types: Vec<String>,

    raw_items: Arc<Value>,
    raw_weapons: Arc<Value>,
    raw_armors: Arc<Value>,
    raw_enemies: Arc<Value>,
    raw_skills: Arc<Value>,
    raw_states: Arc<Value>,
    raw_troops: Arc<Value>,
    map_infos: Arc<Value>,
    common_events: Arc<Value>,
    tilesets: Arc<Value>,
}

impl Database {
    /// Loads every table the lookups need. Missing tables behave as empty ones.
    pub fn load(loader: &DataLoader) -> Self {
        let table = |name: &str| loader.load(name).unwrap_or_else(empty_table);

        let raw_items = table("Items.json");
        let raw_weapons = table("Weapons.json");
        let raw_armors = table("Armors.json");
        let raw_enemies = table("Enemies.json");
        let raw_skills = table("Skills.json");
        let raw_states = table("States.json");
        let raw_troops = table("Troops.json");
        let map_infos = table("MapInfos.json");
        let common_events = table("CommonEvents.json");
        let tilesets = table("Tilesets.json");
        let system = loader
            .load("System.json")
            .unwrap_or_else(|| Arc::new(Value::Null));

        let item_types = raw_items
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter_map(|item| Some((item.int_field("id")?, item.int_or("itypeId", 1))))
            .collect();

        let db = Database {
            items: name_map(&raw_items, "Item"),
            item_types,
            weapons: name_map(&raw_weapons, "Weapon"),
            armors: name_map(&raw_armors, "Armor"),
            enemies: name_map(&raw_enemies, "Enemy"),
            skills: name_map(&raw_skills, "Skill"),
            states: name_map(&raw_states, "State"),
            troops: name_map(&raw_troops, "Troop"),
            common_event_names: name_map(&common_events, "Common Event"),
            switches: index_map(system.list("switches"), "Switch"),
            variables: index_map(system.list("variables"), "Variable"),
            elements: string_list(system.list("elements")),
            weapon_types: string_list(system.list("weaponTypes")),
            armor_types: string_list(system.list("armorTypes")),
            equip_types: string_list(system.list("equipTypes")),
            skill_types: string_list(system.list("skillTypes")),
            raw_items,
            raw_weapons,
            raw_armors,
            raw_enemies,
            raw_skills,
            raw_states,
            raw_troops,
            map_infos,
            common_events,
            tilesets,
        };

        debug!(
            "database loaded: {} items, {} weapons, {} armors, {} enemies, {} troops",
            db.items.len(),
            db.weapons.len(),
            db.armors.len(),
            db.enemies.len(),
            db.troops.len()
        );
        db
    }

    fn lookup(names: &FastMap<i64, String>, id: i64, kind: &str) -> String {
        names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("{kind} #{id}"))
    }

    pub fn item_name(&self, id: i64) -> String {
        Self::lookup(&self.items, id, "Item")
    }

    pub fn weapon_name(&self, id: i64) -> String {
        Self::lookup(&self.weapons, id, "Weapon")
    }

    pub fn armor_name(&self, id: i64) -> String {
        Self::lookup(&self.armors, id, "Armor")
    }

    pub fn enemy_name(&self, id: i64) -> String {
        Self::lookup(&self.enemies, id, "Enemy")
    }

    pub fn skill_name(&self, id: i64) -> String {
        Self::lookup(&self.skills, id, "Skill")
    }

    pub fn state_name(&self, id: i64) -> String {
        Self::lookup(&self.states, id, "State")
    }

    pub fn troop_name(&self, id: i64) -> String {
        Self::lookup(&self.troops, id, "Troop")
    }

    pub fn common_event_name(&self, id: i64) -> String {
        Self::lookup(&self.common_event_names, id, "Common Event")
    }

    pub fn switch_name(&self, id: i64) -> String {
        Self::lookup(&self.switches, id, "Switch")
    }

    pub fn variable_name(&self, id: i64) -> String {
        Self::lookup(&self.variables, id, "Variable")
    }

    /// Map names come straight from `MapInfos`, which may legitimately be blank.
    pub fn map_name(&self, id: i64) -> String {
        match find_by_id(&self.map_infos, id) {
            Some(info) => info.str_or("name", &format!("Map #{id}")).to_owned(),
            None => format!("Map #{id}"),
        }
    }

    /// Key items are items of type 2.
    pub fn is_key_item(&self, id: i64) -> bool {
        self.item_types.get(&id) == Some(&2)
    }

    pub fn element_name(&self, id: i64) -> String {
        match usize::try_from(id).ok().and_then(|i| self.elements.get(i)) {
            Some(name) if id > 0 => name.clone(),
            _ => format!("Element #{id}"),
        }
    }

    pub fn equip_type_name(&self, id: i64) -> String {
        match usize::try_from(id).ok().and_then(|i| self.equip_types.get(i)) {
            Some(name) if id > 0 && !name.is_empty() => name.clone(),
            _ => format!("Equip Type #{id}"),
        }
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn weapon_types(&self) -> &[String] {
        &self.weapon_types
    }

    pub fn armor_types(&self) -> &[String] {
        &self.armor_types
    }

    pub fn equip_types(&self) -> &[String] {
        &self.equip_types
    }

    pub fn skill_types(&self) -> &[String] {
        &self.skill_types
    }

    pub fn troop(&self, id: i64) -> Option<&Value> {
        find_by_id(&self.raw_troops, id)
    }

    pub fn common_event(&self, id: i64) -> Option<&Value> {
        find_by_id(&self.common_events, id)
    }

    pub fn tileset(&self, id: i64) -> Option<&Value> {
        find_by_id(&self.tilesets, id)
    }

    pub fn tileset_flags(&self, id: i64) -> Vec<i64> {
        self.tileset(id)
            .map(|ts| ts.list("flags").iter().filter_map(ValueExt::as_int).collect())
            .unwrap_or_default()
    }

    /// The 9-slot image list, composed from the legacy autotile/main names when absent.
    pub fn tileset_names(&self, id: i64) -> Vec<String> {
        let Some(ts) = self.tileset(id) else {
            return Vec::new();
        };

        let names = ts.list("tilesetNames");
        if !names.is_empty() {
            return string_list(names);
        }

        let main = ts.str_or("tilesetName", "").trim();
        let autotiles = ts.field("autotileNames").and_then(Value::as_array);
        if autotiles.is_none() && main.is_empty() {
            return Vec::new();
        }

        let mut out = vec![String::new(); 9];
        for (slot, name) in autotiles.into_iter().flatten().take(5).enumerate() {
            out[slot] = name.as_str().unwrap_or_default().trim().to_owned();
        }
        if !main.is_empty() {
            out[5] = main.to_owned();
        }
        out
    }

    pub fn map_infos(&self) -> &Value {
        &self.map_infos
    }

    pub fn common_events(&self) -> &Value {
        &self.common_events
    }

    pub fn items(&self) -> &Value {
        &self.raw_items
    }

    pub fn weapons(&self) -> &Value {
        &self.raw_weapons
    }

    pub fn armors(&self) -> &Value {
        &self.raw_armors
    }

    pub fn enemies(&self) -> &Value {
        &self.raw_enemies
    }

    pub fn skills(&self) -> &Value {
        &self.raw_skills
    }

    pub fn states(&self) -> &Value {
        &self.raw_states
    }

    /// Maps grouped under their parent, siblings ordered by `order`, rooted at parent 0.
    pub fn map_tree(&self) -> Vec<MapTreeNode> {
        let mut names: FastMap<i64, String> = FastMap::default();
        let mut children: FastMap<i64, Vec<(i64, i64)>> = FastMap::default();

        for info in self.map_infos.as_array().map(Vec::as_slice).unwrap_or(&[]) {
            if !info.is_object() {
                continue;
            }
            let id = info.int_or("id", 0);
            if id == 0 {
                continue;
            }
            names.insert(id, info.str_or("name", &format!("Map #{id}")).to_owned());
            children
                .entry(info.int_or("parentId", 0))
                .or_default()
                .push((info.int_or("order", 0), id));
        }
        for siblings in children.values_mut() {
            siblings.sort();
        }

        let mut visited = FastSet::default();
        Self::build_tree(0, &names, &children, &mut visited)
    }

    fn build_tree(
        parent: i64,
        names: &FastMap<i64, String>,
        children: &FastMap<i64, Vec<(i64, i64)>>,
        visited: &mut FastSet<i64>,
    ) -> Vec<MapTreeNode> {
        let mut nodes = Vec::new();
        for &(_, id) in children.get(&parent).map(Vec::as_slice).unwrap_or(&[]) {
            // A parent cycle in a hand-edited MapInfos would otherwise recurse forever.
            if !visited.insert(id) {
                continue;
            }
            nodes.push(MapTreeNode {
                id,
                name: names.get(&id).cloned().unwrap_or_else(|| format!("Map #{id}")),
                children: Self::build_tree(id, names, children, visited),
            });
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Engine;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    fn write(dir: &std::path::Path, name: &str, value: Value) {
        fs::write(dir.join(name), value.to_string()).unwrap();
    }

    fn database(tables: &[(&str, Value)]) -> Database {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in tables {
            write(dir.path(), name, value.clone());
        }
        Database::load(&DataLoader::new(dir.path(), Engine::Mv))
    }

    #[test]
    fn test_name_fallbacks() {
        let db = database(&[
            (
                "Items.json",
                json!([null, {"id": 1, "name": " Potion ", "itypeId": 1}, {"id": 2, "name": "", "itypeId": 2}]),
            ),
            ("System.json", json!({"switches": ["", "Door open", "  "], "variables": []})),
        ]);

        assert_eq!(db.item_name(1), "Potion");
        assert_eq!(db.item_name(2), "Item #2");
        assert_eq!(db.item_name(9), "Item #9");
        assert!(db.is_key_item(2));
        assert!(!db.is_key_item(1));
        assert_eq!(db.switch_name(1), "Door open");
        assert_eq!(db.switch_name(2), "Switch #2");
        assert_eq!(db.switch_name(0), "Switch #0");
        assert_eq!(db.variable_name(4), "Variable #4");
        assert_eq!(db.map_name(3), "Map #3");
    }

    #[test]
    fn test_element_and_equip_type_names() {
        let db = database(&[(
            "System.json",
            json!({"elements": ["", "Fire"], "equipTypes": ["", "Weapon", ""]}),
        )]);
        assert_eq!(db.element_name(1), "Fire");
        assert_eq!(db.element_name(0), "Element #0");
        assert_eq!(db.element_name(5), "Element #5");
        assert_eq!(db.equip_type_name(1), "Weapon");
        assert_eq!(db.equip_type_name(2), "Equip Type #2");
    }

    #[test]
    fn test_tileset_names_from_legacy_fields() {
        let db = database(&[(
            "Tilesets.json",
            json!([
                null,
                {"id": 1, "name": "Field", "autotileNames": ["Sea", "Grass", "Lava"], "tilesetName": "World"},
                {"id": 2, "name": "Town", "tilesetNames": ["A1", "A2"], "flags": [16, 15]}
            ]),
        )]);
        assert_eq!(
            db.tileset_names(1),
            vec!["Sea", "Grass", "Lava", "", "", "World", "", "", ""]
        );
        assert_eq!(db.tileset_names(2), vec!["A1", "A2"]);
        assert_eq!(db.tileset_flags(2), vec![16, 15]);
        assert!(db.tileset_names(3).is_empty());
    }

    #[test]
    fn test_map_tree_orders_siblings_and_survives_cycles() {
        let db = database(&[(
            "MapInfos.json",
            json!([
                null,
                {"id": 1, "name": "World", "parentId": 0, "order": 2},
                {"id": 2, "name": "Town", "parentId": 0, "order": 1},
                {"id": 3, "name": "Inn", "parentId": 2, "order": 1},
                {"id": 4, "name": "Loop A", "parentId": 5, "order": 1},
                {"id": 5, "name": "Loop B", "parentId": 4, "order": 1}
            ]),
        )]);

        insta::assert_json_snapshot!(db.map_tree(), @r###"
        [
          {
            "id": 2,
            "name": "Town",
            "children": [
              {
                "id": 3,
                "name": "Inn",
                "children": []
              }
            ]
          },
          {
            "id": 1,
            "name": "World",
            "children": []
          }
        ]
        "###);
    }

    #[test]
    fn test_map_tree_handles_long_chains() {
        let mut infos = vec![Value::Null];
        for id in 1..=2000i64 {
            infos.push(json!({"id": id, "name": format!("Floor {id}"), "parentId": id - 1, "order": id}));
        }
        // Points back into the chain.
        infos.push(json!({"id": 1, "name": "Duplicate", "parentId": 1500, "order": 1}));
        let db = database(&[("MapInfos.json", Value::Array(infos))]);

        let mut depth = 0;
        let mut level = db.map_tree();
        while let Some(node) = level.pop() {
            depth += 1;
            level = node.children;
        }
        assert_eq!(depth, 2000);
    }
}
