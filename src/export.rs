//! Markdown walkthrough export of maps: treasures, key events, transfers, battles and NPCs.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::Value;

use crate::database::Database;
use crate::event::{Conditions, Encounter, EventInterpreter, Opcode, Params, TroopEnemy};
use crate::loader::DataLoader;
use crate::session::ProjectSession;
use crate::utils::ValueExt;

const NONE_LINE: &str = "- None";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Treasure {
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub items: Vec<String>,
    pub conditions: Vec<String>,
}

/// An event that flips switches or consumes key items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub switch_ops: Vec<String>,
    pub key_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferPoint {
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BattleEvent {
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub troops: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Npc {
    pub name: String,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapExport {
    pub id: i64,
    pub name: String,
    pub width: i64,
    pub height: i64,
    pub encounter_step: Option<i64>,
    pub encounters: Vec<Encounter>,
    pub treasures: Vec<Treasure>,
    pub key_events: Vec<KeyEvent>,
    pub transfers: Vec<TransferPoint>,
    pub battles: Vec<BattleEvent>,
    pub npcs: Vec<Npc>,
}

/// What one event contributes to the export, gathered over all of its pages.
#[derive(Debug, Default)]
struct EventSummary {
    has_dialog: bool,
    treasure_items: Vec<String>,
    treasure_conditions: Vec<String>,
    transfer_targets: Vec<String>,
    switch_ops: Vec<String>,
    key_item_consumes: Vec<String>,
    troops: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, entry: String) {
    if !list.contains(&entry) {
        list.push(entry);
    }
}

fn enemy_list(enemies: &[TroopEnemy]) -> String {
    if enemies.is_empty() {
        return "(no members)".to_owned();
    }
    enemies
        .iter()
        .map(|e| {
            if e.count > 1 {
                format!("{} x{}", e.name, e.count)
            } else {
                e.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_or(list: &[String], separator: &str, fallback: &str) -> String {
    if list.is_empty() {
        fallback.to_owned()
    } else {
        list.join(separator)
    }
}

pub struct MapExporter<'a> {
    loader: &'a DataLoader,
    db: &'a Database,
    interpreter: EventInterpreter<'a>,
}

impl<'a> MapExporter<'a> {
    pub fn new(loader: &'a DataLoader, db: &'a Database) -> Self {
        MapExporter {
            loader,
            db,
            interpreter: EventInterpreter::new(db),
        }
    }

    pub fn for_session(session: &'a ProjectSession) -> Self {
        Self::new(session.loader(), session.database())
    }

    /// A constant, or a variable reference when `operand_type` is non-zero.
    fn amount(&self, operand_type: i64, value: i64) -> String {
        if operand_type == 0 {
            value.to_string()
        } else {
            format!("Variable [{}]", self.db.variable_name(value))
        }
    }

    fn summarize(&self, event: &Value) -> EventSummary {
        let mut summary = EventSummary::default();

        for page in event.list("pages").iter().filter(|p| p.is_object()) {
            let conditions = page
                .field("conditions")
                .map(Conditions::from_value)
                .unwrap_or_default();
            let mut page_treasure = Vec::new();

            for command in page.list("list").iter().filter(|c| c.is_object()) {
                let p = Params::new(command.list("parameters"));
                match Opcode::from_code(command.int_or("code", 0)) {
                    Opcode::ShowText | Opcode::TextLine => summary.has_dialog = true,
                    Opcode::ControlSwitches => {
                        let first = p.int(0);
                        let last = p.int_or(1, first);
                        let state = if p.is_zero(2) { "ON" } else { "OFF" };
                        let name = if first == last {
                            self.db.switch_name(first)
                        } else {
                            format!("{}~{}", self.db.switch_name(first), self.db.switch_name(last))
                        };
                        push_unique(&mut summary.switch_ops, format!("{name}={state}"));
                    }
                    Opcode::ControlSelfSwitch => {
                        let ch = p.text_or(0, "A");
                        let state = if p.is_zero(1) { "ON" } else { "OFF" };
                        push_unique(&mut summary.switch_ops, format!("Self Switch {ch}={state}"));
                    }
                    Opcode::TransferPlayer => {
                        let target = if p.is_zero(0) {
                            let map_id = p.int(1);
                            format!(
                                "{} (#{map_id}) ({},{})",
                                self.db.map_name(map_id),
                                p.int(2),
                                p.int(3)
                            )
                        } else {
                            "Location from variables".to_owned()
                        };
                        push_unique(&mut summary.transfer_targets, target);
                    }
                    Opcode::BattleProcessing => {
                        let troop = match p.int(0) {
                            0 => self.db.troop_name(p.int(1)),
                            1 => format!("Troop [Variable {}]", self.db.variable_name(p.int(1))),
                            _ => "Random encounter".to_owned(),
                        };
                        push_unique(&mut summary.troops, troop);
                    }
                    Opcode::ChangeGold if p.is_zero(0) => {
                        page_treasure.push(format!("Gold +{}", self.amount(p.int(1), p.int(2))));
                    }
                    op @ (Opcode::ChangeItems | Opcode::ChangeWeapons | Opcode::ChangeArmors)
                        if p.get(1).is_some() =>
                    {
                        let id = p.int(0);
                        let amount = self.amount(p.int(2), p.int(3));
                        match (op, p.int(1)) {
                            (Opcode::ChangeItems, 1) if self.db.is_key_item(id) => push_unique(
                                &mut summary.key_item_consumes,
                                format!("{} x{amount}", self.db.item_name(id)),
                            ),
                            (_, 0) => {
                                let (label, name) = match op {
                                    Opcode::ChangeItems => ("Item", self.db.item_name(id)),
                                    Opcode::ChangeWeapons => ("Weapon", self.db.weapon_name(id)),
                                    _ => ("Armor", self.db.armor_name(id)),
                                };
                                page_treasure.push(format!("{label}: {name} x{amount}"));
                            }
                            _ => {}
                        }
                    }
                    _ => {}
                }
            }

            // The first page that grants anything is the one the player opens.
            if !page_treasure.is_empty() && summary.treasure_items.is_empty() {
                summary.treasure_items = page_treasure;
                summary.treasure_conditions = self.interpreter.conditions_text(&conditions);
            }
        }

        summary
    }

    /// The structured export of one map, `None` when the map file is missing.
    pub fn build_map_export(&self, map_id: i64) -> Option<MapExport> {
        let map = self.loader.load(&ProjectSession::map_file_name(map_id))?;
        let name = self.db.map_name(map_id);
        let ctx = self.interpreter.map_context(map_id, &name, &map);

        let mut export = MapExport {
            id: map_id,
            name,
            width: map.int_or("width", 0),
            height: map.int_or("height", 0),
            encounter_step: ctx.encounter_step,
            encounters: ctx.encounters,
            treasures: Vec::new(),
            key_events: Vec::new(),
            transfers: Vec::new(),
            battles: Vec::new(),
            npcs: Vec::new(),
        };

        for event in map.list("events").iter().filter(|e| e.is_object()) {
            let summary = self.summarize(event);
            let name = match event.str_or("name", "") {
                "" => "(unnamed)".to_owned(),
                name => name.to_owned(),
            };
            let (x, y) = (event.int_or("x", 0), event.int_or("y", 0));

            let is_treasure = !summary.treasure_items.is_empty();
            let is_transfer = !summary.transfer_targets.is_empty();
            let is_key = !summary.switch_ops.is_empty() || !summary.key_item_consumes.is_empty();
            let is_battle = !summary.troops.is_empty();

            if is_treasure {
                export.treasures.push(Treasure {
                    name: name.clone(),
                    x,
                    y,
                    items: summary.treasure_items,
                    conditions: summary.treasure_conditions,
                });
            }
            if is_key {
                export.key_events.push(KeyEvent {
                    name: name.clone(),
                    x,
                    y,
                    switch_ops: summary.switch_ops,
                    key_items: summary.key_item_consumes,
                });
            }
            if is_transfer {
                export.transfers.push(TransferPoint {
                    name: name.clone(),
                    x,
                    y,
                    targets: summary.transfer_targets,
                });
            }
            if is_battle {
                export.battles.push(BattleEvent {
                    name: name.clone(),
                    x,
                    y,
                    troops: summary.troops,
                });
            }
            if summary.has_dialog && !(is_treasure || is_transfer || is_key || is_battle) {
                export.npcs.push(Npc { name, x, y });
            }
        }

        Some(export)
    }

    /// Ids of every listed map ordered by `(order, id)`, without duplicates.
    pub fn all_map_ids(&self) -> Vec<i64> {
        let mut entries: Vec<(i64, i64)> = Vec::new();
        for info in self.db.map_infos().as_array().into_iter().flatten() {
            let id = info.int_or("id", 0);
            if id == 0 || entries.iter().any(|&(_, seen)| seen == id) {
                continue;
            }
            entries.push((info.int_or("order", 0), id));
        }
        entries.sort_unstable();
        entries.into_iter().map(|(_, id)| id).collect()
    }

    fn write_map(&self, out: &mut String, export: &MapExport) -> std::fmt::Result {
        writeln!(out, "## {} (#{})", export.name, export.id)?;
        writeln!(out)?;
        write!(out, "Size: {}x{}", export.width, export.height)?;
        if let Some(step) = export.encounter_step {
            write!(out, " | Encounter steps: {step}")?;
        }
        writeln!(out)?;
        writeln!(out)?;

        writeln!(out, "### Encounters")?;
        if export.encounters.is_empty() {
            writeln!(out, "{NONE_LINE}")?;
        }
        for encounter in &export.encounters {
            write!(
                out,
                "- {} (weight {}): {}",
                encounter.troop_name,
                encounter.weight,
                enemy_list(&encounter.enemies)
            )?;
            if !encounter.region_set.is_empty() {
                let regions: Vec<String> = encounter.region_set.iter().map(i64::to_string).collect();
                write!(out, " | Regions: {}", regions.join(", "))?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;

        writeln!(out, "### Treasure")?;
        if export.treasures.is_empty() {
            writeln!(out, "{NONE_LINE}")?;
        }
        for t in &export.treasures {
            writeln!(
                out,
                "- ({},{}) {} | {} | Conditions: {}",
                t.x,
                t.y,
                t.name,
                join_or(&t.items, ", ", "Unknown"),
                join_or(&t.conditions, "; ", "None")
            )?;
        }
        writeln!(out)?;

        writeln!(out, "### Key Events")?;
        if export.key_events.is_empty() {
            writeln!(out, "{NONE_LINE}")?;
        }
        for k in &export.key_events {
            write!(out, "- ({},{}) {}", k.x, k.y, k.name)?;
            if !k.switch_ops.is_empty() {
                write!(out, " | Switches: {}", k.switch_ops.join("; "))?;
            }
            if !k.key_items.is_empty() {
                write!(out, " | Consumes: {}", k.key_items.join(", "))?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;

        writeln!(out, "### Transfers")?;
        if export.transfers.is_empty() {
            writeln!(out, "{NONE_LINE}")?;
        }
        for tr in &export.transfers {
            writeln!(out, "- ({},{}) {} -> {}", tr.x, tr.y, tr.name, tr.targets.join("; "))?;
        }
        writeln!(out)?;

        writeln!(out, "### Battles")?;
        if export.battles.is_empty() {
            writeln!(out, "{NONE_LINE}")?;
        }
        for b in &export.battles {
            writeln!(out, "- ({},{}) {} | {}", b.x, b.y, b.name, b.troops.join("; "))?;
        }
        writeln!(out)?;

        writeln!(out, "### NPC")?;
        if export.npcs.is_empty() {
            writeln!(out, "{NONE_LINE}")?;
        }
        for n in &export.npcs {
            writeln!(out, "- ({},{}) {}", n.x, n.y, n.name)?;
        }
        writeln!(out)
    }

    /// Markdown for the given maps; missing maps are skipped.
    pub fn export_markdown(&self, map_ids: &[i64]) -> String {
        let mut out = String::from("# Walkthrough Export\n\n");
        for &map_id in map_ids {
            if let Some(export) = self.build_map_export(map_id) {
                // Writing into a String cannot fail.
                let _ = self.write_map(&mut out, &export);
            }
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        out
    }

    pub fn export_all_markdown(&self) -> String {
        self.export_markdown(&self.all_map_ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Engine;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;

    fn command(code: i64, parameters: Value) -> Value {
        json!({"code": code, "indent": 0, "parameters": parameters})
    }

    fn event(id: i64, name: &str, x: i64, y: i64, pages: Value) -> Value {
        json!({"id": id, "name": name, "x": x, "y": y, "pages": pages})
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, value: Value| {
            fs::write(dir.path().join(name), value.to_string()).unwrap();
        };
        write(
            "MapInfos.json",
            json!([null, {"id": 1, "name": "Village", "parentId": 0, "order": 2},
                   {"id": 2, "name": "Cave", "parentId": 0, "order": 1}]),
        );
        write("Items.json", json!([null, {"id": 1, "name": "Potion", "itypeId": 1},
                                   {"id": 2, "name": "Old Key", "itypeId": 2}]));
        write("Enemies.json", json!([null, {"id": 1, "name": "Slime"}]));
        write("Troops.json", json!([null, {"id": 1, "name": "Slime*2",
            "members": [{"enemyId": 1, "hidden": false}, {"enemyId": 1, "hidden": false}]}]));
        write("System.json", json!({"switches": ["", "Gate Open"], "variables": [""]}));
        write(
            "Map001.json",
            json!({
                "width": 20, "height": 15, "encounterStep": 30,
                "encounterList": [{"troopId": 1, "weight": 5, "regionSet": []}],
                "events": [
                    null,
                    event(1, "Chest", 3, 4, json!([
                        {"conditions": {}, "list": [
                            command(126, json!([1, 0, 0, 2])),
                            command(125, json!([0, 0, 50])),
                            command(123, json!(["A", 0])),
                            command(0, json!([])),
                        ]},
                        {"conditions": {"selfSwitchValid": true, "selfSwitchCh": "A"}, "list": [
                            command(126, json!([1, 0, 0, 9])),
                        ]}
                    ])),
                    event(2, "Door", 5, 0, json!([{"list": [
                        command(201, json!([0, 2, 7, 8, 0, 0])),
                        command(201, json!([0, 2, 7, 8, 0, 0])),
                    ]}])),
                    event(3, "Gate", 9, 9, json!([{"list": [
                        command(126, json!([2, 1, 0, 1])),
                        command(121, json!([1, 1, 0])),
                    ]}])),
                    event(4, "", 1, 1, json!([{"list": [
                        command(101, json!(["", 0, 0, 2])),
                        command(401, json!(["Hello"])),
                    ]}])),
                    event(5, "Guard", 2, 2, json!([{"list": [
                        command(301, json!([0, 1, true, false])),
                    ]}])),
                ]
            }),
        );
        dir
    }

    #[test]
    fn test_build_map_export() {
        let dir = project();
        let loader = DataLoader::new(dir.path(), Engine::Mv);
        let db = Database::load(&loader);
        let exporter = MapExporter::new(&loader, &db);

        assert_eq!(exporter.all_map_ids(), vec![2, 1]);
        assert!(exporter.build_map_export(2).is_none());

        let export = exporter.build_map_export(1).unwrap();
        assert_eq!(export.name, "Village");
        assert_eq!(export.encounters.len(), 1);

        assert_eq!(export.treasures.len(), 1);
        assert_eq!(export.treasures[0].items, vec!["Item: Potion x2", "Gold +50"]);
        assert!(export.treasures[0].conditions.is_empty());

        assert_eq!(export.transfers[0].targets, vec!["Cave (#2) (7,8)"]);

        let names: Vec<&str> = export.key_events.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["Chest", "Gate"]);
        assert_eq!(export.key_events[1].switch_ops, vec!["Gate Open=ON"]);
        assert_eq!(export.key_events[1].key_items, vec!["Old Key x1"]);

        assert_eq!(export.battles[0].troops, vec!["Slime*2"]);
        assert_eq!(export.npcs, vec![Npc { name: "(unnamed)".to_owned(), x: 1, y: 1 }]);
    }

    #[test]
    fn test_export_markdown() {
        let dir = project();
        let loader = DataLoader::new(dir.path(), Engine::Mv);
        let db = Database::load(&loader);
        let markdown = MapExporter::new(&loader, &db).export_all_markdown();

        assert!(markdown.starts_with("# Walkthrough Export\n\n## Village (#1)\n\nSize: 20x15 | Encounter steps: 30\n"));
        assert!(markdown.contains("- Slime*2 (weight 5): Slime x2\n"));
        assert!(markdown.contains("- (3,4) Chest | Item: Potion x2, Gold +50 | Conditions: None\n"));
        assert!(markdown.contains("- (9,9) Gate | Switches: Gate Open=ON | Consumes: Old Key x1\n"));
        assert!(markdown.contains("- (5,0) Door -> Cave (#2) (7,8)\n"));
        assert!(markdown.contains("- (2,2) Guard | Slime*2\n"));
        assert!(markdown.ends_with("### NPC\n- (1,1) (unnamed)\n"));
    }
}
