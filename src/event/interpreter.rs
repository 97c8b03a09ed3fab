use serde::Serialize;
use serde_json::Value;

use crate::database::Database;
use crate::event::model::{Command, Conditions, Event, Page};
use crate::event::opcode::Opcode;
use crate::event::params::Params;
use crate::event::refs::{CrossRef, Encounter, MapContext, RefKind, TroopEnemy, TroopRef};
use crate::utils::{FastMap, ValueExt};

const STORY_REASON: &str = "Story (dialogue/choice/script)";

/// What an event mostly does, by the highest-priority command found on any of its pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Treasure,
    Transfer,
    Battle,
    Dialog,
    Other,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Treasure => "treasure",
            EventKind::Transfer => "transfer",
            EventKind::Battle => "battle",
            EventKind::Dialog => "dialog",
            EventKind::Other => "other",
        }
    }
}

/// Visual category of an interpreted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineClass {
    #[serde(rename = "cmd-talk")]
    Talk,
    #[serde(rename = "cmd-talk-text")]
    TalkText,
    #[serde(rename = "cmd-choice")]
    Choice,
    #[serde(rename = "cmd-choice-branch")]
    ChoiceBranch,
    #[serde(rename = "cmd-cond")]
    Condition,
    #[serde(rename = "cmd-switch")]
    Switch,
    #[serde(rename = "cmd-var")]
    Variable,
    #[serde(rename = "cmd-gold")]
    Gold,
    #[serde(rename = "cmd-item")]
    Item,
    #[serde(rename = "cmd-transfer")]
    Transfer,
    #[serde(rename = "cmd-battle")]
    Battle,
    #[serde(rename = "cmd-common-event")]
    CommonEvent,
    #[serde(rename = "cmd-comment")]
    Comment,
    #[serde(rename = "cmd-script")]
    Script,
    #[serde(rename = "cmd-misc")]
    Misc,
    #[serde(rename = "cmd-unknown")]
    Unknown,
}

/// One readable line produced from one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandLine {
    pub indent: i64,
    pub text: String,
    pub cls: LineClass,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<CrossRef>,
}

/// Character sheet and face shown for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageVisual {
    pub character_name: String,
    pub character_index: i64,
    pub is_big_character: bool,
    pub direction: i64,
    pub pattern: i64,
    pub face_name: String,
    pub face_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    /// 1-based page number.
    pub index: usize,
    pub trigger: String,
    pub conditions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual: Option<PageVisual>,
    pub commands: Vec<CommandLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    pub id: i64,
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub page_count: usize,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub pages: Vec<PageResult>,
}

pub fn trigger_name(trigger: i64) -> String {
    match trigger {
        0 => "Action Button".to_owned(),
        1 => "Player Touch".to_owned(),
        2 => "Event Touch".to_owned(),
        3 => "Autorun".to_owned(),
        4 => "Parallel".to_owned(),
        other => format!("Unknown ({other})"),
    }
}

/// Event classification; treasure outranks transfer, then battle, then dialogue.
pub fn classify_event(event: &Event) -> EventKind {
    let mut found = [false; 4];
    for cmd in event.commands() {
        let p = Params::new(&cmd.parameters);
        let slot = match cmd.opcode() {
            // Only an "increase" operation makes a chest.
            Opcode::ChangeItems | Opcode::ChangeWeapons | Opcode::ChangeArmors
                if p.exact_int(1) == Some(0) =>
            {
                0
            }
            Opcode::ChangeGold if p.exact_int(0) == Some(0) => 0,
            Opcode::TransferPlayer => 1,
            Opcode::BattleProcessing => 2,
            Opcode::ShowText => 3,
            _ => continue,
        };
        found[slot] = true;
    }

    [
        EventKind::Treasure,
        EventKind::Transfer,
        EventKind::Battle,
        EventKind::Dialog,
    ]
    .into_iter()
    .zip(found)
    .find_map(|(kind, hit)| hit.then_some(kind))
    .unwrap_or(EventKind::Other)
}

pub fn is_story_page(commands: &[Command]) -> bool {
    commands.iter().any(|cmd| cmd.opcode().is_story())
}

/// The first face graphic shown by a dialogue command on the page.
fn face_from_commands(commands: &[Command]) -> Option<(String, i64)> {
    commands
        .iter()
        .filter(|cmd| cmd.opcode() == Opcode::ShowText)
        .find_map(|cmd| {
            let p = Params::new(&cmd.parameters);
            let name = p.get(0)?.as_str()?.trim();
            (!name.is_empty()).then(|| (name.to_owned(), p.int(1)))
        })
}

fn page_visual(image: &Value, face: Option<(String, i64)>) -> Option<PageVisual> {
    let str_of = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| image.field(k).and_then(Value::as_str).filter(|s| !s.is_empty()))
            .unwrap_or_default()
            .trim()
            .to_owned()
    };
    let int_of = |keys: &[&str]| keys.iter().find_map(|k| image.int_field(k));

    let character_name = str_of(&["characterName", "character_name"]);
    let is_big_character =
        image.bool_or("isBigCharacter", false) || character_name.starts_with('$');

    let (face_name, face_index) = match face {
        Some(face) => face,
        None => {
            let name = str_of(&["faceName", "face_name"]);
            let index = int_of(&["faceIndex", "face_index"]).unwrap_or(0);
            (name, index)
        }
    };
    let face_index = if face_name.is_empty() { 0 } else { face_index };

    if character_name.is_empty() && face_name.is_empty() {
        return None;
    }

    Some(PageVisual {
        character_index: int_of(&["characterIndex", "character_index"]).unwrap_or(0),
        is_big_character,
        direction: int_of(&["direction", "characterDirection"])
            .filter(|d| *d != 0)
            .unwrap_or(2),
        pattern: int_of(&["pattern", "characterPattern"])
            .filter(|p| *p != 0)
            .unwrap_or(1),
        character_name,
        face_name,
        face_index,
    })
}

/// Translates event instruction streams into readable lines with cross-references.
///
/// The interpreter only reads the database. Map-scoped state lives in a [`MapContext`] that
/// is either passed explicitly to the `*_in` methods or stored with [`set_map_context`]; an
/// instance holding a context must not be shared between concurrent requests for different
/// maps.
///
/// [`set_map_context`]: EventInterpreter::set_map_context
#[derive(Debug, Clone)]
pub struct EventInterpreter<'db> {
    pub(crate) db: &'db Database,
    context: Option<MapContext>,
}

impl<'db> EventInterpreter<'db> {
    pub fn new(db: &'db Database) -> Self {
        EventInterpreter { db, context: None }
    }

    pub fn database(&self) -> &'db Database {
        self.db
    }

    /// Builds the context for `map`, expanding its encounter table into troop compositions.
    pub fn map_context(&self, map_id: i64, map_name: &str, map: &Value) -> MapContext {
        let encounters = map
            .list("encounterList")
            .iter()
            .filter(|e| e.is_object())
            .filter_map(|e| {
                let troop_id = e.int_or("troopId", 0);
                if troop_id == 0 {
                    return None;
                }
                Some(Encounter {
                    troop_id,
                    troop_name: self.db.troop_name(troop_id),
                    weight: e.int_or("weight", 1),
                    region_set: e.list("regionSet").iter().filter_map(ValueExt::as_int).collect(),
                    enemies: self.troop_enemies(troop_id),
                })
            })
            .collect();

        MapContext {
            map_id,
            map_name: map_name.to_owned(),
            encounter_step: map.int_field("encounterStep"),
            encounters,
        }
    }

    pub fn set_map_context(&mut self, map_id: i64, map_name: &str, map: &Value) {
        self.context = Some(self.map_context(map_id, map_name, map));
    }

    pub fn clear_map_context(&mut self) {
        self.context = None;
    }

    pub fn context(&self) -> Option<&MapContext> {
        self.context.as_ref()
    }

    /// Troop members counted per enemy id, ascending.
    pub(crate) fn troop_enemies(&self, troop_id: i64) -> Vec<TroopEnemy> {
        let Some(troop) = self.db.troop(troop_id) else {
            return Vec::new();
        };

        let mut counts: FastMap<i64, (u32, u32)> = FastMap::default();
        for member in troop.list("members").iter().filter(|m| m.is_object()) {
            let enemy_id = member.int_or("enemyId", 0);
            if enemy_id == 0 {
                continue;
            }
            let entry = counts.entry(enemy_id).or_default();
            entry.0 += 1;
            if member.bool_or("hidden", false) {
                entry.1 += 1;
            }
        }

        let mut enemies: Vec<TroopEnemy> = counts
            .into_iter()
            .map(|(id, (count, hidden))| TroopEnemy {
                id,
                name: self.db.enemy_name(id),
                count,
                hidden,
            })
            .collect();
        enemies.sort_by_key(|e| e.id);
        enemies
    }

    pub(crate) fn troop_ref(
        &self,
        troop_id: i64,
        method: i64,
        can_escape: bool,
        can_lose: bool,
    ) -> Option<CrossRef> {
        if troop_id == 0 {
            return None;
        }
        let method_label = match method {
            0 => "Fixed troop",
            1 => "Troop from variable",
            2 => "Random encounter",
            _ => "Battle",
        };
        Some(CrossRef::Troop(TroopRef {
            kind: RefKind::Troop,
            id: troop_id,
            name: self.db.troop_name(troop_id),
            method,
            method_label: method_label.to_owned(),
            can_escape,
            can_lose,
            enemies: self.troop_enemies(troop_id),
            special: false,
            special_reason: None,
        }))
    }

    /// Readable lines for the active appearance predicates; all of them must hold.
    pub fn conditions_text(&self, cond: &Conditions) -> Vec<String> {
        let mut texts = Vec::new();
        for switch in [cond.switch1, cond.switch2].into_iter().flatten() {
            texts.push(format!("Switch [{}] is ON", self.db.switch_name(switch)));
        }
        if let Some((id, value)) = cond.variable {
            texts.push(format!("Variable [{}] >= {}", self.db.variable_name(id), value));
        }
        if let Some(ch) = &cond.self_switch {
            texts.push(format!("Self Switch {ch} is ON"));
        }
        if let Some(item) = cond.item {
            texts.push(format!("Has item [{}]", self.db.item_name(item)));
        }
        if let Some(actor) = cond.actor {
            texts.push(format!("Actor #{actor} is in the party"));
        }
        texts
    }

    pub fn interpret_commands(&self, commands: &[Command]) -> Vec<CommandLine> {
        self.interpret_commands_in(commands, self.context.as_ref())
    }

    pub fn interpret_commands_in(
        &self,
        commands: &[Command],
        ctx: Option<&MapContext>,
    ) -> Vec<CommandLine> {
        commands
            .iter()
            .filter_map(|cmd| {
                let line = self.translate(cmd.opcode(), Params::new(&cmd.parameters), ctx)?;
                (!line.text.is_empty()).then(|| CommandLine {
                    indent: cmd.indent,
                    text: line.text,
                    cls: line.class,
                    refs: line.refs,
                })
            })
            .collect()
    }

    /// Interprets a raw canonical command list (`[{code, indent, parameters}]`).
    pub fn interpret_command_values(&self, list: &[Value]) -> Vec<CommandLine> {
        self.interpret_commands(&Command::list_from_value(list))
    }

    fn interpret_page(&self, page: &Page, index: usize, ctx: Option<&MapContext>) -> PageResult {
        let mut commands = self.interpret_commands_in(&page.list, ctx);
        if is_story_page(&page.list) {
            commands
                .iter_mut()
                .filter(|line| line.cls == LineClass::Battle)
                .flat_map(|line| line.refs.iter_mut())
                .filter(|r| matches!(r.kind(), RefKind::Troop | RefKind::Encounter))
                .for_each(|r| r.mark_special(STORY_REASON));
        }

        PageResult {
            index: index + 1,
            trigger: trigger_name(page.trigger),
            conditions: self.conditions_text(&page.conditions),
            visual: page_visual(&page.image, face_from_commands(&page.list)),
            commands,
        }
    }

    pub fn interpret_event(&self, event: &Event) -> EventResult {
        self.interpret_event_in(event, self.context.as_ref())
    }

    pub fn interpret_event_in(&self, event: &Event, ctx: Option<&MapContext>) -> EventResult {
        let pages = event
            .pages
            .iter()
            .enumerate()
            .filter_map(|(i, page)| Some(self.interpret_page(page.as_ref()?, i, ctx)))
            .collect();

        EventResult {
            id: event.id,
            name: event.name.clone(),
            x: event.x,
            y: event.y,
            page_count: event.pages.len(),
            kind: classify_event(event),
            pages,
        }
    }

    /// Interprets a raw canonical event record, `None` when it is not a record at all.
    pub fn interpret_event_value(&self, event: &Value) -> Option<EventResult> {
        Event::from_value(event).map(|e| self.interpret_event(&e))
    }
}
