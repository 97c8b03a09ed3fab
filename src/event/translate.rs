//! Per-opcode rendering of single commands.

use crate::event::interpreter::{EventInterpreter, LineClass};
use crate::event::opcode::Opcode;
use crate::event::params::{Params, render};
use crate::event::refs::{CrossRef, EncounterRef, ItemRef, MapContext, RefKind, TransferRef};

/// A translated command before it is positioned in the page.
#[derive(Debug, Clone)]
pub(crate) struct Translated {
    pub text: String,
    pub class: LineClass,
    pub refs: Vec<CrossRef>,
}

impl Translated {
    fn with_ref(mut self, cross_ref: Option<CrossRef>) -> Self {
        self.refs.extend(cross_ref);
        self
    }
}

fn line(text: impl Into<String>, class: LineClass) -> Option<Translated> {
    Some(Translated {
        text: text.into(),
        class,
        refs: Vec::new(),
    })
}

fn on_off(p: &Params<'_>, index: usize) -> &'static str {
    if p.is_zero(index) { "ON" } else { "OFF" }
}

fn sign(p: &Params<'_>, index: usize) -> &'static str {
    if p.is_zero(index) { "+" } else { "-" }
}

fn allowed(p: &Params<'_>, index: usize) -> &'static str {
    if p.is_zero(index) { "Disabled" } else { "Enabled" }
}

fn character(id: i64) -> String {
    match id {
        -1 => "Player".to_owned(),
        0 => "This Event".to_owned(),
        id => format!("Event #{id}"),
    }
}

fn vehicle(id: i64) -> &'static str {
    match id {
        0 => "Boat",
        1 => "Ship",
        2 => "Airship",
        _ => "Vehicle",
    }
}

fn direction(dir: i64) -> &'static str {
    match dir {
        2 => "Down",
        4 => "Left",
        6 => "Right",
        8 => "Up",
        _ => "?",
    }
}

fn param_name(index: i64) -> &'static str {
    match index {
        0 => "Max HP",
        1 => "Max MP",
        2 => "Attack",
        3 => "Defense",
        4 => "M.Attack",
        5 => "M.Defense",
        6 => "Agility",
        7 => "Luck",
        _ => "?",
    }
}

fn balloon(id: i64) -> String {
    let name = match id {
        1 => "Exclamation",
        2 => "Question",
        3 => "Music Note",
        4 => "Heart",
        5 => "Anger",
        6 => "Sweat",
        7 => "Cobweb",
        8 => "Silence",
        9 => "Light Bulb",
        10 => "Zzz",
        11 => "User-defined 1",
        other => return format!("#{other}"),
    };
    name.to_owned()
}

impl EventInterpreter<'_> {
    fn item_ref(&self, kind: RefKind, id: i64, name: &str) -> Option<CrossRef> {
        if id == 0 || name.is_empty() {
            return None;
        }
        Some(CrossRef::Item(ItemRef {
            kind,
            id,
            name: name.to_owned(),
        }))
    }

    /// Item/weapon/armor by the `0/1/2` goods type used by shops.
    fn goods(&self, goods_type: i64, id: i64) -> (&'static str, String, Option<RefKind>) {
        match goods_type {
            0 => ("Item", self.db.item_name(id), Some(RefKind::Items)),
            1 => ("Weapon", self.db.weapon_name(id), Some(RefKind::Weapons)),
            2 => ("Armor", self.db.armor_name(id), Some(RefKind::Armors)),
            _ => ("?", format!("#{id}"), None),
        }
    }

    /// `value` or `Variable [name]` depending on the operand-type slot.
    fn operand(&self, p: &Params<'_>, type_index: usize, value_index: usize) -> String {
        let value = p.int(value_index);
        if p.int(type_index) == 1 {
            format!("Variable [{}]", self.db.variable_name(value))
        } else {
            value.to_string()
        }
    }

    fn encounter_ref(
        &self,
        ctx: Option<&MapContext>,
        can_escape: bool,
        can_lose: bool,
    ) -> Option<CrossRef> {
        let ctx = ctx?;
        Some(CrossRef::Encounter(EncounterRef {
            kind: RefKind::Encounter,
            name: "Random encounter".to_owned(),
            map_id: ctx.map_id,
            map_name: ctx.map_name.clone(),
            encounter_step: ctx.encounter_step,
            can_escape,
            can_lose,
            encounters: ctx.encounters.clone(),
            special: false,
            special_reason: None,
        }))
    }

    /// Renders one command. `None` for structural opcodes and for text commands without text.
    pub(crate) fn translate(
        &self,
        op: Opcode,
        p: Params<'_>,
        ctx: Option<&MapContext>,
    ) -> Option<Translated> {
        let db = self.db;
        match op {
            Opcode::ShowText => {
                let face = p.text_or(0, "");
                let position = match p.exact_int(3) {
                    Some(0) => "Top",
                    Some(1) => "Middle",
                    _ => "Bottom",
                };
                let tag = if face.is_empty() {
                    String::new()
                } else {
                    format!("Face: {face} ")
                };
                line(format!("[Show Text] ({tag}Position: {position})"), LineClass::Talk)
            }
            Opcode::TextLine | Opcode::ScrollingTextLine => {
                line(format!("\u{300c}{}\u{300d}", p.text(0)?), LineClass::TalkText)
            }
            Opcode::ShowChoices => line(
                format!("[Choices] {}", p.text_or(0, "")),
                LineClass::Choice,
            ),
            Opcode::WhenChoice => line(
                format!("[When \u{300c}{}\u{300d}]", p.text_or(1, "")),
                LineClass::ChoiceBranch,
            ),
            Opcode::WhenCancel => line("[When Cancel]", LineClass::ChoiceBranch),
            Opcode::ConditionalBranch => {
                let text = self.conditional_text(&p);
                let cross_ref = match p.exact_int(0) {
                    Some(kind @ 8..=10) => {
                        let id = p.int(1);
                        let (kind, name) = match kind {
                            8 => (RefKind::Items, db.item_name(id)),
                            9 => (RefKind::Weapons, db.weapon_name(id)),
                            _ => (RefKind::Armors, db.armor_name(id)),
                        };
                        self.item_ref(kind, id, &name)
                    }
                    _ => None,
                };
                line(text, LineClass::Condition).map(|t| t.with_ref(cross_ref))
            }
            Opcode::Else => line("[Else]", LineClass::Condition),
            Opcode::ControlSwitches => {
                let first = p.int(0);
                let last = p.int_or(1, first);
                let range = if first == last {
                    db.switch_name(first)
                } else {
                    format!("{} ~ {}", db.switch_name(first), db.switch_name(last))
                };
                line(format!("[Switch] {range} = {}", on_off(&p, 2)), LineClass::Switch)
            }
            Opcode::ControlVariables => line(self.variable_text(&p), LineClass::Variable),
            Opcode::ControlSelfSwitch => line(
                format!("[Self Switch] {} = {}", p.text_or(0, "A"), on_off(&p, 1)),
                LineClass::Switch,
            ),
            Opcode::ChangeGold => {
                let amount = if p.is_zero(1) {
                    p.int(2).to_string()
                } else {
                    format!("value of Variable [{}]", db.variable_name(p.int(2)))
                };
                line(format!("[Gold] {}{amount}", sign(&p, 0)), LineClass::Gold)
            }
            Opcode::ChangeItems | Opcode::ChangeWeapons | Opcode::ChangeArmors => {
                let id = p.int(0);
                let (label, name, kind) = match op {
                    Opcode::ChangeItems => ("Item", db.item_name(id), RefKind::Items),
                    Opcode::ChangeWeapons => ("Weapon", db.weapon_name(id), RefKind::Weapons),
                    _ => ("Armor", db.armor_name(id), RefKind::Armors),
                };
                let amount = if p.is_zero(2) {
                    p.int_or(3, 1).to_string()
                } else {
                    "variable".to_owned()
                };
                line(
                    format!("[{label}] {name} x{}{amount}", sign(&p, 1)),
                    LineClass::Item,
                )
                .map(|t| t.with_ref(self.item_ref(kind, id, &name)))
            }
            Opcode::TransferPlayer => {
                if !p.is_zero(0) {
                    return line("[Transfer] -> location from variables", LineClass::Transfer);
                }
                let (map_id, x, y) = (p.int(1), p.int(2), p.int(3));
                let name = db.map_name(map_id);
                let cross_ref = CrossRef::Transfer(TransferRef {
                    kind: RefKind::Transfer,
                    name: name.clone(),
                    map_id,
                    map_name: name.clone(),
                    x,
                    y,
                });
                line(
                    format!("[Transfer] -> {name} (ID: {map_id}) ({x},{y})"),
                    LineClass::Transfer,
                )
                .map(|t| t.with_ref(Some(cross_ref)))
            }
            Opcode::InputNumber => line(
                format!(
                    "[Input Number] -> Variable [{}] (max {} digits)",
                    db.variable_name(p.int(0)),
                    p.int_or(1, 1)
                ),
                LineClass::Misc,
            ),
            Opcode::SelectItem => {
                let item_type = match p.int_or(1, 1) {
                    1 => "Regular Item",
                    2 => "Key Item",
                    3 => "Hidden Item A",
                    4 => "Hidden Item B",
                    _ => "Item",
                };
                line(
                    format!(
                        "[Select Item] {item_type} -> Variable [{}]",
                        db.variable_name(p.int(0))
                    ),
                    LineClass::Misc,
                )
            }
            Opcode::ScrollingText => line(
                format!("[Scrolling Text] (speed: {})", p.int_or(0, 2)),
                LineClass::Talk,
            ),
            Opcode::Loop => line("[Loop]", LineClass::Condition),
            Opcode::RepeatAbove => line("[Repeat Above]", LineClass::Condition),
            Opcode::BreakLoop => line("[Break Loop]", LineClass::Condition),
            Opcode::ExitEvent => line("[Exit Event Processing]", LineClass::Condition),
            Opcode::ControlTimer => {
                if p.is_zero(0) {
                    line(format!("[Timer] Start {} s", p.int(1)), LineClass::Misc)
                } else {
                    line("[Timer] Stop", LineClass::Misc)
                }
            }
            Opcode::ChangePartyMember => {
                let action = if p.is_zero(1) { "joins" } else { "leaves" };
                let init = if p.int(2) == 1 { " (initialized)" } else { "" };
                line(
                    format!("[Party] Actor #{} {action}{init}", p.int(0)),
                    LineClass::Item,
                )
            }
            Opcode::Comment => line(format!("[Comment] {}", p.text(0)?), LineClass::Comment),
            Opcode::CommentLine => line(format!("  {}", p.text(0)?), LineClass::Comment),
            Opcode::CommonEvent => {
                let id = p.int(0);
                line(
                    format!(
                        "[Common Event] #{id} \u{300c}{}\u{300d}",
                        db.common_event_name(id)
                    ),
                    LineClass::CommonEvent,
                )
            }
            Opcode::Label => line(format!("[Label] {}", p.text(0)?), LineClass::Misc),
            Opcode::JumpToLabel => line(
                format!("[Jump] -> label \u{300c}{}\u{300d}", p.text(0)?),
                LineClass::Misc,
            ),
            Opcode::Wait => line(format!("[Wait] {} frames", p.int(0)), LineClass::Misc),
            Opcode::PlayBgm => line(format!("[BGM] {}", p.audio_name(0)?), LineClass::Misc),
            Opcode::PlayBgs => line(format!("[BGS] {}", p.audio_name(0)?), LineClass::Misc),
            Opcode::PlaySe => line(format!("[SE] {}", p.audio_name(0)?), LineClass::Misc),
            Opcode::BattleProcessing => self.battle(&p, ctx),
            Opcode::IfWin => line("[If Win]", LineClass::Battle),
            Opcode::IfEscape => line("[If Escape]", LineClass::Battle),
            Opcode::IfLose => line("[If Lose]", LineClass::Battle),
            Opcode::Script => line(format!("[Script] {}", p.text(0)?), LineClass::Script),
            Opcode::ScriptLine => line(format!("  {}", p.text(0)?), LineClass::Script),
            Opcode::PluginCommand => line(format!("[Plugin] {}", p.text(0)?), LineClass::Script),
            Opcode::SetVehicleLocation => {
                let veh = vehicle(p.int(0));
                if p.is_zero(1) {
                    line(
                        format!(
                            "[Vehicle Location] {veh} -> {} ({},{})",
                            db.map_name(p.int(2)),
                            p.int(3),
                            p.int(4)
                        ),
                        LineClass::Transfer,
                    )
                } else {
                    line(
                        format!("[Vehicle Location] {veh} -> location from variables"),
                        LineClass::Transfer,
                    )
                }
            }
            Opcode::SetEventLocation => {
                let who = character(p.int(0));
                let target = match p.int(1) {
                    0 => format!("({},{})", p.int(2), p.int(3)),
                    1 => "location from variables".to_owned(),
                    _ => format!("swap with Event #{}", p.int(2)),
                };
                line(format!("[Set Event Location] {who} -> {target}"), LineClass::Misc)
            }
            Opcode::ScrollMap => line(
                format!(
                    "[Scroll Map] {} {} tiles",
                    direction(p.int_or(0, 2)),
                    p.int(1)
                ),
                LineClass::Misc,
            ),
            Opcode::SetMovementRoute => line(
                format!("[Movement Route] {}", character(p.int(0))),
                LineClass::Misc,
            ),
            Opcode::GetOnOffVehicle => line("[Get On/Off Vehicle]", LineClass::Misc),
            Opcode::ChangeTransparency => {
                let state = if p.is_zero(0) { "Transparent" } else { "Opaque" };
                line(format!("[Transparency] {state}"), LineClass::Misc)
            }
            Opcode::ShowAnimation => line(
                format!(
                    "[Show Animation] {} Animation #{}",
                    character(p.int(0)),
                    p.int(1)
                ),
                LineClass::Misc,
            ),
            Opcode::ShowBalloon => line(
                format!(
                    "[Balloon Icon] {} {}",
                    character(p.int(0)),
                    balloon(p.int(1))
                ),
                LineClass::Misc,
            ),
            Opcode::EraseEvent => line("[Erase Event]", LineClass::Misc),
            Opcode::ChangePlayerFollowers => {
                let state = if p.is_zero(0) { "Show" } else { "Hide" };
                line(format!("[Player Followers] {state}"), LineClass::Misc)
            }
            Opcode::GatherFollowers => line("[Gather Followers]", LineClass::Misc),
            Opcode::FadeoutScreen => line("[Fadeout Screen]", LineClass::Misc),
            Opcode::FadeinScreen => line("[Fadein Screen]", LineClass::Misc),
            Opcode::TintScreen => {
                let [r, g, b, gray] = p.ints(0, [0; 4]);
                line(
                    format!("[Tint Screen] ({r},{g},{b},{gray}) {} frames", p.int(1)),
                    LineClass::Misc,
                )
            }
            Opcode::FlashScreen => {
                let [r, g, b, a] = p.ints(0, [255, 255, 255, 170]);
                line(
                    format!("[Flash Screen] ({r},{g},{b},{a}) {} frames", p.int(1)),
                    LineClass::Misc,
                )
            }
            Opcode::ShakeScreen => line(
                format!(
                    "[Shake Screen] power: {} speed: {} {} frames",
                    p.int(0),
                    p.int(1),
                    p.int(2)
                ),
                LineClass::Misc,
            ),
            Opcode::ShowPicture => line(
                format!("[Show Picture] #{} {}", p.int(0), p.text_or(1, "?")),
                LineClass::Misc,
            ),
            Opcode::MovePicture => line(format!("[Move Picture] #{}", p.int(0)), LineClass::Misc),
            Opcode::RotatePicture => line(
                format!("[Rotate Picture] #{} speed: {}", p.int(0), p.int(1)),
                LineClass::Misc,
            ),
            Opcode::TintPicture => line(format!("[Tint Picture] #{}", p.int(0)), LineClass::Misc),
            Opcode::ErasePicture => {
                line(format!("[Erase Picture] #{}", p.int(0)), LineClass::Misc)
            }
            Opcode::FadeoutBgm => line(format!("[Fadeout BGM] {} s", p.int(0)), LineClass::Misc),
            Opcode::SaveBgm => line("[Save BGM]", LineClass::Misc),
            Opcode::ResumeBgm => line("[Resume BGM]", LineClass::Misc),
            Opcode::FadeoutBgs => line(format!("[Fadeout BGS] {} s", p.int(0)), LineClass::Misc),
            Opcode::StopSe => line("[Stop SE]", LineClass::Misc),
            Opcode::PlayMovie => line(format!("[Play Movie] {}", p.text_or(0, "?")), LineClass::Misc),
            Opcode::ChangeBattleBgm => line(
                labelled_audio("[Battle BGM]", p.audio_name(0)),
                LineClass::Misc,
            ),
            Opcode::ChangeVictoryMe => line(
                labelled_audio("[Victory ME]", p.audio_name(0)),
                LineClass::Misc,
            ),
            Opcode::ChangeDefeatMe => line(
                labelled_audio("[Defeat ME]", p.audio_name(0)),
                LineClass::Misc,
            ),
            Opcode::ChangeSaveAccess => {
                line(format!("[Save Access] {}", allowed(&p, 0)), LineClass::Misc)
            }
            Opcode::ChangeMenuAccess => {
                line(format!("[Menu Access] {}", allowed(&p, 0)), LineClass::Misc)
            }
            Opcode::ChangeEncounter => {
                line(format!("[Encounter] {}", allowed(&p, 0)), LineClass::Misc)
            }
            Opcode::ChangeFormationAccess => line(
                format!("[Formation Access] {}", allowed(&p, 0)),
                LineClass::Misc,
            ),
            Opcode::ChangeWindowColor => {
                let [r, g, b] = p.ints(0, [0; 3]);
                line(format!("[Window Color] ({r},{g},{b})"), LineClass::Misc)
            }
            Opcode::ChangeVehicleBgm => line(
                format!(
                    "[Vehicle BGM] {} {}",
                    vehicle(p.int(0)),
                    p.audio_name(1).unwrap_or_else(|| "?".to_owned())
                ),
                LineClass::Misc,
            ),
            Opcode::ChangeMapNameDisplay => {
                let state = if p.is_zero(0) { "Show" } else { "Hide" };
                line(format!("[Map Name Display] {state}"), LineClass::Misc)
            }
            Opcode::ChangeTileset => {
                line(format!("[Change Tileset] #{}", p.int(0)), LineClass::Misc)
            }
            Opcode::ChangeBattleBack => line(
                format!(
                    "[Change Battle Back] {} / {}",
                    p.text_or(0, ""),
                    p.text_or(1, "")
                ),
                LineClass::Misc,
            ),
            Opcode::ChangeParallax => line(
                format!("[Change Parallax] {}", p.text_or(0, "")),
                LineClass::Misc,
            ),
            Opcode::ShopProcessing | Opcode::ShopItem => {
                let (label, name, kind) = self.goods(p.int(0), p.int(1));
                let price = if p.exact_int(2) == Some(1) {
                    format!(" (price: {})", p.int(3))
                } else {
                    String::new()
                };
                let text = if op == Opcode::ShopProcessing {
                    format!("[Shop] {label}: {name}{price}")
                } else {
                    format!("  + {label}: {name}{price}")
                };
                let cross_ref = kind.and_then(|kind| self.item_ref(kind, p.int(1), &name));
                line(text, LineClass::Item).map(|t| t.with_ref(cross_ref))
            }
            Opcode::NameInput => line(
                format!(
                    "[Name Input] Actor #{} (max {} characters)",
                    p.int(0),
                    p.int_or(1, 8)
                ),
                LineClass::Misc,
            ),
            Opcode::ChangeHp | Opcode::ChangeMp | Opcode::ChangeExp | Opcode::ChangeLevel => {
                let label = match op {
                    Opcode::ChangeHp => "HP",
                    Opcode::ChangeMp => "MP",
                    Opcode::ChangeExp => "EXP",
                    _ => "Level",
                };
                line(
                    format!(
                        "[{label}] Actor #{} {}{}",
                        p.int(1),
                        sign(&p, 2),
                        self.operand(&p, 3, 4)
                    ),
                    LineClass::Item,
                )
            }
            Opcode::ChangeState => {
                let action = if p.is_zero(2) { "add" } else { "remove" };
                line(
                    format!("[State] Actor #{} {action} State #{}", p.int(1), p.int(3)),
                    LineClass::Item,
                )
            }
            Opcode::RecoverAll => {
                let target = if p.is_zero(0) && p.int(1) == 0 {
                    "Entire Party".to_owned()
                } else {
                    format!("Actor #{}", p.int(1))
                };
                line(format!("[Recover All] {target}"), LineClass::Item)
            }
            Opcode::ChangeParameter => line(
                format!(
                    "[Parameter] Actor #{} {} {}{}",
                    p.int(1),
                    param_name(p.int(2)),
                    sign(&p, 3),
                    self.operand(&p, 4, 5)
                ),
                LineClass::Item,
            ),
            Opcode::ChangeSkill => {
                let action = if p.is_zero(2) { "learn" } else { "forget" };
                line(
                    format!("[Skill] Actor #{} {action} Skill #{}", p.int(1), p.int(3)),
                    LineClass::Item,
                )
            }
            Opcode::ChangeEquipment => {
                let slot = match p.int(1) {
                    0 => "Weapon",
                    1 => "Shield",
                    2 => "Head",
                    3 => "Body",
                    4 => "Accessory",
                    _ => "Equipment",
                };
                let actor = p.int(0);
                let text = match p.int(2) {
                    0 => format!("[Equipment] Actor #{actor} unequip {slot}"),
                    id => format!("[Equipment] Actor #{actor} {slot} -> #{id}"),
                };
                line(text, LineClass::Item)
            }
            Opcode::ChangeName => line(
                format!("[Change Name] Actor #{} -> {}", p.int(0), p.text_or(1, "")),
                LineClass::Misc,
            ),
            Opcode::ChangeClass => line(
                format!("[Change Class] Actor #{} -> Class #{}", p.int(0), p.int(1)),
                LineClass::Item,
            ),
            Opcode::ChangeActorImages => line(
                format!("[Change Images] Actor #{}", p.int(0)),
                LineClass::Misc,
            ),
            Opcode::ChangeVehicleImage => line(
                format!("[Change Images] {}", vehicle(p.int(0))),
                LineClass::Misc,
            ),
            Opcode::ChangeEnemyHp | Opcode::ChangeEnemyMp => {
                let label = if op == Opcode::ChangeEnemyHp { "Enemy HP" } else { "Enemy MP" };
                line(
                    format!(
                        "[{label}] #{} {}{}",
                        p.int(0) + 1,
                        sign(&p, 1),
                        self.operand(&p, 2, 3)
                    ),
                    LineClass::Battle,
                )
            }
            Opcode::ChangeEnemyState => {
                let action = if p.is_zero(1) { "add" } else { "remove" };
                line(
                    format!("[Enemy State] #{} {action} State #{}", p.int(0) + 1, p.int(2)),
                    LineClass::Battle,
                )
            }
            Opcode::EnemyRecoverAll => line(
                format!("[Enemy Recover All] #{}", p.int(0) + 1),
                LineClass::Battle,
            ),
            Opcode::EnemyAppear => {
                line(format!("[Enemy Appear] #{}", p.int(0) + 1), LineClass::Battle)
            }
            Opcode::EnemyTransform => line(
                format!("[Enemy Transform] #{} -> Enemy #{}", p.int(0) + 1, p.int(1)),
                LineClass::Battle,
            ),
            Opcode::AbortBattle => line("[Abort Battle]", LineClass::Battle),
            Opcode::ForceAction => {
                let subject = if p.is_zero(0) { "Enemy" } else { "Actor" };
                line(
                    format!(
                        "[Force Action] {subject} #{} uses Skill #{}",
                        p.int(1) + 1,
                        p.int(2)
                    ),
                    LineClass::Battle,
                )
            }
            Opcode::End
            | Opcode::ChoicesEnd
            | Opcode::BranchEnd
            | Opcode::BattleEnd
            | Opcode::MoveRouteStep => None,
            Opcode::Unknown(code) => line(format!("[Command {code}]"), LineClass::Unknown),
        }
    }

    fn battle(&self, p: &Params<'_>, ctx: Option<&MapContext>) -> Option<Translated> {
        let can_escape = p.truthy(2);
        let can_lose = p.truthy(3);
        let extras: Vec<&str> = [(can_escape, "can escape"), (can_lose, "can lose")]
            .into_iter()
            .filter_map(|(on, label)| on.then_some(label))
            .collect();
        let extras = if extras.is_empty() {
            String::new()
        } else {
            format!(" ({})", extras.join("/"))
        };

        let method = p.int(0);
        let troop_id = p.int(1);
        match method {
            0 => line(
                format!(
                    "[Battle] Troop #{troop_id} \u{300c}{}\u{300d}{extras}",
                    self.db.troop_name(troop_id)
                ),
                LineClass::Battle,
            )
            .map(|t| t.with_ref(self.troop_ref(troop_id, method, can_escape, can_lose))),
            1 => line(
                format!(
                    "[Battle] Troop from Variable [{}]{extras}",
                    self.db.variable_name(troop_id)
                ),
                LineClass::Battle,
            ),
            2 => line(format!("[Battle] Random encounter{extras}"), LineClass::Battle)
                .map(|t| t.with_ref(self.encounter_ref(ctx, can_escape, can_lose))),
            _ => line("[Battle] Start battle", LineClass::Battle),
        }
    }

    fn variable_text(&self, p: &Params<'_>) -> String {
        let db = self.db;
        if p.get(3).is_none() {
            return "[Variable] missing parameters".to_owned();
        }
        let (first, last) = (p.int(0), p.int(1));
        let op = match p.int(2) {
            0 => "=",
            1 => "+=",
            2 => "-=",
            3 => "*=",
            4 => "/=",
            5 => "%=",
            _ => "?=",
        };
        let target = if first == last {
            db.variable_name(first)
        } else {
            format!("{} ~ {}", db.variable_name(first), db.variable_name(last))
        };
        let operand = match p.int(3) {
            0 => p.int(4).to_string(),
            1 => format!("Variable [{}]", db.variable_name(p.int(4))),
            2 => format!("Random ({}~{})", p.int(4), p.int(5)),
            other => format!("(operand type {other})"),
        };
        format!("[Variable] {target} {op} {operand}")
    }

    fn conditional_text(&self, p: &Params<'_>) -> String {
        let db = self.db;
        if p.is_empty() {
            return "[If] (unknown)".to_owned();
        }
        let kind = p.int(0);
        let body = match kind {
            0 => format!("Switch [{}] == {}", db.switch_name(p.int(1)), on_off(p, 2)),
            1 => {
                let op = match p.int(4) {
                    0 => "==",
                    1 => ">=",
                    2 => "<=",
                    3 => ">",
                    4 => "<",
                    5 => "!=",
                    _ => "?",
                };
                let rhs = if p.is_zero(2) {
                    p.int(3).to_string()
                } else {
                    format!("Variable [{}]", db.variable_name(p.int(3)))
                };
                format!("Variable [{}] {op} {rhs}", db.variable_name(p.int(1)))
            }
            2 => format!("Self Switch {} == {}", p.text_or(1, "A"), on_off(p, 2)),
            3 => {
                let op = if p.is_zero(2) { ">=" } else { "<=" };
                format!("Timer {op} {} s", p.int(1))
            }
            4 => {
                let check = match p.int(2) {
                    0 => "is in the party",
                    1 => "name is",
                    2 => "class is",
                    3 => "has learned skill",
                    4 => "has equipped weapon",
                    5 => "has equipped armor",
                    6 => "has state",
                    _ => "?",
                };
                let extra = match p.get(3) {
                    Some(v) if p.int(2) >= 1 => format!(" {}", render(v)),
                    _ => String::new(),
                };
                format!("Actor #{} {check}{extra}", p.int(1))
            }
            5 => {
                let index = p.int(1) + 1;
                if p.is_zero(2) {
                    format!("Enemy #{index} has appeared")
                } else {
                    format!("Enemy #{index} has State #{}", p.int(3))
                }
            }
            6 => format!(
                "{} is facing {}",
                character(p.int(1)),
                direction(p.int(2))
            ),
            7 => {
                let op = match p.int(2) {
                    1 => "<=",
                    2 => "<",
                    _ => ">=",
                };
                format!("Gold {op} {}", p.int(1))
            }
            8 => format!("Has item [{}]", db.item_name(p.int(1))),
            9 | 10 => {
                let name = if kind == 9 {
                    format!("weapon [{}]", db.weapon_name(p.int(1)))
                } else {
                    format!("armor [{}]", db.armor_name(p.int(1)))
                };
                let equipped = if p.truthy(2) { " (including equipped)" } else { "" };
                format!("Has {name}{equipped}")
            }
            11 => {
                let raw = p.text_or(1, "");
                let button = match raw.as_str() {
                    "ok" => "OK",
                    "cancel" => "Cancel",
                    "shift" => "Shift",
                    "down" => "Down",
                    "left" => "Left",
                    "right" => "Right",
                    "up" => "Up",
                    "pageup" => "Page Up",
                    "pagedown" => "Page Down",
                    other => other,
                };
                format!("Button \u{300c}{button}\u{300d} is pressed")
            }
            12 => format!("Script: {}", p.text_or(1, "")),
            13 => format!("Riding the {}", vehicle(p.int(1))),
            other => format!("type {other}"),
        };
        format!("[If] {body}")
    }
}

fn labelled_audio(label: &str, name: Option<String>) -> String {
    match name {
        Some(name) => format!("{label} {name}"),
        None => label.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use crate::database::Database;
    use crate::event::interpreter::{EventInterpreter, LineClass};
    use crate::event::model::Command;
    use crate::event::refs::{CrossRef, RefKind};
    use crate::loader::{DataLoader, Engine};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::fs;

    fn database() -> Database {
        let dir = tempfile::tempdir().unwrap();
        let tables = [
            ("Items.json", json!([null, {"id": 1, "name": "Potion"}])),
            ("Weapons.json", json!([null, {"id": 1, "name": "Sword"}])),
            ("MapInfos.json", json!([null, {"id": 1, "name": "Town"}])),
            ("System.json", json!({"switches": ["", "Gate"], "variables": ["", "Steps", "Gold"]})),
            ("CommonEvents.json", json!([null, {"id": 1, "name": "Heal"}])),
        ];
        for (name, value) in tables {
            fs::write(dir.path().join(name), value.to_string()).unwrap();
        }
        Database::load(&DataLoader::new(dir.path(), Engine::Mv))
    }

    fn texts(db: &Database, commands: Value) -> Vec<(String, LineClass)> {
        let commands = Command::list_from_value(commands.as_array().unwrap());
        EventInterpreter::new(db)
            .interpret_commands(&commands)
            .into_iter()
            .map(|l| (l.text, l.cls))
            .collect()
    }

    fn cmd(code: i64, parameters: Value) -> Value {
        json!({"code": code, "indent": 0, "parameters": parameters})
    }

    #[test]
    fn test_dialogue_lines() {
        let db = database();
        assert_eq!(
            texts(
                &db,
                json!([
                    cmd(101, json!(["Actor1", 0, 0, 2])),
                    cmd(401, json!(["Hello there."])),
                    cmd(401, json!([])),
                    cmd(102, json!([["Yes", "No"], 1])),
                    cmd(402, json!([0, "Yes"])),
                    cmd(404, json!([])),
                    cmd(0, json!([])),
                ])
            ),
            vec![
                ("[Show Text] (Face: Actor1 Position: Bottom)".to_owned(), LineClass::Talk),
                ("\u{300c}Hello there.\u{300d}".to_owned(), LineClass::TalkText),
                ("[Choices] Yes / No".to_owned(), LineClass::Choice),
                ("[When \u{300c}Yes\u{300d}]".to_owned(), LineClass::ChoiceBranch),
            ]
        );
    }

    #[test]
    fn test_state_changes() {
        let db = database();
        assert_eq!(
            texts(
                &db,
                json!([
                    cmd(121, json!([1, 1, 0])),
                    cmd(122, json!([1, 2, 1, 2, 3, 9])),
                    cmd(122, json!([1])),
                    cmd(123, json!(["B", 1])),
                    cmd(125, json!([0, 0, 250])),
                    cmd(125, json!([1, 1, 2])),
                    cmd(117, json!([1])),
                ])
            ),
            vec![
                ("[Switch] Gate = ON".to_owned(), LineClass::Switch),
                ("[Variable] Steps ~ Gold += Random (3~9)".to_owned(), LineClass::Variable),
                ("[Variable] missing parameters".to_owned(), LineClass::Variable),
                ("[Self Switch] B = OFF".to_owned(), LineClass::Switch),
                ("[Gold] +250".to_owned(), LineClass::Gold),
                ("[Gold] -value of Variable [Gold]".to_owned(), LineClass::Gold),
                ("[Common Event] #1 \u{300c}Heal\u{300d}".to_owned(), LineClass::CommonEvent),
            ]
        );
    }

    #[test]
    fn test_item_and_transfer_refs() {
        let db = database();
        let interpreter = EventInterpreter::new(&db);
        let commands = Command::list_from_value(&[
            cmd(126, json!([1, 0, 0, 3])),
            cmd(127, json!([0, 0, 0, 1])),
            cmd(201, json!([0, 1, 4, 7, 2, 0])),
            cmd(201, json!([1, 1, 2, 3])),
            cmd(111, json!([9, 1, true])),
        ]);
        let lines = interpreter.interpret_commands(&commands);

        assert_eq!(lines[0].text, "[Item] Potion x+3");
        assert_eq!(
            serde_json::to_value(&lines[0].refs).unwrap(),
            json!([{"kind": "items", "id": 1, "name": "Potion"}])
        );
        // Weapon id 0 never yields a reference.
        assert!(lines[1].refs.is_empty());

        assert_eq!(lines[2].text, "[Transfer] -> Town (ID: 1) (4,7)");
        assert_eq!(
            serde_json::to_value(&lines[2].refs).unwrap(),
            json!([{"kind": "transfer", "name": "Town", "mapId": 1, "mapName": "Town", "x": 4, "y": 7}])
        );
        assert_eq!(lines[3].text, "[Transfer] -> location from variables");
        assert!(lines[3].refs.is_empty());

        assert_eq!(lines[4].text, "[If] Has weapon [Sword] (including equipped)");
        assert!(matches!(&lines[4].refs[0], CrossRef::Item(r) if r.kind == RefKind::Weapons));
    }

    #[test]
    fn test_unknown_and_structural_opcodes() {
        let db = database();
        assert_eq!(
            texts(
                &db,
                json!([
                    cmd(505, json!([{"code": 1}])),
                    cmd(412, json!([])),
                    cmd(604, json!([])),
                    cmd(999, json!([1, 2])),
                    cmd(413, json!([])),
                ])
            ),
            vec![
                ("[Command 999]".to_owned(), LineClass::Unknown),
                ("[Repeat Above]".to_owned(), LineClass::Condition),
            ]
        );
    }

    #[test]
    fn test_lines_keep_indent() {
        let db = database();
        let commands = Command::list_from_value(&[
            json!({"code": 111, "indent": 0, "parameters": [0, 1, 0]}),
            json!({"code": 230, "indent": 1, "parameters": [60]}),
            json!({"code": 411, "indent": 0, "parameters": []}),
        ]);
        let lines = EventInterpreter::new(&db).interpret_commands(&commands);
        let indents: Vec<i64> = lines.iter().map(|l| l.indent).collect();
        assert_eq!(indents, vec![0, 1, 0]);
        assert_eq!(lines[0].text, "[If] Switch [Gate] == ON");
        assert_eq!(lines[1].text, "[Wait] 60 frames");
    }
}
