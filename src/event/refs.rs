//! Structured cross-references attached to interpreted command lines.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Items,
    Weapons,
    Armors,
    Troop,
    Encounter,
    Transfer,
}

/// A catalog entry granted, consumed, checked or sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRef {
    pub kind: RefKind,
    pub id: i64,
    pub name: String,
}

/// Enemies of one id within a troop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TroopEnemy {
    pub id: i64,
    pub name: String,
    pub count: u32,
    /// Members of this id that only appear mid-battle.
    pub hidden: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TroopRef {
    pub kind: RefKind,
    pub id: i64,
    pub name: String,
    pub method: i64,
    pub method_label: String,
    pub can_escape: bool,
    pub can_lose: bool,
    pub enemies: Vec<TroopEnemy>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub special: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_reason: Option<String>,
}

/// One row of a map's random encounter table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub troop_id: i64,
    pub troop_name: String,
    pub weight: i64,
    pub region_set: Vec<i64>,
    pub enemies: Vec<TroopEnemy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterRef {
    pub kind: RefKind,
    pub name: String,
    pub map_id: i64,
    pub map_name: String,
    pub encounter_step: Option<i64>,
    pub can_escape: bool,
    pub can_lose: bool,
    pub encounters: Vec<Encounter>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub special: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRef {
    pub kind: RefKind,
    pub name: String,
    pub map_id: i64,
    pub map_name: String,
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CrossRef {
    Item(ItemRef),
    Troop(TroopRef),
    Encounter(EncounterRef),
    Transfer(TransferRef),
}

impl CrossRef {
    pub fn kind(&self) -> RefKind {
        match self {
            CrossRef::Item(r) => r.kind,
            CrossRef::Troop(r) => r.kind,
            CrossRef::Encounter(r) => r.kind,
            CrossRef::Transfer(r) => r.kind,
        }
    }

    /// Flags a battle reference as scripted. Other references are left alone.
    pub(crate) fn mark_special(&mut self, reason: &str) {
        match self {
            CrossRef::Troop(r) => {
                r.special = true;
                r.special_reason = Some(reason.to_owned());
            }
            CrossRef::Encounter(r) => {
                r.special = true;
                r.special_reason = Some(reason.to_owned());
            }
            CrossRef::Item(_) | CrossRef::Transfer(_) => {}
        }
    }

    pub fn is_special(&self) -> bool {
        match self {
            CrossRef::Troop(r) => r.special,
            CrossRef::Encounter(r) => r.special,
            CrossRef::Item(_) | CrossRef::Transfer(_) => false,
        }
    }
}

/// The map whose events are being interpreted; needed to expand random encounters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapContext {
    pub map_id: i64,
    pub map_name: String,
    pub encounter_step: Option<i64>,
    pub encounters: Vec<Encounter>,
}
