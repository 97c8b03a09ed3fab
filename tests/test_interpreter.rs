mod fixtures;

use fixtures::*;
use pretty_assertions::assert_eq;
use rpgdata::event::{CrossRef, EventKind, LineClass, RefKind};
use rpgdata::{ProjectSession, ProjectSettings};
use serde_json::json;

fn session() -> (tempfile::TempDir, ProjectSession) {
    ensure_env_logger_initialized();
    let dir = tempfile::tempdir().unwrap();
    let data = write_mv_project(dir.path());
    let session = ProjectSession::open(&data, &ProjectSettings::new()).unwrap();
    (dir, session)
}

#[test]
fn test_map_events_are_classified() {
    let (_dir, session) = session();
    let events = session.interpret_map(1).unwrap();

    let kinds: Vec<(&str, EventKind)> = events.iter().map(|e| (e.name.as_str(), e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ("Chest", EventKind::Treasure),
            ("Door", EventKind::Transfer),
            ("Guard", EventKind::Battle),
            ("Villager", EventKind::Dialog),
        ]
    );
}

#[test]
fn test_treasure_lines_reference_catalog_entries() {
    let (_dir, session) = session();
    let events = session.interpret_map(1).unwrap();
    let chest = &events[0];

    let page = &chest.pages[0];
    assert_eq!(page.index, 1);
    assert_eq!(page.trigger, "Action Button");
    assert!(page.conditions.is_empty());

    let item_line = &page.commands[0];
    assert_eq!(item_line.cls, LineClass::Item);
    assert_eq!(item_line.text, "[Item] Potion x+2");
    match &item_line.refs[..] {
        [CrossRef::Item(item)] => {
            assert_eq!(item.kind, RefKind::Items);
            assert_eq!(item.id, 1);
            assert_eq!(item.name, "Potion");
        }
        other => panic!("unexpected refs {:?}", other),
    }

    assert_eq!(page.commands[1].cls, LineClass::Gold);
    assert_eq!(page.commands[1].text, "[Gold] +100");
}

#[test]
fn test_transfer_resolves_target_map() {
    let (_dir, session) = session();
    let events = session.interpret_map(1).unwrap();
    let line = &events[1].pages[0].commands[0];

    assert_eq!(line.cls, LineClass::Transfer);
    assert!(line.text.starts_with("[Transfer] -> Field (ID: 2) (4,7)"));
    match &line.refs[..] {
        [CrossRef::Transfer(target)] => {
            assert_eq!(target.map_id, 2);
            assert_eq!(target.map_name, "Field");
            assert_eq!((target.x, target.y), (4, 7));
        }
        other => panic!("unexpected refs {:?}", other),
    }
}

#[test]
fn test_battles_on_story_pages_are_special() {
    let (_dir, session) = session();
    let events = session.interpret_map(1).unwrap();
    let guard = &events[2];

    let battle = guard.pages[0]
        .commands
        .iter()
        .find(|line| line.cls == LineClass::Battle)
        .unwrap();
    match &battle.refs[..] {
        [CrossRef::Troop(troop)] => {
            assert_eq!(troop.name, "Slime x2");
            assert!(troop.can_escape);
            assert!(!troop.can_lose);
            assert_eq!(troop.enemies.len(), 1);
            assert_eq!(troop.enemies[0].name, "Slime");
            assert_eq!(troop.enemies[0].count, 2);
            assert!(troop.special);
            assert_eq!(
                troop.special_reason.as_deref(),
                Some("Story (dialogue/choice/script)")
            );
        }
        other => panic!("unexpected refs {:?}", other),
    }
    assert!(battle.refs[0].is_special());

    let serialized = serde_json::to_value(&guard.pages[0].commands[0]).unwrap();
    assert_eq!(serialized["cls"], json!("cmd-talk"));
}

#[test]
fn test_random_encounters_use_map_context() {
    let (_dir, session) = session();
    let interpreter = session.interpreter();
    let map = session.load_map(2).unwrap();
    let ctx = session.map_context(2, &map);

    assert_eq!(ctx.map_name, "Field");
    assert_eq!(ctx.encounter_step, Some(25));
    assert_eq!(ctx.encounters.len(), 2);
    assert_eq!(ctx.encounters[1].region_set, vec![1, 2]);
    // One visible bat and one that appears mid-battle.
    assert_eq!(ctx.encounters[1].enemies[0].count, 2);
    assert_eq!(ctx.encounters[1].enemies[0].hidden, 1);

    let random_battle = vec![command(301, json!([2, 0, false, false]))];
    let without = interpreter.interpret_command_values(&random_battle);
    assert_eq!(without[0].text, "[Battle] Random encounter");

    let events = vec![event(1, "Ambush", 0, 0, vec![page(random_battle)])];
    let raw = rpgdata::event::Event::from_value(&events[0]).unwrap();
    let result = interpreter.interpret_event_in(&raw, Some(&ctx));
    match &result.pages[0].commands[0].refs[..] {
        [CrossRef::Encounter(encounter)] => {
            assert_eq!(encounter.map_id, 2);
            assert_eq!(encounter.encounter_step, Some(25));
            assert_eq!(encounter.encounters.len(), 2);
            assert!(!encounter.special);
        }
        other => panic!("unexpected refs {:?}", other),
    }
}

#[test]
fn test_event_results_serialize_with_type_field() {
    let (_dir, session) = session();
    let events = session.interpret_map(1).unwrap();
    let value = serde_json::to_value(&events[3]).unwrap();

    assert_eq!(value["type"], json!("dialog"));
    assert_eq!(value["pageCount"], json!(1));
    assert_eq!(value["pages"][0]["commands"][1]["cls"], json!("cmd-talk-text"));
    assert!(value["pages"][0]["commands"][1].get("refs").is_none());
}
