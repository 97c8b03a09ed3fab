//! Normalization of legacy (`.rvdata`/`.rvdata2`) object graphs into the canonical JSON schema
//! used by newer projects.
//!
//! Converters never fail on individual records: missing attributes take their documented
//! default and malformed slots become `null`.

mod fields;
mod map;
mod tables;

pub use self::fields::{decode_table, to_plain};

use serde_json::Value;

use crate::marshal::Node;

/// Lowercased base name without extension, for both `/` and `\` separated names.
pub fn table_stem(logical_name: &str) -> String {
    let base = logical_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(logical_name);
    let stem = match base.rfind('.') {
        Some(dot) if dot > 0 => &base[..dot],
        _ => base,
    };
    stem.to_lowercase()
}

/// Converts a decoded table into its canonical shape, choosing the converter by file name.
pub fn adapt(logical_name: &str, node: &Node) -> Value {
    let stem = table_stem(logical_name);
    match stem.as_str() {
        "mapinfos" => tables::convert_map_infos(node),
        s if s.starts_with("map") => map::convert_map(node),
        "system" => tables::convert_system(node),
        "commonevents" => tables::convert_common_events(node),
        "troops" => tables::convert_troops(node),
        "items" => tables::convert_items(node),
        "weapons" => tables::convert_weapons(node),
        "armors" => tables::convert_armors(node),
        "enemies" => tables::convert_enemies(node),
        "skills" => tables::convert_skills(node),
        "states" => tables::convert_states(node),
        "tilesets" => tables::convert_tilesets(node),
        _ => to_plain(node),
    }
}
