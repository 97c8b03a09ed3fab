//! Per-cell passage of a tile map, decided the way the engine's `checkPassage` does.

use bitflags::bitflags;
use serde_json::Value;

use crate::utils::ValueExt;

/// Number of tile layers scanned, top first.
const TILE_LAYERS: usize = 4;

bitflags! {
    /// Direction bits of a tileset flag. A set direction bit blocks that direction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PassageFlags: u16 {
        const DOWN = 0x01;
        const LEFT = 0x02;
        const RIGHT = 0x04;
        const UP = 0x08;
        /// Drawn above characters; never decides passage.
        const STAR = 0x10;

        const ALL_DIRECTIONS = Self::DOWN.bits() | Self::LEFT.bits() | Self::RIGHT.bits() | Self::UP.bits();
    }
}

fn check_passage(
    tiles: &[i64],
    flags: &[i64],
    cell: usize,
    layer_size: usize,
    direction: PassageFlags,
) -> bool {
    for z in (0..TILE_LAYERS).rev() {
        let Some(&tile_id) = tiles.get(z * layer_size + cell) else {
            continue;
        };
        let Some(&flag) = usize::try_from(tile_id)
            .ok()
            .filter(|&id| id != 0)
            .and_then(|id| flags.get(id))
        else {
            continue;
        };
        let flag = PassageFlags::from_bits_truncate(flag as u16);
        if flag.contains(PassageFlags::STAR) {
            continue;
        }
        return !flag.contains(direction);
    }
    false
}

/// Blocked directions of every cell, row-major. `tiles` is the map's layered `data` array.
pub fn compute_passability(
    width: usize,
    height: usize,
    tiles: &[i64],
    flags: &[i64],
) -> Vec<PassageFlags> {
    if width == 0 || height == 0 || tiles.is_empty() {
        return Vec::new();
    }
    let layer_size = width * height;

    (0..layer_size)
        .map(|cell| {
            PassageFlags::ALL_DIRECTIONS
                .iter()
                .filter(|&direction| !check_passage(tiles, flags, cell, layer_size, direction))
                .collect()
        })
        .collect()
}

/// `1` for cells passable in at least one direction, `0` otherwise.
pub fn passable_cells(width: usize, height: usize, tiles: &[i64], flags: &[i64]) -> Vec<u8> {
    compute_passability(width, height, tiles, flags)
        .into_iter()
        .map(|blocked| u8::from(blocked != PassageFlags::ALL_DIRECTIONS))
        .collect()
}

/// [`passable_cells`] over a canonical map record.
pub fn map_passable_cells(map: &Value, flags: &[i64]) -> Vec<u8> {
    let dimension = |key| usize::try_from(map.int_or(key, 0)).unwrap_or(0);
    let tiles: Vec<i64> = map
        .list("data")
        .iter()
        .map(|tile| tile.as_int().unwrap_or(0))
        .collect();
    passable_cells(dimension("width"), dimension("height"), &tiles, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // tile 1: open ground, tile 2: wall, tile 3: star (bridge rail), tile 4: blocks only up
    const FLAGS: [i64; 5] = [0, 0x00, 0x0f, 0x1f, 0x08];

    #[test]
    fn test_top_layer_decides() {
        // 2x1 map, layers 0 and 2 populated.
        let mut tiles = vec![0; 2 * 4];
        tiles[0] = 1;
        tiles[1] = 1;
        tiles[2 * 2] = 2;
        let cells = compute_passability(2, 1, &tiles, &FLAGS);
        assert_eq!(cells, vec![PassageFlags::ALL_DIRECTIONS, PassageFlags::empty()]);
        assert_eq!(passable_cells(2, 1, &tiles, &FLAGS), vec![0, 1]);
    }

    #[test]
    fn test_star_tiles_fall_through() {
        let tiles = vec![1, 0, 0, 3];
        assert_eq!(compute_passability(1, 1, &tiles, &FLAGS), vec![PassageFlags::empty()]);

        let tiles = vec![4, 0, 3, 0];
        assert_eq!(compute_passability(1, 1, &tiles, &FLAGS), vec![PassageFlags::UP]);
    }

    #[test]
    fn test_undecided_cells_are_blocked() {
        // Empty cell, unknown tile id and a negative id.
        let tiles = vec![0, 99, -5];
        assert_eq!(passable_cells(3, 1, &tiles, &FLAGS), vec![0, 0, 0]);
        // Short data arrays only consult the layers present.
        assert_eq!(passable_cells(3, 1, &[1], &FLAGS), vec![1, 0, 0]);
    }

    #[test]
    fn test_empty_maps() {
        assert!(compute_passability(0, 5, &[1], &FLAGS).is_empty());
        assert!(passable_cells(2, 2, &[], &FLAGS).is_empty());
    }

    #[test]
    fn test_map_record() {
        let map = json!({"width": 2, "height": 1, "data": [1, 2, 0, 0, 0, 0, 0, 0]});
        assert_eq!(map_passable_cells(&map, &FLAGS), vec![1, 0]);
    }
}
