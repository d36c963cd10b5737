use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::constants::PORTAL_PAIRS;
use crate::error::{MapError, PersistError};
use crate::types::{Cell, Tile};

#[derive(Clone, Debug)]
pub struct GridMap {
    width: usize,
    height: usize,
    tiles: Vec<Vec<Tile>>,
    original: Vec<Vec<Tile>>,
    tunnels: BTreeMap<Cell, Cell>,
    player_spawn: Cell,
    pellets_remaining: usize,
    initial_pellets: usize,
}

#[derive(Clone, Debug)]
pub struct DecodedTiles(Vec<Vec<Tile>>);

impl GridMap {
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let text = fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, MapError> {
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        if lines.is_empty() {
            return Err(MapError::Empty);
        }

        let width = lines[0].chars().count();
        if width == 0 {
            return Err(MapError::Empty);
        }
        let mut tiles = Vec::with_capacity(lines.len());
        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(MapError::Ragged {
                    row,
                    expected: width,
                    found,
                });
            }
            let mut parsed = Vec::with_capacity(width);
            for (col, symbol) in line.chars().enumerate() {
                let tile = Tile::from_symbol(symbol)
                    .ok_or(MapError::UnknownSymbol { row, col, symbol })?;
                parsed.push(tile);
            }
            tiles.push(parsed);
        }

        let mut map = Self {
            width,
            height: tiles.len(),
            original: tiles.clone(),
            tiles,
            tunnels: BTreeMap::new(),
            player_spawn: Cell::default(),
            pellets_remaining: 0,
            initial_pellets: 0,
        };
        map.player_spawn = map
            .find_all(Tile::PlayerSpawn)
            .first()
            .copied()
            .ok_or(MapError::MissingPlayerSpawn)?;
        map.find_tunnels();
        map.pellets_remaining = count_collectibles(&map.tiles);
        map.initial_pellets = map.pellets_remaining;
        info!(
            width = map.width,
            height = map.height,
            collectibles = map.initial_pellets,
            tunnels = map.tunnels.len() / 2,
            "map loaded"
        );
        Ok(map)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn player_spawn(&self) -> Cell {
        self.player_spawn
    }

    pub fn tile_at(&self, row: i32, col: i32) -> Tile {
        if row < 0 || col < 0 {
            return Tile::Wall;
        }
        self.tiles
            .get(row as usize)
            .and_then(|line| line.get(col as usize))
            .copied()
            .unwrap_or(Tile::Wall)
    }

    pub fn tile(&self, cell: Cell) -> Tile {
        self.tile_at(cell.y, cell.x)
    }

    /// Writes a tile, keeping the live pellet counter in step. Out of
    /// bounds is ignored.
    pub fn set_tile(&mut self, row: i32, col: i32, tile: Tile) {
        if row < 0 || col < 0 || row as usize >= self.height || col as usize >= self.width {
            return;
        }
        let slot = &mut self.tiles[row as usize][col as usize];
        match (slot.is_collectible(), tile.is_collectible()) {
            (true, false) => self.pellets_remaining = self.pellets_remaining.saturating_sub(1),
            (false, true) => self.pellets_remaining += 1,
            _ => {}
        }
        *slot = tile;
    }

    pub fn is_wall(&self, row: i32, col: i32) -> bool {
        self.tile_at(row, col).is_wall()
    }

    pub fn is_traversable(&self, row: i32, col: i32) -> bool {
        self.tile_at(row, col).is_traversable()
    }

    pub fn is_walkable(&self, cell: Cell) -> bool {
        self.is_traversable(cell.y, cell.x)
    }

    pub fn find_all(&self, tile: Tile) -> Vec<Cell> {
        let mut out = Vec::new();
        for (y, line) in self.tiles.iter().enumerate() {
            for (x, current) in line.iter().enumerate() {
                if *current == tile {
                    out.push(Cell::new(x as i32, y as i32));
                }
            }
        }
        out
    }

    pub fn find_symbol(&self, symbol: char) -> Vec<Cell> {
        match Tile::from_symbol(symbol) {
            Some(tile) => self.find_all(tile),
            None => Vec::new(),
        }
    }

    pub fn tunnel_exit(&self, cell: Cell) -> Option<Cell> {
        self.tunnels.get(&cell).copied()
    }

    pub fn tunnels(&self) -> &BTreeMap<Cell, Cell> {
        &self.tunnels
    }

    pub fn consume(&mut self, cell: Cell) -> Option<Tile> {
        let tile = self.tile(cell);
        if !tile.is_collectible() {
            return None;
        }
        self.set_tile(cell.y, cell.x, Tile::Empty);
        Some(tile)
    }

    pub fn pellets_remaining(&self) -> usize {
        self.pellets_remaining
    }

    pub fn initial_pellets(&self) -> usize {
        self.initial_pellets
    }

    pub fn reset(&mut self) {
        self.tiles = self.original.clone();
        self.pellets_remaining = self.initial_pellets;
        debug!(collectibles = self.pellets_remaining, "map reset");
    }

    pub fn rows(&self) -> Vec<String> {
        self.tiles
            .iter()
            .map(|line| line.iter().map(|tile| tile.symbol()).collect())
            .collect()
    }

    pub fn decode_rows(&self, rows: &[String]) -> Result<DecodedTiles, PersistError> {
        let mismatch = || PersistError::DimensionMismatch {
            width: self.width,
            height: self.height,
            found_width: rows.first().map(|r| r.chars().count()).unwrap_or(0),
            found_height: rows.len(),
        };
        if rows.len() != self.height {
            return Err(mismatch());
        }
        let mut tiles = Vec::with_capacity(self.height);
        for (row, line) in rows.iter().enumerate() {
            if line.chars().count() != self.width {
                return Err(mismatch());
            }
            let mut parsed = Vec::with_capacity(self.width);
            for (col, symbol) in line.chars().enumerate() {
                let tile = Tile::from_symbol(symbol)
                    .ok_or(PersistError::UnknownSymbol { row, col, symbol })?;
                parsed.push(tile);
            }
            tiles.push(parsed);
        }
        Ok(DecodedTiles(tiles))
    }

    pub fn restore(&mut self, decoded: DecodedTiles) {
        self.tiles = decoded.0;
        self.pellets_remaining = count_collectibles(&self.tiles);
    }

    fn find_tunnels(&mut self) {
        for (start_symbol, end_symbol) in PORTAL_PAIRS {
            let start = self.find_all(Tile::Portal(start_symbol)).first().copied();
            let end = self.find_all(Tile::Portal(end_symbol)).first().copied();
            if let (Some(start), Some(end)) = (start, end) {
                self.tunnels.insert(start, end);
                self.tunnels.insert(end, start);
                debug!(?start, ?end, "tunnel {start_symbol}{end_symbol} linked");
            }
        }
    }
}

fn count_collectibles(tiles: &[Vec<Tile>]) -> usize {
    tiles
        .iter()
        .flatten()
        .filter(|tile| tile.is_collectible())
        .count()
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};

    use super::*;

    const LEVEL_1: &str = include_str!("../maps/level_1.txt");

    fn reachable_from_player_spawn(map: &GridMap) -> HashSet<Cell> {
        let mut out = HashSet::new();
        let Some(start) = map.find_all(Tile::PlayerSpawn).first().copied() else {
            return out;
        };
        let mut queue = VecDeque::new();
        out.insert(start);
        queue.push_back(start);
        while let Some(cell) = queue.pop_front() {
            for next in [
                Cell::new(cell.x - 1, cell.y),
                Cell::new(cell.x + 1, cell.y),
                Cell::new(cell.x, cell.y - 1),
                Cell::new(cell.x, cell.y + 1),
            ] {
                if map.is_walkable(next) && out.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        out
    }

    #[test]
    fn out_of_bounds_reads_as_wall_and_writes_are_ignored() {
        let mut map = GridMap::parse("#####\n#P. #\n#####\n").expect("valid map");
        assert_eq!(map.tile_at(-1, 0), Tile::Wall);
        assert_eq!(map.tile_at(0, 99), Tile::Wall);
        assert_eq!(map.tile_at(3, 1), Tile::Wall);
        assert!(map.is_wall(-5, -5));

        let before = map.rows();
        map.set_tile(-1, 2, Tile::Pellet);
        map.set_tile(1, 5, Tile::Pellet);
        assert_eq!(map.rows(), before);
        assert_eq!(map.pellets_remaining(), 1);
    }

    #[test]
    fn ragged_and_unknown_input_is_rejected() {
        assert!(matches!(
            GridMap::parse("####\n#P#\n####"),
            Err(MapError::Ragged { row: 1, expected: 4, found: 3 })
        ));
        assert!(matches!(
            GridMap::parse("###\n#Pz\n###"),
            Err(MapError::UnknownSymbol { row: 1, col: 2, symbol: 'z' })
        ));
        assert!(matches!(GridMap::parse("\n\n"), Err(MapError::Empty)));
        assert!(matches!(
            GridMap::parse("###\n#.#\n###"),
            Err(MapError::MissingPlayerSpawn)
        ));
    }

    #[test]
    fn consuming_items_keeps_counter_in_step_and_reset_restores() {
        let mut map = GridMap::parse("#####\n#P.o#\n#####").expect("valid map");
        assert_eq!(map.pellets_remaining(), 2);

        assert_eq!(map.consume(Cell::new(2, 1)), Some(Tile::Pellet));
        assert_eq!(map.tile_at(1, 2), Tile::Empty);
        assert_eq!(map.pellets_remaining(), 1);
        assert_eq!(map.consume(Cell::new(2, 1)), None);
        assert_eq!(map.pellets_remaining(), 1);

        assert_eq!(map.consume(Cell::new(3, 1)), Some(Tile::PowerPellet));
        assert_eq!(map.pellets_remaining(), 0);

        map.set_tile(1, 1, Tile::Pellet);
        assert_eq!(map.pellets_remaining(), 1);

        map.reset();
        assert_eq!(map.pellets_remaining(), map.initial_pellets());
        assert_eq!(map.pellets_remaining(), 2);
        assert_eq!(map.rows(), vec!["#####", "#P.o#", "#####"]);
    }

    #[test]
    fn tunnels_are_bidirectional_and_incomplete_pairs_skipped() {
        let map = GridMap::parse("#######\nAP  NB#\n#######").expect("valid map");
        assert_eq!(map.tunnels().len(), 2);
        for (from, to) in map.tunnels() {
            assert_eq!(map.tunnel_exit(*to), Some(*from));
        }
        assert_eq!(map.tunnel_exit(Cell::new(0, 1)), Some(Cell::new(5, 1)));
        assert_eq!(map.tunnel_exit(Cell::new(4, 1)), None);
    }

    #[test]
    fn find_all_is_row_major() {
        let map = GridMap::parse("#G#G\nGP  \n###G").expect("valid map");
        assert_eq!(
            map.find_symbol('G'),
            vec![
                Cell::new(1, 0),
                Cell::new(3, 0),
                Cell::new(0, 1),
                Cell::new(3, 2)
            ]
        );
    }

    #[test]
    fn decode_rows_validates_before_restore() {
        let mut map = GridMap::parse("#####\n#P.o#\n#####").expect("valid map");
        let bad_width = vec!["####".to_string(), "#P.#".into(), "####".into()];
        assert!(matches!(
            map.decode_rows(&bad_width),
            Err(PersistError::DimensionMismatch { .. })
        ));
        let bad_symbol = vec!["#####".to_string(), "#P?o#".into(), "#####".into()];
        assert!(matches!(
            map.decode_rows(&bad_symbol),
            Err(PersistError::UnknownSymbol { row: 1, col: 2, symbol: '?' })
        ));
        assert_eq!(map.pellets_remaining(), 2);

        let eaten = vec!["#####".to_string(), "#P  #".into(), "#####".into()];
        let decoded = map.decode_rows(&eaten).expect("valid rows");
        map.restore(decoded);
        assert_eq!(map.pellets_remaining(), 0);
        map.reset();
        assert_eq!(map.pellets_remaining(), 2);
    }

    #[test]
    fn default_level_is_closed_and_fully_reachable() {
        let map = GridMap::parse(LEVEL_1).expect("bundled map parses");
        assert_eq!((map.width(), map.height()), (22, 20));
        assert_eq!(map.player_spawn(), Cell::new(10, 15));
        assert_eq!(map.find_all(Tile::GhostSpawn).len(), 4);
        assert_eq!(map.tunnels().len(), 6);
        assert_eq!(map.initial_pellets(), 149);

        let reachable = reachable_from_player_spawn(&map);
        for y in 0..map.height() as i32 {
            for x in 0..map.width() as i32 {
                let cell = Cell::new(x, y);
                let tile = map.tile(cell);
                if tile.is_collectible() || tile == Tile::GhostSpawn {
                    assert!(reachable.contains(&cell), "unreachable {tile:?} at {cell:?}");
                }
            }
        }
    }
}
