use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CELL_SIZE, EMPTY, GHOST_SPAWN, HALF_CELL, PELLET, PLAYER_SPAWN, PORTAL_PAIRS, POWER_PELLET,
    WALL,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::None => (0, 0),
        }
    }

    pub fn to_vec2(self) -> Vec2 {
        let (dx, dy) = self.delta();
        Vec2::new(dx as f32, dy as f32)
    }

    /// Dominant axis of a heading; ties go to the horizontal axis.
    pub fn from_heading(heading: Vec2) -> Self {
        if heading.x == 0.0 && heading.y == 0.0 {
            return Self::None;
        }
        if heading.x.abs() >= heading.y.abs() {
            if heading.x > 0.0 {
                Self::Right
            } else {
                Self::Left
            }
        } else if heading.y > 0.0 {
            Self::Down
        } else {
            Self::Up
        }
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn center(self) -> Vec2 {
        Vec2::new(
            self.x as f32 * CELL_SIZE + HALF_CELL,
            self.y as f32 * CELL_SIZE + HALF_CELL,
        )
    }

    pub fn containing(pos: Vec2) -> Self {
        Self {
            x: (pos.x / CELL_SIZE).floor() as i32,
            y: (pos.y / CELL_SIZE).floor() as i32,
        }
    }

    pub fn is_adjacent(self, other: Cell) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    pub fn normalized(self) -> Option<Vec2> {
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            return None;
        }
        Some(Vec2::new(self.x / len, self.y / len))
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tile {
    Wall,
    Empty,
    Pellet,
    PowerPellet,
    PlayerSpawn,
    GhostSpawn,
    Portal(char),
}

impl Tile {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            WALL => Some(Self::Wall),
            EMPTY => Some(Self::Empty),
            PELLET => Some(Self::Pellet),
            POWER_PELLET => Some(Self::PowerPellet),
            PLAYER_SPAWN => Some(Self::PlayerSpawn),
            GHOST_SPAWN => Some(Self::GhostSpawn),
            other
                if PORTAL_PAIRS
                    .iter()
                    .any(|(a, b)| *a == other || *b == other) =>
            {
                Some(Self::Portal(other))
            }
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Wall => WALL,
            Self::Empty => EMPTY,
            Self::Pellet => PELLET,
            Self::PowerPellet => POWER_PELLET,
            Self::PlayerSpawn => PLAYER_SPAWN,
            Self::GhostSpawn => GHOST_SPAWN,
            Self::Portal(symbol) => symbol,
        }
    }

    pub fn is_wall(self) -> bool {
        matches!(self, Self::Wall)
    }

    pub fn is_traversable(self) -> bool {
        !self.is_wall()
    }

    pub fn is_collectible(self) -> bool {
        matches!(self, Self::Pellet | Self::PowerPellet)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    MainMenu,
    Playing,
    Paused,
    GameOver,
    VictoryPhase,
    Ranking,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    NavigateUp,
    NavigateDown,
    Confirm,
    Cancel,
    PauseToggle,
    Move(Direction),
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuOption {
    Start,
    Ranking,
    Load,
    Quit,
}

impl MenuOption {
    pub const ALL: [MenuOption; 4] = [Self::Start, Self::Ranking, Self::Load, Self::Quit];

    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "Start Game",
            Self::Ranking => "Ranking",
            Self::Load => "Load Saved Game",
            Self::Quit => "Quit",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseOption {
    SaveAndExit,
    ExitWithoutSaving,
    Cancel,
}

impl PauseOption {
    pub const ALL: [PauseOption; 3] = [Self::SaveAndExit, Self::ExitWithoutSaving, Self::Cancel];

    pub fn label(self) -> &'static str {
        match self {
            Self::SaveAndExit => "Save and Exit",
            Self::ExitWithoutSaving => "Exit without Saving",
            Self::Cancel => "Cancel",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: f32,
    pub y: f32,
    pub cell: Cell,
    pub dir: Direction,
    pub facing: Direction,
    #[serde(rename = "invincibleTicks")]
    pub invincible_ticks: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub sprite: String,
    pub x: f32,
    pub y: f32,
    pub cell: Cell,
    pub facing: Direction,
    pub frightened: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionView {
    pub tick: u64,
    pub phase: Phase,
    #[serde(rename = "menuIndex")]
    pub menu_index: usize,
    #[serde(rename = "pauseIndex")]
    pub pause_index: usize,
    pub score: u32,
    pub lives: u32,
    #[serde(rename = "pelletsRemaining")]
    pub pellets_remaining: usize,
    #[serde(rename = "queuedGhosts")]
    pub queued_ghosts: usize,
    pub tiles: Vec<String>,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<RankingView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankingEntry {
    pub name: String,
    pub score: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankingView {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<RankingEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_defined_symbol_is_wall_or_traversable() {
        for symbol in ['#', ' ', '.', 'o', 'P', 'G', 'A', 'B', 'N', 'M', 'X', 'Y'] {
            let tile = Tile::from_symbol(symbol).expect("defined symbol");
            assert_ne!(tile.is_wall(), tile.is_traversable(), "symbol {symbol:?}");
            assert_eq!(tile.symbol(), symbol);
        }
        assert!(Tile::from_symbol('Z').is_none());
    }

    #[test]
    fn zero_vector_does_not_normalize() {
        assert!(Vec2::ZERO.normalized().is_none());
        let unit = Vec2::new(3.0, 4.0).normalized().expect("non-zero");
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cell_center_round_trips_through_containing() {
        let cell = Cell::new(4, 7);
        assert_eq!(Cell::containing(cell.center()), cell);
        assert_eq!(cell.center(), Vec2::new(135.0, 225.0));
    }

    #[test]
    fn heading_maps_to_dominant_axis() {
        assert_eq!(Direction::from_heading(Vec2::new(0.2, -3.0)), Direction::Up);
        assert_eq!(Direction::from_heading(Vec2::new(-2.0, 1.0)), Direction::Left);
        assert_eq!(Direction::from_heading(Vec2::ZERO), Direction::None);
    }
}
