pub const TICK_RATE: u32 = 60;

pub const CELL_SIZE: f32 = 30.0;
pub const HALF_CELL: f32 = CELL_SIZE / 2.0;

pub const PLAYER_SPEED: f32 = 2.0;
pub const GHOST_SPEED: f32 = 2.1;
pub const PLAYER_START_LIVES: u32 = 3;

pub const SCARED_TIME_SEC: f64 = 20.0;
pub const GHOST_SPAWN_INTERVAL_SEC: f64 = 5.0;
pub const TUNNEL_COOLDOWN_SEC: f64 = 1.5;

pub const PELLET_SCORE: u32 = 10;
pub const POWER_PELLET_SCORE: u32 = 50;
pub const GHOST_SCORE: u32 = 200;

pub const GHOST_SPRITES: [&str; 4] = ["blinky", "pinky", "inky", "clyde"];
pub const GHOST_COOLDOWNS_SEC: [f64; 5] = [2.0, 3.1, 4.0, 4.5, 4.6];

pub const DEFAULT_PLAYER_NAME: &str = "PLAYER";
pub const RANKING_LIMIT: usize = 10;

pub const WALL: char = '#';
pub const EMPTY: char = ' ';
pub const PELLET: char = '.';
pub const POWER_PELLET: char = 'o';
pub const PLAYER_SPAWN: char = 'P';
pub const GHOST_SPAWN: char = 'G';
pub const PORTAL_PAIRS: [(char, char); 3] = [('A', 'B'), ('N', 'M'), ('X', 'Y')];

/// Converts a duration in seconds to whole ticks, truncating.
pub fn secs_to_ticks(seconds: f64, tick_rate: u32) -> u32 {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * tick_rate as f64) as u32
}
