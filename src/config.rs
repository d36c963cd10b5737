use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    secs_to_ticks, DEFAULT_PLAYER_NAME, GHOST_COOLDOWNS_SEC, GHOST_SCORE, GHOST_SPAWN_INTERVAL_SEC,
    GHOST_SPEED, GHOST_SPRITES, HALF_CELL, PELLET_SCORE, PLAYER_SPEED, PLAYER_START_LIVES,
    POWER_PELLET_SCORE, SCARED_TIME_SEC, TICK_RATE, TUNNEL_COOLDOWN_SEC,
};
use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub tick_rate: u32,
    pub player_speed: f32,
    pub ghost_speed: f32,
    pub scared_time_sec: f64,
    pub ghost_spawn_interval_sec: f64,
    pub tunnel_cooldown_sec: f64,
    pub start_lives: u32,
    pub pellet_score: u32,
    pub power_pellet_score: u32,
    pub ghost_score: u32,
    pub ghost_sprites: Vec<String>,
    pub ghost_cooldowns_sec: Vec<f64>,
    pub player_name: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            player_speed: PLAYER_SPEED,
            ghost_speed: GHOST_SPEED,
            scared_time_sec: SCARED_TIME_SEC,
            ghost_spawn_interval_sec: GHOST_SPAWN_INTERVAL_SEC,
            tunnel_cooldown_sec: TUNNEL_COOLDOWN_SEC,
            start_lives: PLAYER_START_LIVES,
            pellet_score: PELLET_SCORE,
            power_pellet_score: POWER_PELLET_SCORE,
            ghost_score: GHOST_SCORE,
            ghost_sprites: GHOST_SPRITES.iter().map(|s| s.to_string()).collect(),
            ghost_cooldowns_sec: GHOST_COOLDOWNS_SEC.to_vec(),
            player_name: DEFAULT_PLAYER_NAME.to_string(),
        }
    }
}

impl GameConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: GameConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tickRate must be positive".into()));
        }
        for (name, speed) in [
            ("playerSpeed", self.player_speed),
            ("ghostSpeed", self.ghost_speed),
        ] {
            // a step of half a cell or more can jump over the alignment window
            if !(speed > 0.0 && speed < HALF_CELL) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in (0, {HALF_CELL}), got {speed}"
                )));
            }
        }
        for (name, seconds) in [
            ("scaredTimeSec", self.scared_time_sec),
            ("ghostSpawnIntervalSec", self.ghost_spawn_interval_sec),
            ("tunnelCooldownSec", self.tunnel_cooldown_sec),
        ] {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-negative number, got {seconds}"
                )));
            }
        }
        if self.ghost_sprites.is_empty() {
            return Err(ConfigError::Invalid("ghostSprites must not be empty".into()));
        }
        if self.ghost_cooldowns_sec.is_empty() {
            return Err(ConfigError::Invalid(
                "ghostCooldownsSec must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .ghost_cooldowns_sec
            .iter()
            .find(|value| !value.is_finite() || **value < 0.0)
        {
            return Err(ConfigError::Invalid(format!(
                "ghostCooldownsSec entries must be non-negative, got {bad}"
            )));
        }
        Ok(())
    }

    pub fn scared_ticks(&self) -> u32 {
        secs_to_ticks(self.scared_time_sec, self.tick_rate)
    }

    pub fn spawn_interval_ticks(&self) -> u32 {
        secs_to_ticks(self.ghost_spawn_interval_sec, self.tick_rate)
    }

    pub fn tunnel_cooldown_ticks(&self) -> u32 {
        secs_to_ticks(self.tunnel_cooldown_sec, self.tick_rate)
    }

    /// Sprite key and replan cooldown for the `index`-th ghost spawn marker.
    pub fn ghost_profile(&self, index: usize) -> (String, u32) {
        let sprite = self
            .ghost_sprites
            .get(index % self.ghost_sprites.len().max(1))
            .cloned()
            .unwrap_or_default();
        let cooldown_sec = self
            .ghost_cooldowns_sec
            .get(index % self.ghost_cooldowns_sec.len().max(1))
            .copied()
            .unwrap_or_default();
        (sprite, secs_to_ticks(cooldown_sec, self.tick_rate))
    }
}
