use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::error::PersistError;
use crate::persistence::{SavedSession, SessionStorage};
use crate::types::{
    Cell, Direction, GhostView, Intent, MenuOption, PauseOption, Phase, PlayerView, RankingView,
    SessionView, Tile,
};
use crate::world::GridMap;

pub mod collision;
pub mod movement;
pub mod pathfinding;
pub mod spawn_system;

use self::movement::{Ghost, Player, PlayerStep, TunnelClock};
use self::spawn_system::SpawnScheduler;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,
    Halt,
}

#[derive(Clone, Debug)]
pub struct Session {
    config: GameConfig,
    grid: GridMap,
    phase: Phase,
    menu_index: usize,
    pause_index: usize,
    score: u32,
    lives: u32,
    player: Player,
    ghosts: Vec<Ghost>,
    spawns: SpawnScheduler,
    tunnels: TunnelClock,
    tick_counter: u64,
    notice: Option<String>,
    ranking: Option<RankingView>,
}

impl Session {
    pub fn new(config: GameConfig, grid: GridMap) -> Self {
        let player = Player::new(grid.player_spawn(), config.player_speed);
        let spawns = SpawnScheduler::from_map(&grid, &config);
        let tunnels = TunnelClock::new(config.tunnel_cooldown_ticks());
        Self {
            lives: config.start_lives,
            config,
            grid,
            phase: Phase::MainMenu,
            menu_index: 0,
            pause_index: 0,
            score: 0,
            player,
            ghosts: Vec::new(),
            spawns,
            tunnels,
            tick_counter: 0,
            notice: None,
            ranking: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn ghosts(&self) -> &[Ghost] {
        &self.ghosts
    }

    pub fn queued_ghosts(&self) -> usize {
        self.spawns.len()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn selected_menu(&self) -> MenuOption {
        MenuOption::ALL[self.menu_index % MenuOption::ALL.len()]
    }

    pub fn selected_pause(&self) -> PauseOption {
        PauseOption::ALL[self.pause_index % PauseOption::ALL.len()]
    }

    pub fn handle_intent<S: SessionStorage>(&mut self, intent: Intent, storage: &mut S) -> Control {
        if intent == Intent::Quit {
            info!(phase = ?self.phase, "quit requested");
            return Control::Halt;
        }
        match self.phase {
            Phase::MainMenu => match intent {
                Intent::NavigateUp => {
                    self.menu_index = wrap_prev(self.menu_index, MenuOption::ALL.len())
                }
                Intent::NavigateDown => {
                    self.menu_index = wrap_next(self.menu_index, MenuOption::ALL.len())
                }
                Intent::Confirm => return self.confirm_menu(storage),
                _ => {}
            },
            Phase::Playing => match intent {
                Intent::PauseToggle => {
                    self.pause_index = 0;
                    self.set_phase(Phase::Paused);
                }
                Intent::Move(dir) => self.player.buffer_direction(dir),
                _ => {}
            },
            Phase::Paused => match intent {
                Intent::NavigateUp => {
                    self.pause_index = wrap_prev(self.pause_index, PauseOption::ALL.len())
                }
                Intent::NavigateDown => {
                    self.pause_index = wrap_next(self.pause_index, PauseOption::ALL.len())
                }
                Intent::Confirm => return self.confirm_pause(storage),
                Intent::PauseToggle | Intent::Cancel => self.set_phase(Phase::Playing),
                _ => {}
            },
            Phase::GameOver | Phase::VictoryPhase => {
                if intent == Intent::Confirm {
                    self.record_score(storage);
                    self.set_phase(Phase::MainMenu);
                }
            }
            Phase::Ranking => {
                if matches!(intent, Intent::Confirm | Intent::Cancel) {
                    self.ranking = None;
                    self.set_phase(Phase::MainMenu);
                }
            }
        }
        Control::Continue
    }

    pub fn update(&mut self) {
        self.tick_counter += 1;
        match self.phase {
            Phase::Playing => self.step_playing(),
            Phase::MainMenu
            | Phase::Paused
            | Phase::GameOver
            | Phase::VictoryPhase
            | Phase::Ranking => {}
        }
    }

    pub fn reset_round(&mut self) {
        self.grid.reset();
        self.score = 0;
        self.lives = self.config.start_lives;
        self.player = Player::new(self.grid.player_spawn(), self.config.player_speed);
        self.ghosts.clear();
        self.spawns = SpawnScheduler::from_map(&self.grid, &self.config);
        self.tunnels = TunnelClock::new(self.config.tunnel_cooldown_ticks());
        self.notice = None;
    }

    pub fn snapshot(&self) -> SavedSession {
        SavedSession {
            score: self.score,
            lives: self.lives,
            player: self.player.agent.cell,
            invincible_ticks: self.player.invincible_ticks,
            tiles: self.grid.rows(),
            ghosts: self.ghosts.iter().map(|ghost| ghost.agent.cell).collect(),
            saved_at: None,
        }
    }

    /// Replaces the round with a saved one. Nothing changes unless every
    /// part of the snapshot is valid for this map.
    pub fn restore(&mut self, saved: &SavedSession) -> Result<(), PersistError> {
        let decoded = self.grid.decode_rows(&saved.tiles)?;
        let mut grid = self.grid.clone();
        grid.restore(decoded);
        if !grid.is_walkable(saved.player) {
            return Err(PersistError::BadCoordinate {
                what: "player",
                x: saved.player.x,
                y: saved.player.y,
            });
        }
        if let Some(bad) = saved.ghosts.iter().find(|cell| !grid.is_walkable(**cell)) {
            return Err(PersistError::BadCoordinate {
                what: "ghost",
                x: bad.x,
                y: bad.y,
            });
        }

        self.reset_round();
        self.grid = grid;
        self.score = saved.score;
        self.lives = saved.lives;
        self.player.agent.place(saved.player);
        self.player.invincible_ticks = saved.invincible_ticks;
        let mut ghosts = self.spawns.take(saved.ghosts.len());
        for (ghost, cell) in ghosts.iter_mut().zip(&saved.ghosts) {
            ghost.agent.place(*cell);
        }
        if ghosts.len() < saved.ghosts.len() {
            warn!(
                saved = saved.ghosts.len(),
                available = ghosts.len(),
                "snapshot has more ghosts than the map provides"
            );
        }
        self.ghosts = ghosts;
        Ok(())
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            tick: self.tick_counter,
            phase: self.phase,
            menu_index: self.menu_index,
            pause_index: self.pause_index,
            score: self.score,
            lives: self.lives,
            pellets_remaining: self.grid.pellets_remaining(),
            queued_ghosts: self.spawns.len(),
            tiles: self.grid.rows(),
            player: PlayerView {
                x: self.player.agent.pos.x,
                y: self.player.agent.pos.y,
                cell: self.player.agent.cell,
                dir: self.player.direction,
                facing: self.player.facing(),
                invincible_ticks: self.player.invincible_ticks,
            },
            ghosts: self
                .ghosts
                .iter()
                .map(|ghost| GhostView {
                    sprite: ghost.sprite.clone(),
                    x: ghost.agent.pos.x,
                    y: ghost.agent.pos.y,
                    cell: ghost.agent.cell,
                    facing: Direction::from_heading(ghost.heading),
                    frightened: ghost.frightened,
                })
                .collect(),
            notice: self.notice.clone(),
            ranking: self.ranking.clone(),
        }
    }

    fn confirm_menu<S: SessionStorage>(&mut self, storage: &mut S) -> Control {
        match self.selected_menu() {
            MenuOption::Start => {
                self.reset_round();
                self.set_phase(Phase::Playing);
            }
            MenuOption::Ranking => {
                self.ranking = Some(storage.ranking());
                self.set_phase(Phase::Ranking);
            }
            MenuOption::Load => {
                match storage
                    .load_session()
                    .and_then(|saved| self.restore(&saved))
                {
                    Ok(()) => {
                        info!(score = self.score, lives = self.lives, "saved session loaded");
                        self.set_phase(Phase::Playing);
                    }
                    Err(error) => {
                        warn!(%error, "failed to load saved session");
                        self.notice = Some(format!("could not load saved game: {error}"));
                    }
                }
            }
            MenuOption::Quit => {
                info!("quit from main menu");
                return Control::Halt;
            }
        }
        Control::Continue
    }

    fn confirm_pause<S: SessionStorage>(&mut self, storage: &mut S) -> Control {
        match self.selected_pause() {
            PauseOption::SaveAndExit => {
                let snapshot = self.snapshot();
                if let Err(error) = storage.save_session(&snapshot) {
                    warn!(%error, "failed to save session");
                    self.notice = Some(format!("could not save game: {error}"));
                    return Control::Continue;
                }
                self.record_score(storage);
                return Control::Halt;
            }
            PauseOption::ExitWithoutSaving => self.set_phase(Phase::MainMenu),
            PauseOption::Cancel => self.set_phase(Phase::Playing),
        }
        Control::Continue
    }

    fn record_score<S: SessionStorage>(&mut self, storage: &mut S) {
        if let Err(error) = storage.record_score(&self.config.player_name, self.score) {
            warn!(%error, score = self.score, "failed to record score");
        }
    }

    fn step_playing(&mut self) {
        self.tunnels.tick();

        let was_invincible = self.player.is_invincible();
        let step = self.player.advance(&self.grid, &mut self.tunnels);
        if was_invincible && !self.player.is_invincible() {
            info!("invincibility over");
        }
        match step {
            PlayerStep::Moved {
                entered: Some(cell),
            } => self.apply_player_pickups(cell),
            PlayerStep::Teleported { from, to } => debug!(?from, ?to, "tunnel used"),
            PlayerStep::Moved { entered: None } => {}
        }

        let quarry = self.player.agent.cell;
        let frightened = self.player.is_invincible();
        for ghost in &mut self.ghosts {
            ghost.update(&self.grid, quarry, frightened);
        }

        if let Some(ghost) = self.spawns.tick() {
            self.ghosts.push(ghost);
        }

        let outcome = collision::resolve(
            &mut self.player,
            &mut self.ghosts,
            &mut self.score,
            &mut self.lives,
            self.config.ghost_score,
        );
        if outcome.game_over {
            self.set_phase(Phase::GameOver);
            return;
        }
        if self.grid.pellets_remaining() == 0 {
            info!(score = self.score, "maze cleared");
            self.set_phase(Phase::VictoryPhase);
        }
    }

    fn apply_player_pickups(&mut self, cell: Cell) {
        match self.grid.consume(cell) {
            Some(Tile::Pellet) => self.score += self.config.pellet_score,
            Some(Tile::PowerPellet) => {
                self.score += self.config.power_pellet_score;
                self.player.invincible_ticks = self.config.scared_ticks();
                info!(ticks = self.player.invincible_ticks, "player invincible");
            }
            _ => {}
        }
    }

    fn set_phase(&mut self, next: Phase) {
        if self.phase != next {
            info!(from = ?self.phase, to = ?next, "phase change");
        }
        self.phase = next;
    }
}

fn wrap_next(index: usize, len: usize) -> usize {
    (index + 1) % len
}

fn wrap_prev(index: usize, len: usize) -> usize {
    (index + len - 1) % len
}
