use std::collections::VecDeque;

use tracing::trace;

use crate::constants::{CELL_SIZE, HALF_CELL};
use crate::types::{Cell, Direction, Vec2};
use crate::world::GridMap;

use super::pathfinding::find_path;

pub fn is_aligned(pos: Vec2, speed: f32) -> bool {
    (pos.x.rem_euclid(CELL_SIZE) - HALF_CELL).abs() < speed
        && (pos.y.rem_euclid(CELL_SIZE) - HALF_CELL).abs() < speed
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub cell: Cell,
    pub pos: Vec2,
    pub speed: f32,
    pub spawn: Cell,
}

impl Agent {
    pub fn new(spawn: Cell, speed: f32) -> Self {
        Self {
            cell: spawn,
            pos: spawn.center(),
            speed,
            spawn,
        }
    }

    pub fn is_aligned(&self) -> bool {
        is_aligned(self.pos, self.speed)
    }

    pub fn place(&mut self, cell: Cell) {
        self.cell = cell;
        self.pos = cell.center();
    }

    pub fn reset(&mut self) {
        self.place(self.spawn);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TunnelClock {
    remaining: u32,
    duration: u32,
}

impl TunnelClock {
    pub fn new(duration: u32) -> Self {
        Self {
            remaining: 0,
            duration,
        }
    }

    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    pub fn is_ready(&self) -> bool {
        self.remaining == 0
    }

    pub fn arm(&mut self) {
        self.remaining = self.duration;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerStep {
    Teleported { from: Cell, to: Cell },
    Moved { entered: Option<Cell> },
}

#[derive(Clone, Debug)]
pub struct Player {
    pub agent: Agent,
    pub direction: Direction,
    pub buffered: Option<Direction>,
    pub invincible_ticks: u32,
}

impl Player {
    pub fn new(spawn: Cell, speed: f32) -> Self {
        Self {
            agent: Agent::new(spawn, speed),
            direction: Direction::None,
            buffered: None,
            invincible_ticks: 0,
        }
    }

    /// Back to spawn, standing still. Invincibility is left as is.
    pub fn reset(&mut self) {
        self.agent.reset();
        self.direction = Direction::None;
        self.buffered = None;
    }

    pub fn buffer_direction(&mut self, dir: Direction) {
        self.buffered = Some(dir);
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_ticks > 0
    }

    pub fn facing(&self) -> Direction {
        match (self.direction, self.buffered) {
            (Direction::None, Some(Direction::None) | None) => Direction::Right,
            (Direction::None, Some(buffered)) => buffered,
            (dir, _) => dir,
        }
    }

    pub fn advance(&mut self, grid: &GridMap, tunnels: &mut TunnelClock) -> PlayerStep {
        self.invincible_ticks = self.invincible_ticks.saturating_sub(1);

        if self.agent.is_aligned() {
            let from = self.agent.cell;
            if tunnels.is_ready() {
                if let Some(to) = grid.tunnel_exit(from) {
                    self.agent.place(to);
                    tunnels.arm();
                    trace!(?from, ?to, "player took tunnel");
                    return PlayerStep::Teleported { from, to };
                }
            }
            if let Some(next) = self.buffered.take() {
                if !grid.tile(from.step(next)).is_wall() {
                    self.direction = next;
                }
            }
            if grid.tile(from.step(self.direction)).is_wall() {
                self.direction = Direction::None;
            }
        }

        self.agent.pos += self.direction.to_vec2() * self.agent.speed;
        let cell = Cell::containing(self.agent.pos);
        if cell == self.agent.cell {
            return PlayerStep::Moved { entered: None };
        }
        self.agent.cell = cell;
        PlayerStep::Moved {
            entered: Some(cell),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ghost {
    pub agent: Agent,
    pub sprite: String,
    pub heading: Vec2,
    pub frightened: bool,
    cooldown_ticks: u32,
    cooldown_remaining: u32,
    path: VecDeque<Cell>,
    target: Option<Cell>,
}

impl Ghost {
    pub fn new(spawn: Cell, speed: f32, sprite: String, cooldown_ticks: u32) -> Self {
        Self {
            agent: Agent::new(spawn, speed),
            sprite,
            heading: Vec2::ZERO,
            frightened: false,
            cooldown_ticks,
            cooldown_remaining: 0,
            path: VecDeque::new(),
            target: None,
        }
    }

    /// Back to spawn with no route. The replan countdown keeps running.
    pub fn reset(&mut self) {
        self.agent.reset();
        self.heading = Vec2::ZERO;
        self.path.clear();
        self.target = None;
    }

    pub fn target(&self) -> Option<Cell> {
        self.target
    }

    pub fn path(&self) -> &VecDeque<Cell> {
        &self.path
    }

    pub fn cooldown_ticks(&self) -> u32 {
        self.cooldown_ticks
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }

    pub fn update(&mut self, grid: &GridMap, quarry: Cell, quarry_invincible: bool) {
        if self.cooldown_remaining > 0 {
            self.cooldown_remaining -= 1;
        }
        if self.cooldown_remaining == 0 {
            self.replan(grid, quarry);
            self.cooldown_remaining = self.cooldown_ticks;
        }
        self.move_towards_target();
        self.frightened = quarry_invincible;
    }

    pub fn replan(&mut self, grid: &GridMap, goal: Cell) {
        self.path = find_path(grid, self.agent.cell, goal)
            .map(VecDeque::from)
            .unwrap_or_default();
        self.target = self.path.get(1).copied();
        trace!(
            sprite = %self.sprite,
            from = ?self.agent.cell,
            ?goal,
            len = self.path.len(),
            "ghost replanned"
        );
    }

    fn move_towards_target(&mut self) {
        let Some(target) = self.target else {
            return;
        };
        let goal = target.center();
        let delta = goal - self.agent.pos;
        if delta.length() < self.agent.speed {
            self.agent.place(target);
            self.path.pop_front();
            self.target = self.path.get(1).copied();
            return;
        }
        let Some(unit) = delta.normalized() else {
            return;
        };
        self.heading = unit;
        self.agent.pos += unit * self.agent.speed;
        if self.agent.is_aligned() {
            self.agent.cell = Cell::containing(self.agent.pos);
        }
    }
}
