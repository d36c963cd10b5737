use std::collections::VecDeque;

use tracing::debug;

use crate::config::GameConfig;
use crate::types::Tile;
use crate::world::GridMap;

use super::movement::Ghost;

#[derive(Clone, Debug)]
pub struct SpawnScheduler {
    queue: VecDeque<Ghost>,
    elapsed: u32,
    interval: u32,
}

impl SpawnScheduler {
    pub fn new(queue: VecDeque<Ghost>, interval: u32) -> Self {
        Self {
            queue,
            elapsed: 0,
            interval,
        }
    }

    pub fn from_map(grid: &GridMap, config: &GameConfig) -> Self {
        let queue = grid
            .find_all(Tile::GhostSpawn)
            .into_iter()
            .enumerate()
            .map(|(index, spawn)| {
                let (sprite, cooldown) = config.ghost_profile(index);
                Ghost::new(spawn, config.ghost_speed, sprite, cooldown)
            })
            .collect();
        Self::new(queue, config.spawn_interval_ticks())
    }

    /// Advances the release timer; returns a ghost when one is due. The
    /// timer only runs while something is queued.
    pub fn tick(&mut self) -> Option<Ghost> {
        if self.queue.is_empty() {
            return None;
        }
        self.elapsed += 1;
        if self.elapsed < self.interval {
            return None;
        }
        self.elapsed = 0;
        let ghost = self.queue.pop_front()?;
        debug!(sprite = %ghost.sprite, spawn = ?ghost.agent.spawn, left = self.queue.len(), "ghost released");
        Some(ghost)
    }

    pub fn take(&mut self, count: usize) -> Vec<Ghost> {
        let count = count.min(self.queue.len());
        self.queue.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn ghost(x: i32) -> Ghost {
        Ghost::new(Cell::new(x, 1), 2.1, format!("g{x}"), 60)
    }

    #[test]
    fn kth_ghost_released_at_k_intervals() {
        let mut scheduler = SpawnScheduler::new((1..=3).map(ghost).collect(), 5);
        let mut released = Vec::new();
        for tick in 1..=20u32 {
            if let Some(ghost) = scheduler.tick() {
                released.push((tick, ghost.agent.spawn.x));
            }
        }
        assert_eq!(released, vec![(5, 1), (10, 2), (15, 3)]);
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.elapsed(), 0);
    }

    #[test]
    fn timer_is_frozen_while_queue_is_empty() {
        let mut scheduler = SpawnScheduler::new(VecDeque::new(), 3);
        for _ in 0..10 {
            assert!(scheduler.tick().is_none());
        }
        assert_eq!(scheduler.elapsed(), 0);
    }

    #[test]
    fn take_drains_from_front_and_caps_at_queue_length() {
        let mut scheduler = SpawnScheduler::new((1..=3).map(ghost).collect(), 5);
        let taken = scheduler.take(2);
        assert_eq!(
            taken.iter().map(|g| g.agent.spawn.x).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(scheduler.take(9).len(), 1);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn from_map_assigns_profiles_in_marker_order() {
        let grid = GridMap::parse("#######\n#GPG G#\n#######").expect("map");
        let config = GameConfig::default();
        let mut scheduler = SpawnScheduler::from_map(&grid, &config);
        assert_eq!(scheduler.len(), 3);
        let ghosts = scheduler.take(3);
        let sprites: Vec<_> = ghosts.iter().map(|g| g.sprite.as_str()).collect();
        assert_eq!(sprites, vec!["blinky", "pinky", "inky"]);
        assert_eq!(ghosts[1].cooldown_ticks(), 186);
        assert_eq!(ghosts[2].agent.spawn, Cell::new(5, 1));
    }
}
