use tracing::{debug, info};

use crate::constants::HALF_CELL;

use super::movement::{Ghost, Player};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionOutcome {
    pub ghosts_eaten: u32,
    pub lives_lost: u32,
    pub game_over: bool,
}

/// Eaten ghosts go back to spawn but stay active. Stops at the first fatal hit.
pub fn resolve(
    player: &mut Player,
    ghosts: &mut [Ghost],
    score: &mut u32,
    lives: &mut u32,
    ghost_score: u32,
) -> CollisionOutcome {
    let mut outcome = CollisionOutcome::default();
    for idx in 0..ghosts.len() {
        if player.agent.pos.distance(ghosts[idx].agent.pos) >= HALF_CELL {
            continue;
        }
        if player.is_invincible() {
            *score += ghost_score;
            outcome.ghosts_eaten += 1;
            debug!(sprite = %ghosts[idx].sprite, score = *score, "ghost eaten");
            ghosts[idx].reset();
            continue;
        }

        *lives = lives.saturating_sub(1);
        outcome.lives_lost += 1;
        if *lives == 0 {
            outcome.game_over = true;
            info!(score = *score, "last life lost");
            break;
        }
        info!(lives = *lives, "life lost");
        player.reset();
        for ghost in ghosts.iter_mut() {
            ghost.reset();
        }
    }
    outcome
}
