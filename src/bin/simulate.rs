use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use maze_chase::config::GameConfig;
use maze_chase::engine::movement::is_aligned;
use maze_chase::engine::pathfinding::find_path;
use maze_chase::engine::{Control, Session};
use maze_chase::persistence::MemoryStorage;
use maze_chase::types::{Cell, Direction, Intent, Phase, SessionView, Tile};
use maze_chase::world::GridMap;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_MAP: &str = include_str!("../../maps/level_1.txt");

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless autopilot runs with invariant checks")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    map: Option<PathBuf>,
    /// Run a single scenario with this tick budget instead of the default set.
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug)]
struct Scenario {
    name: String,
    config: GameConfig,
    max_ticks: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    outcome: String,
    ticks: u64,
    score: u32,
    lives: u32,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: usize,
    #[serde(rename = "pelletsRemaining")]
    pellets_remaining: usize,
    #[serde(rename = "ghostsEaten")]
    ghosts_eaten: u32,
    #[serde(rename = "livesLost")]
    lives_lost: u32,
    #[serde(rename = "ghostsReleased")]
    ghosts_released: usize,
    #[serde(rename = "elapsedMs")]
    elapsed_ms: u128,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let grid = match cli.map.as_deref() {
        Some(path) => GridMap::load(path)
            .with_context(|| format!("failed to load map {}", path.display()))?,
        None => GridMap::parse(DEFAULT_MAP).context("bundled map is invalid")?,
    };
    let base_config = match cli.config.as_deref() {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };

    let mut results = Vec::new();
    let mut has_anomaly = false;
    for scenario in resolve_scenarios(&cli, &base_config) {
        info!(scenario = %scenario.name, max_ticks = scenario.max_ticks, "scenario started");
        let (result, records) = run_scenario(&scenario, grid.clone());
        for record in &records {
            warn!(scenario = %scenario.name, tick = record.tick, message = %record.message, "anomaly detected");
        }
        has_anomaly |= !result.anomalies.is_empty();
        info!(
            scenario = %scenario.name,
            outcome = %result.outcome,
            score = result.score,
            ticks = result.ticks,
            "scenario finished"
        );
        println!("{}", serde_json::to_string(&result)?);
        results.push(result);
    }

    let summary = build_run_summary(results);
    if let Some(path) = cli.summary_out.as_deref() {
        write_summary(path, &summary)
            .with_context(|| format!("failed to write summary {}", path.display()))?;
    }

    if has_anomaly {
        std::process::exit(1);
    }
    Ok(())
}

fn resolve_scenarios(cli: &Cli, base: &GameConfig) -> Vec<Scenario> {
    if let Some(ticks) = cli.ticks {
        return vec![Scenario {
            name: "custom".to_string(),
            config: base.clone(),
            max_ticks: ticks.max(1),
        }];
    }
    let minute = base.tick_rate as u64 * 60;
    vec![
        Scenario {
            name: "autopilot-default".to_string(),
            config: base.clone(),
            max_ticks: minute * 3,
        },
        Scenario {
            name: "autopilot-crowded".to_string(),
            config: GameConfig {
                ghost_spawn_interval_sec: 1.0,
                start_lives: 5,
                ..base.clone()
            },
            max_ticks: minute * 3,
        },
        Scenario {
            name: "autopilot-slow-ghosts".to_string(),
            config: GameConfig {
                ghost_speed: 1.5,
                ..base.clone()
            },
            max_ticks: minute * 2,
        },
    ]
}

fn run_scenario(scenario: &Scenario, grid: GridMap) -> (ScenarioResultLine, Vec<AnomalyRecord>) {
    let started = Instant::now();
    let initial_pellets = grid.initial_pellets();
    let mut storage = MemoryStorage::default();
    let mut session = Session::new(scenario.config.clone(), grid);
    session.handle_intent(Intent::Confirm, &mut storage);

    let mut log = AnomalyLog::default();
    let mut last_score = 0;
    let mut last_lives = session.lives();
    let mut lives_lost = 0;
    let mut ghosts_eaten = 0;

    let outcome = loop {
        match session.phase() {
            Phase::GameOver => break "game_over",
            Phase::VictoryPhase => break "victory",
            _ => {}
        }
        if session.tick() >= scenario.max_ticks {
            break "timeout";
        }
        if let Some(dir) = autopilot(&session) {
            if session.handle_intent(Intent::Move(dir), &mut storage) == Control::Halt {
                break "halted";
            }
        }
        let before = session.view();
        session.update();
        let view = session.view();

        if view.lives < last_lives {
            lives_lost += last_lives - view.lives;
        }
        ghosts_eaten += ghost_points(&before, &view, &scenario.config)
            / scenario.config.ghost_score.max(1);
        for message in collect_anomalies(&session, &view, last_score, &scenario.config) {
            log.note(view.tick, message);
        }
        last_score = view.score;
        last_lives = view.lives;
    };

    let view = session.view();
    let result = ScenarioResultLine {
        scenario: scenario.name.clone(),
        outcome: outcome.to_string(),
        ticks: view.tick,
        score: view.score,
        lives: view.lives,
        pellets_eaten: initial_pellets.saturating_sub(view.pellets_remaining),
        pellets_remaining: view.pellets_remaining,
        ghosts_eaten,
        lives_lost,
        ghosts_released: view.ghosts.len(),
        elapsed_ms: started.elapsed().as_millis(),
        anomalies: log.distinct,
    };
    (result, log.records)
}

/// Score gained this tick that did not come from items.
fn ghost_points(before: &SessionView, after: &SessionView, config: &GameConfig) -> u32 {
    let pellets = count_tiles(&before.tiles, Tile::Pellet)
        .saturating_sub(count_tiles(&after.tiles, Tile::Pellet)) as u32;
    let powers = count_tiles(&before.tiles, Tile::PowerPellet)
        .saturating_sub(count_tiles(&after.tiles, Tile::PowerPellet)) as u32;
    after
        .score
        .saturating_sub(before.score)
        .saturating_sub(pellets * config.pellet_score + powers * config.power_pellet_score)
}

fn count_tiles(rows: &[String], tile: Tile) -> usize {
    rows.iter()
        .flat_map(|row| row.chars())
        .filter(|symbol| *symbol == tile.symbol())
        .count()
}

fn autopilot(session: &Session) -> Option<Direction> {
    let grid = session.grid();
    let from = session.player().agent.cell;
    let goal = nearest_collectible(grid, from)?;
    let path = find_path(grid, from, goal)?;
    let next = *path.get(1)?;
    Some(step_direction(from, next))
}

fn nearest_collectible(grid: &GridMap, from: Cell) -> Option<Cell> {
    let mut visited = HashSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(cell) = queue.pop_front() {
        if cell != from && grid.tile(cell).is_collectible() {
            return Some(cell);
        }
        for dir in [Direction::Right, Direction::Left, Direction::Down, Direction::Up] {
            let next = cell.step(dir);
            if grid.is_walkable(next) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    None
}

fn step_direction(from: Cell, to: Cell) -> Direction {
    match (to.x - from.x, to.y - from.y) {
        (1, 0) => Direction::Right,
        (-1, 0) => Direction::Left,
        (0, 1) => Direction::Down,
        (0, -1) => Direction::Up,
        _ => Direction::None,
    }
}

fn collect_anomalies(
    session: &Session,
    view: &SessionView,
    last_score: u32,
    config: &GameConfig,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    let counted =
        count_tiles(&view.tiles, Tile::Pellet) + count_tiles(&view.tiles, Tile::PowerPellet);
    if counted != view.pellets_remaining {
        anomalies.push(format!(
            "pellet counter drift: counter {} grid {}",
            view.pellets_remaining, counted
        ));
    }
    if view.lives > config.start_lives {
        anomalies.push(format!("lives above start: {}", view.lives));
    }
    if view.score < last_score {
        anomalies.push(format!("score decreased: {} -> {}", last_score, view.score));
    }

    let grid = session.grid();
    let player = &session.player().agent;
    if !grid.is_walkable(player.cell) {
        anomalies.push(format!("player on blocked cell {:?}", player.cell));
    }
    if is_aligned(player.pos, player.speed) && Cell::containing(player.pos) != player.cell {
        anomalies.push(format!(
            "player cell {:?} disagrees with position ({:.1}, {:.1})",
            player.cell, player.pos.x, player.pos.y
        ));
    }
    for ghost in session.ghosts() {
        let agent = &ghost.agent;
        if !grid.is_walkable(agent.cell) {
            anomalies.push(format!("{} on blocked cell {:?}", ghost.sprite, agent.cell));
        }
        if agent.is_aligned() && Cell::containing(agent.pos) != agent.cell {
            anomalies.push(format!(
                "{} cell {:?} disagrees with position ({:.1}, {:.1})",
                ghost.sprite, agent.cell, agent.pos.x, agent.pos.y
            ));
        }
    }
    anomalies
}

#[derive(Default)]
struct AnomalyLog {
    records: Vec<AnomalyRecord>,
    distinct: Vec<String>,
    seen: HashSet<String>,
}

impl AnomalyLog {
    fn note(&mut self, tick: u64, message: String) {
        if self.seen.insert(message.clone()) {
            self.distinct.push(message.clone());
        }
        self.records.push(AnomalyRecord { tick, message });
    }
}

fn build_run_summary(scenarios: Vec<ScenarioResultLine>) -> RunSummary {
    let mut outcome_counts = BTreeMap::new();
    for scenario in &scenarios {
        *outcome_counts.entry(scenario.outcome.clone()).or_insert(0) += 1;
    }
    RunSummary {
        scenario_count: scenarios.len(),
        anomaly_count: scenarios.iter().map(|s| s.anomalies.len()).sum(),
        outcome_counts,
        scenarios,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, text)?;
    Ok(())
}
