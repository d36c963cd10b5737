use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use maze_chase::config::GameConfig;
use maze_chase::engine::{Control, Session};
use maze_chase::persistence::FileStorage;
use maze_chase::types::{Direction, Intent, MenuOption, PauseOption, Phase, SessionView};
use maze_chase::world::GridMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_MAP: &str = include_str!("../../maps/level_1.txt");

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    map: Option<PathBuf>,
    /// Defaults to $MAZE_SAVE_PATH, then .data/save.json
    #[arg(long)]
    save: Option<PathBuf>,
    /// Defaults to $MAZE_RANKING_PATH, then .data/ranking.txt
    #[arg(long)]
    ranking: Option<PathBuf>,
    #[arg(long)]
    name: Option<String>,
    /// Ticks between redraws while playing.
    #[arg(long, default_value_t = 6)]
    redraw_every: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match cli.config.as_deref() {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(name) = cli.name.clone() {
        config.player_name = name;
    }
    config.validate()?;

    let grid = match cli.map.as_deref() {
        Some(path) => GridMap::load(path)
            .with_context(|| format!("failed to load map {}", path.display()))?,
        None => GridMap::parse(DEFAULT_MAP).context("bundled map is invalid")?,
    };

    let save_path = cli.save.clone().unwrap_or_else(|| {
        std::env::var("MAZE_SAVE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".data/save.json"))
    });
    let ranking_path = cli.ranking.clone().unwrap_or_else(|| {
        std::env::var("MAZE_RANKING_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".data/ranking.txt"))
    });
    info!(save = %save_path.display(), ranking = %ranking_path.display(), "storage paths");

    let mut storage = FileStorage::new(save_path, ranking_path);
    let tick = Duration::from_micros(1_000_000 / config.tick_rate as u64);
    let mut session = Session::new(config, grid);

    let (tx, mut rx) = mpsc::channel::<String>(64);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = tx.send("q".to_string()).await;
                    break;
                }
                Err(error) => {
                    warn!(%error, "stdin read failed");
                    break;
                }
            }
        }
    });

    let mut interval = tokio::time::interval(tick);
    let mut last_phase = None;
    let mut dirty = true;
    'outer: loop {
        interval.tick().await;
        while let Ok(line) = rx.try_recv() {
            for intent in parse_intents(&line, session.phase()) {
                if session.handle_intent(intent, &mut storage) == Control::Halt {
                    break 'outer;
                }
                dirty = true;
            }
        }
        session.update();

        let phase = session.phase();
        let redraw = dirty
            || last_phase != Some(phase)
            || (phase == Phase::Playing && session.tick() % cli.redraw_every.max(1) == 0);
        if redraw {
            print!("\x1b[2J\x1b[H{}", render(&session.view()));
            dirty = false;
            last_phase = Some(phase);
        }
    }

    info!(score = session.score(), "bye");
    Ok(())
}

fn parse_intents(line: &str, phase: Phase) -> Vec<Intent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return vec![Intent::Confirm];
    }
    trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .filter_map(|c| intent_for(c.to_ascii_lowercase(), phase))
        .collect()
}

fn intent_for(key: char, phase: Phase) -> Option<Intent> {
    let in_round = phase == Phase::Playing;
    let intent = match key {
        'q' => Intent::Quit,
        'p' => Intent::PauseToggle,
        'x' => Intent::Cancel,
        'e' => Intent::Confirm,
        'w' if in_round => Intent::Move(Direction::Up),
        's' if in_round => Intent::Move(Direction::Down),
        'a' if in_round => Intent::Move(Direction::Left),
        'd' if in_round => Intent::Move(Direction::Right),
        'w' => Intent::NavigateUp,
        's' => Intent::NavigateDown,
        _ => return None,
    };
    Some(intent)
}

fn render(view: &SessionView) -> String {
    let mut out = String::new();
    match view.phase {
        Phase::MainMenu => {
            out.push_str("MAZE CHASE\n\n");
            for (idx, option) in MenuOption::ALL.iter().enumerate() {
                let marker = if idx == view.menu_index { '>' } else { ' ' };
                let _ = writeln!(out, " {marker} {}", option.label());
            }
        }
        Phase::Ranking => {
            out.push_str("RANKING\n\n");
            if let Some(ranking) = &view.ranking {
                for (idx, entry) in ranking.entries.iter().enumerate() {
                    let _ = writeln!(out, "{:>2}. {:<12} {:>6}", idx + 1, entry.name, entry.score);
                }
                if ranking.entries.is_empty() {
                    out.push_str("  no scores yet\n");
                }
            }
            out.push_str("\n<enter> back\n");
        }
        Phase::Playing | Phase::Paused => {
            out.push_str(&render_board(view));
            if view.phase == Phase::Paused {
                out.push_str("\nPAUSED\n");
                for (idx, option) in PauseOption::ALL.iter().enumerate() {
                    let marker = if idx == view.pause_index { '>' } else { ' ' };
                    let _ = writeln!(out, " {marker} {}", option.label());
                }
            }
        }
        Phase::GameOver => {
            let _ = writeln!(out, "GAME OVER\n\nscore {}\n\n<enter> menu", view.score);
        }
        Phase::VictoryPhase => {
            let _ = writeln!(out, "MAZE CLEARED\n\nscore {}\n\n<enter> menu", view.score);
        }
    }
    if let Some(notice) = &view.notice {
        let _ = writeln!(out, "\n! {notice}");
    }
    out
}

fn render_board(view: &SessionView) -> String {
    let mut rows: Vec<Vec<char>> = view.tiles.iter().map(|row| row.chars().collect()).collect();
    let mut put = |x: i32, y: i32, symbol: char| {
        if let Some(slot) = usize::try_from(y)
            .ok()
            .and_then(|y| rows.get_mut(y))
            .and_then(|row| usize::try_from(x).ok().and_then(|x| row.get_mut(x)))
        {
            *slot = symbol;
        }
    };
    for ghost in &view.ghosts {
        let symbol = if ghost.frightened {
            '~'
        } else {
            ghost
                .sprite
                .chars()
                .next()
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or('G')
        };
        put(ghost.cell.x, ghost.cell.y, symbol);
    }
    let player = match view.player.facing {
        Direction::Up => 'v',
        Direction::Down => '^',
        Direction::Left => '>',
        _ => '<',
    };
    put(view.player.cell.x, view.player.cell.y, player);

    let mut out = String::new();
    for row in rows {
        out.extend(row);
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "score {:>6}  lives {}  pellets {:>3}  queued {}{}",
        view.score,
        view.lives,
        view.pellets_remaining,
        view.queued_ghosts,
        if view.player.invincible_ticks > 0 {
            "  POWER"
        } else {
            ""
        }
    );
    out
}
