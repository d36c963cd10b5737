use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::constants::{DEFAULT_PLAYER_NAME, RANKING_LIMIT};
use crate::error::PersistError;
use crate::types::{RankingEntry, RankingView};

/// Append-only score log, one `NAME SCORE` pair per line.
pub struct RankingStore {
    file_path: PathBuf,
}

impl RankingStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn record(&self, name: &str, score: u32) -> Result<(), PersistError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let name = ranking_name(name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{name} {score}")?;
        debug!(%name, score, path = %self.file_path.display(), "score recorded");
        Ok(())
    }

    pub fn entries(&self) -> Vec<RankingEntry> {
        let text = match fs::read_to_string(&self.file_path) {
            Ok(text) => text,
            Err(error) => {
                if error.kind() != ErrorKind::NotFound {
                    warn!(path = %self.file_path.display(), %error, "failed to read ranking");
                }
                return Vec::new();
            }
        };
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| {
                let parsed = parse_line(line);
                if parsed.is_none() {
                    warn!(line = idx + 1, content = line, "skipping malformed ranking line");
                }
                parsed
            })
            .collect()
    }

    pub fn top(&self, limit: usize) -> Vec<RankingEntry> {
        let mut entries = self.entries();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(limit);
        entries
    }

    pub fn build_view(&self) -> RankingView {
        RankingView {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries: self.top(RANKING_LIMIT),
        }
    }
}

pub fn parse_line(line: &str) -> Option<RankingEntry> {
    let mut parts = line.split_whitespace();
    let name = parts.next()?;
    let score = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(RankingEntry {
        name: name.to_string(),
        score,
    })
}

fn ranking_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return DEFAULT_PLAYER_NAME.to_string();
    }
    trimmed
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            rand::random::<u32>()
        );
        std::env::temp_dir().join(unique).join("ranking.txt")
    }

    #[test]
    fn record_appends_and_creates_parent_dir() {
        let path = temp_file("ranking-record");
        let store = RankingStore::new(path.clone());
        store.record("Alice", 120).expect("record");
        store.record("  Bob Smith ", 80).expect("record");
        store.record("", 5).expect("record");

        let text = fs::read_to_string(&path).expect("read back");
        assert_eq!(text, "Alice 120\nBob_Smith 80\nPLAYER 5\n");

        let _ = fs::remove_dir_all(path.parent().expect("parent exists"));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let path = temp_file("ranking-malformed");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        fs::write(
            &path,
            "Alice 100\nno-score\nBob abc\n\nCarol 300 extra\nDave -4\nEve 50\n",
        )
        .expect("write file");

        let store = RankingStore::new(path.clone());
        assert_eq!(
            store.entries(),
            vec![
                RankingEntry {
                    name: "Alice".into(),
                    score: 100
                },
                RankingEntry {
                    name: "Eve".into(),
                    score: 50
                },
            ]
        );

        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn top_is_descending_stable_and_limited() {
        let path = temp_file("ranking-top");
        let store = RankingStore::new(path.clone());
        for (idx, score) in [30, 90, 30, 10, 50, 70, 20, 80, 60, 40, 100, 90].iter().enumerate() {
            store.record(&format!("P{idx}"), *score).expect("record");
        }

        let top = store.top(RANKING_LIMIT);
        assert_eq!(top.len(), 10);
        let scores: Vec<u32> = top.iter().map(|entry| entry.score).collect();
        assert_eq!(scores, vec![100, 90, 90, 80, 70, 60, 50, 40, 30, 30]);
        assert_eq!(top[1].name, "P1");
        assert_eq!(top[2].name, "P11");
        assert_eq!(top[8].name, "P0");
        assert_eq!(top[9].name, "P2");

        let view = store.build_view();
        assert_eq!(view.entries, top);
        assert!(chrono::DateTime::parse_from_rfc3339(&view.generated_at_iso).is_ok());

        let _ = fs::remove_dir_all(path.parent().expect("parent exists"));
    }

    #[test]
    fn missing_file_is_empty_ranking() {
        let store = RankingStore::new(temp_file("ranking-missing"));
        assert!(store.entries().is_empty());
        assert!(store.build_view().entries.is_empty());
    }
}
