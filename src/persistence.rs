use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::RANKING_LIMIT;
use crate::error::PersistError;
use crate::ranking_store::RankingStore;
use crate::types::{Cell, RankingEntry, RankingView};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub score: u32,
    pub lives: u32,
    pub player: Cell,
    pub invincible_ticks: u32,
    pub tiles: Vec<String>,
    pub ghosts: Vec<Cell>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

pub trait SessionStorage {
    fn save_session(&mut self, snapshot: &SavedSession) -> Result<(), PersistError>;
    fn load_session(&mut self) -> Result<SavedSession, PersistError>;
    fn record_score(&mut self, name: &str, score: u32) -> Result<(), PersistError>;
    fn ranking(&self) -> RankingView;
}

pub struct SaveStore {
    file_path: PathBuf,
}

impl SaveStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn save(&self, snapshot: &SavedSession) -> Result<(), PersistError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut stamped = snapshot.clone();
        stamped.saved_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        let text = serde_json::to_string_pretty(&stamped)?;
        let tmp = self.file_path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.file_path)?;
        info!(path = %self.file_path.display(), score = snapshot.score, "session saved");
        Ok(())
    }

    pub fn load(&self) -> Result<SavedSession, PersistError> {
        let text = fs::read_to_string(&self.file_path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

pub struct FileStorage {
    saves: SaveStore,
    ranking: RankingStore,
}

impl FileStorage {
    pub fn new(save_path: PathBuf, ranking_path: PathBuf) -> Self {
        Self {
            saves: SaveStore::new(save_path),
            ranking: RankingStore::new(ranking_path),
        }
    }
}

impl SessionStorage for FileStorage {
    fn save_session(&mut self, snapshot: &SavedSession) -> Result<(), PersistError> {
        self.saves.save(snapshot)
    }

    fn load_session(&mut self) -> Result<SavedSession, PersistError> {
        self.saves.load()
    }

    fn record_score(&mut self, name: &str, score: u32) -> Result<(), PersistError> {
        self.ranking.record(name, score)
    }

    fn ranking(&self) -> RankingView {
        self.ranking.build_view()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    pub saved: Option<SavedSession>,
    pub scores: Vec<RankingEntry>,
}

impl SessionStorage for MemoryStorage {
    fn save_session(&mut self, snapshot: &SavedSession) -> Result<(), PersistError> {
        self.saved = Some(snapshot.clone());
        Ok(())
    }

    fn load_session(&mut self) -> Result<SavedSession, PersistError> {
        self.saved.clone().ok_or_else(|| {
            PersistError::Io(io::Error::new(io::ErrorKind::NotFound, "no saved session"))
        })
    }

    fn record_score(&mut self, name: &str, score: u32) -> Result<(), PersistError> {
        self.scores.push(RankingEntry {
            name: name.to_string(),
            score,
        });
        Ok(())
    }

    fn ranking(&self) -> RankingView {
        let mut entries = self.scores.clone();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(RANKING_LIMIT);
        RankingView {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries,
        }
    }
}
