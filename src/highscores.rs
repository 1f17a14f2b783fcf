//! High score leaderboard system
//!
//! Persisted through platform storage, tracks the top 10 scores. Older saves
//! stored a bare JSON array of numbers; those still load.

use serde::{Deserialize, Serialize};

use crate::platform::{Storage, StorageError};
use crate::sim::GameState;

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    /// Stage reached
    #[serde(default)]
    pub stage: u32,
    /// Unix timestamp (ms) when achieved
    #[serde(default)]
    pub timestamp: f64,
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

/// Stored forms we accept
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredScores {
    Board(HighScores),
    Entries(Vec<HighScoreEntry>),
    Legacy(Vec<f64>),
}

impl HighScores {
    const STORAGE_KEY: &'static str = "highScores";

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Add a new score to the leaderboard (if it qualifies)
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add_score(&mut self, score: u64, stage: u32, timestamp: f64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }

        let entry = HighScoreEntry {
            score,
            stage,
            timestamp,
        };

        // Sorted descending by score
        let pos = self.entries.iter().position(|e| score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    /// Record the score and stage of a finished or abandoned run
    pub fn record_run(&mut self, state: &GameState, timestamp: f64) -> Option<usize> {
        let rank = self.add_score(state.score(), state.current_stage(), timestamp)?;
        log::info!("New high score #{}: {}", rank, state.score());
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Parse any stored form, normalizing order and length
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut entries = match serde_json::from_str::<StoredScores>(json)? {
            StoredScores::Board(board) => board.entries,
            StoredScores::Entries(entries) => entries,
            StoredScores::Legacy(scores) => scores
                .into_iter()
                .filter(|s| s.is_finite() && *s > 0.0)
                .map(|s| HighScoreEntry {
                    score: s.floor() as u64,
                    stage: 0,
                    timestamp: 0.0,
                })
                .collect(),
        };
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_HIGH_SCORES);
        Ok(Self { entries })
    }

    pub fn load_from(storage: &dyn Storage) -> Result<Self, StorageError> {
        match storage.get(Self::STORAGE_KEY)? {
            Some(json) => Ok(Self::from_json(&json)?),
            None => Ok(Self::new()),
        }
    }

    pub fn save_to(&self, storage: &dyn Storage) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        storage.set(Self::STORAGE_KEY, &json)
    }

    /// Load, falling back to an empty board on any failure
    pub fn load(storage: &dyn Storage) -> Self {
        match Self::load_from(storage) {
            Ok(scores) => {
                log::info!("Loaded {} high scores", scores.entries.len());
                scores
            }
            Err(e) => {
                log::warn!("Discarding stored high scores: {}", e);
                Self::new()
            }
        }
    }

    pub fn save(&self, storage: &dyn Storage) {
        match self.save_to(storage) {
            Ok(()) => log::info!("High scores saved ({} entries)", self.entries.len()),
            Err(e) => log::warn!("Failed to save high scores: {}", e),
        }
    }
}
