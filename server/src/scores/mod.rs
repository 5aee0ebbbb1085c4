use std::collections::BTreeMap;

use comms::event::HighscoreEntry;

pub use self::json_file::JsonFileScoreStore;
#[cfg(test)]
pub use self::memory::MemoryScoreStore;

mod json_file;
#[cfg(test)]
mod memory;

/// Result of [ScoreStore::set_if_greater]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub updated: bool,
    pub best_score: u64,
}

/// Best sleep duration per user.
///
/// Implementations keep the table in memory and must not fail the caller when
/// persisting it goes wrong; such failures are only logged.
pub trait ScoreStore: Send + Sync {
    fn get(&self, user_id: &str) -> Option<HighscoreEntry>;

    /// Keep `candidate` if it beats the stored score. Unknown users are created with it.
    fn set_if_greater(&self, user_id: &str, name: &str, candidate: u64) -> ScoreUpdate;

    /// Create the user with a zero score, returns false if the user already exists
    fn register_name(&self, user_id: &str, name: &str) -> bool;

    /// Every entry, best score first
    fn ranking(&self) -> Vec<HighscoreEntry>;
}

/// The table logic shared by the store implementations
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct ScoreTable {
    entries: BTreeMap<String, HighscoreEntry>,
}

impl ScoreTable {
    pub fn from_entries(entries: BTreeMap<String, HighscoreEntry>) -> Self {
        ScoreTable { entries }
    }

    pub fn entries(&self) -> &BTreeMap<String, HighscoreEntry> {
        &self.entries
    }

    pub fn get(&self, user_id: &str) -> Option<HighscoreEntry> {
        self.entries.get(user_id).cloned()
    }

    pub fn set_if_greater(&mut self, user_id: &str, name: &str, candidate: u64) -> ScoreUpdate {
        match self.entries.get_mut(user_id) {
            Some(entry) if candidate > entry.score => {
                entry.score = candidate;

                ScoreUpdate {
                    updated: true,
                    best_score: candidate,
                }
            }
            Some(entry) => ScoreUpdate {
                updated: false,
                best_score: entry.score,
            },
            None => {
                self.entries.insert(
                    String::from(user_id),
                    HighscoreEntry {
                        user_id: String::from(user_id),
                        name: String::from(name),
                        score: candidate,
                    },
                );

                ScoreUpdate {
                    updated: true,
                    best_score: candidate,
                }
            }
        }
    }

    pub fn register_name(&mut self, user_id: &str, name: &str) -> bool {
        if self.entries.contains_key(user_id) {
            return false;
        }

        self.entries.insert(
            String::from(user_id),
            HighscoreEntry {
                user_id: String::from(user_id),
                name: String::from(name),
                score: 0,
            },
        );

        true
    }

    pub fn ranking(&self) -> Vec<HighscoreEntry> {
        let mut ranking: Vec<HighscoreEntry> = self.entries.values().cloned().collect();
        ranking.sort_by(|a, b| b.score.cmp(&a.score));

        ranking
    }
}
