use std::sync::{Mutex, MutexGuard};

use comms::event::HighscoreEntry;

use super::{ScoreStore, ScoreTable, ScoreUpdate};

/// [ScoreStore] that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    table: Mutex<ScoreTable>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, ScoreTable> {
        // the table is always left consistent, a poisoned lock is still usable
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ScoreStore for MemoryScoreStore {
    fn get(&self, user_id: &str) -> Option<HighscoreEntry> {
        self.table().get(user_id)
    }

    fn set_if_greater(&self, user_id: &str, name: &str, candidate: u64) -> ScoreUpdate {
        self.table().set_if_greater(user_id, name, candidate)
    }

    fn register_name(&self, user_id: &str, name: &str) -> bool {
        self.table().register_name(user_id, name)
    }

    fn ranking(&self) -> Vec<HighscoreEntry> {
        self.table().ranking()
    }
}
