use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use anyhow::Context;
use comms::event::HighscoreEntry;
use tokio::sync::{mpsc, oneshot};

use super::{ScoreStore, ScoreTable, ScoreUpdate};

type Entries = BTreeMap<String, HighscoreEntry>;

/// Work for the task that owns the highscores file
#[derive(Debug)]
enum WriterMessage {
    Save(Entries),
    /// Acknowledged once every earlier save has been written
    Flush(oneshot::Sender<()>),
}

/// [ScoreStore] persisted as a single JSON object, `user id -> entry`.
///
/// The file is read once on startup. After every change a snapshot of the table is
/// handed to a background task which rewrites the file, so callers never wait on the disk.
/// Snapshots are queued while the table is locked, which keeps them in the order of the changes.
#[derive(Debug)]
pub struct JsonFileScoreStore {
    path: PathBuf,
    table: Mutex<ScoreTable>,
    writer: mpsc::UnboundedSender<WriterMessage>,
}

impl JsonFileScoreStore {
    /// Load the store from `path` and start its writer task. A missing or unreadable
    /// file starts an empty table. Must be called within a tokio runtime.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let table = match load(&path) {
            Ok(Some(entries)) => {
                log::info!("loaded {} highscores from {}", entries.len(), path.display());

                ScoreTable::from_entries(entries)
            }
            Ok(None) => {
                log::info!("no highscores at {}, starting empty", path.display());

                ScoreTable::default()
            }
            Err(err) => {
                log::warn!("ignoring highscores at {}: {:#}", path.display(), err);

                ScoreTable::default()
            }
        };

        let (writer, messages) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(path.clone(), messages));

        JsonFileScoreStore {
            path,
            table: Mutex::new(table),
            writer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait until every change made so far has been written
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();

        if self.writer.send(WriterMessage::Flush(ack_tx)).is_err() {
            log::warn!("highscores writer is gone, nothing to flush");

            return;
        }

        // the writer only drops the ack if it is shutting down
        let _ = ack_rx.await;
    }

    fn table(&self) -> MutexGuard<'_, ScoreTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, table: &ScoreTable) {
        if self
            .writer
            .send(WriterMessage::Save(table.entries().clone()))
            .is_err()
        {
            log::warn!("highscores writer is gone, change is kept in memory only");
        }
    }
}

impl ScoreStore for JsonFileScoreStore {
    fn get(&self, user_id: &str) -> Option<HighscoreEntry> {
        self.table().get(user_id)
    }

    fn set_if_greater(&self, user_id: &str, name: &str, candidate: u64) -> ScoreUpdate {
        let mut table = self.table();
        let update = table.set_if_greater(user_id, name, candidate);

        if update.updated {
            self.persist(&table);
        }

        update
    }

    fn register_name(&self, user_id: &str, name: &str) -> bool {
        let mut table = self.table();
        let created = table.register_name(user_id, name);

        if created {
            self.persist(&table);
        }

        created
    }

    fn ranking(&self) -> Vec<HighscoreEntry> {
        self.table().ranking()
    }
}

/// Writes snapshots in the order they were queued. Only the newest of the
/// snapshots waiting at a time is written, older ones are outdated by it.
async fn run_writer(path: PathBuf, mut messages: mpsc::UnboundedReceiver<WriterMessage>) {
    while let Some(message) = messages.recv().await {
        match message {
            WriterMessage::Save(mut entries) => {
                let mut acks = Vec::new();

                while let Ok(next) = messages.try_recv() {
                    match next {
                        WriterMessage::Save(newer) => entries = newer,
                        WriterMessage::Flush(ack) => {
                            acks.push(ack);
                            break;
                        }
                    }
                }

                if let Err(err) = save(&path, &entries).await {
                    log::warn!("could not save highscores: {:#}", err);
                }

                for ack in acks {
                    let _ = ack.send(());
                }
            }
            WriterMessage::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    log::debug!("highscores writer for {} stopped", path.display());
}

fn load(path: &Path) -> anyhow::Result<Option<Entries>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).context("could not read highscores file"),
    };

    let entries = serde_json::from_str(&data).context("highscores file is not valid json")?;

    Ok(Some(entries))
}

async fn save(path: &Path, entries: &Entries) -> anyhow::Result<()> {
    let data = serde_json::to_vec(entries).context("could not serialize highscores")?;

    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("could not write {}", path.display()))
}
