use std::collections::HashMap;

use tokio::{sync::Mutex, time::Instant};

use crate::room_directory::RoomError;

/// Single-player sleep segments, keyed by user id and independent of any room
#[derive(Debug, Default)]
pub struct SoloSessions {
    started_at: Mutex<HashMap<String, Instant>>,
}

impl SoloSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start(&self, user_id: &str, now: Instant) -> Result<(), RoomError> {
        let mut started_at = self.started_at.lock().await;

        if started_at.contains_key(user_id) {
            return Err(RoomError::SegmentAlreadyActive);
        }

        started_at.insert(String::from(user_id), now);

        Ok(())
    }

    /// Ends the segment and returns its length in whole seconds
    pub async fn stop(&self, user_id: &str, now: Instant) -> Result<u64, RoomError> {
        let started_at = self
            .started_at
            .lock()
            .await
            .remove(user_id)
            .ok_or(RoomError::SegmentNotActive)?;

        Ok(now.saturating_duration_since(started_at).as_secs())
    }
}
