use std::collections::HashMap;

use comms::event::Event;
use tokio::sync::{mpsc, RwLock};

/// Room membership of a connection, set by a successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionBinding {
    pub user_id: String,
    pub username: String,
    pub room_id: String,
}

#[derive(Debug)]
struct ConnectionEntry {
    outbox: mpsc::Sender<Event>,
    binding: Option<ConnectionBinding>,
}

/// [ConnectionRegistry] knows every live connection, where to deliver its events,
/// and which user and room it currently speaks for.
///
/// Delivery never waits: an event for a connection whose outbox is full or closed is dropped.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionEntry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        ConnectionRegistry {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, connection_id: &str, outbox: mpsc::Sender<Event>) {
        self.connections.write().await.insert(
            String::from(connection_id),
            ConnectionEntry {
                outbox,
                binding: None,
            },
        );
    }

    /// Forget a connection, returning the binding it still had
    pub async fn unregister(&self, connection_id: &str) -> Option<ConnectionBinding> {
        self.connections
            .write()
            .await
            .remove(connection_id)
            .and_then(|entry| entry.binding)
    }

    /// Attach a connection to a user and room, returning the previous binding
    pub async fn bind(
        &self,
        connection_id: &str,
        binding: ConnectionBinding,
    ) -> Option<ConnectionBinding> {
        self.connections
            .write()
            .await
            .get_mut(connection_id)
            .and_then(|entry| entry.binding.replace(binding))
    }

    pub async fn unbind(&self, connection_id: &str) -> Option<ConnectionBinding> {
        self.connections
            .write()
            .await
            .get_mut(connection_id)
            .and_then(|entry| entry.binding.take())
    }

    pub async fn binding(&self, connection_id: &str) -> Option<ConnectionBinding> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .and_then(|entry| entry.binding.clone())
    }

    /// Whether any connection still speaks for the user in the room
    pub async fn is_user_bound(&self, room_id: &str, user_id: &str) -> bool {
        self.connections.read().await.values().any(|entry| {
            entry
                .binding
                .as_ref()
                .is_some_and(|binding| binding.room_id == room_id && binding.user_id == user_id)
        })
    }

    /// Deliver an event to a single connection, returns false if it could not be queued
    pub async fn send_to(&self, connection_id: &str, event: Event) -> bool {
        match self.connections.read().await.get(connection_id) {
            Some(entry) => deliver(connection_id, &entry.outbox, event),
            None => false,
        }
    }

    /// Deliver an event to every connection bound to the room, returns how many accepted it
    pub async fn broadcast(&self, room_id: &str, event: &Event) -> usize {
        let connections = self.connections.read().await;

        connections
            .iter()
            .filter(|(_, entry)| {
                entry
                    .binding
                    .as_ref()
                    .is_some_and(|binding| binding.room_id == room_id)
            })
            .filter(|(connection_id, entry)| deliver(connection_id, &entry.outbox, event.clone()))
            .count()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }
}

fn deliver(connection_id: &str, outbox: &mpsc::Sender<Event>, event: Event) -> bool {
    match outbox.try_send(event) {
        Ok(()) => true,
        Err(err) => {
            log::debug!("dropping event for connection '{}': {}", connection_id, err);

            false
        }
    }
}
