use std::sync::Arc;

use comms::{
    command::{JoinRoomCommand, UserCommand},
    event::{
        Event, HighscoresEvent, PublicRoomsEvent, SleepStoppedEvent, UserDepartureEvent,
        UserNotFoundEvent, UserRegisteredEvent, UserSleepUpdatedEvent,
    },
};
use tokio::{
    sync::{mpsc, OwnedMutexGuard},
    time::Instant,
};

use crate::{
    room_directory::{GameRoom, RoomDirectory, RoomError},
    sanitize::sanitize_username,
    scores::ScoreStore,
    session::{ConnectionBinding, ConnectionRegistry},
    solo::SoloSessions,
};

/// Capacity of a connection's outbox, events beyond it are dropped for that connection
pub const OUTBOX_CAPACITY: usize = 100;

/// Why a member is leaving their room, decides which event the others receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DepartureReason {
    Left,
    Disconnected,
}

/// [EventRouter] applies the commands of every connection to the rooms and
/// delivers the resulting events.
///
/// A command is applied while its room is locked and the resulting broadcasts
/// are queued before the lock is released, so every member observes the
/// events of a room in the order they happened.
pub struct EventRouter {
    directory: RoomDirectory,
    connections: ConnectionRegistry,
    scores: Arc<dyn ScoreStore>,
    solo: SoloSessions,
}

impl EventRouter {
    pub fn new(scores: Arc<dyn ScoreStore>) -> Self {
        EventRouter {
            directory: RoomDirectory::new(),
            connections: ConnectionRegistry::new(),
            scores,
            solo: SoloSessions::new(),
        }
    }

    #[cfg(test)]
    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    /// Register a new connection, the returned receiver yields every event addressed to it
    pub async fn connect(&self, connection_id: &str) -> mpsc::Receiver<Event> {
        let (outbox_tx, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);
        self.connections.register(connection_id, outbox_tx).await;

        log::debug!("connection '{}' registered", connection_id);

        outbox_rx
    }

    /// The connection is gone: its member leaves the room and the connection is forgotten.
    /// A running segment is dropped without touching the highscores.
    pub async fn disconnect(&self, connection_id: &str) {
        self.depart(connection_id, DepartureReason::Disconnected)
            .await;
        self.connections.unregister(connection_id).await;

        log::debug!("connection '{}' unregistered", connection_id);
    }

    /// Apply a single command of a connection. Rejections are answered to that connection only.
    pub async fn handle(&self, connection_id: &str, command: UserCommand) {
        let result = match command {
            UserCommand::JoinRoom(cmd) => self.join_room(connection_id, cmd).await,
            UserCommand::StartGame(_) => self.start_game(connection_id).await,
            UserCommand::StartSleep(_) => self.start_sleep(connection_id).await,
            UserCommand::UpdateSleepTime(cmd) => {
                self.update_sleep_time(connection_id, cmd.sleep_time)
                    .await
            }
            UserCommand::StopSleep(_) => self.stop_sleep(connection_id).await,
            UserCommand::LeaveRoom(_) => {
                self.depart(connection_id, DepartureReason::Left).await;

                Ok(())
            }
            UserCommand::ListPublicRooms(_) => self.list_public_rooms(connection_id).await,
            UserCommand::RegisterUser(cmd) => {
                self.register_user(connection_id, &cmd.user_id, &cmd.name)
                    .await
            }
            UserCommand::GetUser(cmd) => self.get_user(connection_id, cmd.user_id).await,
            UserCommand::ListHighscores(_) => self.list_highscores(connection_id).await,
            UserCommand::StartSoloSleep(cmd) => {
                self.start_solo_sleep(connection_id, &cmd.user_id).await
            }
            UserCommand::StopSoloSleep(cmd) => {
                self.stop_solo_sleep(connection_id, &cmd.user_id).await
            }
            // the session ends the connection on quit, nothing to route
            UserCommand::Quit(_) => Ok(()),
        };

        if let Err(err) = result {
            log::debug!("rejected command of '{}': {}", connection_id, err);
            self.reply(connection_id, err.to_event()).await;
        }
    }

    async fn join_room(&self, connection_id: &str, cmd: JoinRoomCommand) -> Result<(), RoomError> {
        let username = sanitize_username(&cmd.username);
        let creator = cmd.is_room_creator.then_some(cmd.user_id.as_str());

        let previous = {
            let mut room = self
                .directory
                .find_or_create(cmd.room_id.as_deref(), cmd.room_type, creator)
                .await?;
            let admission = room.admit(&cmd.user_id, &username)?;

            let previous = self
                .connections
                .bind(
                    connection_id,
                    ConnectionBinding {
                        user_id: cmd.user_id.clone(),
                        username,
                        room_id: String::from(room.room_id()),
                    },
                )
                .await;

            log::info!(
                "'{}' {} room '{}'",
                cmd.user_id,
                if admission.rejoined { "rejoined" } else { "joined" },
                room.room_id()
            );

            self.connections
                .broadcast(room.room_id(), &Event::CurrentUsers(admission.snapshot))
                .await;

            if admission.game_already_started {
                self.reply(connection_id, Event::GameStarted).await;
            }

            previous
        };

        // a connection speaks for one room at a time, the one it was in before is left
        if let Some(previous) = previous {
            let same_membership = self
                .connections
                .binding(connection_id)
                .await
                .is_some_and(|current| {
                    current.room_id == previous.room_id && current.user_id == previous.user_id
                });

            if !same_membership {
                self.leave_room(&previous, DepartureReason::Left).await;
            }
        }

        Ok(())
    }

    async fn start_game(&self, connection_id: &str) -> Result<(), RoomError> {
        let (binding, mut room) = self.bound_room(connection_id).await?;

        room.start_game(&binding.user_id)?;

        log::info!("room '{}' started by '{}'", binding.room_id, binding.user_id);

        self.connections
            .broadcast(&binding.room_id, &Event::GameStarted)
            .await;

        Ok(())
    }

    async fn start_sleep(&self, connection_id: &str) -> Result<(), RoomError> {
        let (binding, mut room) = self.bound_room(connection_id).await?;

        room.begin_segment(&binding.user_id, Instant::now())?;
        self.reply(connection_id, Event::SleepStarted).await;

        Ok(())
    }

    async fn update_sleep_time(&self, connection_id: &str, sleep_time: u64) -> Result<(), RoomError> {
        let (binding, mut room) = self.bound_room(connection_id).await?;

        if !room.report_progress(&binding.user_id, sleep_time)? {
            log::trace!("ignoring update of '{}' without a running segment", binding.user_id);

            return Ok(());
        }

        self.connections
            .broadcast(
                &binding.room_id,
                &Event::UserSleepUpdated(UserSleepUpdatedEvent {
                    user_id: binding.user_id.clone(),
                    sleep_time,
                    username: binding.username.clone(),
                    has_stopped: false,
                }),
            )
            .await;

        Ok(())
    }

    async fn stop_sleep(&self, connection_id: &str) -> Result<(), RoomError> {
        let (binding, duration, was_running) = {
            let (binding, mut room) = self.bound_room(connection_id).await?;

            let was_running = room
                .member(&binding.user_id)
                .is_some_and(|member| member.is_active());
            let duration = room.end_segment(&binding.user_id, Instant::now())?;

            self.reply(
                connection_id,
                Event::SleepStopped(SleepStoppedEvent { duration }),
            )
            .await;
            self.connections
                .broadcast(
                    &binding.room_id,
                    &Event::UserSleepUpdated(UserSleepUpdatedEvent {
                        user_id: binding.user_id.clone(),
                        sleep_time: duration,
                        username: binding.username.clone(),
                        has_stopped: true,
                    }),
                )
                .await;
            self.announce_round_result(&mut room).await;

            (binding, duration, was_running)
        };

        // only a segment that actually ran produces a score
        if was_running {
            // the room is released before touching the store
            self.record_score(&binding.user_id, &binding.username, duration);
        }

        Ok(())
    }

    async fn list_public_rooms(&self, connection_id: &str) -> Result<(), RoomError> {
        let rooms = self.directory.list_public_open().await;
        self.reply(connection_id, Event::PublicRooms(PublicRoomsEvent { rooms }))
            .await;

        Ok(())
    }

    async fn register_user(&self, connection_id: &str, user_id: &str, name: &str) -> Result<(), RoomError> {
        let created = self.scores.register_name(user_id, &sanitize_username(name));
        self.reply(
            connection_id,
            Event::UserRegistered(UserRegisteredEvent { created }),
        )
        .await;

        Ok(())
    }

    async fn get_user(&self, connection_id: &str, user_id: String) -> Result<(), RoomError> {
        let event = match self.scores.get(&user_id) {
            Some(entry) => Event::UserScore(entry),
            None => Event::UserNotFound(UserNotFoundEvent { user_id }),
        };
        self.reply(connection_id, event).await;

        Ok(())
    }

    async fn list_highscores(&self, connection_id: &str) -> Result<(), RoomError> {
        let entries = self.scores.ranking();
        self.reply(connection_id, Event::Highscores(HighscoresEvent { entries }))
            .await;

        Ok(())
    }

    async fn start_solo_sleep(&self, connection_id: &str, user_id: &str) -> Result<(), RoomError> {
        self.solo.start(user_id, Instant::now()).await?;
        self.reply(connection_id, Event::SoloSleepStarted).await;

        Ok(())
    }

    async fn stop_solo_sleep(&self, connection_id: &str, user_id: &str) -> Result<(), RoomError> {
        let duration = self.solo.stop(user_id, Instant::now()).await?;

        let name = self
            .scores
            .get(user_id)
            .map(|entry| entry.name)
            .unwrap_or_else(|| String::from(user_id));
        self.record_score(user_id, &name, duration);

        self.reply(
            connection_id,
            Event::SoloSleepStopped(SleepStoppedEvent { duration }),
        )
        .await;

        Ok(())
    }

    /// Unbind the connection and, unless another connection still speaks for
    /// the same user, remove that user from the room
    async fn depart(&self, connection_id: &str, reason: DepartureReason) {
        let Some(binding) = self.connections.unbind(connection_id).await else {
            return;
        };

        self.leave_room(&binding, reason).await;
    }

    async fn leave_room(&self, binding: &ConnectionBinding, reason: DepartureReason) {
        let still_connected = || {
            self.connections
                .is_user_bound(&binding.room_id, &binding.user_id)
        };

        let (mut room, departure) = match self
            .directory
            .leave(&binding.room_id, &binding.user_id, still_connected)
            .await
        {
            Ok(Some(left)) => left,
            Ok(None) => {
                log::debug!(
                    "'{}' still has a connection in room '{}'",
                    binding.user_id,
                    binding.room_id
                );

                return;
            }
            Err(err) => {
                log::debug!(
                    "'{}' could not leave room '{}': {}",
                    binding.user_id,
                    binding.room_id,
                    err
                );

                return;
            }
        };

        log::info!(
            "'{}' left room '{}' ({:?})",
            binding.user_id,
            binding.room_id,
            reason
        );

        // nobody is left to notify
        if departure.closed {
            return;
        }

        let departure_event = UserDepartureEvent {
            user_id: departure.member.user_id.clone(),
            username: departure.member.username.clone(),
        };
        let event = match reason {
            DepartureReason::Left => Event::UserLeft(departure_event),
            DepartureReason::Disconnected => Event::UserDisconnected(departure_event),
        };
        self.connections.broadcast(&binding.room_id, &event).await;

        if departure.creator_changed {
            log::info!(
                "'{}' is the new creator of room '{}'",
                room.creator_id().unwrap_or_default(),
                binding.room_id
            );

            self.connections
                .broadcast(&binding.room_id, &Event::CurrentUsers(room.snapshot()))
                .await;
        }

        self.announce_round_result(&mut room).await;
    }

    async fn announce_round_result(&self, room: &mut OwnedMutexGuard<GameRoom>) {
        if let Some(result) = room.take_round_result() {
            log::info!(
                "round of room '{}' is over, {} winner(s)",
                room.room_id(),
                result.winners.len()
            );

            self.connections
                .broadcast(room.room_id(), &Event::RoundOver(result))
                .await;
        }
    }

    /// Look up the room a connection has joined and lock it
    async fn bound_room(
        &self,
        connection_id: &str,
    ) -> Result<(ConnectionBinding, OwnedMutexGuard<GameRoom>), RoomError> {
        let binding = self
            .connections
            .binding(connection_id)
            .await
            .ok_or(RoomError::NotInRoom)?;
        let handle = self
            .directory
            .get(&binding.room_id)
            .await
            .ok_or(RoomError::NotInRoom)?;

        let room = handle.lock_owned().await;

        Ok((binding, room))
    }

    fn record_score(&self, user_id: &str, name: &str, duration: u64) {
        let update = self.scores.set_if_greater(user_id, name, duration);

        if update.updated {
            log::info!("new best of '{}': {}s", user_id, update.best_score);
        }
    }

    async fn reply(&self, connection_id: &str, event: Event) {
        self.connections.send_to(connection_id, event).await;
    }
}
