use std::{collections::HashMap, future::Future, sync::Arc};

use comms::{command::RoomType, event::PublicRoom};
use nanoid::nanoid;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::room::{GameRoom, Member, RoomError, RoomState};

/// Shared, individually locked room
pub type RoomHandle = Arc<Mutex<GameRoom>>;

const PRIVATE_ROOM_ID_LEN: usize = 6;
const GENERATED_ROOM_ID_LEN: usize = 8;

/// Outcome of [RoomDirectory::leave]
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    /// The member as they were when leaving
    pub member: Member,
    /// The departing member was the creator and somebody else took over
    pub creator_changed: bool,
    /// Nobody is left, the room has been removed from the directory
    pub closed: bool,
}

/// [RoomDirectory] owns every live room of the process.
///
/// Each room has its own lock so unrelated rooms never wait on each other. Joins and
/// leaves hold the directory write lock while they lock the room, which keeps a room
/// from being removed while somebody is being admitted to it. The lock order is always
/// directory first, then room.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: RwLock<HashMap<String, RoomHandle>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        RoomDirectory {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Finds the room to join, or creates it when `creator` claims the creator role.
    ///
    /// The room is returned locked so the caller can admit the user before anybody else
    /// touches it. A creator of a public room may omit the id to get a generated one.
    pub async fn find_or_create(
        &self,
        room_id: Option<&str>,
        room_type: RoomType,
        creator: Option<&str>,
    ) -> Result<OwnedMutexGuard<GameRoom>, RoomError> {
        let mut rooms = self.rooms.write().await;

        let handle = match (room_id, creator) {
            (Some(room_id), None) => rooms.get(room_id).cloned().ok_or(RoomError::RoomNotFound)?,
            (Some(room_id), Some(creator_id)) => {
                if rooms.contains_key(room_id) {
                    return Err(RoomError::RoomAlreadyExists);
                }

                validate_room_id(room_id, room_type)?;

                Self::insert_room(&mut rooms, room_id, room_type, creator_id)
            }
            (None, Some(creator_id)) if room_type == RoomType::Public => {
                let room_id = loop {
                    let candidate = nanoid!(GENERATED_ROOM_ID_LEN);

                    if !rooms.contains_key(&candidate) {
                        break candidate;
                    }
                };

                Self::insert_room(&mut rooms, &room_id, room_type, creator_id)
            }
            (None, _) => {
                return Err(RoomError::InvalidRoomId(String::from(
                    "a room id is required",
                )))
            }
        };

        // the room lock is taken before the directory lock is released
        let room = handle.lock_owned().await;
        drop(rooms);

        Ok(room)
    }

    pub async fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Marks a member as left, hands the creator role over if needed and removes
    /// the room once no present member remains.
    ///
    /// `still_connected` is asked after the room is locked and while no join can
    /// reach it. When it answers true the member stays and `None` is returned, so a
    /// connection of the same user that joined in the meantime is never left dangling.
    ///
    /// The room is returned still locked so the caller can notify the remaining
    /// members before any other event of the room is applied.
    pub async fn leave<F, Fut>(
        &self,
        room_id: &str,
        user_id: &str,
        still_connected: F,
    ) -> Result<Option<(OwnedMutexGuard<GameRoom>, Departure)>, RoomError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut rooms = self.rooms.write().await;
        let handle = rooms.get(room_id).cloned().ok_or(RoomError::RoomNotFound)?;
        let mut room = handle.lock_owned().await;

        if still_connected().await {
            return Ok(None);
        }

        let member = room.mark_left(user_id)?;
        let creator_changed = room.elect_creator_if_needed();
        let closed = room.present_count() == 0;

        if closed {
            Self::remove_room(&mut rooms, room_id);
        }

        Ok(Some((
            room,
            Departure {
                member,
                creator_changed,
                closed,
            },
        )))
    }

    /// Public rooms which are open for new members, sorted by id.
    /// The result is a snapshot and is not updated afterwards.
    pub async fn list_public_open(&self) -> Vec<PublicRoom> {
        let rooms = self.rooms.read().await;
        let mut public_rooms = Vec::new();

        for handle in rooms.values() {
            let room = handle.lock().await;

            if room.room_type() == RoomType::Public && room.state() == RoomState::Open {
                public_rooms.push(PublicRoom {
                    room_id: String::from(room.room_id()),
                    member_count: room.present_count(),
                });
            }
        }

        public_rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));

        public_rooms
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Deletes a room from the map, doing nothing if it does not exist
    fn remove_room(rooms: &mut HashMap<String, RoomHandle>, room_id: &str) -> bool {
        let removed = rooms.remove(room_id).is_some();

        if removed {
            log::info!("room '{}' removed", room_id);
        }

        removed
    }

    fn insert_room(
        rooms: &mut HashMap<String, RoomHandle>,
        room_id: &str,
        room_type: RoomType,
        creator_id: &str,
    ) -> RoomHandle {
        let handle = Arc::new(Mutex::new(GameRoom::new(room_id, room_type, Some(creator_id))));
        rooms.insert(String::from(room_id), handle.clone());

        log::info!(
            "room '{}' ({:?}) created by '{}'",
            room_id,
            room_type,
            creator_id
        );

        handle
    }
}

/// Private rooms are identified by a six digit code, public ids only have to be non-empty
fn validate_room_id(room_id: &str, room_type: RoomType) -> Result<(), RoomError> {
    let valid = match room_type {
        RoomType::Private => {
            room_id.len() == PRIVATE_ROOM_ID_LEN && room_id.bytes().all(|b| b.is_ascii_digit())
        }
        RoomType::Public => !room_id.trim().is_empty(),
    };

    if valid {
        Ok(())
    } else {
        Err(RoomError::InvalidRoomId(String::from(room_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create(directory: &RoomDirectory, room_id: &str, room_type: RoomType, creator: &str) {
        let mut room = directory
            .find_or_create(Some(room_id), room_type, Some(creator))
            .await
            .unwrap();

        room.admit(creator, creator).unwrap();
    }

    async fn join(directory: &RoomDirectory, room_id: &str, user_id: &str) {
        let mut room = directory
            .find_or_create(Some(room_id), RoomType::Public, None)
            .await
            .unwrap();

        room.admit(user_id, user_id).unwrap();
    }

    #[tokio::test]
    async fn test_creator_creates_and_others_join() {
        let directory = RoomDirectory::new();

        create(&directory, "room", RoomType::Public, "a").await;
        join(&directory, "room", "b").await;

        let handle = directory.get("room").await.unwrap();
        let room = handle.lock().await;
        assert_eq!(room.creator_id(), Some("a"));
        assert_eq!(room.present_count(), 2);
    }

    #[tokio::test]
    async fn test_existence_rules() {
        let directory = RoomDirectory::new();

        let missing = directory
            .find_or_create(Some("nope"), RoomType::Public, None)
            .await;
        assert_eq!(missing.unwrap_err(), RoomError::RoomNotFound);

        create(&directory, "room", RoomType::Public, "a").await;

        let duplicate = directory
            .find_or_create(Some("room"), RoomType::Public, Some("b"))
            .await;
        assert_eq!(duplicate.unwrap_err(), RoomError::RoomAlreadyExists);
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_private_room_ids_must_be_six_digits() {
        let directory = RoomDirectory::new();

        for invalid in ["12345", "1234567", "12a456", ""] {
            let result = directory
                .find_or_create(Some(invalid), RoomType::Private, Some("a"))
                .await;

            assert_eq!(
                result.unwrap_err(),
                RoomError::InvalidRoomId(String::from(invalid))
            );
        }

        create(&directory, "123456", RoomType::Private, "a").await;
        assert!(directory.get("123456").await.is_some());
    }

    #[tokio::test]
    async fn test_public_room_ids_are_generated_for_creators() {
        let directory = RoomDirectory::new();

        let room_id = {
            let room = directory
                .find_or_create(None, RoomType::Public, Some("a"))
                .await
                .unwrap();

            String::from(room.room_id())
        };

        assert_eq!(room_id.len(), GENERATED_ROOM_ID_LEN);
        assert!(directory.get(&room_id).await.is_some());

        let without_id = directory.find_or_create(None, RoomType::Public, None).await;
        assert!(matches!(without_id, Err(RoomError::InvalidRoomId(_))));

        let private_without_id = directory
            .find_or_create(None, RoomType::Private, Some("a"))
            .await;
        assert!(matches!(private_without_id, Err(RoomError::InvalidRoomId(_))));
    }

    /// Leave without any other connection of the user around
    async fn leave(
        directory: &RoomDirectory,
        room_id: &str,
        user_id: &str,
    ) -> Result<(OwnedMutexGuard<GameRoom>, Departure), RoomError> {
        directory
            .leave(room_id, user_id, || async { false })
            .await
            .map(|left| left.unwrap())
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let directory = RoomDirectory::new();
        create(&directory, "room", RoomType::Public, "a").await;

        let mut rooms = directory.rooms.write().await;
        assert!(RoomDirectory::remove_room(&mut rooms, "room"));
        assert!(!RoomDirectory::remove_room(&mut rooms, "room"));
        drop(rooms);

        assert!(directory.get("room").await.is_none());
    }

    #[tokio::test]
    async fn test_leave_keeps_a_member_that_is_still_connected() {
        let directory = RoomDirectory::new();
        create(&directory, "room", RoomType::Public, "a").await;

        let left = directory
            .leave("room", "a", || async { true })
            .await
            .unwrap();

        assert!(left.is_none());
        let handle = directory.get("room").await.unwrap();
        assert!(handle.lock().await.member("a").unwrap().is_present());
    }

    #[tokio::test]
    async fn test_leave_reelects_creator_and_closes_empty_rooms() {
        let directory = RoomDirectory::new();
        create(&directory, "room", RoomType::Public, "a").await;
        join(&directory, "room", "b").await;
        join(&directory, "room", "c").await;

        let (room, departure) = leave(&directory, "room", "a").await.unwrap();
        assert!(departure.creator_changed);
        assert!(!departure.closed);
        assert_eq!(room.creator_id(), Some("b"));
        drop(room);

        let (_, departure) = leave(&directory, "room", "c").await.unwrap();
        assert!(!departure.creator_changed);
        assert!(!departure.closed);

        let (_, departure) = leave(&directory, "room", "b").await.unwrap();
        assert!(departure.closed);
        assert!(directory.get("room").await.is_none());

        // the id can be reused once the room is gone
        create(&directory, "room", RoomType::Public, "d").await;
    }

    #[tokio::test]
    async fn test_leave_unknown_member_changes_nothing() {
        let directory = RoomDirectory::new();
        create(&directory, "room", RoomType::Public, "a").await;

        let result = leave(&directory, "room", "zed").await;

        assert_eq!(
            result.unwrap_err(),
            RoomError::MemberNotFound(String::from("zed"))
        );
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_public_open_filters_private_and_started_rooms() {
        let directory = RoomDirectory::new();
        create(&directory, "b-public", RoomType::Public, "a").await;
        join(&directory, "b-public", "b").await;
        create(&directory, "a-public", RoomType::Public, "c").await;
        create(&directory, "123456", RoomType::Private, "d").await;
        create(&directory, "started", RoomType::Public, "e").await;

        directory
            .get("started")
            .await
            .unwrap()
            .lock()
            .await
            .start_game("e")
            .unwrap();

        let listed = directory.list_public_open().await;

        assert_eq!(
            listed,
            vec![
                PublicRoom {
                    room_id: "a-public".into(),
                    member_count: 1,
                },
                PublicRoom {
                    room_id: "b-public".into(),
                    member_count: 2,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unrelated_rooms_do_not_block_each_other() {
        let directory = Arc::new(RoomDirectory::new());
        create(&directory, "one", RoomType::Public, "a").await;
        create(&directory, "two", RoomType::Public, "b").await;

        let one = directory.get("one").await.unwrap();
        let _held = one.lock().await;

        // room "two" stays usable while "one" is locked
        let two = directory.get("two").await.unwrap();
        let locked = two.try_lock();
        assert!(locked.is_ok());
    }
}
