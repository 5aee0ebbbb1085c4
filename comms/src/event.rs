use serde::{Deserialize, Serialize};

/// A member of a room as shown to every participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub user_id: String,
    pub username: String,
    /// Last known elapsed seconds of the member's segment
    pub sleep_time: u64,
    #[serde(default)]
    pub has_stopped: bool,
    #[serde(default)]
    pub has_left: bool,
}

/// Full membership snapshot of a room, sent after every membership change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUsersEvent {
    pub room_id: String,
    /// Members in join order, including the ones that have left
    pub users: Vec<RoomMember>,
    /// The user id allowed to start the game
    pub room_creator: Option<String>,
}

/// Incremental update of a single member's elapsed time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSleepUpdatedEvent {
    pub user_id: String,
    pub sleep_time: u64,
    pub username: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_stopped: bool,
}

/// Reply to the sender of a stop with the final duration of their segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepStoppedEvent {
    pub duration: u64,
}

/// A member left the room, either explicitly or by losing the connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDepartureEvent {
    pub user_id: String,
    pub username: String,
}

/// Final result of a round, published once every member has stopped or left
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOverEvent {
    /// All members sorted by elapsed time, longest first
    pub standings: Vec<RoomMember>,
    /// More than one winner means a tie
    pub winners: Vec<RoomMember>,
}

/// Summary of a joinable public room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRoom {
    pub room_id: String,
    pub member_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicRoomsEvent {
    pub rooms: Vec<PublicRoom>,
}

/// A persisted best score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighscoreEntry {
    pub user_id: String,
    pub name: String,
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighscoresEvent {
    /// Sorted by score, best first
    pub entries: Vec<HighscoreEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNotFoundEvent {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRegisteredEvent {
    /// False when the user id was already known
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub connection_id: String,
}

/// Machine readable reason of a rejected command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    RoomNotFound,
    RoomAlreadyExists,
    RoomAlreadyStarted,
    NotCreator,
    AlreadyStarted,
    NotStarted,
    SegmentAlreadyActive,
    SegmentNotActive,
    MemberNotFound,
    InvalidRoomId,
    NotInRoom,
}

/// A command was rejected, only sent to the connection which issued it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase")]
/// Events that can be sent to the client
/// Events are either replies to the issuing connection or broadcasts to every connection of a room
pub enum Event {
    Connected(ConnectedEvent),
    RoomNotFound,
    RoomAlreadyExists,
    CurrentUsers(CurrentUsersEvent),
    GameStarted,
    SleepStarted,
    UserSleepUpdated(UserSleepUpdatedEvent),
    SleepStopped(SleepStoppedEvent),
    UserLeft(UserDepartureEvent),
    UserDisconnected(UserDepartureEvent),
    RoundOver(RoundOverEvent),
    PublicRooms(PublicRoomsEvent),
    UserRegistered(UserRegisteredEvent),
    UserScore(HighscoreEntry),
    UserNotFound(UserNotFoundEvent),
    Highscores(HighscoresEvent),
    SoloSleepStarted,
    SoloSleepStopped(SleepStoppedEvent),
    Error(ErrorEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    // given an event enum, and an expect string, asserts that event is serialized / deserialized appropiately
    fn assert_event_serialization(event: &Event, expected: &str) {
        let serialized = serde_json::to_string(&event).unwrap();
        assert_eq!(serialized, expected);
        let deserialized: Event = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, *event);
    }

    #[test]
    fn test_current_users_event() {
        let event = Event::CurrentUsers(CurrentUsersEvent {
            room_id: "r".to_string(),
            users: vec![RoomMember {
                user_id: "a".to_string(),
                username: "alice".to_string(),
                sleep_time: 0,
                has_stopped: false,
                has_left: false,
            }],
            room_creator: Some("a".to_string()),
        });

        assert_event_serialization(
            &event,
            r#"{"t":"currentUsers","roomId":"r","users":[{"userId":"a","username":"alice","sleepTime":0,"hasStopped":false,"hasLeft":false}],"roomCreator":"a"}"#,
        );
    }

    #[test]
    fn test_user_sleep_updated_event_omits_has_stopped_while_running() {
        let event = Event::UserSleepUpdated(UserSleepUpdatedEvent {
            user_id: "a".to_string(),
            sleep_time: 3,
            username: "alice".to_string(),
            has_stopped: false,
        });

        assert_event_serialization(
            &event,
            r#"{"t":"userSleepUpdated","userId":"a","sleepTime":3,"username":"alice"}"#,
        );
    }

    #[test]
    fn test_user_sleep_updated_event_when_stopped() {
        let event = Event::UserSleepUpdated(UserSleepUpdatedEvent {
            user_id: "a".to_string(),
            sleep_time: 5,
            username: "alice".to_string(),
            has_stopped: true,
        });

        assert_event_serialization(
            &event,
            r#"{"t":"userSleepUpdated","userId":"a","sleepTime":5,"username":"alice","hasStopped":true}"#,
        );
    }

    #[test]
    fn test_unit_events() {
        assert_event_serialization(&Event::GameStarted, r#"{"t":"gameStarted"}"#);
        assert_event_serialization(&Event::RoomNotFound, r#"{"t":"roomNotFound"}"#);
    }

    #[test]
    fn test_error_event() {
        let event = Event::Error(ErrorEvent {
            kind: ErrorKind::NotCreator,
            message: "only the room creator can start the game".to_string(),
        });

        assert_event_serialization(
            &event,
            r#"{"t":"error","kind":"notCreator","message":"only the room creator can start the game"}"#,
        );
    }

    #[test]
    fn test_public_rooms_event() {
        let event = Event::PublicRooms(PublicRoomsEvent {
            rooms: vec![PublicRoom {
                room_id: "abc".to_string(),
                member_count: 2,
            }],
        });

        assert_event_serialization(
            &event,
            r#"{"t":"publicRooms","rooms":[{"roomId":"abc","memberCount":2}]}"#,
        );
    }
}
