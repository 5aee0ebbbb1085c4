use comms::event::{ErrorEvent, ErrorKind, Event};

/// Every way a room or segment operation can be rejected.
///
/// All variants are recoverable, they are reported to the connection which
/// issued the command and the affected state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room already exists")]
    RoomAlreadyExists,
    #[error("room has already started, new members can not join")]
    RoomAlreadyStarted,
    #[error("only the room creator can start the game")]
    NotCreator,
    #[error("game has already started")]
    AlreadyStarted,
    #[error("game has not started yet")]
    NotStarted,
    #[error("a sleep segment is already in progress")]
    SegmentAlreadyActive,
    #[error("no sleep segment in progress")]
    SegmentNotActive,
    #[error("user '{0}' is not a member of the room")]
    MemberNotFound(String),
    #[error("invalid room id: {0}")]
    InvalidRoomId(String),
    #[error("join a room first")]
    NotInRoom,
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoomError::RoomNotFound => ErrorKind::RoomNotFound,
            RoomError::RoomAlreadyExists => ErrorKind::RoomAlreadyExists,
            RoomError::RoomAlreadyStarted => ErrorKind::RoomAlreadyStarted,
            RoomError::NotCreator => ErrorKind::NotCreator,
            RoomError::AlreadyStarted => ErrorKind::AlreadyStarted,
            RoomError::NotStarted => ErrorKind::NotStarted,
            RoomError::SegmentAlreadyActive => ErrorKind::SegmentAlreadyActive,
            RoomError::SegmentNotActive => ErrorKind::SegmentNotActive,
            RoomError::MemberNotFound(_) => ErrorKind::MemberNotFound,
            RoomError::InvalidRoomId(_) => ErrorKind::InvalidRoomId,
            RoomError::NotInRoom => ErrorKind::NotInRoom,
        }
    }

    /// The reply sent to the issuing connection.
    /// Missing and duplicate rooms have dedicated events, everything else is a generic error event.
    pub fn to_event(&self) -> Event {
        match self {
            RoomError::RoomNotFound => Event::RoomNotFound,
            RoomError::RoomAlreadyExists => Event::RoomAlreadyExists,
            other => Event::Error(ErrorEvent {
                kind: other.kind(),
                message: other.to_string(),
            }),
        }
    }
}
