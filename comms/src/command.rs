use serde::{Deserialize, Serialize};

/// Visibility of a room. Public rooms are listed to everyone, private rooms
/// can only be joined by knowing their id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    #[default]
    Public,
    Private,
}

/// User Command for joining a room, or creating it when `is_room_creator` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomCommand {
    /// The room to join. Creators of public rooms may leave it out to get a generated id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub user_id: String,
    /// Display name, sanitized by the server before use.
    pub username: String,
    #[serde(default)]
    pub room_type: RoomType,
    #[serde(default)]
    pub is_room_creator: bool,
}

/// User Command for starting the game of the joined room. Only the room creator may do so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGameCommand;

/// User Command for starting the sender's own sleep segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartSleepCommand;

/// User Command for reporting the elapsed time of the running segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSleepTimeCommand {
    /// Elapsed whole seconds as measured by the client.
    pub sleep_time: u64,
}

/// User Command for ending the sender's sleep segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSleepCommand;

/// User Command for leaving the joined room without closing the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRoomCommand;

/// User Command for listing the public rooms which have not started yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPublicRoomsCommand;

/// User Command for registering a display name in the highscore table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserCommand {
    pub user_id: String,
    pub name: String,
}

/// User Command for reading a single highscore entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserCommand {
    pub user_id: String,
}

/// User Command for reading the whole highscore table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListHighscoresCommand;

/// User Command for starting a single-player segment outside of any room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSoloSleepCommand {
    pub user_id: String,
}

/// User Command for stopping a single-player segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSoloSleepCommand {
    pub user_id: String,
}

/// User Command for quitting the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuitCommand;

/// A user command which can be sent to the server by a single connection.
/// Room commands other than `JoinRoom` act on the room the connection has joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_ct", rename_all = "camelCase")]
pub enum UserCommand {
    JoinRoom(JoinRoomCommand),
    StartGame(StartGameCommand),
    StartSleep(StartSleepCommand),
    UpdateSleepTime(UpdateSleepTimeCommand),
    StopSleep(StopSleepCommand),
    LeaveRoom(LeaveRoomCommand),
    ListPublicRooms(ListPublicRoomsCommand),
    RegisterUser(RegisterUserCommand),
    GetUser(GetUserCommand),
    ListHighscores(ListHighscoresCommand),
    StartSoloSleep(StartSoloSleepCommand),
    StopSoloSleep(StopSoloSleepCommand),
    Quit(QuitCommand),
}
