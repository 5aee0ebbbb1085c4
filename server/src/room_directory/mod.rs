pub use self::room::{GameRoom, RoomError};
pub use self::room_directory::RoomDirectory;

mod room;
#[allow(clippy::module_inception)]
mod room_directory;
