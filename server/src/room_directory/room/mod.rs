mod error;
mod game_room;
mod member_registry;

pub use self::error::RoomError;
pub use self::game_room::{GameRoom, RoomState};
pub use self::member_registry::Member;
