use comms::event::RoomMember;
use tokio::time::Instant;

/// A participant of a room and the state of their sleep segment
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub user_id: String,
    pub username: String,
    /// Set only while a segment is running
    pub activity_started_at: Option<Instant>,
    /// Last reported or computed duration in whole seconds
    pub elapsed_seconds: u64,
    pub has_stopped: bool,
    pub has_left: bool,
}

impl Member {
    fn new(user_id: &str, username: &str) -> Self {
        Member {
            user_id: String::from(user_id),
            username: String::from(username),
            activity_started_at: None,
            elapsed_seconds: 0,
            has_stopped: false,
            has_left: false,
        }
    }

    pub fn is_present(&self) -> bool {
        !self.has_left
    }

    pub fn is_active(&self) -> bool {
        self.activity_started_at.is_some()
    }

    /// The view of this member that is sent to clients
    pub fn to_view(&self) -> RoomMember {
        RoomMember {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            sleep_time: self.elapsed_seconds,
            has_stopped: self.has_stopped,
            has_left: self.has_left,
        }
    }
}

/// [MemberRegistry] keeps the members of a room in the order they first joined.
///
/// Members that leave stay in the registry with `has_left` set, so the standings
/// still show them until the room is torn down.
#[derive(Debug, Default)]
pub struct MemberRegistry {
    members: Vec<Member>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        MemberRegistry {
            members: Vec::new(),
        }
    }

    /// Add a member, returns false and changes nothing if the user id is already registered
    pub fn insert(&mut self, user_id: &str, username: &str) -> bool {
        if self.get(user_id).is_some() {
            return false;
        }

        self.members.push(Member::new(user_id, username));

        true
    }

    pub fn get(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.user_id == user_id)
    }

    pub fn get_mut(&mut self, user_id: &str) -> Option<&mut Member> {
        self.members
            .iter_mut()
            .find(|member| member.user_id == user_id)
    }

    /// Like [MemberRegistry::get] but skips members who have left
    pub fn get_present(&self, user_id: &str) -> Option<&Member> {
        self.get(user_id).filter(|member| member.is_present())
    }

    pub fn get_present_mut(&mut self, user_id: &str) -> Option<&mut Member> {
        self.get_mut(user_id).filter(|member| member.is_present())
    }

    /// The earliest joined member that has not left
    pub fn first_present(&self) -> Option<&Member> {
        self.members.iter().find(|member| member.is_present())
    }

    pub fn present_count(&self) -> usize {
        self.members.iter().filter(|member| member.is_present()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
