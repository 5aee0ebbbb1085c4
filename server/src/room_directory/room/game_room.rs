use comms::{
    command::RoomType,
    event::{CurrentUsersEvent, RoundOverEvent},
};
use tokio::time::Instant;

use super::{
    error::RoomError,
    member_registry::{Member, MemberRegistry},
};

/// Lifecycle of a [GameRoom]. A room that reaches zero present members is torn down by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    /// Created but nobody has been admitted yet
    Empty,
    /// Accepting new members, waiting for the creator to start
    Open,
    /// The creator started the game, only existing members may rejoin
    Started,
}

/// Result of a successful [GameRoom::admit]
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Membership after the admission, to be broadcast to the whole room
    pub snapshot: CurrentUsersEvent,
    /// True when the user was already a member, e.g. a reconnect
    pub rejoined: bool,
    /// The joining user has to be told the game already started
    pub game_already_started: bool,
}

/// [GameRoom] is the state machine of a single sleep race.
///
/// It only knows about members and their timers; delivering events to the
/// connections of the room is the job of the router.
#[derive(Debug)]
pub struct GameRoom {
    room_id: String,
    room_type: RoomType,
    started: bool,
    creator_id: Option<String>,
    members: MemberRegistry,
    round_over_announced: bool,
}

impl GameRoom {
    pub fn new(room_id: &str, room_type: RoomType, creator_id: Option<&str>) -> Self {
        GameRoom {
            room_id: String::from(room_id),
            room_type,
            started: false,
            creator_id: creator_id.map(String::from),
            members: MemberRegistry::new(),
            round_over_announced: false,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn room_type(&self) -> RoomType {
        self.room_type
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn creator_id(&self) -> Option<&str> {
        self.creator_id.as_deref()
    }

    pub fn state(&self) -> RoomState {
        if self.started {
            RoomState::Started
        } else if self.members.is_empty() {
            RoomState::Empty
        } else {
            RoomState::Open
        }
    }

    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.get(user_id)
    }

    /// Number of members that have not left
    pub fn present_count(&self) -> usize {
        self.members.present_count()
    }

    pub fn snapshot(&self) -> CurrentUsersEvent {
        CurrentUsersEvent {
            room_id: self.room_id.clone(),
            users: self.members.iter().map(Member::to_view).collect(),
            room_creator: self.creator_id.clone(),
        }
    }

    /// Add a user to the room.
    ///
    /// Joining again with an id that is already registered is an idempotent
    /// re-admission: the username is refreshed and a member who had left is
    /// present again. New users can only join while the room is open.
    pub fn admit(&mut self, user_id: &str, username: &str) -> Result<Admission, RoomError> {
        let rejoined = match self.members.get_mut(user_id) {
            Some(member) => {
                member.username = String::from(username);
                member.has_left = false;

                true
            }
            None => {
                if self.started {
                    return Err(RoomError::RoomAlreadyStarted);
                }

                self.members.insert(user_id, username);

                false
            }
        };

        self.elect_creator_if_needed();

        Ok(Admission {
            snapshot: self.snapshot(),
            rejoined,
            game_already_started: self.started,
        })
    }

    /// Hand the creator role to the earliest joined present member when the
    /// current creator is gone. Returns true if the creator changed.
    pub fn elect_creator_if_needed(&mut self) -> bool {
        let creator_present = self
            .creator_id
            .as_deref()
            .is_some_and(|creator_id| self.members.get_present(creator_id).is_some());

        if creator_present {
            return false;
        }

        match self.members.first_present() {
            Some(member) => {
                self.creator_id = Some(member.user_id.clone());

                true
            }
            None => false,
        }
    }

    pub fn start_game(&mut self, requester_id: &str) -> Result<(), RoomError> {
        if self.creator_id.as_deref() != Some(requester_id) {
            return Err(RoomError::NotCreator);
        }

        if self.started {
            return Err(RoomError::AlreadyStarted);
        }

        self.started = true;

        Ok(())
    }

    /// Start the timer of a member. A new segment replaces the result of a previous one.
    pub fn begin_segment(&mut self, user_id: &str, now: Instant) -> Result<Instant, RoomError> {
        if !self.started {
            return Err(RoomError::NotStarted);
        }

        let member = self.present_member_mut(user_id)?;

        if member.is_active() {
            return Err(RoomError::SegmentAlreadyActive);
        }

        member.activity_started_at = Some(now);
        member.elapsed_seconds = 0;
        member.has_stopped = false;
        self.round_over_announced = false;

        Ok(now)
    }

    /// Overwrite the elapsed time of a running segment with the client's report.
    ///
    /// Reports for a member without a running segment are ignored and return
    /// false, they are usually duplicates or late arrivals after a stop.
    pub fn report_progress(&mut self, user_id: &str, elapsed_seconds: u64) -> Result<bool, RoomError> {
        let member = self.present_member_mut(user_id)?;

        if !member.is_active() {
            return Ok(false);
        }

        member.elapsed_seconds = elapsed_seconds;

        Ok(true)
    }

    /// Finish the segment of a member and return its duration in whole seconds.
    ///
    /// A running segment is measured from its start to `now`; otherwise the
    /// last reported elapsed time is taken as final.
    pub fn end_segment(&mut self, user_id: &str, now: Instant) -> Result<u64, RoomError> {
        if !self.started {
            return Err(RoomError::NotStarted);
        }

        let member = self.present_member_mut(user_id)?;

        let duration = match member.activity_started_at.take() {
            Some(started_at) => now.saturating_duration_since(started_at).as_secs(),
            None => member.elapsed_seconds,
        };

        member.elapsed_seconds = duration;
        member.has_stopped = true;

        Ok(duration)
    }

    /// Mark a member as gone. A running segment is dropped without producing a result,
    /// the member keeps whatever elapsed time was last reported.
    pub fn mark_left(&mut self, user_id: &str) -> Result<Member, RoomError> {
        let member = self.present_member_mut(user_id)?;

        member.has_left = true;
        member.activity_started_at = None;

        Ok(member.clone())
    }

    /// All members, longest sleeper first. Equal times keep the join order.
    pub fn standings(&self) -> Vec<Member> {
        let mut standings: Vec<Member> = self.members.iter().cloned().collect();
        // sort_by is stable, so equal elapsed times stay in join order
        standings.sort_by(|a, b| b.elapsed_seconds.cmp(&a.elapsed_seconds));

        standings
    }

    pub fn is_round_over(&self) -> bool {
        self.members
            .iter()
            .all(|member| member.has_stopped || member.has_left)
    }

    /// Present members sharing the longest elapsed time. Left members count
    /// towards the maximum but can not win. Only meaningful once the round is over.
    pub fn winners(&self) -> Vec<Member> {
        let Some(best) = self.members.iter().map(|m| m.elapsed_seconds).max() else {
            return Vec::new();
        };

        self.standings()
            .into_iter()
            .filter(|member| !member.has_left && member.elapsed_seconds == best)
            .collect()
    }

    /// Returns the round result the first time a started round is over and
    /// at least one member is still there to hear about it.
    pub fn take_round_result(&mut self) -> Option<RoundOverEvent> {
        if !self.started
            || self.round_over_announced
            || self.present_count() == 0
            || !self.is_round_over()
        {
            return None;
        }

        self.round_over_announced = true;

        Some(RoundOverEvent {
            standings: self.standings().iter().map(Member::to_view).collect(),
            winners: self.winners().iter().map(Member::to_view).collect(),
        })
    }

    fn present_member_mut(&mut self, user_id: &str) -> Result<&mut Member, RoomError> {
        self.members
            .get_present_mut(user_id)
            .ok_or_else(|| RoomError::MemberNotFound(String::from(user_id)))
    }
}
