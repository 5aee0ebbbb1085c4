use std::time::Duration;

use comms::{
    command::{
        JoinRoomCommand, QuitCommand, RoomType, StartGameCommand, StartSleepCommand,
        StopSleepCommand, UpdateSleepTimeCommand, UserCommand,
    },
    event::Event,
    transport::{self, client::CommandWriter, client::EventStream},
};
use nanoid::nanoid;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpStream, task::JoinSet};
use tokio_stream::StreamExt;

/// Stress Test for the Sleep Race Server
///
/// Generates synthetic load with rooms whose members all race a segment of random length,
/// reporting their elapsed time every second. The number of rooms, members per room and
/// segment lengths can be configured.
///
/// !IMPORTANT! Be sure to check and configure your socket limits, before you run the tests

const SERVER_ADDR: &str = "localhost:3005";

/// Stress Test Configuration
// The number of rooms to spawn, distributed across the load increments
const LOAD_INCREMENTS: &str = r#"[
    { "room_count": 100, "after": { "secs": 60, "nanos": 0 }, "steps": 60 },
    { "room_count": 300, "after": { "secs": 120, "nanos": 0 }, "steps": 60 }
]"#;
// How many members race in a single room, including the creator
const MEMBERS_PER_ROOM: usize = 4;
// Bounds of a member's segment length in seconds
const SEGMENT_SECONDS: std::ops::Range<u64> = 10..60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoadIncrements {
    room_count: usize,
    after: Duration,
    steps: usize,
}

/// Connects and joins the room, returning the event stream positioned after the first membership snapshot
async fn connect_member(
    room_id: &str,
    is_room_creator: bool,
) -> anyhow::Result<(EventStream, CommandWriter)> {
    let tcp_stream = TcpStream::connect(SERVER_ADDR).await?;
    let (mut event_stream, mut command_writer) = transport::client::split_tcp_stream(tcp_stream);

    match event_stream.next().await {
        Some(Ok(Event::Connected(_))) => {}
        _ => return Err(anyhow::anyhow!("server did not greet the connection")),
    }

    let user_id = nanoid!(10);
    command_writer
        .write(&UserCommand::JoinRoom(JoinRoomCommand {
            room_id: Some(String::from(room_id)),
            user_id: user_id.clone(),
            username: format!("sleeper-{}", user_id),
            room_type: RoomType::Public,
            is_room_creator,
        }))
        .await?;

    match event_stream.next().await {
        Some(Ok(Event::CurrentUsers(_))) => Ok((event_stream, command_writer)),
        other => Err(anyhow::anyhow!("could not join room {}: {:?}", room_id, other)),
    }
}

/// Waits for the game to start, races a segment of random length and stays until the round is over
async fn race(mut event_stream: EventStream, mut command_writer: CommandWriter) -> anyhow::Result<()> {
    loop {
        match event_stream.next().await {
            Some(Ok(Event::GameStarted)) => break,
            Some(_) => continue,
            None => return Err(anyhow::anyhow!("server closed the connection before the start")),
        }
    }

    let segment_seconds = StdRng::from_entropy().gen_range(SEGMENT_SECONDS);
    command_writer
        .write(&UserCommand::StartSleep(StartSleepCommand))
        .await?;

    let updates = tokio::spawn(async move {
        for sleep_time in 1..=segment_seconds {
            tokio::time::sleep(Duration::from_secs(1)).await;
            command_writer
                .write(&UserCommand::UpdateSleepTime(UpdateSleepTimeCommand {
                    sleep_time,
                }))
                .await?;
        }

        command_writer
            .write(&UserCommand::StopSleep(StopSleepCommand))
            .await?;

        anyhow::Ok(command_writer)
    });

    while let Some(event) = event_stream.next().await {
        if let Ok(Event::RoundOver(_)) = event {
            break;
        }
    }

    let mut command_writer = updates.await??;
    command_writer
        .write(&UserCommand::Quit(QuitCommand))
        .await?;

    Ok(())
}

async fn spawn_single_room() -> anyhow::Result<()> {
    let result = spawn_single_room_raw().await;

    match result.as_ref() {
        Ok(_) => println!("room exited without problems"),
        Err(err) => println!("some error occurred = {}", err),
    }

    result
}

async fn spawn_single_room_raw() -> anyhow::Result<()> {
    let room_id = nanoid!(8);
    let (creator_events, mut creator_commands) = connect_member(&room_id, true).await?;

    let mut members: JoinSet<anyhow::Result<()>> = JoinSet::new();
    for _ in 1..MEMBERS_PER_ROOM {
        let (events, commands) = connect_member(&room_id, false).await?;
        members.spawn(race(events, commands));
    }

    creator_commands
        .write(&UserCommand::StartGame(StartGameCommand))
        .await?;
    race(creator_events, creator_commands).await?;

    while let Some(result) = members.join_next().await {
        result??;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let load_increments: Vec<LoadIncrements> =
        serde_json::from_str(LOAD_INCREMENTS).expect("could not parse the load increments");

    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();

    let mut current: usize = 0;
    for li in load_increments {
        let diff = li.room_count - current;
        let sleep_duration =
            Duration::from_millis((li.after.as_millis() / li.steps as u128) as u64);
        let to_increment = diff / li.steps;

        for _ in 0..li.steps {
            for _ in 0..to_increment {
                join_set.spawn(spawn_single_room());
            }

            current += to_increment;
            println!("total rooms: {}", current);
            tokio::time::sleep(sleep_duration).await;
        }
    }

    while join_set.join_next().await.is_some() {}
}
