use anyhow::Context;
use comms::{
    command::{self, UserCommand},
    event::{self, Event},
    transport,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_stream::StreamExt;

const PORT: usize = 8081;

async fn server_example() -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("0.0.0.0:{}", PORT))
        .await
        .expect("could not bind to the port");

    let tcp_stream = match listener.accept().await {
        Ok((tcp_stream, _addr)) => tcp_stream,
        Err(e) => return Err(anyhow::anyhow!("failed to accept client: {}", e)),
    };

    let (mut command_stream, mut event_writer) = transport::server::split_tcp_stream(tcp_stream);

    event_writer
        .write(&Event::Connected(event::ConnectedEvent {
            connection_id: "connection-1".into(),
        }))
        .await?;

    while let Some(result) = command_stream.next().await {
        match result {
            Ok(command) => println!("SERVER: received command: {:?}", command),
            Err(e) => println!("SERVER: failed to read command: {}", e),
        }
    }

    Ok(())
}

async fn client_example() -> anyhow::Result<()> {
    let tcp_stream = match TcpStream::connect(format!("localhost:{}", PORT)).await {
        Ok(tcp_stream) => tcp_stream,
        Err(e) => return Err(anyhow::anyhow!("failed to connect to server: {}", e)),
    };

    let (mut event_stream, mut command_writer) = transport::client::split_tcp_stream(tcp_stream);

    match event_stream.next().await {
        Some(Ok(event)) => println!("CLIENT: received event: {:?}", event),
        Some(Err(e)) => println!("CLIENT: failed to read event: {}", e),
        None => return Err(anyhow::anyhow!("server closed the connection")),
    }

    for command in [
        UserCommand::JoinRoom(command::JoinRoomCommand {
            room_id: None,
            user_id: "user-1".into(),
            username: "alice".into(),
            room_type: command::RoomType::Public,
            is_room_creator: true,
        }),
        UserCommand::StartGame(command::StartGameCommand),
        UserCommand::StartSleep(command::StartSleepCommand),
        UserCommand::StopSleep(command::StopSleepCommand),
    ] {
        command_writer.write(&command).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tokio::try_join!(server_example(), client_example()).context("one of the examples failed")?;

    println!("example ran without problems");

    Ok(())
}
