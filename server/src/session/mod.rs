use std::sync::Arc;

use comms::{
    command::UserCommand,
    event::{ConnectedEvent, Event},
    transport::{self, server::CommandStream, server::EventWriter},
};
use nanoid::nanoid;
use tokio::{
    net::TcpStream,
    sync::{broadcast, mpsc},
};
use tokio_stream::StreamExt;

use crate::event_router::EventRouter;

pub use connection_registry::{ConnectionBinding, ConnectionRegistry};

mod connection_registry;

/// Given a tcp stream and the event router, handles the user session
/// until the user quits, the tcp stream is closed for some reason, or the server shuts down.
///
/// However the session ends, the connection is reported as disconnected to the router
/// so its room can notify the remaining members.
pub async fn handle_user_session(
    router: Arc<EventRouter>,
    mut quit_rx: broadcast::Receiver<()>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let connection_id = nanoid!();
    let (mut commands, mut event_writer) = transport::server::split_tcp_stream(stream);
    let mut outbox = router.connect(&connection_id).await;

    let result = run_session(
        &router,
        &connection_id,
        &mut quit_rx,
        &mut commands,
        &mut event_writer,
        &mut outbox,
    )
    .await;

    router.disconnect(&connection_id).await;

    if let Err(err) = &result {
        log::debug!("session '{}' ended with an error: {:#}", connection_id, err);
    }

    result
}

async fn run_session(
    router: &EventRouter,
    connection_id: &str,
    quit_rx: &mut broadcast::Receiver<()>,
    commands: &mut CommandStream,
    event_writer: &mut EventWriter,
    outbox: &mut mpsc::Receiver<Event>,
) -> anyhow::Result<()> {
    // The client needs its connection id before sending anything
    event_writer
        .write(&Event::Connected(ConnectedEvent {
            connection_id: String::from(connection_id),
        }))
        .await?;

    loop {
        tokio::select! {
            cmd = commands.next() => match cmd {
                None | Some(Ok(UserCommand::Quit(_))) => break,
                Some(Ok(cmd)) => router.handle(connection_id, cmd).await,
                // a broken socket ends the session, a malformed line is only skipped
                Some(Err(err)) if err.downcast_ref::<std::io::Error>().is_some() => return Err(err),
                Some(Err(err)) => {
                    log::warn!("ignoring malformed command of '{}': {:#}", connection_id, err);
                }
            },
            // Events addressed to this connection, either replies or room broadcasts
            Some(event) = outbox.recv() => {
                event_writer.write(&event).await?;
            }
            Ok(_) = quit_rx.recv() => {
                log::info!("closing session '{}' for shutdown", connection_id);
                break;
            }
        }
    }

    Ok(())
}
