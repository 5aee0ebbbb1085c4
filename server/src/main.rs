use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::{net::TcpListener, sync::broadcast, task::JoinSet};

use crate::{config::Config, event_router::EventRouter, scores::JsonFileScoreStore};

mod config;
mod event_router;
mod room_directory;
mod sanitize;
mod scores;
mod session;
mod solo;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    let scores = Arc::new(JsonFileScoreStore::open(config.highscores.clone()));
    log::info!("highscores are kept in {}", scores.path().display());
    let router = Arc::new(EventRouter::new(scores.clone()));

    let server = TcpListener::bind(config.address())
        .await
        .with_context(|| format!("could not bind to {}", config.address()))?;
    let (quit_tx, quit_rx) = broadcast::channel::<()>(1);
    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();

    log::info!("listening on {}", config.address());
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for the interrupt signal")?;
                log::info!("server interrupted, gracefully shutting down");
                // no receiver only means no session is running
                let _ = quit_tx.send(());
                break;
            }
            accepted = server.accept() => match accepted {
                Ok((socket, peer)) => {
                    log::debug!("accepted connection from {}", peer);
                    join_set.spawn(session::handle_user_session(router.clone(), quit_rx.resubscribe(), socket));
                }
                Err(err) => log::warn!("failed to accept a connection: {}", err),
            },
            // reap finished sessions so the set does not grow forever
            Some(finished) = join_set.join_next(), if !join_set.is_empty() => {
                if let Ok(Err(err)) = finished {
                    log::debug!("session closed: {:#}", err);
                }
            }
        }
    }

    while join_set.join_next().await.is_some() {}
    scores.flush().await;
    log::info!("server shut down");

    Ok(())
}
