//! Per-connection WebSocket handling.
//!
//! The first frame after the handshake is the login: its token picks (or
//! creates) the controlled entity. Every later frame's token is ignored and
//! replaced by the authenticated identity, so a client can never act for
//! someone else. Malformed JSON and unknown actions are logged and dropped;
//! the connection stays open. Periodic pings keep the read timeout honest:
//! silence beyond the timeout closes the connection.

use std::time::Duration;

use anyhow::{Context, bail};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use warren_runtime::{ClientCommand, GameHandle};

const READ_TIMEOUT: Duration = Duration::from_secs(60);
const PING_INTERVAL: Duration = Duration::from_secs(20);

pub async fn serve_connection(stream: TcpStream, handle: GameHandle) -> anyhow::Result<()> {
    let ws = accept_async(stream).await.context("websocket handshake")?;
    let (mut sink, mut source) = ws.split();

    // Login handshake: the first message identifies the entity.
    let first = timeout(READ_TIMEOUT, source.next())
        .await
        .context("login timed out")?
        .context("connection closed before login")?
        .context("login frame error")?;
    let Some(login_cmd) = parse_command(&first) else {
        bail!("malformed login frame");
    };
    if login_cmd.token.trim().is_empty() {
        bail!("login frame carried no token");
    }

    let login = handle
        .login(login_cmd.token.trim().to_string())
        .await
        .context("login rejected")?;
    let entity = login.entity;
    let mut responses = login.responses;
    debug!(entity = %entity, "login complete");

    // The login frame doubles as the first command (normally INIT).
    handle
        .submit(entity, login_cmd.action, login_cmd.payload)
        .await
        .ok();

    let mut ping = tokio::time::interval(PING_INTERVAL);
    let mut last_seen = Instant::now();

    let result: anyhow::Result<()> = loop {
        tokio::select! {
            frame = responses.recv() => match frame {
                Some(frame) => {
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(entity = %entity, error = %err, "unserializable frame skipped");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break Ok(());
                    }
                }
                // Channel replaced by a re-login elsewhere, or service gone.
                None => break Ok(()),
            },
            _ = ping.tick() => {
                if last_seen.elapsed() > READ_TIMEOUT {
                    debug!(entity = %entity, "read timeout; closing connection");
                    break Ok(());
                }
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break Ok(());
                }
            }
            incoming = source.next() => {
                let msg = match incoming {
                    None => break Ok(()),
                    Some(Err(err)) => {
                        debug!(entity = %entity, error = %err, "read error");
                        break Ok(());
                    }
                    Some(Ok(msg)) => msg,
                };
                last_seen = Instant::now();
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<ClientCommand>(&text) {
                            Ok(command) => {
                                // Token overwrite: the authenticated entity
                                // acts, whatever the client claimed.
                                handle
                                    .submit(entity, command.action, command.payload)
                                    .await
                                    .ok();
                            }
                            Err(err) => {
                                warn!(entity = %entity, error = %err, "malformed command dropped");
                            }
                        }
                    }
                    Message::Ping(body) => {
                        if sink.send(Message::Pong(body)).await.is_err() {
                            break Ok(());
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Close(_) => break Ok(()),
                    _ => {}
                }
            }
        }
    };

    handle.logout(entity).await.ok();
    result
}

fn parse_command(msg: &Message) -> Option<ClientCommand> {
    match msg {
        Message::Text(text) => serde_json::from_str(text).ok(),
        _ => None,
    }
}
