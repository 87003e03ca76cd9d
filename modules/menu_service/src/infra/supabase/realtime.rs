//! Hosted realtime channel
//!
//! One websocket per module joins a single channel that listens for row
//! changes on `menu_items` (every kind) and `menu_updates` (inserts). Each
//! change becomes a payload-free [`ChangeEvent`] on the local hub, whichever
//! client made it.

use super::dto::{
    AccessTokenPayload, InboundFrame, JoinConfig, JoinPayload, OutboundFrame,
    PostgresChangesFilter, PostgresChangesPayload, ReplyPayload,
};
use super::SupabaseClient;
use crate::domain::{ChangeEvent, ChangeKind, ChangeSource, RealtimeHub, Table};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::{Sink, SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const CHANNEL_TOPIC: &str = "realtime:menu-service";
const PROTOCOL_VERSION: &str = "1.0.0";
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

const SUBSCRIPTIONS: [PostgresChangesFilter; 2] = [
    PostgresChangesFilter {
        event: "*",
        schema: "public",
        table: "menu_items",
    },
    PostgresChangesFilter {
        event: "INSERT",
        schema: "public",
        table: "menu_updates",
    },
];

/// [`ChangeSource`] over the hosted realtime websocket
pub struct SupabaseRealtime {
    client: Arc<SupabaseClient>,
}

/// Meaning of one inbound frame
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    Joined,
    Change(Table, ChangeKind),
    Ignored,
}

impl SupabaseRealtime {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }

    /// `wss://<project>/realtime/v1/websocket?apikey=<key>&vsn=1.0.0`
    pub fn socket_url(&self) -> Result<Url> {
        let mut url = self.client.endpoint("realtime/v1/websocket")?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => bail!("unsupported realtime scheme '{other}'"),
        };
        url.set_scheme(scheme)
            .map_err(|()| anyhow!("cannot switch {url} to {scheme}"))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.client.anon_key)
            .append_pair("vsn", PROTOCOL_VERSION);
        Ok(url)
    }

    async fn connect(&self) -> Result<WsStream> {
        let url = self.socket_url()?;
        let (socket, _response) = tokio::time::timeout(
            self.client.request_timeout,
            tokio_tungstenite::connect_async(url.as_str()),
        )
        .await
        .context("realtime connect timed out")?
        .context("realtime connect failed")?;

        tracing::info!(host = url.host_str().unwrap_or_default(), "Realtime socket connected");
        Ok(socket)
    }

    /// Join the channel and forward changes until the socket drops (`Err`)
    /// or `cancel` fires (`Ok`)
    async fn run_connection(
        &self,
        socket: WsStream,
        hub: &RealtimeHub,
        cancel: &CancellationToken,
        joined_once: &mut bool,
    ) -> Result<()> {
        let (mut sink, mut stream) = socket.split();
        let mut next_ref = 0u64;
        let mut make_ref = || {
            next_ref += 1;
            next_ref.to_string()
        };

        let join_ref = make_ref();
        let token = self.client.bearer();
        send(
            &mut sink,
            OutboundFrame {
                topic: CHANNEL_TOPIC,
                event: "phx_join",
                payload: JoinPayload {
                    config: JoinConfig {
                        postgres_changes: SUBSCRIPTIONS.to_vec(),
                    },
                    access_token: &token,
                },
                reference: join_ref.clone(),
                join_ref: Some(join_ref.clone()),
            },
        )
        .await?;

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut auth = self.client.auth_subscribe();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.close().await;
                    return Ok(());
                }

                _ = heartbeat.tick() => {
                    send(
                        &mut sink,
                        OutboundFrame {
                            topic: "phoenix",
                            event: "heartbeat",
                            payload: serde_json::Map::new(),
                            reference: make_ref(),
                            join_ref: None,
                        },
                    )
                    .await?;
                }

                // Row-level policies follow the signed-in user
                change = auth.recv() => match change {
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        let token = self.client.bearer();
                        send(
                            &mut sink,
                            OutboundFrame {
                                topic: CHANNEL_TOPIC,
                                event: "access_token",
                                payload: AccessTokenPayload { access_token: &token },
                                reference: make_ref(),
                                join_ref: Some(join_ref.clone()),
                            },
                        )
                        .await?;
                    }
                    Err(RecvError::Closed) => return Ok(()),
                },

                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => match parse_frame(text.as_str(), &join_ref)? {
                        Inbound::Joined => {
                            tracing::info!(topic = CHANNEL_TOPIC, "Realtime channel joined");
                            if *joined_once {
                                // Changes made while disconnected were missed
                                hub.notify(ChangeEvent::updated(Table::MenuItems));
                                hub.notify(ChangeEvent::inserted(Table::MenuUpdates));
                            }
                            *joined_once = true;
                        }
                        Inbound::Change(table, kind) => {
                            tracing::debug!(table = table.as_str(), ?kind, "Realtime change");
                            hub.notify(ChangeEvent::new(table, kind));
                        }
                        Inbound::Ignored => {}
                    },
                    Some(Ok(Message::Ping(data))) => {
                        sink.send(Message::Pong(data))
                            .await
                            .context("failed to answer ping")?;
                    }
                    Some(Ok(Message::Close(_))) | None => bail!("realtime socket closed"),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e).context("realtime socket error"),
                },
            }
        }
    }
}

#[async_trait]
impl ChangeSource for SupabaseRealtime {
    async fn run(&self, hub: RealtimeHub, cancel: CancellationToken) {
        tracing::info!("Realtime subscriber started");
        let mut delay = INITIAL_RETRY_DELAY;
        let mut joined_once = false;

        while !cancel.is_cancelled() {
            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                connected = self.connect() => connected,
            };

            match connected {
                Ok(socket) => {
                    delay = INITIAL_RETRY_DELAY;
                    match self
                        .run_connection(socket, &hub, &cancel, &mut joined_once)
                        .await
                    {
                        Ok(()) => break,
                        Err(e) => {
                            tracing::warn!(error = %format!("{e:#}"), "Realtime connection lost")
                        }
                    }
                }
                Err(e) => tracing::warn!(
                    delay_ms = delay.as_millis() as u64,
                    error = %format!("{e:#}"),
                    "Realtime connection failed"
                ),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = (delay * 2).min(MAX_RETRY_DELAY);
        }

        tracing::info!("Realtime subscriber stopped");
    }
}

async fn send<S, P>(sink: &mut S, frame: OutboundFrame<'_, P>) -> Result<()>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
    P: Serialize,
{
    let text = serde_json::to_string(&frame).context("failed to encode realtime frame")?;
    sink.send(Message::text(text))
        .await
        .context("failed to send realtime frame")
}

/// `Err` only when the server ends or refuses the channel; frames that do
/// not decode are logged and skipped
fn parse_frame(text: &str, join_ref: &str) -> Result<Inbound> {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed realtime frame");
            return Ok(Inbound::Ignored);
        }
    };
    if frame.topic != CHANNEL_TOPIC {
        return Ok(Inbound::Ignored);
    }

    match frame.event.as_str() {
        "phx_reply" if frame.reference.as_deref() == Some(join_ref) => {
            let reply: ReplyPayload =
                serde_json::from_value(frame.payload).context("malformed join reply")?;
            if reply.status != "ok" {
                bail!("realtime join rejected: {}", reply.response);
            }
            Ok(Inbound::Joined)
        }
        "postgres_changes" => {
            let change = match serde_json::from_value::<PostgresChangesPayload>(frame.payload) {
                Ok(payload) => payload.data,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed realtime change");
                    return Ok(Inbound::Ignored);
                }
            };
            match (Table::from_name(&change.table), change_kind(&change.kind)) {
                (Some(table), Some(kind)) => Ok(Inbound::Change(table, kind)),
                _ => {
                    tracing::debug!(table = %change.table, kind = %change.kind, "Ignoring realtime change");
                    Ok(Inbound::Ignored)
                }
            }
        }
        "system" if frame.payload.get("status").and_then(|s| s.as_str()) == Some("error") => {
            bail!("realtime subscription failed: {}", frame.payload)
        }
        "phx_error" | "phx_close" => bail!("realtime channel ended by server ({})", frame.event),
        _ => Ok(Inbound::Ignored),
    }
}

fn change_kind(kind: &str) -> Option<ChangeKind> {
    match kind {
        "INSERT" => Some(ChangeKind::Insert),
        "UPDATE" => Some(ChangeKind::Update),
        "DELETE" => Some(ChangeKind::Delete),
        _ => None,
    }
}
