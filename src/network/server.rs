use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, trace, warn};

use crate::game::handle::EconomyHandle;
use crate::protocol::{self, ClientCommand, ServerMessage};

/// Messages queued for one client's write task before snapshots start
/// being dropped.
pub const OUTBOX_CAPACITY: usize = 16;

/// Channel carrying outgoing messages to one client's write task.
type ClientTx = mpsc::Sender<ServerMessage>;

/// The game network server.
///
/// Every connected front-end drives and observes the same economy. Each
/// connection gets three pieces:
///
/// 1. **Write task** – encodes `ServerMessage`s as msgpack and forwards
///    them to the WebSocket sink.
/// 2. **Refresh task** – offers a snapshot every refresh interval. When a
///    client stops reading and its outbox is full the snapshot is dropped;
///    the next one supersedes it anyway.
/// 3. **Read loop** – decodes `ClientCommand`s and applies them through
///    the economy handle, answering with a log entry. Replies wait for
///    room in the outbox.
pub struct GameServer {
    listener: TcpListener,
    handle: EconomyHandle,
    refresh_interval: Duration,
}

impl GameServer {
    pub async fn bind(
        addr: &str,
        handle: EconomyHandle,
        refresh_interval: Duration,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            handle,
            refresh_interval,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) {
        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Accept error: {}", e);
                    continue;
                }
            };
            info!("Client connected from {}", addr);
            tokio::spawn(serve_client(
                stream,
                addr,
                self.handle.clone(),
                self.refresh_interval,
            ));
        }
    }
}

async fn serve_client(
    stream: TcpStream,
    addr: SocketAddr,
    handle: EconomyHandle,
    refresh_interval: Duration,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut ws_write, mut ws_read) = ws_stream.split();
    let (client_tx, mut client_rx): (ClientTx, _) = mpsc::channel(OUTBOX_CAPACITY);

    // ── Write task ──────────────────────────────────────────────
    let write_task = tokio::spawn(async move {
        while let Some(msg) = client_rx.recv().await {
            let bytes = match protocol::encode(&msg) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("Failed to serialize ServerMessage: {}", e);
                    continue;
                }
            };
            if let Err(e) = ws_write.send(Message::Binary(bytes.into())).await {
                warn!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    // ── Refresh task ────────────────────────────────────────────
    let refresh_task = tokio::spawn(publish_snapshots(
        handle.clone(),
        client_tx.clone(),
        refresh_interval,
    ));

    // ── Read loop ───────────────────────────────────────────────
    while let Some(result) = ws_read.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!("WebSocket read error from {}: {}", addr, e);
                break;
            }
        };
        if msg.is_close() {
            break;
        }
        if !msg.is_binary() {
            continue;
        }
        let data = msg.into_data();
        let reply = match protocol::decode::<ClientCommand>(&data) {
            Ok(command) => apply_command(&handle, command).await,
            Err(e) => {
                warn!("Failed to decode ClientCommand from {}: {}", addr, e);
                ServerMessage::Error {
                    message: format!("undecodable command: {}", e),
                }
            }
        };
        if client_tx.send(reply).await.is_err() {
            break;
        }
    }

    refresh_task.abort();
    drop(client_tx);
    let _ = write_task.await;
    info!("Client {} disconnected", addr);
}

/// Offers a snapshot to `tx` every `period` until the client goes away.
/// Never waits on a full outbox.
async fn publish_snapshots(handle: EconomyHandle, tx: ClientTx, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let snapshot = handle.snapshot().await;
        match tx.try_send(ServerMessage::Snapshot(snapshot)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("Outbox full, dropping snapshot"),
            Err(TrySendError::Closed(_)) => break,
        }
    }
}

async fn apply_command(handle: &EconomyHandle, command: ClientCommand) -> ServerMessage {
    match handle.execute(command).await {
        Ok((_, log)) => ServerMessage::Log(log),
        Err(e) => {
            warn!("Rejected {:?}: {}", command, e);
            ServerMessage::Error {
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::GameCatalog;
    use crate::game::economy::Economy;
    use crate::protocol::LogCategory;
    use tokio_tungstenite::connect_async;

    async fn start_server() -> (SocketAddr, EconomyHandle) {
        let handle = EconomyHandle::new(Economy::new(&GameCatalog::default()));
        let server = GameServer::bind("127.0.0.1:0", handle.clone(), Duration::from_millis(20))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        (addr, handle)
    }

    /// Reads frames until one matches `pick`.
    async fn next_matching<S, T>(ws: &mut S, pick: impl Fn(ServerMessage) -> Option<T>) -> T
    where
        S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
    {
        loop {
            let msg = ws.next().await.unwrap().unwrap();
            if !msg.is_binary() {
                continue;
            }
            let decoded: ServerMessage = protocol::decode(&msg.into_data()).unwrap();
            if let Some(found) = pick(decoded) {
                return found;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_client_outbox_stays_bounded() {
        let handle = EconomyHandle::new(Economy::new(&GameCatalog::default()));
        let (tx, mut rx) = mpsc::channel(OUTBOX_CAPACITY);
        let refresh = tokio::spawn(publish_snapshots(
            handle.clone(),
            tx,
            Duration::from_millis(20),
        ));

        // Nobody reads for 50 refresh periods.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!refresh.is_finished());

        let mut queued = 0;
        while let Ok(msg) = rx.try_recv() {
            assert!(matches!(msg, ServerMessage::Snapshot(_)));
            queued += 1;
        }
        assert_eq!(queued, OUTBOX_CAPACITY);

        // Once the reader is gone the refresh task stops on its own.
        drop(rx);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(refresh.is_finished());
    }

    #[tokio::test]
    async fn client_click_is_applied_and_reported() {
        let (addr, handle) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let bytes = protocol::encode(&ClientCommand::Click).unwrap();
        ws.send(Message::Binary(bytes.into())).await.unwrap();

        let log = next_matching(&mut ws, |m| match m {
            ServerMessage::Log(log) => Some(log),
            _ => None,
        })
        .await;
        assert_eq!(log.category, LogCategory::Economy);
        assert_eq!(handle.read(|e| e.coins()).await, 1);

        let snapshot = next_matching(&mut ws, |m| match m {
            ServerMessage::Snapshot(s) if s.coins == 1 => Some(s),
            _ => None,
        })
        .await;
        assert_eq!(snapshot.total_clicks, 1);
    }

    #[tokio::test]
    async fn bad_frames_and_bad_indices_get_errors() {
        let (addr, _handle) = start_server().await;
        let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        ws.send(Message::Binary(vec![0xc1u8].into())).await.unwrap();
        let message = next_matching(&mut ws, |m| match m {
            ServerMessage::Error { message } => Some(message),
            _ => None,
        })
        .await;
        assert!(message.starts_with("undecodable command"));

        let bytes = protocol::encode(&ClientCommand::PurchaseFacility {
            index: 99,
            mode: None,
        })
        .unwrap();
        ws.send(Message::Binary(bytes.into())).await.unwrap();
        let message = next_matching(&mut ws, |m| match m {
            ServerMessage::Error { message } => Some(message),
            _ => None,
        })
        .await;
        assert_eq!(message, "facility index 99 out of range (8 facilities)");
    }
}
