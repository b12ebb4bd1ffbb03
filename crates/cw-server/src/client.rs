use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::BytesMut;
use cw_protocol::{Request, WarehouseCodec, WarehouseMessage, PROTOCOL_VERSION};
use cw_sync::{SyncError, SyncResult, WarehouseTransport};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Viewer side of the TCP protocol.
///
/// A background task decodes incoming frames into a channel so
/// [`try_recv`](WarehouseTransport::try_recv) never blocks.
pub struct RemoteTransport {
    writer: OwnedWriteHalf,
    incoming: mpsc::Receiver<WarehouseMessage>,
    reader_task: JoinHandle<()>,
    world: String,
}

impl RemoteTransport {
    /// Connect and complete the handshake as `viewer`.
    pub async fn connect(addr: SocketAddr, viewer: &str) -> SyncResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| SyncError::TransportError(format!("{addr}: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| SyncError::TransportError(e.to_string()))?;
        let (mut reader, mut writer) = stream.into_split();

        let hello = WarehouseMessage::Hello {
            version: PROTOCOL_VERSION,
            viewer: viewer.to_string(),
        };
        WarehouseCodec::write_message(&mut writer, &hello).await?;

        let mut buf = BytesMut::with_capacity(4096);
        let world = match WarehouseCodec::read_message(&mut reader, &mut buf).await? {
            Some(WarehouseMessage::HelloAck { world, .. }) => world,
            Some(WarehouseMessage::Error { code, message }) => {
                return Err(SyncError::Rejected { code, message })
            }
            Some(other) => {
                return Err(SyncError::TransportError(format!(
                    "expected HelloAck, got {}",
                    other.type_name()
                )))
            }
            None => return Err(SyncError::TransportError("closed during handshake".into())),
        };

        let (sender, incoming) = mpsc::channel(256);
        let reader_task = tokio::spawn(async move {
            loop {
                match WarehouseCodec::read_message(&mut reader, &mut buf).await {
                    Ok(Some(msg)) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "connection to warehouse lost");
                        break;
                    }
                }
            }
            debug!("reader task finished");
        });

        Ok(Self {
            writer,
            incoming,
            reader_task,
            world,
        })
    }

    /// World name announced by the server.
    pub fn world(&self) -> &str {
        &self.world
    }
}

impl Drop for RemoteTransport {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

#[async_trait]
impl WarehouseTransport for RemoteTransport {
    async fn send(&mut self, request: Request) -> SyncResult<()> {
        WarehouseCodec::write_message(&mut self.writer, &request.to_message()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> SyncResult<Option<WarehouseMessage>> {
        Ok(self.incoming.recv().await)
    }

    fn try_recv(&mut self) -> SyncResult<Option<WarehouseMessage>> {
        match self.incoming.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => Ok(None),
        }
    }
}
