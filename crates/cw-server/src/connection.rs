//! One viewer connection on the protocol listener.
//!
//! A connection opens with `Hello`/`HelloAck`, then joins the world's
//! authority. From then on a writer task forwards everything the authority
//! addresses to the viewer, while the read loop validates incoming
//! messages and submits them one at a time.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use cw_ledger::SourceInventory;
use cw_protocol::{
    error_codes, ProtocolError, Request, WarehouseCodec, WarehouseMessage, PROTOCOL_VERSION,
};
use cw_sync::AuthorityHandle;
use cw_types::ResourceCatalog;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};

/// Serve one accepted TCP connection until the viewer hangs up.
pub async fn serve_connection<I>(
    stream: TcpStream,
    peer: SocketAddr,
    handle: AuthorityHandle,
    catalog: Arc<dyn ResourceCatalog>,
    inventory: I,
) -> ServerResult<()>
where
    I: SourceInventory + Send + 'static,
{
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();
    let mut buf = BytesMut::with_capacity(4096);

    let viewer_name = handshake(&mut reader, &mut writer, &mut buf, handle.world()).await?;
    let (viewer, mut pushes) = handle.join(inventory).await?;
    info!(%peer, %viewer, name = %viewer_name, world = handle.world(), "viewer connected");

    // Rejections are written by the same task as pushes so frames never
    // interleave.
    let (reject_tx, mut rejects) = mpsc::channel::<WarehouseMessage>(16);
    let writer_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                Some(msg) = pushes.recv() => msg,
                Some(msg) = rejects.recv() => msg,
                else => break,
            };
            if let Err(e) = WarehouseCodec::write_message(&mut writer, &msg).await {
                debug!(error = %e, "write failed, closing writer");
                break;
            }
        }
    });

    let result = read_loop(&mut reader, &mut buf, &handle, viewer, &*catalog, &reject_tx).await;

    drop(reject_tx);
    if let Err(e) = handle.leave(viewer).await {
        debug!(%viewer, error = %e, "leave after disconnect failed");
    }
    if let Err(e) = writer_task.await {
        warn!(%viewer, error = %e, "writer task panicked");
    }
    info!(%peer, %viewer, "viewer disconnected");
    result
}

async fn read_loop<R>(
    reader: &mut R,
    buf: &mut BytesMut,
    handle: &AuthorityHandle,
    viewer: cw_sync::ViewerId,
    catalog: &dyn ResourceCatalog,
    rejects: &mpsc::Sender<WarehouseMessage>,
) -> ServerResult<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        let msg = match WarehouseCodec::read_message(reader, buf).await {
            Ok(Some(msg)) => msg,
            Ok(None) => return Ok(()),
            // The frame was consumed whole; the stream is still aligned.
            Err(e @ (ProtocolError::Deserialization(_) | ProtocolError::InvalidMessageType(_))) => {
                warn!(%viewer, error = %e, "dropping undecodable message");
                reject(rejects, &e).await;
                continue;
            }
            Err(e) => {
                warn!(%viewer, error = %e, "closing connection");
                reject(rejects, &e).await;
                return Err(e.into());
            }
        };

        match Request::from_message(msg, catalog) {
            Ok(request) => {
                handle.submit(viewer, request).await?;
            }
            Err(e) => {
                debug!(%viewer, error = %e, "rejected request");
                reject(rejects, &e).await;
            }
        }
    }
}

async fn reject(rejects: &mpsc::Sender<WarehouseMessage>, error: &ProtocolError) {
    let msg = WarehouseMessage::Error {
        code: error.wire_code(),
        message: error.to_string(),
    };
    // The writer is gone only if the viewer already hung up.
    let _ = rejects.send(msg).await;
}

/// Expect `Hello` with a matching version and answer `HelloAck`. Returns
/// the name the viewer announced.
async fn handshake<R, W>(
    reader: &mut R,
    writer: &mut W,
    buf: &mut BytesMut,
    world: &str,
) -> ServerResult<String>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let first = WarehouseCodec::read_message(reader, buf)
        .await?
        .ok_or_else(|| ServerError::Handshake("connection closed before hello".into()))?;

    let (version, viewer) = match first {
        WarehouseMessage::Hello { version, viewer } => (version, viewer),
        other => {
            let error = ProtocolError::UnexpectedMessage(other.type_name());
            write_error(writer, &error).await;
            return Err(ServerError::Handshake(error.to_string()));
        }
    };
    if version != PROTOCOL_VERSION {
        let error = ProtocolError::VersionMismatch {
            local: PROTOCOL_VERSION,
            remote: version,
        };
        write_error(writer, &error).await;
        return Err(error.into());
    }

    let ack = WarehouseMessage::HelloAck {
        version: PROTOCOL_VERSION,
        world: world.to_string(),
    };
    WarehouseCodec::write_message(writer, &ack).await?;
    Ok(viewer)
}

async fn write_error<W: AsyncWrite + Unpin>(writer: &mut W, error: &ProtocolError) {
    let msg = WarehouseMessage::Error {
        code: error.wire_code(),
        message: error.to_string(),
    };
    if let Err(e) = WarehouseCodec::write_message(writer, &msg).await {
        debug!(error = %e, "could not report handshake failure");
    }
}
