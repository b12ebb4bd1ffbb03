use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{WarehouseMessage, MAX_MESSAGE_SIZE};

const HEADER_LEN: usize = 5;

/// Codec for encoding/decoding warehouse protocol messages.
pub struct WarehouseCodec;

impl WarehouseCodec {
    /// Encode a message with framing: [4 bytes len][1 byte tag][payload]
    pub fn encode(msg: &WarehouseMessage) -> ProtocolResult<Vec<u8>> {
        let payload = bincode::serialize(msg)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.type_tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode a framed message. Returns (message, bytes_consumed).
    pub fn decode(data: &[u8]) -> ProtocolResult<(WarehouseMessage, usize)> {
        if data.len() < HEADER_LEN {
            return Err(ProtocolError::FramingError("too short".into()));
        }
        let total = frame_len(data)?;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        let msg = decode_body(data[4], &data[HEADER_LEN..total])?;
        Ok((msg, total))
    }

    /// Decode the next complete frame from `buf`, consuming it.
    ///
    /// Returns `Ok(None)` while the frame is still incomplete.
    pub fn decode_buf(buf: &mut BytesMut) -> ProtocolResult<Option<WarehouseMessage>> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let total = frame_len(buf)?;
        if buf.len() < total {
            buf.reserve(total - buf.len());
            return Ok(None);
        }
        let mut frame = buf.split_to(total);
        frame.advance(4);
        let tag = frame.get_u8();
        decode_body(tag, &frame).map(Some)
    }

    /// Read the next message from `reader`, buffering partial frames in `buf`.
    ///
    /// Returns `Ok(None)` on a clean end of stream.
    pub async fn read_message<R>(
        reader: &mut R,
        buf: &mut BytesMut,
    ) -> ProtocolResult<Option<WarehouseMessage>>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(msg) = Self::decode_buf(buf)? {
                return Ok(Some(msg));
            }
            if reader.read_buf(buf).await? == 0 {
                if buf.is_empty() {
                    trace!("peer closed the stream");
                    return Ok(None);
                }
                debug!(buffered = buf.len(), "stream ended inside a frame");
                return Err(ProtocolError::FramingError(
                    "connection closed mid-frame".into(),
                ));
            }
        }
    }

    /// Frame and write one message, flushing the writer.
    pub async fn write_message<W>(writer: &mut W, msg: &WarehouseMessage) -> ProtocolResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = Self::encode(msg)?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Encode payload only (no framing).
    pub fn encode_payload(msg: &WarehouseMessage) -> ProtocolResult<Vec<u8>> {
        bincode::serialize(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    /// Decode payload only (no framing).
    pub fn decode_payload(data: &[u8]) -> ProtocolResult<WarehouseMessage> {
        bincode::deserialize(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }
}

/// Total frame length (header included) announced by the first four bytes.
fn frame_len(data: &[u8]) -> ProtocolResult<usize> {
    let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if len < 1 {
        return Err(ProtocolError::FramingError("zero-length frame".into()));
    }
    if len - 1 > MAX_MESSAGE_SIZE {
        warn!(size = len - 1, max = MAX_MESSAGE_SIZE, "refusing oversized frame");
        return Err(ProtocolError::MessageTooLarge {
            size: len - 1,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(4 + len)
}

fn decode_body(tag: u8, payload: &[u8]) -> ProtocolResult<WarehouseMessage> {
    let msg = WarehouseCodec::decode_payload(payload)?;
    if msg.type_tag() != tag {
        debug!(tag, decoded = msg.type_name(), "frame tag does not match payload");
        return Err(ProtocolError::InvalidMessageType(tag));
    }
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use cw_types::{ItemStack, OperationKind, OperationResult, ResourceType, Snapshot, Timestamp};

    use super::*;

    fn wheat() -> ResourceType {
        ResourceType::new("minecraft:wheat").unwrap()
    }

    fn snapshot() -> Snapshot {
        let mut items = BTreeMap::new();
        items.insert(wheat(), 64);
        items.insert(ResourceType::new("minecraft:stone").unwrap(), 0);
        Snapshot::new(items, Timestamp::from_millis(1_700_000_000_123))
    }

    #[test]
    fn snapshot_push_survives_framing() {
        let msg = WarehouseMessage::PushSnapshot { snapshot: snapshot() };
        let encoded = WarehouseCodec::encode(&msg).unwrap();
        let (decoded, consumed) = WarehouseCodec::decode(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn outcome_and_inventory_survive_framing() {
        let msgs = [
            WarehouseMessage::OperationOutcome {
                op: OperationKind::DepositAll,
                result: OperationResult::Success,
                moved: [(wheat(), 64)].into_iter().collect(),
            },
            WarehouseMessage::PushInventory {
                slots: vec![
                    Some(ItemStack::simple(wheat(), 3)),
                    None,
                    Some(ItemStack::with_extra_data(wheat(), 1)),
                ],
            },
        ];
        for msg in msgs {
            let encoded = WarehouseCodec::encode(&msg).unwrap();
            assert_eq!(WarehouseCodec::decode(&encoded).unwrap().0, msg);
        }
    }

    #[test]
    fn decode_truncated() {
        let err = WarehouseCodec::decode(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn decode_zero_length() {
        let data = [0u8, 0, 0, 0, 0];
        let err = WarehouseCodec::decode(&data).unwrap_err();
        assert!(matches!(err, ProtocolError::FramingError(_)));
    }

    #[test]
    fn oversized_frame_rejected_before_buffering() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&u32::MAX.to_be_bytes());
        buf.extend_from_slice(&[1]);
        assert!(matches!(
            WarehouseCodec::decode_buf(&mut buf),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn mismatched_tag_rejected() {
        let mut encoded = WarehouseCodec::encode(&WarehouseMessage::DepositAll).unwrap();
        encoded[4] = WarehouseMessage::RequestSnapshot.type_tag();
        assert!(matches!(
            WarehouseCodec::decode(&encoded),
            Err(ProtocolError::InvalidMessageType(3))
        ));
    }

    #[test]
    fn garbage_payload_is_a_decode_failure() {
        let data = [0u8, 0, 0, 3, 5, 0xff, 0xff];
        assert!(matches!(
            WarehouseCodec::decode(&data),
            Err(ProtocolError::Deserialization(_))
        ));
    }

    #[test]
    fn decode_buf_handles_split_frames() {
        let first = WarehouseCodec::encode(&WarehouseMessage::RequestSnapshot).unwrap();
        let second = WarehouseCodec::encode(&WarehouseMessage::DepositFromSlot { slot: 4, count: 2 })
            .unwrap();
        let mut stream = first.clone();
        stream.extend_from_slice(&second);

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&stream[..3]);
        assert!(WarehouseCodec::decode_buf(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&stream[3..first.len() + 2]);
        assert_eq!(
            WarehouseCodec::decode_buf(&mut buf).unwrap(),
            Some(WarehouseMessage::RequestSnapshot)
        );
        assert!(WarehouseCodec::decode_buf(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&stream[first.len() + 2..]);
        assert_eq!(
            WarehouseCodec::decode_buf(&mut buf).unwrap(),
            Some(WarehouseMessage::DepositFromSlot { slot: 4, count: 2 })
        );
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn async_read_write() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let msg = WarehouseMessage::PushSnapshot { snapshot: snapshot() };
        let sent = msg.clone();
        let writer = tokio::spawn(async move {
            WarehouseCodec::write_message(&mut client, &sent).await.unwrap();
            WarehouseCodec::write_message(&mut client, &WarehouseMessage::DepositAll)
                .await
                .unwrap();
        });

        let mut buf = BytesMut::new();
        let first = WarehouseCodec::read_message(&mut server, &mut buf).await.unwrap();
        let second = WarehouseCodec::read_message(&mut server, &mut buf).await.unwrap();
        writer.await.unwrap();
        let end = WarehouseCodec::read_message(&mut server, &mut buf).await.unwrap();

        assert_eq!(first, Some(msg));
        assert_eq!(second, Some(WarehouseMessage::DepositAll));
        assert_eq!(end, None);
    }

    #[test]
    fn payload_roundtrip() {
        let msg = WarehouseMessage::Hello { version: 1, viewer: "steve".into() };
        let bytes = WarehouseCodec::encode_payload(&msg).unwrap();
        assert_eq!(WarehouseCodec::decode_payload(&bytes).unwrap(), msg);
    }
}
