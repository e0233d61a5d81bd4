//! Wire framing shared by every transport.

use bytes::{BufMut, Bytes, BytesMut};
use gpscot_core::TransportError;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// Marker written before every event
pub const FRAME_MARKER: [u8; 3] = [0xBF, 0x00, 0xBF];

/// Frames an encoded event: marker followed by the UTF-8 XML, no length
/// prefix and no trailer.
pub fn frame_event(event: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_MARKER.len() + event.len());
    buf.put_slice(&FRAME_MARKER);
    buf.put_slice(event.as_bytes());
    buf.freeze()
}

/// Writes and flushes a frame on a stream within `write_timeout`.
pub(crate) async fn write_frame<S>(
    stream: &mut S,
    frame: &[u8],
    write_timeout: Duration,
    transport: &'static str,
) -> Result<(), TransportError>
where
    S: AsyncWrite + Unpin,
{
    let write = async {
        stream.write_all(frame).await?;
        stream.flush().await
    };

    timeout(write_timeout, write)
        .await
        .map_err(|_| TransportError::SendTimeout {
            transport,
            timeout_ms: write_timeout.as_millis() as u64,
        })?
        .map_err(|e| TransportError::send_failed(transport, e))
}
