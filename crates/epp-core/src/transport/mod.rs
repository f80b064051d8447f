//! Length-prefixed framing for EPP over a byte stream
//!
//! Every EPP document travels as one frame: a 4-byte big-endian unsigned
//! length that counts the header itself, followed by the document bytes.
//! [`FramedStream`] adds this framing to any tokio byte stream and bounds
//! every read and write with the configured timeout.

mod tls;

pub use tls::{build_client_config, connect_tls};

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::traits::Transport;

/// Size of the frame length header
pub const HEADER_LEN: usize = 4;

/// Largest frame accepted from the registry, header included
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Encode one document as a frame (header followed by payload)
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, crate::Error> {
    let total = payload.len() + HEADER_LEN;
    let total = u32::try_from(total)
        .map_err(|_| crate::Error::transport(format!("Frame too large: {} bytes", total)))?;

    let mut frame = Vec::with_capacity(total as usize);
    frame.extend_from_slice(&total.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Validate a received length header and return the payload length
fn payload_len(header: [u8; HEADER_LEN]) -> Result<usize, crate::Error> {
    let total = u32::from_be_bytes(header) as usize;
    if total < HEADER_LEN {
        return Err(crate::Error::transport(format!(
            "Invalid frame length {}: shorter than its header",
            total
        )));
    }
    if total > MAX_FRAME_SIZE {
        return Err(crate::Error::transport(format!(
            "Frame length {} exceeds maximum {}",
            total, MAX_FRAME_SIZE
        )));
    }
    Ok(total - HEADER_LEN)
}

/// EPP framing over an arbitrary byte stream
pub struct FramedStream<S> {
    stream: S,
    io_timeout: Duration,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a connected stream
    pub fn new(stream: S, io_timeout: Duration) -> Self {
        Self { stream, io_timeout }
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }

    async fn write_frame(&mut self, payload: &[u8]) -> Result<(), crate::Error> {
        let frame = encode_frame(payload)?;
        let write = async {
            self.stream.write_all(&frame).await?;
            self.stream.flush().await
        };

        timeout(self.io_timeout, write)
            .await
            .map_err(|_| {
                crate::Error::transport(format!("Write timed out after {:?}", self.io_timeout))
            })?
            .map_err(|e| crate::Error::transport(format!("Write failed: {}", e)))
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>, crate::Error> {
        let read = async {
            let mut header = [0u8; HEADER_LEN];
            self.stream
                .read_exact(&mut header)
                .await
                .map_err(|e| {
                    crate::Error::transport(format!("Failed to read frame header: {}", e))
                })?;

            let len = payload_len(header)?;
            let mut payload = vec![0u8; len];
            self.stream
                .read_exact(&mut payload)
                .await
                .map_err(|e| {
                    crate::Error::transport(format!(
                        "Short frame: expected {} payload bytes: {}",
                        len, e
                    ))
                })?;
            Ok(payload)
        };

        timeout(self.io_timeout, read).await.map_err(|_| {
            crate::Error::transport(format!("Read timed out after {:?}", self.io_timeout))
        })?
    }
}

#[async_trait]
impl<S> Transport for FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, payload: &[u8]) -> Result<(), crate::Error> {
        self.write_frame(payload).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>, crate::Error> {
        self.read_frame().await
    }

    async fn close(&mut self) -> Result<(), crate::Error> {
        timeout(self.io_timeout, self.stream.shutdown())
            .await
            .map_err(|_| crate::Error::transport("Shutdown timed out"))?
            .map_err(|e| crate::Error::transport(format!("Shutdown failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn frame_header_counts_itself() {
        let frame = encode_frame(b"<epp/>").unwrap();
        assert_eq!(&frame[..4], &[0, 0, 0, 10]);
        assert_eq!(&frame[4..], b"<epp/>");
    }

    #[tokio::test]
    async fn send_writes_header_then_payload() {
        let mock = tokio_test::io::Builder::new()
            .write(&[0, 0, 0, 9, b'h', b'e', b'l', b'l', b'o'])
            .build();
        let mut framed = FramedStream::new(mock, TIMEOUT);
        framed.send(b"hello").await.unwrap();
    }

    #[tokio::test]
    async fn receive_reads_split_frames() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0, 0])
            .read(&[0, 7, b'a'])
            .read(b"bc")
            .build();
        let mut framed = FramedStream::new(mock, TIMEOUT);
        assert_eq!(framed.receive().await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn header_only_frame_is_empty_document() {
        let mock = tokio_test::io::Builder::new().read(&[0, 0, 0, 4]).build();
        let mut framed = FramedStream::new(mock, TIMEOUT);
        assert!(framed.receive().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn length_below_header_is_rejected() {
        let mock = tokio_test::io::Builder::new().read(&[0, 0, 0, 3]).build();
        let mut framed = FramedStream::new(mock, TIMEOUT);
        let err = framed.receive().await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0x7f, 0xff, 0xff, 0xff])
            .build();
        let mut framed = FramedStream::new(mock, TIMEOUT);
        let err = framed.receive().await.unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[tokio::test]
    async fn truncated_payload_is_transport_error() {
        let mock = tokio_test::io::Builder::new()
            .read(&[0, 0, 0, 20, b'x', b'y'])
            .build();
        let mut framed = FramedStream::new(mock, TIMEOUT);
        let err = framed.receive().await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("Short frame"));
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let mut framed = FramedStream::new(client, Duration::from_millis(50));
        let err = framed.receive().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
