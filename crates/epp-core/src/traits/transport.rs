// # Transport Trait
//
// Defines the interface between the EPP client and the byte stream that
// carries framed EPP documents.
//
// ## Implementations
//
// - `FramedStream<S>` over any tokio byte stream (`crate::transport`)
// - TLS: `FramedStream<TlsStream<TcpStream>>` from `connect_tls`
// - Tests: `FramedStream<DuplexStream>` talking to an in-process registry
//
// ## Usage
//
// ```rust,ignore
// use epp_core::Transport;
//
// transport.send(xml.as_bytes()).await?;
// let reply = transport.receive().await?;
// ```

use async_trait::async_trait;

/// Framed EPP message transport
///
/// One document per frame in each direction. The EPP session allows exactly
/// one outstanding command, so `send` is always followed by `receive`.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O on its own socket
/// - ✅ Enforce framing and per-operation timeouts
///
/// ## Forbidden Capabilities
/// - ❌ Retry, reconnect or re-send (owned by the caller)
/// - ❌ Interpret EPP documents (owned by `ResponseDecoder`)
/// - ❌ Track authentication state (owned by `EppClient`)
///
/// Any error returned by a transport leaves it unusable.
#[async_trait]
pub trait Transport: Send {
    /// Send one document, prepending the length header
    async fn send(&mut self, payload: &[u8]) -> Result<(), crate::Error>;

    /// Receive exactly one document, without its length header
    async fn receive(&mut self) -> Result<Vec<u8>, crate::Error>;

    /// Shut the stream down
    async fn close(&mut self) -> Result<(), crate::Error>;
}
