//! Async UDP transport endpoint.
//!
//! [`Endpoint`] is a thin wrapper around `tokio::net::UdpSocket` that speaks
//! [`Request`] and [`Answer`] instead of raw bytes.  A client endpoint pins
//! its peer address once at connection setup; a server endpoint discovers the
//! peer from the most recently received datagram and replies there.  All
//! protocol logic lives elsewhere; this module owns only byte I/O and
//! addressing.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};

use crate::packet::{Answer, PacketError, Request, MAX_PAYLOAD, REQUEST_HEADER_LEN};

/// Largest datagram either side ever sends.
const MAX_DATAGRAM: usize = REQUEST_HEADER_LEN + MAX_PAYLOAD;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise from endpoint operations.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The received datagram could not be decoded.
    #[error("datagram decode error: {0}")]
    Packet(#[from] PacketError),
    /// `host` did not resolve to any usable address.
    #[error("could not resolve '{0}'")]
    Unresolvable(String),
    /// A send was attempted before any peer address was known.
    #[error("no peer address known")]
    NoPeer,
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A packet-oriented UDP endpoint for one side of a session.
#[derive(Debug)]
pub struct Endpoint {
    /// Address this endpoint is bound to (resolved after the OS assigns an
    /// ephemeral port).
    local_addr: SocketAddr,
    socket: UdpSocket,
    /// Where outbound datagrams go: pinned at setup on the client, updated
    /// from the latest inbound datagram on the server.
    peer: Option<SocketAddr>,
}

impl Endpoint {
    /// Bind a server-side endpoint to `local_addr`.
    ///
    /// Passing port 0 lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let socket = UdpSocket::bind(local_addr).await?;
        let local_addr = socket.local_addr()?;
        Ok(Self {
            local_addr,
            socket,
            peer: None,
        })
    }

    /// Create a client-side endpoint with its peer pinned to `host:port`.
    ///
    /// `host` defaults to the IPv6 loopback address when not given.  The
    /// local socket is bound to an unspecified address of the peer's family.
    pub async fn connect(host: Option<&str>, port: u16) -> Result<Self, SocketError> {
        let peer = match host {
            Some(name) => lookup_host((name, port))
                .await?
                .next()
                .ok_or_else(|| SocketError::Unresolvable(name.to_string()))?,
            None => SocketAddr::from((Ipv6Addr::LOCALHOST, port)),
        };
        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let mut endpoint = Self::bind(local).await?;
        endpoint.peer = Some(peer);
        log::debug!("[arq] {} → peer {}", endpoint.local_addr, peer);
        Ok(endpoint)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Encode `request` and send it to the pinned peer.
    pub async fn send_request(&self, request: &Request) -> Result<(), SocketError> {
        let peer = self.peer.ok_or(SocketError::NoPeer)?;
        self.socket.send_to(&request.encode(), peer).await?;
        Ok(())
    }

    /// Receive the next datagram and decode it as an [`Answer`].
    pub async fn recv_answer(&self) -> Result<Answer, SocketError> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let (n, _from) = self.socket.recv_from(&mut buf).await?;
        Ok(Answer::decode(&buf[..n])?)
    }

    /// Receive the next raw datagram, remembering its sender as the peer for
    /// subsequent [`send_answer`](Self::send_answer) calls.
    pub async fn recv_datagram(&mut self) -> Result<Vec<u8>, SocketError> {
        let mut buf = [0u8; MAX_DATAGRAM];
        let (n, from) = self.socket.recv_from(&mut buf).await?;
        self.peer = Some(from);
        Ok(buf[..n].to_vec())
    }

    /// Encode `answer` and send it to the most recently seen peer.
    pub async fn send_answer(&self, answer: &Answer) -> Result<(), SocketError> {
        let peer = self.peer.ok_or(SocketError::NoPeer)?;
        self.socket.send_to(&answer.encode(), peer).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{AnswerKind, RequestKind};

    async fn ephemeral() -> Endpoint {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        Endpoint::bind(addr).await.expect("bind failed")
    }

    #[tokio::test]
    async fn request_then_reply_roundtrip() {
        let mut server = ephemeral().await;
        let server_addr = server.local_addr();

        let client = Endpoint::connect(Some("127.0.0.1"), server_addr.port())
            .await
            .expect("connect failed");

        client
            .send_request(&Request::data(3, b"payload".to_vec()))
            .await
            .expect("send failed");

        let datagram = server.recv_datagram().await.expect("recv failed");
        let request = Request::decode(&datagram).expect("decode failed");
        assert_eq!(request.kind, RequestKind::Data);
        assert_eq!(request.sequence, 3);
        assert_eq!(request.payload, b"payload");

        // The server learned the client's address from the datagram.
        server
            .send_answer(&Answer::ok(4))
            .await
            .expect("answer failed");
        let answer = client.recv_answer().await.expect("recv answer failed");
        assert_eq!(answer.kind, AnswerKind::Ok);
        assert_eq!(answer.seq_field, 4);
    }

    #[tokio::test]
    async fn answer_without_peer_is_rejected() {
        let server = ephemeral().await;
        let err = server.send_answer(&Answer::ok(1)).await.unwrap_err();
        assert!(matches!(err, SocketError::NoPeer));
    }
}
