//! ARQ server: receive loop around the [`ArqReceiver`] transform.
//!
//! The [`Server`] owns the bound [`Endpoint`], the per-session receiver
//! state, and two independent [`LossSimulator`]s — one filtering inbound
//! requests before they are inspected, one filtering outbound answers before
//! transmission.  Awaiting the socket is the loop's only suspension point;
//! there is no polling and no pacing on this side.
//!
//! The loop never terminates on its own: after a close the next Hello starts
//! a fresh transfer into the same sink.

use std::net::SocketAddr;

use crate::endpoint::{Endpoint, SocketError};
use crate::packet::{Answer, ErrorCode, PacketError, Request};
use crate::receiver::ArqReceiver;
use crate::simulator::LossSimulator;
use crate::sink::TransferSink;

/// One listening ARQ server instance.
#[derive(Debug)]
pub struct Server {
    endpoint: Endpoint,
    receiver: ArqReceiver,
    request_loss: LossSimulator,
    answer_loss: LossSimulator,
}

impl Server {
    /// Bind to `addr` with the given loss filters.
    pub async fn bind(
        addr: SocketAddr,
        request_loss: LossSimulator,
        answer_loss: LossSimulator,
    ) -> Result<Self, SocketError> {
        let endpoint = Endpoint::bind(addr).await?;
        log::info!("[server] listening on {}", endpoint.local_addr());
        Ok(Self {
            endpoint,
            receiver: ArqReceiver::new(),
            request_loss,
            answer_loss,
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    /// Serve forever.  Returns only on a transport error.
    pub async fn run(&mut self, sink: &mut dyn TransferSink) -> Result<(), SocketError> {
        loop {
            self.serve_one(sink).await?;
        }
    }

    /// Handle exactly one inbound datagram: loss-filter it, decode it, run
    /// the receiver transform, loss-filter the answer, send it.
    pub async fn serve_one(&mut self, sink: &mut dyn TransferSink) -> Result<(), SocketError> {
        let datagram = self.endpoint.recv_datagram().await?;

        // Simulated request loss happens before the datagram is inspected.
        if self.request_loss.should_drop() {
            log::debug!("[server] ✗ dropped inbound request ({} bytes)", datagram.len());
            return Ok(());
        }

        let answer = match Request::decode(&datagram) {
            Ok(request) => self.receiver.process(&request, sink),
            Err(PacketError::UnknownKind(kind)) => {
                log::warn!("[server] illegal request kind {kind:#04x}");
                Answer::err(ErrorCode::IllegalRequest)
            }
            Err(e) => {
                // Not even a recognisable request: nothing to answer.
                log::warn!("[server] undecodable datagram: {e}");
                return Ok(());
            }
        };

        if self.answer_loss.should_drop() {
            log::debug!("[server] ✗ dropped {:?} answer", answer.kind);
            return Ok(());
        }
        self.endpoint.send_answer(&answer).await
    }
}
