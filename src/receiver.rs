//! ARQ receive-side state machine.
//!
//! [`ArqReceiver`] implements the receiver half of the protocol:
//!
//! - Only **in-order** data requests are delivered to the sink
//!   (`sequence == next_expected`).
//! - Duplicate or out-of-order data is answered with a **cumulative**
//!   re-acknowledgment and never touches the sink, which is what drives the
//!   sender's window back into convergence.
//! - The only state carried between requests is the `next_expected` counter:
//!   1 after a session start, incremented per accepted unit, 0 after a close.
//!
//! The transform is pure given that counter; it must be invoked exactly once
//! per request that survives loss simulation.  Socket I/O and loss injection
//! live in [`crate::server`].

use crate::packet::{Answer, ErrorCode, Request, RequestKind};
use crate::sink::TransferSink;

/// Receive-side session state.
#[derive(Debug, Default)]
pub struct ArqReceiver {
    next_expected: u64,
}

impl ArqReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative next-expected sequence number.
    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    /// Consume one inbound request and produce the answer to send back.
    pub fn process(&mut self, request: &Request, sink: &mut dyn TransferSink) -> Answer {
        match request.kind {
            RequestKind::Hello => {
                // A sink that cannot start gets the session rejected rather
                // than silently accepted; the client sees a terminal error.
                if let Err(e) = sink.begin() {
                    log::error!("[server] sink refused to start a transfer: {e}");
                    return Answer::err(ErrorCode::Internal);
                }
                self.next_expected = 1;
                log::info!("[server] transfer started");
                Answer::hello(self.next_expected)
            }
            RequestKind::Data => {
                if request.sequence == self.next_expected {
                    if let Err(e) = sink.write(&request.payload) {
                        // Not delivered: answer a warning and leave the
                        // counter alone so the retransmit redelivers it.
                        log::warn!(
                            "[server] sink write failed for seq {}: {e}",
                            request.sequence
                        );
                        return Answer::warn(ErrorCode::SinkError);
                    }
                    self.next_expected += 1;
                    log::debug!(
                        "[server] ← DATA seq={} len={} accepted; → OK next={}",
                        request.sequence,
                        request.payload.len(),
                        self.next_expected
                    );
                } else {
                    log::debug!(
                        "[server] ← DATA seq={} ignored (expecting {next}); → OK next={next}",
                        request.sequence,
                        next = self.next_expected
                    );
                }
                Answer::ok(self.next_expected)
            }
            RequestKind::Close => {
                sink.end();
                let answer = Answer::ok(self.next_expected);
                log::info!(
                    "[server] transfer finished ({} data packets)",
                    self.next_expected.saturating_sub(1)
                );
                self.next_expected = 0;
                answer
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
