//! ARQ send-side driver: the interval-paced Go-Back-N client.
//!
//! [`ArqClient`] owns one [`Endpoint`] and one [`SendWindow`] and exposes
//! three blocking operations — [`open`](ArqClient::open),
//! [`send_unit`](ArqClient::send_unit), [`close`](ArqClient::close) — that
//! all run the same internal tick function until a terminal condition.
//!
//! # The tick
//!
//! Each tick models exactly one [`TICK_INTERVAL`] of wall-clock time and
//! performs, in order:
//!
//! 1. Advance the interval counter.
//! 2. Arm the resend sweep when the oldest in-flight request has aged past
//!    [`TIMEOUT_TICKS`] intervals.
//! 3. Send **at most one** datagram: a sweep resend if one is due (resends
//!    have strict priority), otherwise the offered new request if the window
//!    has room.  A full window is reported as backpressure instead.
//! 4. Wait up to one interval for an answer; an in-range cumulative
//!    acknowledgment slides the window.
//! 5. Idle for whatever remains of the interval, so the send rate is one
//!    datagram per interval no matter how fast the loop spins.
//!
//! Transport failures inside a tick are absorbed ("this attempt did
//! nothing"): an unsent request simply ages into the next sweep.  Only an
//! explicit error answer or an exhausted time budget reaches the caller.

use std::time::Duration;

use tokio::time::{sleep_until, timeout, Instant};

use crate::endpoint::{Endpoint, SocketError};
use crate::packet::{Answer, AnswerKind, Request, MAX_PAYLOAD};
use crate::window::{SendWindow, MAX_WINDOW};

// ---------------------------------------------------------------------------
// Policy constants
// ---------------------------------------------------------------------------

/// Wall-clock length of one scheduling interval.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Intervals without an acknowledgment before the oldest in-flight request
/// triggers a Go-Back-N resend sweep.
pub const TIMEOUT_TICKS: u64 = 3;

/// Time budget for the session-open handshake (≈ 50 ticks).
pub const OPEN_BUDGET: Duration = Duration::from_secs(5);

/// Time budget for one data or close exchange (≈ 20 000 ticks).  Hitting it
/// means the transport has stalled outright; per-packet recovery is already
/// handled inside each tick, so this is a last-resort guard, not a timeout.
pub const TRANSFER_BUDGET: Duration = Duration::from_secs(2000);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failures surfaced by the client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport setup failed: {0}")]
    Transport(#[from] SocketError),
    /// The server answered with a terminal error.
    #[error("server rejected the request (error code {0})")]
    Rejected(u64),
    /// No session acknowledgment arrived within the open budget.
    #[error("session open timed out")]
    OpenTimedOut,
    /// A data exchange exhausted its time budget.
    #[error("transfer stalled waiting for acknowledgment of sequence {0}")]
    Stalled(u64),
}

// ---------------------------------------------------------------------------
// ArqClient
// ---------------------------------------------------------------------------

/// What one tick observed, for the operation loop driving it.
#[derive(Debug, Default)]
struct TickReport {
    /// The offered request could not be placed because the window is full.
    window_full: bool,
    /// Answer received during this interval, if any.
    answer: Option<Answer>,
}

/// Send-side session driver.
#[derive(Debug)]
pub struct ArqClient {
    endpoint: Endpoint,
    window: SendWindow,
    open_budget: Duration,
    transfer_budget: Duration,
}

impl ArqClient {
    /// Resolve the server address (loopback when `host` is `None`) and set up
    /// a session driver talking to it.
    pub async fn connect(host: Option<&str>, port: u16) -> Result<Self, ClientError> {
        let endpoint = Endpoint::connect(host, port).await?;
        Ok(Self {
            endpoint,
            window: SendWindow::new(),
            open_budget: OPEN_BUDGET,
            transfer_budget: TRANSFER_BUDGET,
        })
    }

    /// Override the default time budgets (used by tests to provoke the
    /// exhaustion paths without waiting out the production values).
    pub fn with_budgets(mut self, open: Duration, transfer: Duration) -> Self {
        self.open_budget = open;
        self.transfer_budget = transfer;
        self
    }

    /// Open a session: offer a Hello at sequence 0, then wait/retransmit
    /// until the server confirms it.
    ///
    /// Succeeds on any Hello/Ok answer; fails on an explicit error answer or
    /// when the open budget lapses without one.
    pub async fn open(&mut self, window: usize) -> Result<(), ClientError> {
        self.window.reset();
        let mut offer = Some(Request::hello());
        let deadline = Instant::now() + self.open_budget;

        while Instant::now() < deadline {
            let report = self.tick(&mut offer, window).await;
            if let Some(answer) = report.answer {
                match answer.kind {
                    AnswerKind::Hello | AnswerKind::Ok => {
                        log::debug!("[arq] session open, next={}", answer.seq_field);
                        return Ok(());
                    }
                    AnswerKind::Err => return Err(ClientError::Rejected(answer.seq_field)),
                    AnswerKind::Warn => {}
                }
            }
        }
        Err(ClientError::OpenTimedOut)
    }

    /// Reliably transfer one payload unit (at most [`MAX_PAYLOAD`] bytes;
    /// longer input is truncated — split units at the caller).
    ///
    /// Blocks until the cumulative acknowledgment covers this unit's
    /// sequence number.  A Warn answer (e.g. a failing sink on the far side)
    /// keeps the unit in flight; an Err answer fails the transfer; budget
    /// exhaustion fails it as a transport stall.
    pub async fn send_unit(&mut self, payload: &[u8], window: usize) -> Result<(), ClientError> {
        let unit = &payload[..payload.len().min(MAX_PAYLOAD)];
        let sequence = self.window.next_seq();
        let mut offer = Some(Request::data(sequence, unit.to_vec()));
        let deadline = Instant::now() + self.transfer_budget;

        while Instant::now() < deadline {
            let report = self.tick(&mut offer, window).await;
            if report.window_full {
                continue;
            }
            if let Some(answer) = report.answer {
                match answer.kind {
                    AnswerKind::Err => return Err(ClientError::Rejected(answer.seq_field)),
                    // Delivered once the cumulative ack moves past our sequence.
                    AnswerKind::Ok if answer.seq_field >= sequence + 1 => return Ok(()),
                    // Warn, or an older cumulative ack: keep driving the window.
                    _ => {}
                }
            }
        }
        Err(ClientError::Stalled(sequence))
    }

    /// Close the session: offer a Close at the next sequence number and wait
    /// for it to be confirmed.
    ///
    /// A close needs its own sequence number confirmed (`seq_field ≥`
    /// sequence); nothing beyond it is ever implied.  When the budget lapses
    /// the close is still treated as a success-with-warning: every data unit
    /// was already confirmed before close was attempted, only the farewell
    /// handshake went unanswered.
    pub async fn close(&mut self, window: usize) -> Result<(), ClientError> {
        let sequence = self.window.next_seq();
        let mut offer = Some(Request::close(sequence));
        let deadline = Instant::now() + self.transfer_budget;

        while Instant::now() < deadline {
            let report = self.tick(&mut offer, window).await;
            if report.window_full {
                continue;
            }
            if let Some(answer) = report.answer {
                match answer.kind {
                    AnswerKind::Err => return Err(ClientError::Rejected(answer.seq_field)),
                    AnswerKind::Ok | AnswerKind::Hello if answer.seq_field >= sequence => {
                        log::debug!("[arq] session closed");
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }
        log::warn!("[arq] close not acknowledged; giving up with the data already confirmed");
        Ok(())
    }

    /// Number of requests currently awaiting acknowledgment.
    pub fn in_flight(&self) -> usize {
        self.window.in_flight()
    }

    // -----------------------------------------------------------------------
    // The tick
    // -----------------------------------------------------------------------

    /// Run one scheduling interval.  `offer` is taken only when the request
    /// is actually placed into the window, so an untaken offer is re-offered
    /// by the caller's next tick while a placed one can never be re-enqueued.
    async fn tick(&mut self, offer: &mut Option<Request>, window: usize) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport::default();
        let window = window.clamp(1, MAX_WINDOW);

        let tick = self.window.advance_tick();

        if self.window.start_sweep_if_due(TIMEOUT_TICKS) {
            log::debug!(
                "[arq] tick {tick}: ack timeout, resending from seq {}",
                self.window.base()
            );
        }

        // At most one datagram leaves per interval; resends take priority
        // over new data.
        if let Some(resend) = self.window.take_sweep_resend() {
            log::debug!("[arq] ↻ {:?} seq={}", resend.kind, resend.sequence);
            if let Err(e) = self.endpoint.send_request(resend).await {
                // Picked up again by the next sweep once the slot ages out.
                log::debug!("[arq] resend failed: {e}");
            }
        } else if offer.is_some() {
            if !self.window.has_room(window) {
                report.window_full = true;
            } else if let Some(request) = offer.take() {
                log::debug!(
                    "[arq] → {:?} seq={} len={}",
                    request.kind,
                    request.sequence,
                    request.payload.len()
                );
                if let Err(e) = self.endpoint.send_request(&request).await {
                    log::debug!("[arq] send failed: {e}");
                }
                self.window.push(request);
            }
        }

        // Wait up to one interval for an answer; whatever fails to arrive or
        // decode counts as silence.
        match timeout(TICK_INTERVAL, self.endpoint.recv_answer()).await {
            Ok(Ok(answer)) => {
                if matches!(answer.kind, AnswerKind::Ok | AnswerKind::Hello) {
                    let confirmed = self.window.acknowledge(answer.seq_field);
                    if confirmed > 0 {
                        log::debug!(
                            "[arq] ← ACK next={} (window slid {confirmed})",
                            answer.seq_field
                        );
                    }
                }
                report.answer = Some(answer);
            }
            Ok(Err(e)) => log::debug!("[arq] receive failed: {e}"),
            Err(_elapsed) => {}
        }

        // Top up the interval so no more than one send decision happens per
        // TICK_INTERVAL of wall-clock time.
        sleep_until(started + TICK_INTERVAL).await;
        report
    }
}
