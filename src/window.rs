//! Go-Back-N send-side window state.
//!
//! [`SendWindow`] maintains the sliding window of in-flight requests for one
//! session.
//!
//! # Protocol contract
//!
//! - At most `window` requests may be in flight at once (`window` ≤
//!   [`MAX_WINDOW`]).
//! - Acknowledgments are **cumulative**: `ack = K` means the receiver has
//!   accepted every sequence number strictly below `K`.
//! - Time is counted in ticks (one tick = one scheduling interval); the
//!   oldest in-flight request ages against [`last sent tick`](Slot) and a
//!   timeout arms a resend sweep covering `base..next` (go back to N).
//! - In-flight requests live in a ring of [`RING_CAPACITY`] slots indexed by
//!   `sequence % RING_CAPACITY`.  The capacity is twice the maximum window
//!   so a freshly assigned sequence can never alias a slot still occupied by
//!   an unacknowledged one.
//!
//! This module only manages state; all socket I/O and pacing is the caller's
//! responsibility (see [`crate::client`]).
//!
//! # Sequence-number layout
//!
//! ```text
//!     base               next
//!      │                  │
//!  ────┼──────────────────┼──────────────────▶ seq space
//!      │ <── in flight ──▶│ <── unassigned ─▶
//! ```

use crate::packet::Request;

/// Largest window size the protocol accepts.
pub const MAX_WINDOW: usize = 10;

/// Ring-buffer slots; must exceed [`MAX_WINDOW`] to prevent slot aliasing.
pub const RING_CAPACITY: usize = 2 * MAX_WINDOW;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// One ring slot: the last-sent copy of an in-flight request plus the tick
/// of its most recent transmission attempt.
#[derive(Debug, Clone, Default)]
struct Slot {
    request: Option<Request>,
    last_send_tick: u64,
}

// ---------------------------------------------------------------------------
// SendWindow
// ---------------------------------------------------------------------------

/// Sliding-window state for one session.
#[derive(Debug)]
pub struct SendWindow {
    /// Lowest unacknowledged sequence number (left window edge).
    base: u64,
    /// Next sequence number to assign to a new outgoing request.
    next: u64,
    /// Requests currently awaiting acknowledgment (`next - base`).
    in_flight: usize,
    /// Interval counter; advanced once per scheduling step.
    tick: u64,
    /// Resend cursor while a Go-Back-N sweep is underway (`None` = idle).
    sweep: Option<u64>,
    slots: Vec<Slot>,
}

impl Default for SendWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SendWindow {
    pub fn new() -> Self {
        Self {
            base: 0,
            next: 0,
            in_flight: 0,
            tick: 0,
            sweep: None,
            slots: vec![Slot::default(); RING_CAPACITY],
        }
    }

    /// Zero all window state, as done at session open and teardown.
    pub fn reset(&mut self) {
        self.base = 0;
        self.next = 0;
        self.in_flight = 0;
        self.tick = 0;
        self.sweep = None;
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
    }

    /// Lowest unacknowledged sequence number.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Sequence number the next new request will carry.
    pub fn next_seq(&self) -> u64 {
        self.next
    }

    /// Number of requests awaiting acknowledgment.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// `true` when a resend sweep is underway.
    pub fn sweep_active(&self) -> bool {
        self.sweep.is_some()
    }

    /// Advance the interval counter; returns the new tick.
    pub fn advance_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// `true` when there is room for one more in-flight request.
    pub fn has_room(&self, window: usize) -> bool {
        self.in_flight < window
    }

    /// Arm (or re-arm) the resend sweep when the oldest in-flight request has
    /// not been sent for `timeout_ticks` intervals.
    ///
    /// The cursor always restarts at `base`, even if a sweep was already
    /// underway.  Returns `true` when the sweep was (re)armed.
    pub fn start_sweep_if_due(&mut self, timeout_ticks: u64) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        let slot = &self.slots[ring_index(self.base)];
        if self.tick.saturating_sub(slot.last_send_tick) >= timeout_ticks {
            self.sweep = Some(self.base);
            return true;
        }
        false
    }

    /// Take the next request due for resending, advancing the sweep cursor.
    ///
    /// Stamps the slot with the current tick (the attempt counts even when
    /// the subsequent transmit fails; the request then ages back into the
    /// next sweep).  The sweep deactivates once the cursor reaches `next`.
    pub fn take_sweep_resend(&mut self) -> Option<&Request> {
        let pos = self.sweep?;
        debug_assert!(self.base <= pos && pos <= self.next);
        if pos >= self.next {
            self.sweep = None;
            return None;
        }
        let idx = ring_index(pos);
        self.slots[idx].last_send_tick = self.tick;
        self.sweep = if pos + 1 >= self.next {
            None
        } else {
            Some(pos + 1)
        };
        self.slots[idx].request.as_ref()
    }

    /// Place a new request into its ring slot and advance `next`.
    ///
    /// The caller must have transmitted (or attempted to transmit) the
    /// request and checked [`has_room`] first; the slot is stamped with the
    /// current tick.
    pub fn push(&mut self, request: Request) {
        debug_assert_eq!(request.sequence, self.next);
        let idx = ring_index(self.next);
        debug_assert!(
            self.slots[idx].request.is_none(),
            "ring slot aliasing at index {idx}"
        );
        self.slots[idx] = Slot {
            request: Some(request),
            last_send_tick: self.tick,
        };
        self.next += 1;
        self.in_flight += 1;
    }

    /// Process a cumulative acknowledgment.
    ///
    /// `ack` confirms every sequence number strictly below it.  Values
    /// outside `[base, next]` are stale or spurious and ignored.  Slides the
    /// window forward, clamps an active sweep cursor at the new `base`, and
    /// cancels the sweep entirely once nothing is left in flight.  Returns
    /// the number of requests newly confirmed.
    pub fn acknowledge(&mut self, ack: u64) -> usize {
        if ack < self.base || ack > self.next {
            return 0;
        }

        let mut confirmed = 0usize;
        while self.in_flight > 0 && self.base < ack {
            self.slots[ring_index(self.base)] = Slot::default();
            self.base += 1;
            self.in_flight -= 1;
            confirmed += 1;
        }

        if let Some(pos) = self.sweep {
            if self.base >= self.next {
                self.sweep = None;
            } else if pos < self.base {
                self.sweep = Some(self.base);
            }
        }
        confirmed
    }
}

#[inline]
fn ring_index(sequence: u64) -> usize {
    (sequence % RING_CAPACITY as u64) as usize
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Request;

    const TIMEOUT: u64 = 3;

    /// Helper: push one data request carrying the window's next sequence.
    fn push_next(w: &mut SendWindow) -> u64 {
        let seq = w.next_seq();
        w.push(Request::data(seq, vec![0u8; 4]));
        seq
    }

    #[test]
    fn initial_state() {
        let w = SendWindow::new();
        assert_eq!(w.base(), 0);
        assert_eq!(w.next_seq(), 0);
        assert_eq!(w.in_flight(), 0);
        assert!(w.has_room(1));
        assert!(!w.sweep_active());
    }

    #[test]
    fn push_advances_next_and_in_flight() {
        let mut w = SendWindow::new();
        w.advance_tick();
        push_next(&mut w);
        assert_eq!(w.next_seq(), 1);
        assert_eq!(w.base(), 0);
        assert_eq!(w.in_flight(), 1);
    }

    #[test]
    fn window_full_blocks_new_requests() {
        let mut w = SendWindow::new();
        w.advance_tick();
        for _ in 0..3 {
            push_next(&mut w);
        }
        assert!(!w.has_room(3));
        assert!(w.has_room(4));
    }

    #[test]
    fn cumulative_ack_slides_multiple() {
        let mut w = SendWindow::new();
        w.advance_tick();
        for _ in 0..3 {
            push_next(&mut w);
        }
        assert_eq!(w.acknowledge(3), 3);
        assert_eq!(w.base(), 3);
        assert_eq!(w.in_flight(), 0);
    }

    #[test]
    fn partial_ack_slides_partially() {
        let mut w = SendWindow::new();
        w.advance_tick();
        for _ in 0..3 {
            push_next(&mut w);
        }
        assert_eq!(w.acknowledge(2), 2);
        assert_eq!(w.base(), 2);
        assert_eq!(w.in_flight(), 1);
    }

    #[test]
    fn duplicate_ack_confirms_nothing() {
        let mut w = SendWindow::new();
        w.advance_tick();
        push_next(&mut w);
        assert_eq!(w.acknowledge(1), 1);
        assert_eq!(w.acknowledge(1), 0);
    }

    #[test]
    fn ack_beyond_next_is_ignored() {
        let mut w = SendWindow::new();
        w.advance_tick();
        push_next(&mut w);
        assert_eq!(w.acknowledge(1000), 0);
        assert_eq!(w.base(), 0);
        assert_eq!(w.in_flight(), 1);
    }

    #[test]
    fn timeout_arms_sweep_after_configured_age() {
        let mut w = SendWindow::new();
        w.advance_tick(); // tick 1
        push_next(&mut w);

        w.advance_tick(); // tick 2, age 1
        assert!(!w.start_sweep_if_due(TIMEOUT));
        w.advance_tick(); // tick 3, age 2
        assert!(!w.start_sweep_if_due(TIMEOUT));
        w.advance_tick(); // tick 4, age 3
        assert!(w.start_sweep_if_due(TIMEOUT));
        assert!(w.sweep_active());
    }

    #[test]
    fn sweep_yields_all_unacked_in_order_then_deactivates() {
        let mut w = SendWindow::new();
        w.advance_tick();
        for _ in 0..3 {
            push_next(&mut w);
        }
        for _ in 0..TIMEOUT {
            w.advance_tick();
        }
        assert!(w.start_sweep_if_due(TIMEOUT));

        let mut resent = Vec::new();
        while let Some(req) = w.take_sweep_resend() {
            resent.push(req.sequence);
        }
        assert_eq!(resent, vec![0, 1, 2]);
        assert!(!w.sweep_active());
    }

    #[test]
    fn one_resend_per_call_keeps_cursor_between_calls() {
        let mut w = SendWindow::new();
        w.advance_tick();
        push_next(&mut w);
        push_next(&mut w);
        for _ in 0..TIMEOUT {
            w.advance_tick();
        }
        assert!(w.start_sweep_if_due(TIMEOUT));

        assert_eq!(w.take_sweep_resend().map(|r| r.sequence), Some(0));
        assert!(w.sweep_active());
        assert_eq!(w.take_sweep_resend().map(|r| r.sequence), Some(1));
        assert!(!w.sweep_active());
        assert!(w.take_sweep_resend().is_none());
    }

    #[test]
    fn resend_refreshes_slot_age() {
        let mut w = SendWindow::new();
        w.advance_tick();
        push_next(&mut w);
        for _ in 0..TIMEOUT {
            w.advance_tick();
        }
        assert!(w.start_sweep_if_due(TIMEOUT));
        assert!(w.take_sweep_resend().is_some());

        // Freshly stamped: the very next tick must not re-trigger.
        w.advance_tick();
        assert!(!w.start_sweep_if_due(TIMEOUT));
    }

    #[test]
    fn ack_mid_sweep_clamps_cursor_at_base() {
        let mut w = SendWindow::new();
        w.advance_tick();
        for _ in 0..4 {
            push_next(&mut w);
        }
        for _ in 0..TIMEOUT {
            w.advance_tick();
        }
        assert!(w.start_sweep_if_due(TIMEOUT));

        // Ack slides base past the cursor; the sweep must resume at base.
        assert_eq!(w.acknowledge(2), 2);
        assert!(w.sweep_active());
        assert_eq!(w.take_sweep_resend().map(|r| r.sequence), Some(2));
    }

    #[test]
    fn ack_of_everything_cancels_sweep() {
        let mut w = SendWindow::new();
        w.advance_tick();
        for _ in 0..2 {
            push_next(&mut w);
        }
        for _ in 0..TIMEOUT {
            w.advance_tick();
        }
        assert!(w.start_sweep_if_due(TIMEOUT));
        assert_eq!(w.acknowledge(2), 2);
        assert!(!w.sweep_active());
        assert!(w.take_sweep_resend().is_none());
    }

    #[test]
    fn ring_indices_wrap_past_capacity() {
        let mut w = SendWindow::new();
        w.advance_tick();
        // Drive the window well past one full ring revolution.
        for _ in 0..(RING_CAPACITY as u64 + 5) {
            let seq = push_next(&mut w);
            assert_eq!(w.acknowledge(seq + 1), 1);
        }
        assert_eq!(w.base(), RING_CAPACITY as u64 + 5);
        assert_eq!(w.in_flight(), 0);
    }

    #[test]
    fn in_flight_never_exceeds_window_bound() {
        let mut w = SendWindow::new();
        w.advance_tick();
        for _ in 0..MAX_WINDOW {
            assert!(w.in_flight() <= MAX_WINDOW);
            if w.has_room(MAX_WINDOW) {
                push_next(&mut w);
            }
        }
        assert_eq!(w.in_flight(), MAX_WINDOW);
        assert!(!w.has_room(MAX_WINDOW));
    }

    #[test]
    fn reset_clears_everything() {
        let mut w = SendWindow::new();
        w.advance_tick();
        push_next(&mut w);
        for _ in 0..TIMEOUT {
            w.advance_tick();
        }
        w.start_sweep_if_due(TIMEOUT);

        w.reset();
        assert_eq!(w.base(), 0);
        assert_eq!(w.next_seq(), 0);
        assert_eq!(w.in_flight(), 0);
        assert!(!w.sweep_active());
    }
}
