use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use super::protocol::sequence_greater_than;

const MIN_RESEND: Duration = Duration::from_millis(50);
const MAX_RESEND: Duration = Duration::from_millis(1000);
const ACK_WINDOW: u32 = 32;

#[derive(Debug, Clone)]
pub struct PendingReliable {
    pub sequence: u32,
    pub payload: Vec<u8>,
    pub first_sent: Instant,
    pub last_sent: Instant,
    pub resends: u32,
}

/// Outgoing half of a reliable channel: numbers payloads, keeps them until
/// acknowledged and tracks smoothed round-trip time.
#[derive(Debug)]
pub struct ReliableSender {
    pending: VecDeque<PendingReliable>,
    next_sequence: u32,
    srtt: f32,
    rtt_var: f32,
}

impl Default for ReliableSender {
    fn default() -> Self {
        Self::new()
    }
}

impl ReliableSender {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            next_sequence: 0,
            srtt: 100.0,
            rtt_var: 50.0,
        }
    }

    /// Queues a payload and returns the sequence it must be sent with.
    pub fn push(&mut self, payload: Vec<u8>, now: Instant) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        self.pending.push_back(PendingReliable {
            sequence,
            payload,
            first_sent: now,
            last_sent: now,
            resends: 0,
        });
        sequence
    }

    /// Drops every pending payload below `next_expected` or covered by
    /// `ack`/`ack_bitfield` and returns their sequences.
    pub fn process_ack(
        &mut self,
        next_expected: u32,
        ack: u32,
        ack_bitfield: u32,
        now: Instant,
    ) -> Vec<u32> {
        let mut acked = Vec::new();
        let mut rtt_samples = Vec::new();

        self.pending.retain(|pending| {
            let is_acked = if sequence_greater_than(next_expected, pending.sequence)
                || pending.sequence == ack
            {
                true
            } else if sequence_greater_than(ack, pending.sequence) {
                let diff = ack.wrapping_sub(pending.sequence);
                diff <= ACK_WINDOW && (ack_bitfield & (1 << (diff - 1))) != 0
            } else {
                false
            };

            if is_acked {
                acked.push(pending.sequence);
                // Karn: only unambiguous samples feed the estimate.
                if pending.resends == 0 {
                    rtt_samples.push(
                        now.saturating_duration_since(pending.first_sent)
                            .as_secs_f32()
                            * 1000.0,
                    );
                }
            }
            !is_acked
        });

        for rtt in rtt_samples {
            self.update_rtt(rtt);
        }

        acked
    }

    fn update_rtt(&mut self, rtt: f32) {
        const ALPHA: f32 = 0.125;
        const BETA: f32 = 0.25;

        let diff = (rtt - self.srtt).abs();
        self.rtt_var = (1.0 - BETA) * self.rtt_var + BETA * diff;
        self.srtt = (1.0 - ALPHA) * self.srtt + ALPHA * rtt;
    }

    pub fn resend_timeout(&self) -> Duration {
        let ms = (self.srtt + 4.0 * self.rtt_var).max(0.0);
        Duration::from_secs_f32(ms / 1000.0).clamp(MIN_RESEND, MAX_RESEND)
    }

    /// Payloads whose resend timer expired; their timers restart at `now`.
    pub fn due_resends(&mut self, now: Instant) -> Vec<(u32, Vec<u8>)> {
        let timeout = self.resend_timeout();
        let mut due = Vec::new();

        for pending in &mut self.pending {
            if now.saturating_duration_since(pending.last_sent) >= timeout {
                pending.last_sent = now;
                pending.resends += 1;
                due.push((pending.sequence, pending.payload.clone()));
            }
        }
        due
    }

    pub fn srtt(&self) -> f32 {
        self.srtt
    }

    pub fn rtt_var(&self) -> f32 {
        self.rtt_var
    }

    pub fn unacked_count(&self) -> usize {
        self.pending.len()
    }
}

/// What a receiver reports back. Everything below `next_expected` has been
/// delivered; `ack`/`ack_bitfield` additionally cover held early arrivals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckData {
    pub next_expected: u32,
    pub ack: u32,
    pub ack_bitfield: u32,
}

/// Incoming half of a reliable channel: suppresses duplicates, holds early
/// arrivals and releases payloads strictly in sequence order.
#[derive(Debug, Default)]
pub struct ReliableReceiver {
    next_expected: u32,
    held: BTreeMap<u32, Vec<u8>>,
    last_received: Option<u32>,
    received_bitfield: u32,
}

impl ReliableReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payloads now deliverable, oldest first. Duplicates and
    /// stale sequences yield nothing but are still acknowledged.
    pub fn receive(&mut self, sequence: u32, payload: Vec<u8>) -> Vec<Vec<u8>> {
        self.record_ack(sequence);

        if sequence != self.next_expected && !sequence_greater_than(sequence, self.next_expected)
        {
            return Vec::new();
        }
        self.held.entry(sequence).or_insert(payload);

        let mut ready = Vec::new();
        while let Some(payload) = self.held.remove(&self.next_expected) {
            ready.push(payload);
            self.next_expected = self.next_expected.wrapping_add(1);
        }
        ready
    }

    fn record_ack(&mut self, sequence: u32) {
        let Some(last) = self.last_received else {
            self.last_received = Some(sequence);
            return;
        };

        if sequence_greater_than(sequence, last) {
            let diff = sequence.wrapping_sub(last);
            self.received_bitfield = if diff <= ACK_WINDOW {
                self.received_bitfield.checked_shl(diff).unwrap_or(0) | (1 << (diff - 1))
            } else {
                0
            };
            self.last_received = Some(sequence);
        } else {
            let diff = last.wrapping_sub(sequence);
            if diff > 0 && diff <= ACK_WINDOW {
                self.received_bitfield |= 1 << (diff - 1);
            }
        }
    }

    /// `None` until the first reliable datagram arrives.
    pub fn ack_data(&self) -> Option<AckData> {
        self.last_received.map(|last| AckData {
            next_expected: self.next_expected,
            ack: last,
            ack_bitfield: self.received_bitfield,
        })
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}
