// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory hub used by the unit tests.
//!
//! Packets are queued as (channel, cargo). Reads behave like the hub over
//! I2C: every transaction starts with a header describing the cargo still
//! pending, followed by as many cargo bytes as the transaction asks for.

use super::delay::DelayMs;
use super::SensorInterface;
use crate::constants::{CONTINUATION_BIT, PACKET_HEADER_LENGTH};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockError;

pub(crate) type Responder = Box<dyn FnMut(&[u8]) -> Vec<(u8, Vec<u8>)>>;

/// Packet partially handed out to the host
pub(crate) struct Pending {
    pub(crate) channel: u8,
    pub(crate) sequence: u8,
    pub(crate) cargo: Vec<u8>,
    pub(crate) offset: usize,
}

pub struct MockInterface {
    pub(crate) queue: VecDeque<(u8, Vec<u8>)>,
    pub(crate) pending: Option<Pending>,
    pub(crate) hub_sequence: u8,
    pub(crate) responder: Option<Responder>,
    pub written: Vec<Vec<u8>>,
    pub read_limit: usize,
    pub reads: usize,
    pub always_ready: bool,
    pub fail_writes: bool,
    /// Read transactions past this count fail
    pub fail_reads_after: Option<usize>,
    pub soft_reset: bool,
}

impl Default for MockInterface {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            pending: None,
            hub_sequence: 0,
            responder: None,
            written: Vec::new(),
            read_limit: 32,
            reads: 0,
            always_ready: false,
            fail_writes: false,
            fail_reads_after: None,
            soft_reset: false,
        }
    }
}

impl MockInterface {
    pub fn with_read_limit(read_limit: usize) -> Self {
        Self {
            read_limit,
            ..Default::default()
        }
    }

    pub fn push(&mut self, channel: u8, cargo: &[u8]) {
        self.queue.push_back((channel, cargo.to_vec()));
    }

    /// Install a hook that queues the hub's replies to every written packet
    pub fn respond_with(&mut self, responder: impl FnMut(&[u8]) -> Vec<(u8, Vec<u8>)> + 'static) {
        self.responder = Some(Box::new(responder));
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_none() && self.queue.is_empty()
    }
}

impl SensorInterface for MockInterface {
    type SensorError = MockError;

    fn setup(&mut self, _delay_source: &mut impl DelayMs) -> Result<(), MockError> {
        Ok(())
    }

    fn requires_soft_reset(&self) -> bool {
        self.soft_reset
    }

    fn data_ready(&mut self) -> bool {
        self.always_ready || !self.is_drained()
    }

    fn max_read_len(&self) -> usize {
        self.read_limit
    }

    fn write_packet(&mut self, packet: &[u8]) -> Result<(), MockError> {
        if self.fail_writes {
            return Err(MockError);
        }
        self.written.push(packet.to_vec());
        if let Some(responder) = self.responder.as_mut() {
            self.queue.extend(responder(packet));
        }
        Ok(())
    }

    fn read_transaction(&mut self, recv_buf: &mut [u8]) -> Result<(), MockError> {
        self.reads += 1;
        if self.fail_reads_after.is_some_and(|n| self.reads > n) {
            return Err(MockError);
        }
        recv_buf.fill(0);

        if self.pending.is_none() {
            if let Some((channel, cargo)) = self.queue.pop_front() {
                self.pending = Some(Pending {
                    channel,
                    sequence: self.hub_sequence,
                    cargo,
                    offset: 0,
                });
                self.hub_sequence = self.hub_sequence.wrapping_add(1);
            }
        }
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };

        let remaining = pending.cargo.len() - pending.offset;
        let mut length = (remaining + PACKET_HEADER_LENGTH) as u16;
        if pending.offset > 0 {
            length |= CONTINUATION_BIT;
        }
        let header = [
            length.to_le_bytes()[0],
            length.to_le_bytes()[1],
            pending.channel,
            pending.sequence,
        ];
        let header_len = recv_buf.len().min(PACKET_HEADER_LENGTH);
        recv_buf[..header_len].copy_from_slice(&header[..header_len]);

        let n = recv_buf.len().saturating_sub(PACKET_HEADER_LENGTH).min(remaining);
        recv_buf[PACKET_HEADER_LENGTH..PACKET_HEADER_LENGTH + n]
            .copy_from_slice(&pending.cargo[pending.offset..pending.offset + n]);
        pending.offset += n;

        if pending.offset >= pending.cargo.len() && (n > 0 || pending.cargo.is_empty()) {
            self.pending = None;
        }
        Ok(())
    }
}

/// Delay source that only counts
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub elapsed_ms: u64,
}

impl DelayMs for FakeDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ms += u64::from(ms);
    }
}
