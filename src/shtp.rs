// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! SHTP packet framing.
//!
//! Every transfer to or from the hub is a 4-byte header followed by cargo:
//!
//! ```text
//! [len LSB, len MSB (bit 7 = continuation), channel, sequence] cargo...
//! ```
//!
//! The length counts the header. The framer owns one wrapping sequence
//! counter per channel and reassembles cargo that does not fit in one bus
//! transaction.

use crate::{
    constants::{
        CONTINUATION_BIT, MAX_PACKET_SIZE, NUM_CHANNELS, PACKET_HEADER_LENGTH,
        PACKET_SEND_BUF_LEN,
    },
    driver::DriverError,
    interface::{delay::DelayMs, SensorInterface},
};
use log::{debug, trace};
use strum::{Display, FromRepr};

/// SHTP channels exposed by the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[repr(u8)]
pub enum Channel {
    Command = 0,
    Executable = 1,
    Control = 2,
    Reports = 3,
    WakeReports = 4,
    Gyro = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    /// Total length including the header, continuation bit cleared
    pub length: u16,
    pub channel: u8,
    pub sequence: u8,
}

impl PacketHeader {
    pub fn parse(bytes: &[u8; PACKET_HEADER_LENGTH]) -> Self {
        let raw = u16::from_le_bytes([bytes[0], bytes[1]]);
        Self {
            length: raw & !CONTINUATION_BIT,
            channel: bytes[2],
            sequence: bytes[3],
        }
    }

    pub fn encode(&self) -> [u8; PACKET_HEADER_LENGTH] {
        let [lsb, msb] = self.length.to_le_bytes();
        [lsb, msb, self.channel, self.sequence]
    }

    pub fn payload_len(&self) -> usize {
        usize::from(self.length).saturating_sub(PACKET_HEADER_LENGTH)
    }

    pub fn channel(&self) -> Option<Channel> {
        Channel::from_repr(self.channel)
    }
}

/// One received packet
#[derive(Debug, Clone, Default)]
pub struct Packet {
    header: PacketHeader,
    payload: heapless::Vec<u8, MAX_PACKET_SIZE>,
    truncated: usize,
}

impl Packet {
    pub fn new(header: PacketHeader) -> Self {
        Self {
            header,
            payload: heapless::Vec::new(),
            truncated: 0,
        }
    }

    /// Build a packet from a channel and cargo, as if it had been received
    pub fn from_payload(channel: Channel, payload: &[u8]) -> Self {
        let mut packet = Self::new(PacketHeader {
            length: (payload.len() + PACKET_HEADER_LENGTH).min(usize::from(u16::MAX)) as u16,
            channel: channel as u8,
            sequence: 0,
        });
        packet.extend(payload);
        packet
    }

    /// Append cargo, dropping and counting whatever exceeds the buffer
    fn extend(&mut self, bytes: &[u8]) {
        let room = self.payload.capacity() - self.payload.len();
        let take = room.min(bytes.len());
        // cannot fail, `take` fits the remaining capacity
        let _ = self.payload.extend_from_slice(&bytes[..take]);
        self.truncated += bytes.len() - take;
    }

    pub fn header(&self) -> &PacketHeader {
        &self.header
    }

    pub fn channel(&self) -> Option<Channel> {
        self.header.channel()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// First cargo byte, which identifies the report on most channels
    pub fn report_id(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Number of cargo bytes read from the bus but dropped for lack of room
    pub fn truncated(&self) -> usize {
        self.truncated
    }

    /// Header and cargo as space separated hex
    pub fn hex_dump(&self) -> String {
        self.header
            .encode()
            .iter()
            .chain(self.payload.iter())
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveState {
    #[default]
    Idle,
    AwaitingHeader,
    AwaitingPayload {
        remaining: usize,
    },
    Complete,
    TimedOut,
}

/// Packet framer: sequence numbers, send buffer and receive state machine
pub struct Shtp {
    /// Each communication channel with the device has its own sequence number
    sequence_numbers: [u8; NUM_CHANNELS],
    /// Buffer for building packets to send to the hub
    send_buf: [u8; PACKET_SEND_BUF_LEN],
    /// Scratch for one read transaction
    recv_buf: Vec<u8>,
    state: ReceiveState,
}

impl Default for Shtp {
    fn default() -> Self {
        Self::new()
    }
}

impl Shtp {
    pub fn new() -> Self {
        Self {
            sequence_numbers: [0; NUM_CHANNELS],
            send_buf: [0; PACKET_SEND_BUF_LEN],
            recv_buf: Vec::new(),
            state: ReceiveState::Idle,
        }
    }

    /// Sequence number the next packet on `channel` will carry
    pub fn sequence_number(&self, channel: Channel) -> u8 {
        self.sequence_numbers[channel as usize]
    }

    pub fn state(&self) -> ReceiveState {
        self.state
    }

    /// Frame `payload` for `channel` and write it.
    ///
    /// The channel's sequence number is consumed before the write, so it
    /// stays advanced even if the transport rejects the packet.
    pub fn send<SI, SE>(
        &mut self,
        iface: &mut SI,
        channel: Channel,
        payload: &[u8],
    ) -> Result<(), DriverError<SE>>
    where
        SI: SensorInterface<SensorError = SE>,
    {
        let packet_length = payload.len() + PACKET_HEADER_LENGTH;
        if packet_length > PACKET_SEND_BUF_LEN {
            return Err(DriverError::PayloadTooLarge(payload.len()));
        }

        let sequence = &mut self.sequence_numbers[channel as usize];
        let header = PacketHeader {
            length: packet_length as u16,
            channel: channel as u8,
            sequence: *sequence,
        };
        *sequence = sequence.wrapping_add(1);

        self.send_buf[..PACKET_HEADER_LENGTH].copy_from_slice(&header.encode());
        self.send_buf[PACKET_HEADER_LENGTH..packet_length].copy_from_slice(payload);
        trace!("send {} {:x?}", channel, &self.send_buf[..packet_length]);

        iface
            .write_packet(&self.send_buf[..packet_length])
            .map_err(DriverError::CommError)
    }

    /// Read one packet.
    ///
    /// The header is read on its own, then the cargo in transactions of at
    /// most `max_read_len()` bytes; each one repeats the header, which is
    /// skipped. A zero length header means nothing is pending.
    pub fn receive<SI, SE>(&mut self, iface: &mut SI) -> Result<Option<Packet>, DriverError<SE>>
    where
        SI: SensorInterface<SensorError = SE>,
    {
        self.state = ReceiveState::AwaitingHeader;
        let mut header_bytes = [0u8; PACKET_HEADER_LENGTH];
        if let Err(e) = iface.read_transaction(&mut header_bytes) {
            self.state = ReceiveState::Idle;
            return Err(DriverError::CommError(e));
        }
        let header = PacketHeader::parse(&header_bytes);
        if header.length == 0 {
            self.state = ReceiveState::Idle;
            return Ok(None);
        }
        if usize::from(header.length) < PACKET_HEADER_LENGTH {
            trace!("runt header {:x?}", header_bytes);
            self.state = ReceiveState::Idle;
            return Ok(None);
        }

        let mut packet = Packet::new(header);
        let chunk_max = iface
            .max_read_len()
            .saturating_sub(PACKET_HEADER_LENGTH)
            .max(1);
        let mut remaining = header.payload_len();

        while remaining > 0 {
            self.state = ReceiveState::AwaitingPayload { remaining };
            let chunk = remaining.min(chunk_max);
            self.recv_buf.clear();
            self.recv_buf.resize(chunk + PACKET_HEADER_LENGTH, 0);
            if let Err(e) = iface.read_transaction(&mut self.recv_buf) {
                self.state = ReceiveState::Idle;
                return Err(DriverError::CommError(e));
            }
            packet.extend(&self.recv_buf[PACKET_HEADER_LENGTH..]);
            remaining -= chunk;
        }

        if packet.truncated() > 0 {
            debug!(
                "packet on channel {} truncated, dropped {} bytes",
                header.channel,
                packet.truncated()
            );
        }
        trace!("recv {}", packet.hex_dump());
        self.state = ReceiveState::Complete;
        Ok(Some(packet))
    }

    /// Wait up to `max_ms` for the hub to signal data, then read one packet
    pub fn receive_with_timeout<SI, SE>(
        &mut self,
        iface: &mut SI,
        delay: &mut impl DelayMs,
        max_ms: u32,
    ) -> Result<Option<Packet>, DriverError<SE>>
    where
        SI: SensorInterface<SensorError = SE>,
    {
        self.state = ReceiveState::Idle;
        let mut waited = 0;
        while !iface.data_ready() {
            if waited >= max_ms {
                self.state = ReceiveState::TimedOut;
                return Ok(None);
            }
            delay.delay_ms(1);
            waited += 1;
        }
        self.receive(iface)
    }
}
