// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Flash Record System (FRS) reads.
//!
//! FRS records hold per-sensor metadata (range, resolution, Q points...).
//! A read request asks for a number of 32-bit words from a record; the hub
//! answers with one or more read responses carrying up to two words each.

use crate::constants::{
    frs_read_status_to_str, FRS_READ_STATUS_BLOCK_AND_RECORD_COMPLETE,
    FRS_READ_STATUS_BLOCK_COMPLETE, FRS_READ_STATUS_READ_COMPLETE, MAX_METADATA_SIZE,
    SHUB_FRS_READ_REQ, SHUB_FRS_READ_RESP,
};
use log::{debug, trace};

/// Words collected from one FRS read
pub type FrsMetadata = heapless::Vec<u32, MAX_METADATA_SIZE>;

/// Build an FRS read request.
///
/// `read_offset` and `block_size` are counted in 32-bit words.
pub fn build_frs_read_request(record_id: u16, read_offset: u16, block_size: u16) -> [u8; 8] {
    let offset = read_offset.to_le_bytes();
    let record = record_id.to_le_bytes();
    let size = block_size.to_le_bytes();
    [
        SHUB_FRS_READ_REQ,
        0, // reserved
        offset[0],
        offset[1],
        record[0],
        record[1],
        size[0],
        size[1],
    ]
}

/// Decoded FRS read response (report 0xF3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrsReadResponse {
    /// Number of valid words in `words`
    pub data_length: u8,
    pub status: u8,
    /// Word offset of `words[0]` within the record
    pub offset: u16,
    pub words: [u32; 2],
    pub record_id: u16,
}

impl FrsReadResponse {
    /// Parse a Control channel payload, `None` if it is not a complete FRS
    /// read response
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < 14 || payload[0] != SHUB_FRS_READ_RESP {
            return None;
        }
        let word = |at: usize| {
            u32::from_le_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]])
        };
        Some(Self {
            data_length: payload[1] >> 4,
            status: payload[1] & 0x0F,
            offset: u16::from_le_bytes([payload[2], payload[3]]),
            words: [word(4), word(8)],
            record_id: u16::from_le_bytes([payload[12], payload[13]]),
        })
    }

    /// Words carried by this response
    pub fn data(&self) -> &[u32] {
        &self.words[..usize::from(self.data_length.min(2))]
    }

    /// Read complete, block complete, or both
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            FRS_READ_STATUS_READ_COMPLETE
                | FRS_READ_STATUS_BLOCK_COMPLETE
                | FRS_READ_STATUS_BLOCK_AND_RECORD_COMPLETE
        )
    }
}

/// How an FRS read ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrsReadOutcome {
    /// The hub reported the read finished
    Complete,
    /// More words arrived than fit in the metadata buffer
    Truncated,
    /// No response within the retry limit
    TimedOut,
}

/// Collects the words of one FRS read, response by response
#[derive(Debug, Clone)]
pub struct FrsReader {
    record_id: u16,
    metadata: FrsMetadata,
}

impl FrsReader {
    pub fn new(record_id: u16) -> Self {
        Self {
            record_id,
            metadata: FrsMetadata::new(),
        }
    }

    /// Feed one response; returns the outcome once the read is over.
    ///
    /// Responses for other records are ignored.
    pub fn accept(&mut self, response: &FrsReadResponse) -> Option<FrsReadOutcome> {
        if response.record_id != self.record_id {
            trace!(
                "frs response for 0x{:04X}, waiting on 0x{:04X}",
                response.record_id,
                self.record_id
            );
            return None;
        }
        trace!(
            "frs read 0x{:04X} @{}: {}",
            response.record_id,
            response.offset,
            frs_read_status_to_str(response.status)
        );

        for &word in response.data() {
            if self.metadata.push(word).is_err() {
                debug!("frs metadata overrun on record 0x{:04X}", self.record_id);
                return Some(FrsReadOutcome::Truncated);
            }
        }

        if response.is_terminal() {
            return Some(FrsReadOutcome::Complete);
        }
        if self.metadata.is_full() {
            debug!("frs metadata full on record 0x{:04X}", self.record_id);
            return Some(FrsReadOutcome::Truncated);
        }
        None
    }

    pub fn metadata(&self) -> &[u32] {
        &self.metadata
    }

    pub fn into_metadata(self) -> FrsMetadata {
        self.metadata
    }
}
