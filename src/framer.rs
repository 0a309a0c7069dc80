//! Byte-source framing: sync byte search, 188/192-byte pitch auto-detection and
//! re-synchronization after corrupt regions.

use super::{Result, SYNC_BYTE, TIMESTAMPED_PACKET_LEN, TS_PACKET_LEN};
use log::warn;
use std::io::{ErrorKind, Read};

/// Wire pitch of the packets in a byte source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PacketSize {
    /// Plain 188-byte packets.
    Standard,
    /// 192-byte packets: a 4-byte opaque prefix ahead of each sync byte, used by BDAV streams
    /// and some capture formats for timestamps.
    Timestamped,
}

impl PacketSize {
    /// Total frame length on the wire.
    pub fn len(&self) -> usize {
        match self {
            Self::Standard => TS_PACKET_LEN,
            Self::Timestamped => TIMESTAMPED_PACKET_LEN,
        }
    }

    /// Number of prefix bytes ahead of the sync byte.
    pub fn prefix_len(&self) -> usize {
        self.len() - TS_PACKET_LEN
    }
}

/// One framed packet pulled out of the byte source.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The opaque 4-byte prefix of 192-byte framing, preserved verbatim.
    pub prefix: Option<[u8; 4]>,
    /// The 188-byte TS packet starting with the sync byte.
    pub packet: [u8; TS_PACKET_LEN],
}

/// Slices fixed-size TS frames out of a [`Read`] source.
///
/// The pitch is auto-detected from the first sync byte whose successors repeat at 188- or
/// 192-byte intervals; leading bytes that match neither are discarded. A mid-stream sync loss
/// triggers a rescan for the next aligned sync byte.
pub struct Framer<R> {
    source: R,
    buf: Vec<u8>,
    start: usize,
    size: Option<PacketSize>,
    eof: bool,
    resyncs: u64,
}

const READ_CHUNK: usize = 8192;

impl<R: Read> Framer<R> {
    /// Creates a framer that auto-detects the packet pitch.
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: Vec::new(),
            start: 0,
            size: None,
            eof: false,
            resyncs: 0,
        }
    }

    /// Creates a framer locked to a known packet pitch.
    pub fn with_packet_size(source: R, size: PacketSize) -> Self {
        let mut out = Self::new(source);
        out.size = Some(size);
        out
    }

    /// The detected (or configured) packet pitch, once known.
    pub fn packet_size(&self) -> Option<PacketSize> {
        self.size
    }

    /// Number of mid-stream sync losses recovered from.
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }

    fn available(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Reads more bytes from the source; returns false at end of stream.
    fn grow(&mut self) -> Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.start > READ_CHUNK {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            match self.source.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Ensures `need` bytes are buffered; returns false when the source ends first.
    fn fill(&mut self, need: usize) -> Result<bool> {
        while self.available() < need {
            if !self.grow()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether sync bytes repeat with `pitch` starting at absolute index `index`. Inconclusive
    /// tails only pass at end of stream.
    fn syncs_at(&self, index: usize, pitch: usize) -> bool {
        let mut matched = 0;
        let mut i = index;
        while i < self.buf.len() {
            if self.buf[i] != SYNC_BYTE {
                return false;
            }
            matched += 1;
            if matched == 3 {
                return true;
            }
            i += pitch;
        }
        matched >= 1 && self.eof
    }

    fn detect(&mut self) -> Result<Option<PacketSize>> {
        loop {
            while self.start < self.buf.len() && self.buf[self.start] != SYNC_BYTE {
                self.start += 1;
            }
            if self.available() < 2 * TIMESTAMPED_PACKET_LEN + 1 && !self.eof {
                self.grow()?;
                continue;
            }
            if self.available() == 0 {
                return Ok(None);
            }
            let index = self.start;
            if self.syncs_at(index, TS_PACKET_LEN) {
                return Ok(Some(PacketSize::Standard));
            }
            if self.syncs_at(index, TIMESTAMPED_PACKET_LEN) {
                // The frame begins 4 bytes ahead of the sync; an incomplete first prefix
                // skips to the next frame.
                self.start = if index >= 4 {
                    index - 4
                } else {
                    index + TS_PACKET_LEN
                };
                return Ok(Some(PacketSize::Timestamped));
            }
            // A stray 0x47 in leading junk.
            self.start += 1;
        }
    }

    /// Pulls the next frame, or [`None`] at end of stream (a truncated trailing frame is
    /// discarded).
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.size.is_none() {
            match self.detect()? {
                Some(size) => self.size = Some(size),
                None => return Ok(None),
            }
        }
        let size = self.size.unwrap();
        let total = size.len();
        let prefix_len = size.prefix_len();

        let mut lost = false;
        loop {
            if !self.fill(total)? {
                return Ok(None);
            }
            if self.buf[self.start + prefix_len] == SYNC_BYTE {
                break;
            }
            if !lost {
                warn!("Lost packet sync; rescanning");
                self.resyncs += 1;
                lost = true;
            }
            self.start += 1;
        }

        let frame_bytes = &self.buf[self.start..self.start + total];
        let mut packet = [0_u8; TS_PACKET_LEN];
        packet.copy_from_slice(&frame_bytes[prefix_len..]);
        let prefix = if prefix_len > 0 {
            let mut prefix = [0_u8; 4];
            prefix.copy_from_slice(&frame_bytes[..prefix_len]);
            Some(prefix)
        } else {
            None
        };
        self.start += total;
        Ok(Some(Frame { prefix, packet }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(counter: u8) -> [u8; TS_PACKET_LEN] {
        let mut packet = [0xFF_u8; TS_PACKET_LEN];
        packet[0] = SYNC_BYTE;
        packet[1] = 0x1F;
        packet[2] = 0xFF;
        packet[3] = 0x10 | counter;
        packet
    }

    #[test]
    fn test_detects_standard_pitch_and_discards_junk() {
        let mut bytes = vec![0x12, 0x47, 0x99]; // junk, including a stray sync byte
        for counter in 0..4 {
            bytes.extend_from_slice(&packet(counter));
        }
        let mut framer = Framer::new(bytes.as_slice());
        let mut frames = Vec::new();
        while let Some(frame) = framer.next_frame().unwrap() {
            frames.push(frame);
        }
        assert_eq!(framer.packet_size(), Some(PacketSize::Standard));
        assert_eq!(frames.len(), 4);
        for (counter, frame) in frames.iter().enumerate() {
            assert!(frame.prefix.is_none());
            assert_eq!(frame.packet[3] & 0xF, counter as u8);
        }
    }

    #[test]
    fn test_detects_timestamped_pitch() {
        let mut bytes = Vec::new();
        for counter in 0..3 {
            bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC, counter]); // opaque prefix
            bytes.extend_from_slice(&packet(counter));
        }
        let mut framer = Framer::new(bytes.as_slice());
        let mut frames = Vec::new();
        while let Some(frame) = framer.next_frame().unwrap() {
            frames.push(frame);
        }
        assert_eq!(framer.packet_size(), Some(PacketSize::Timestamped));
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].prefix, Some([0xAA, 0xBB, 0xCC, 1]));
    }

    #[test]
    fn test_resync_after_corrupt_region() {
        let mut bytes = Vec::new();
        for counter in 0..3 {
            bytes.extend_from_slice(&packet(counter));
        }
        bytes.extend_from_slice(&[0x00; 100]); // torn packet fragment
        for counter in 3..6 {
            bytes.extend_from_slice(&packet(counter));
        }
        let mut framer = Framer::new(bytes.as_slice());
        let mut counters = Vec::new();
        while let Some(frame) = framer.next_frame().unwrap() {
            counters.push(frame.packet[3] & 0xF);
        }
        assert_eq!(counters, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(framer.resyncs(), 1);
    }

    #[test]
    fn test_truncated_tail_discarded() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&packet(0));
        bytes.extend_from_slice(&packet(1)[..100]);
        let mut framer = Framer::new(bytes.as_slice());
        assert!(framer.next_frame().unwrap().is_some());
        assert!(framer.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_all_junk_yields_nothing() {
        let bytes = vec![0x00_u8; 1000];
        let mut framer = Framer::new(bytes.as_slice());
        assert!(framer.next_frame().unwrap().is_none());
    }
}
