//! Muxer facade: produces constant-size TS packets carrying the current PAT/PMT and PES
//! payloads.

use super::adaptation::AdaptationField;
use super::descriptors::DescriptorList;
use super::framer::PacketSize;
use super::pes::PesHeader;
use super::psi::{table_ids, ElementaryStream, Pat, PatEntry, Pmt, Psi, SectionSyntax, TableData};
use super::{
    Error, ErrorDetails, PacketHeader, Result, SliceWriter, TransportScramblingControl, TsParser,
    PID_NULL, SYNC_BYTE, TS_PACKET_LEN,
};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Payload bytes available in a packet with no adaptation field.
const PACKET_PAYLOAD_LEN: usize = TS_PACKET_LEN - 4;

/// First PID handed out when elementary streams are added without an explicit PID.
const FIRST_AUTO_PID: u16 = 0x0100;

struct CachedTables {
    pat_section: Vec<u8>,
    pmt_section: Vec<u8>,
}

/// Single-program transport stream muxer over any [`Write`] sink.
///
/// Maintains the PAT/PMT for one program and per-PID continuity counters; every emitted packet
/// is exactly the configured size (188, or 192 with a zeroed timestamp prefix).
///
/// # Example
///
/// ```
/// use dvbts::{DescriptorList, Muxer, PesHeader, PesOptional};
///
/// let mut out = Vec::new();
/// let mut muxer = Muxer::new(&mut out, 1, 0x1000);
/// let pid = muxer
///     .add_elementary_stream(0x1B, Some(0x0100), DescriptorList::default(), true)
///     .expect("PID collision!");
/// muxer.write_tables().expect("Write Error!");
/// let header = PesHeader {
///     stream_id: 0xE0,
///     packet_length: 0,
///     optional: Some(PesOptional::with_pts(900_000)),
/// };
/// muxer.write_payload(pid, None, &header, &[0_u8; 4096]).expect("Write Error!");
/// assert_eq!(out.len() % 188, 0);
/// ```
pub struct Muxer<W> {
    sink: W,
    packet_size: PacketSize,
    transport_stream_id: u16,
    program_number: u16,
    pmt_pid: u16,
    pcr_pid: u16,
    streams: Vec<ElementaryStream>,
    continuity: HashMap<u16, u8>,
    version: u8,
    next_auto_pid: u16,
    cached_tables: Option<CachedTables>,
    cancel: Option<Arc<AtomicBool>>,
    packets_written: u64,
}

impl<W: Write> Muxer<W> {
    /// Creates a muxer for one program, emitting standard 188-byte packets.
    pub fn new(sink: W, program_number: u16, pmt_pid: u16) -> Self {
        Self {
            sink,
            packet_size: PacketSize::Standard,
            transport_stream_id: 1,
            program_number,
            pmt_pid,
            pcr_pid: super::psi::PCR_PID_NONE,
            streams: Vec::new(),
            continuity: HashMap::new(),
            version: 0,
            next_auto_pid: FIRST_AUTO_PID,
            cached_tables: None,
            cancel: None,
            packets_written: 0,
        }
    }

    /// Selects the emitted packet size. The 4-byte prefix of 192-byte packets is zero-filled.
    pub fn with_packet_size(mut self, size: PacketSize) -> Self {
        self.packet_size = size;
        self
    }

    /// Sets the transport stream id announced in the PAT.
    pub fn set_transport_stream_id(&mut self, transport_stream_id: u16) {
        self.transport_stream_id = transport_stream_id;
        self.invalidate_tables();
    }

    /// Installs a cancellation flag, checked between packets.
    pub fn set_cancellation(&mut self, cancel: Arc<AtomicBool>) {
        self.cancel = Some(cancel);
    }

    /// Number of TS packets emitted so far.
    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    fn pid_in_use(&self, pid: u16) -> bool {
        pid == self.pmt_pid || self.streams.iter().any(|s| s.pid == pid)
    }

    fn invalidate_tables(&mut self) {
        self.version = (self.version + 1) & 0x1F;
        self.cached_tables = None;
    }

    /// Appends an elementary stream to the PMT, optionally marking its PID as the program's
    /// PCR PID. Without an explicit PID the next free PID from 0x0100 is allocated. Fails with
    /// [`PidInUse`](ErrorDetails::PidInUse) when the PID is already taken.
    pub fn add_elementary_stream(
        &mut self,
        stream_type: u8,
        pid: Option<u16>,
        descriptors: DescriptorList,
        is_pcr: bool,
    ) -> Result<u16> {
        let pid = match pid {
            Some(pid) => {
                if self.pid_in_use(pid) || pid == PID_NULL || pid < 0x10 {
                    return Err(Error::new(0, ErrorDetails::PidInUse(pid)));
                }
                pid
            }
            None => {
                while self.pid_in_use(self.next_auto_pid) {
                    self.next_auto_pid += 1;
                }
                let pid = self.next_auto_pid;
                self.next_auto_pid += 1;
                pid
            }
        };
        self.streams.push(ElementaryStream {
            stream_type,
            pid,
            descriptors,
        });
        if is_pcr {
            self.pcr_pid = pid;
        }
        self.invalidate_tables();
        Ok(pid)
    }

    /// Removes the elementary stream on `pid`; fails with
    /// [`UnknownPid`](ErrorDetails::UnknownPid) when absent.
    pub fn remove_elementary_stream(&mut self, pid: u16) -> Result<()> {
        let index = self
            .streams
            .iter()
            .position(|s| s.pid == pid)
            .ok_or_else(|| Error::new(0, ErrorDetails::UnknownPid(pid)))?;
        self.streams.remove(index);
        if self.pcr_pid == pid {
            self.pcr_pid = super::psi::PCR_PID_NONE;
        }
        self.invalidate_tables();
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        if let Some(cancel) = &self.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::new(0, ErrorDetails::Cancelled));
            }
        }
        Ok(())
    }

    fn encode_section(section: &Psi) -> Result<Vec<u8>> {
        let mut scratch = [0_u8; 1024];
        let mut writer = SliceWriter::new(&mut scratch);
        section.write(&mut writer)?;
        Ok(writer.written().to_vec())
    }

    fn ensure_tables(&mut self) -> Result<()> {
        if self.cached_tables.is_some() {
            return Ok(());
        }
        let syntax = |table_id_extension| SectionSyntax {
            table_id_extension,
            version: self.version,
            current_next_indicator: true,
            section_number: 0,
            last_section_number: 0,
        };
        let pat = Psi {
            table_id: table_ids::PAT,
            private_bit: false,
            syntax: Some(syntax(self.transport_stream_id)),
            table: TableData::Pat(Pat {
                entries: SmallVec::from_slice(&[PatEntry {
                    program_number: self.program_number,
                    pid: self.pmt_pid,
                }]),
            }),
        };
        let pmt = Psi {
            table_id: table_ids::PMT,
            private_bit: false,
            syntax: Some(syntax(self.program_number)),
            table: TableData::Pmt(Pmt {
                pcr_pid: self.pcr_pid,
                program_descriptors: DescriptorList::default(),
                streams: self.streams.clone(),
            }),
        };
        self.cached_tables = Some(CachedTables {
            pat_section: Self::encode_section(&pat)?,
            pmt_section: Self::encode_section(&pmt)?,
        });
        Ok(())
    }

    /// Emits the current PAT and PMT, one TS packet each (more when a table outgrows a single
    /// packet). The encoded sections are cached until a structural change bumps the version.
    /// Returns the number of packets written.
    pub fn write_tables(&mut self) -> Result<usize> {
        self.ensure_tables()?;
        let tables = self.cached_tables.take().unwrap();
        let result = self
            .write_section_packets(super::PID_PAT, &tables.pat_section)
            .and_then(|pat_packets| {
                Ok(pat_packets + self.write_section_packets(self.pmt_pid, &tables.pmt_section)?)
            });
        self.cached_tables = Some(tables);
        result
    }

    /// Emits one PES packet as a run of TS packets on `pid`: the first carries `adaptation`
    /// (if any) and the PES header, the rest carry payload only, and the final packet is
    /// filled with adaptation-field stuffing. Returns the number of packets written.
    pub fn write_payload(
        &mut self,
        pid: u16,
        adaptation: Option<&AdaptationField>,
        header: &PesHeader,
        payload: &[u8],
    ) -> Result<usize> {
        let mut pes = vec![0_u8; header.encoded_len() + payload.len()];
        let mut writer = SliceWriter::new(&mut pes);
        header.write(&mut writer, payload.len())?;
        writer.write(payload)?;

        let mut first_adaptation = adaptation.cloned();
        if let Some(field) = &mut first_adaptation {
            if (field.length as usize) < field.content_len() {
                *field = field.clone().sized();
            }
            if field.encoded_len() > PACKET_PAYLOAD_LEN {
                return Err(Error::new(0, ErrorDetails::BadAdaptationHeader));
            }
        }

        let mut packets = 0;
        let mut remaining = &pes[..];
        let mut first = true;
        while first || !remaining.is_empty() {
            self.check_cancelled()?;
            let mut field = if first { first_adaptation.take() } else { None };
            let available = PACKET_PAYLOAD_LEN - field.as_ref().map_or(0, |a| a.encoded_len());
            let take = available.min(remaining.len());
            if take < available {
                // Short final packet: grow (or create) the adaptation field to fill the gap.
                let target = PACKET_PAYLOAD_LEN - take;
                field = Some(match field {
                    Some(existing) => existing.pad_to(target)?,
                    None => AdaptationField::stuffing(target),
                });
            }
            let (chunk, rest) = remaining.split_at(take);
            self.emit_packet(pid, first, field.as_ref(), chunk, false)?;
            packets += 1;
            remaining = rest;
            first = false;
        }
        Ok(packets)
    }

    fn write_section_packets(&mut self, pid: u16, section: &[u8]) -> Result<usize> {
        let mut packets = 0;
        // Pointer field ahead of the first chunk.
        let mut unit: Vec<u8> = Vec::with_capacity(1 + section.len());
        unit.push(0x00);
        unit.extend_from_slice(section);

        let mut remaining = &unit[..];
        let mut first = true;
        while !remaining.is_empty() {
            self.check_cancelled()?;
            let take = PACKET_PAYLOAD_LEN.min(remaining.len());
            let (chunk, rest) = remaining.split_at(take);
            self.emit_packet(pid, first, None, chunk, true)?;
            packets += 1;
            remaining = rest;
            first = false;
        }
        Ok(packets)
    }

    /// Assembles and writes exactly one TS packet. `psi_stuffing` selects 0xFF payload fill
    /// (sections) over adaptation-field stuffing (PES, already sized by the caller).
    fn emit_packet(
        &mut self,
        pid: u16,
        unit_start: bool,
        adaptation: Option<&AdaptationField>,
        chunk: &[u8],
        psi_stuffing: bool,
    ) -> Result<()> {
        let counter = self.continuity.entry(pid).or_insert(0);
        let header = PacketHeader::new()
            .with_sync_byte(SYNC_BYTE)
            .with_pusi(unit_start)
            .with_pid(pid)
            .with_tsc(TransportScramblingControl::NotScrambled)
            .with_has_adaptation_field(adaptation.is_some())
            .with_has_payload(true)
            .with_continuity_counter(*counter);
        *counter = (*counter + 1) & 0xF;

        let mut buf = [0_u8; super::TIMESTAMPED_PACKET_LEN];
        let total = self.packet_size.len();
        let mut writer = SliceWriter::new(&mut buf[..total]);
        // The timestamp prefix of 192-byte output is not synthesized, only reserved.
        writer.fill(self.packet_size.prefix_len(), 0x00)?;
        writer.write(&header.into_bytes())?;
        if let Some(field) = adaptation {
            field.write(&mut writer)?;
        }
        writer.write(chunk)?;
        if psi_stuffing {
            writer.fill_remaining(0xFF);
        } else if writer.remaining_len() > 0 {
            return Err(writer.make_error(ErrorDetails::BadAdaptationHeader));
        }
        self.sink.write_all(writer.written())?;
        self.packets_written += 1;
        Ok(())
    }

    /// Flushes the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TsUnit, TS_PACKET_LEN};

    fn demux_all(bytes: &[u8]) -> Vec<TsUnit> {
        let mut parser = TsParser::default();
        for chunk in bytes.chunks(TS_PACKET_LEN) {
            let mut packet = [0_u8; TS_PACKET_LEN];
            packet.copy_from_slice(chunk);
            parser.parse(&packet).unwrap();
        }
        parser.flush().unwrap();
        let mut units = Vec::new();
        while let Some(unit) = parser.take_unit() {
            units.push(unit);
        }
        units
    }

    #[test]
    fn test_write_tables_round_trip() {
        let mut out = Vec::new();
        let mut muxer = Muxer::new(&mut out, 1, 0x1000);
        let pid = muxer
            .add_elementary_stream(0x1B, Some(0x1234), DescriptorList::default(), true)
            .unwrap();
        assert_eq!(pid, 0x1234);
        let packets = muxer.write_tables().unwrap();
        assert_eq!(packets, 2);
        assert_eq!(out.len(), 2 * TS_PACKET_LEN);
        assert_eq!(out[0], crate::SYNC_BYTE);
        assert_eq!(out[TS_PACKET_LEN], crate::SYNC_BYTE);

        // Both tables parse back (which verifies their CRCs) with the same content.
        let units = demux_all(&out);
        assert_eq!(units.len(), 2);
        match &units[0] {
            TsUnit::Psi(section) => match &section.table {
                TableData::Pat(pat) => {
                    assert_eq!(pat.entries.len(), 1);
                    assert_eq!(pat.entries[0].program_number, 1);
                    assert_eq!(pat.entries[0].pid, 0x1000);
                }
                other => panic!("unexpected table: {:?}", other),
            },
            other => panic!("unexpected unit: {:?}", other),
        }
        match &units[1] {
            TsUnit::Psi(section) => match &section.table {
                TableData::Pmt(pmt) => {
                    assert_eq!(pmt.pcr_pid, 0x1234);
                    assert_eq!(pmt.streams.len(), 1);
                    assert_eq!(pmt.streams[0].stream_type, 0x1B);
                    assert_eq!(pmt.streams[0].pid, 0x1234);
                }
                other => panic!("unexpected table: {:?}", other),
            },
            other => panic!("unexpected unit: {:?}", other),
        }
    }

    #[test]
    fn test_table_cache_and_versioning() {
        let mut out = Vec::new();
        let mut muxer = Muxer::new(&mut out, 1, 0x1000);
        muxer
            .add_elementary_stream(0x1B, None, DescriptorList::default(), true)
            .unwrap();
        muxer.write_tables().unwrap();
        muxer.write_tables().unwrap();
        muxer
            .add_elementary_stream(0x0F, None, DescriptorList::default(), false)
            .unwrap();
        muxer.write_tables().unwrap();

        let units = demux_all(&out);
        let versions: Vec<u8> = units
            .iter()
            .map(|unit| match unit {
                TsUnit::Psi(section) => section.syntax.unwrap().version,
                other => panic!("unexpected unit: {:?}", other),
            })
            .collect();
        // Identical re-emission reuses the cached version; the structural change bumps it.
        assert_eq!(versions, vec![1, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_auto_pid_allocation_and_collisions() {
        let mut out = Vec::new();
        let mut muxer = Muxer::new(&mut out, 1, 0x1000);
        let first = muxer
            .add_elementary_stream(0x1B, None, DescriptorList::default(), true)
            .unwrap();
        let second = muxer
            .add_elementary_stream(0x0F, None, DescriptorList::default(), false)
            .unwrap();
        assert_eq!(first, 0x0100);
        assert_eq!(second, 0x0101);
        let error = muxer
            .add_elementary_stream(0x03, Some(first), DescriptorList::default(), false)
            .unwrap_err();
        assert!(matches!(error.details, ErrorDetails::PidInUse(0x0100)));
        let error = muxer.remove_elementary_stream(0x0999).unwrap_err();
        assert!(matches!(error.details, ErrorDetails::UnknownPid(0x0999)));
        muxer.remove_elementary_stream(first).unwrap();
        let reused = muxer
            .add_elementary_stream(0x1B, Some(first), DescriptorList::default(), false)
            .unwrap();
        assert_eq!(reused, 0x0100);
    }

    #[test]
    fn test_write_payload_splits_and_stuffs() {
        use crate::{Pes, PesOptional};

        let mut out = Vec::new();
        let mut muxer = Muxer::new(&mut out, 1, 0x1000);
        let pid = muxer
            .add_elementary_stream(0x1B, None, DescriptorList::default(), true)
            .unwrap();
        let header = PesHeader {
            stream_id: 0xE0,
            packet_length: 0,
            optional: Some(PesOptional::with_pts(900_000)),
        };
        let payload: Vec<u8> = (0..500_u32).map(|i| i as u8).collect();
        let packets = muxer.write_payload(pid, None, &header, &payload).unwrap();
        // 14 header bytes plus 500 payload bytes span three 184-byte chunks.
        assert_eq!(packets, 3);
        assert_eq!(out.len(), 3 * TS_PACKET_LEN);
        for chunk in out.chunks(TS_PACKET_LEN) {
            assert_eq!(chunk[0], crate::SYNC_BYTE);
        }
        // Only the first packet has the payload unit start flag.
        assert_eq!(out[1] & 0x40, 0x40);
        assert_eq!(out[TS_PACKET_LEN + 1] & 0x40, 0);

        let units = demux_all(&out);
        assert_eq!(units.len(), 1);
        match &units[0] {
            TsUnit::Pes(pes) => {
                assert_eq!(pes.pts(), Some(900_000));
                assert_eq!(pes.data, payload);
            }
            other => panic!("unexpected unit: {:?}", other),
        }
    }

    #[test]
    fn test_write_payload_with_pcr_adaptation() {
        use crate::{ClockReference, PesOptional};

        let mut out = Vec::new();
        let mut muxer = Muxer::new(&mut out, 1, 0x1000);
        let pid = muxer
            .add_elementary_stream(0x1B, None, DescriptorList::default(), true)
            .unwrap();
        let adaptation = AdaptationField {
            random_access: true,
            pcr: Some(ClockReference::from_90khz(900_000)),
            ..AdaptationField::default()
        };
        let header = PesHeader {
            stream_id: 0xE0,
            packet_length: 0,
            optional: Some(PesOptional::with_pts(900_000)),
        };
        muxer
            .write_payload(pid, Some(&adaptation), &header, &[0x42; 600])
            .unwrap();
        assert_eq!(out.len() % TS_PACKET_LEN, 0);

        let mut parser = TsParser::default();
        let mut first = [0_u8; TS_PACKET_LEN];
        first.copy_from_slice(&out[..TS_PACKET_LEN]);
        let packet = parser.parse(&first).unwrap();
        let field = packet.adaptation_field.unwrap();
        assert!(field.random_access);
        assert_eq!(field.pcr, Some(ClockReference::from_90khz(900_000)));
    }

    #[test]
    fn test_exact_fit_needs_no_stuffing() {
        let mut out = Vec::new();
        let mut muxer = Muxer::new(&mut out, 1, 0x1000);
        let pid = muxer
            .add_elementary_stream(0x1B, None, DescriptorList::default(), true)
            .unwrap();
        let header = PesHeader {
            stream_id: 0xE0,
            packet_length: 0,
            optional: None,
        };
        // 6 header bytes + 178 payload bytes fill one packet exactly.
        let packets = muxer.write_payload(pid, None, &header, &[0x11; 178]).unwrap();
        assert_eq!(packets, 1);
        assert_eq!(out[4], 0x00);
        assert_eq!(out[5], 0x00);
        assert_eq!(out[6], 0x01);
    }

    #[test]
    fn test_timestamped_output_size() {
        let mut out = Vec::new();
        let mut muxer =
            Muxer::new(&mut out, 1, 0x1000).with_packet_size(PacketSize::Timestamped);
        muxer
            .add_elementary_stream(0x1B, None, DescriptorList::default(), true)
            .unwrap();
        muxer.write_tables().unwrap();
        assert_eq!(out.len(), 2 * crate::TIMESTAMPED_PACKET_LEN);
        assert_eq!(out[4], crate::SYNC_BYTE);
        assert_eq!(out[crate::TIMESTAMPED_PACKET_LEN + 4], crate::SYNC_BYTE);
    }
}
