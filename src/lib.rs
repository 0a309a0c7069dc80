//! Library for demuxing and muxing MPEG transport streams with DVB service information.
//!
//! # Usage
//! Simply add this crate as a dependency in your `Cargo.toml`.
//!
//! ```toml
//! [dependencies]
//! dvbts = "~0.1.0"
//! ```
//!
//! The packet-level [`TsParser`] turns single 188-byte packets into [`Packet`] records and
//! assembles payload units spanning multiple packets; the [`Demuxer`] drives it from any
//! [`std::io::Read`] source and yields typed [`TsUnit`] records; the [`Muxer`] goes the other
//! way, producing constant-size packets from PES payloads and the current PAT/PMT.

#![doc(html_root_url = "https://docs.rs/dvbts/0.1.0")]
#![allow(unused)]
#![deny(missing_docs, unsafe_code)]

use crc::{Crc, Digest, CRC_32_MPEG_2};
use log::warn;
use modular_bitfield_msb::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::result;

mod slice_reader;
pub use slice_reader::SliceReader;

mod slice_writer;
pub use slice_writer::SliceWriter;

pub mod clock;
pub use clock::{ClockReference, DvbTime};

mod adaptation;
pub use adaptation::{AdaptationExtension, AdaptationField, LegalTimeWindow, SeamlessSplice};

pub mod descriptors;
pub use descriptors::{Descriptor, DescriptorList};

pub mod psi;
pub use psi::{Psi, SectionSyntax, TableData};

mod pes;
pub use pes::{
    DsmTrickMode, PStdBuffer, Pes, PesExtension, PesHeader, PesOptional, PesSequenceCounter,
    TrickModeRate, STREAM_ID_PADDING, STREAM_ID_PRIVATE_2,
};

mod reassembly;
use reassembly::{Assembler, PesAssembler, PidState, PsiAssembler, UnitAssembler};

mod framer;
pub use framer::{Frame, Framer, PacketSize};

mod demux;
pub use demux::{Demuxer, RawPayloadAction, RawPayloadHandler};

mod mux;
pub use mux::Muxer;

const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);
type CrcDigest = Digest<'static, u32>;

/// First byte of every TS packet.
pub const SYNC_BYTE: u8 = 0x47;
/// Size of a standard TS packet.
pub const TS_PACKET_LEN: usize = 188;
/// Size of a TS packet with the 4-byte timestamp prefix used by some capture formats.
pub const TIMESTAMPED_PACKET_LEN: usize = 192;

/// PID of the program association table.
pub const PID_PAT: u16 = 0x0000;
/// PID of the conditional access table.
pub const PID_CAT: u16 = 0x0001;
/// PID of the transport stream description table.
pub const PID_TSDT: u16 = 0x0002;
/// Default PID of the network information table.
pub const PID_NIT: u16 = 0x0010;
/// PID of null packets.
pub const PID_NULL: u16 = 0x1FFF;

const DEFAULT_MAX_PSI_UNIT_LEN: usize = 1024;

/// Whether `pid` is one of the DVB SI PIDs (NIT/SDT/EIT/RST/TDT/TOT/DIT/SIT).
fn is_si_pid(pid: u16) -> bool {
    matches!(pid, 0x10..=0x14 | 0x1E..=0x1F)
}

/// Errors that may be encountered while parsing or serializing an MPEG transport stream.
#[derive(Debug)]
pub enum ErrorDetails {
    /// Encountered when a [`SliceReader`] reads out of bounds.
    /// The [`usize`] parameter is the length of the offending read.
    PacketOverrun(usize),
    /// Encountered when a [`SliceWriter`] writes out of bounds.
    /// The [`usize`] parameter is the length of the offending write.
    ShortWrite(usize),
    /// MPEG-TS packet headers must contain a sync byte of 0x47.
    /// This is the error when encountering any other value.
    LostSync,
    /// Encountered for inconsistent [`AdaptationField`] parses.
    BadAdaptationHeader,
    /// Encountered for inconsistent PSI section headers.
    BadPsiHeader,
    /// Encountered for inconsistent [`PesHeader`] or [`PesOptional`] parses, including marker
    /// bits that are not where the format says they must be.
    BadPesHeader,
    /// Encountered when a PSI section fails its CRC check.
    PsiCrcMismatch,
    /// A declared length overruns its container, or a PSI section length exceeds 1021.
    InvalidLength(usize),
    /// A table id outside the known set stopped the section loop.
    UnknownTable(u8),
    /// The caller's cancellation signal fired.
    Cancelled,
    /// A PID was added to the muxer twice.
    PidInUse(u16),
    /// A PID unknown to the muxer was referenced.
    UnknownPid(u16),
    /// The byte source or sink failed.
    Io(std::io::Error),
}

/// Error type encapsulating all possible parser and serializer errors.
#[derive(Debug)]
pub struct Error {
    /// Byte index within the packet or buffer that the error was encountered.
    pub location: usize,
    /// Information about the error.
    pub details: ErrorDetails,
}

impl Error {
    /// Creates an error at `location`.
    pub fn new(location: usize, details: ErrorDetails) -> Self {
        Self { location, details }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::new(0, ErrorDetails::Io(error))
    }
}

/// [`std::result::Result`] alias that uses [`Error`].
pub type Result<T> = result::Result<T, Error>;

/// TSC information used in a packet's payload.
#[repr(u8)]
#[derive(Debug, BitfieldSpecifier)]
#[bits = 2]
pub enum TransportScramblingControl {
    /// Not scrambled.
    NotScrambled,
    /// Do not use.
    Reserved,
    /// Scrambled with even key.
    ScrambledEvenKey,
    /// Scrambled with odd key.
    ScrambledOddKey,
}

/// Link-layer header found at the start of every 188-byte MPEG-TS packet.
#[bitfield]
#[derive(Debug, Clone)]
pub struct PacketHeader {
    /// Must be [`SYNC_BYTE`].
    pub sync_byte: B8,
    /// Transport error indicator; payload of flagged packets is ignored.
    pub tei: bool,
    /// Payload unit start indicator.
    pub pusi: bool,
    /// Transport priority.
    pub priority: bool,
    /// Routing identifier.
    pub pid: B13,
    /// Transport scrambling control.
    pub tsc: TransportScramblingControl,
    /// Whether an adaptation field follows the header.
    pub has_adaptation_field: bool,
    /// Whether payload bytes follow the header (and adaptation field).
    pub has_payload: bool,
    /// Modulo-16 per-PID sequence counter, incremented on payload-bearing packets.
    pub continuity_counter: B4,
}

/// Counters of anomalies that the packet layer recovers from without surfacing errors.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    /// PSI sections dropped on a CRC mismatch.
    pub crc_mismatches: u64,
    /// Continuity counter breaks and discontinuity indicators.
    pub discontinuities: u64,
    /// Packets discarded as duplicates.
    pub duplicate_packets: u64,
    /// Packets skipped for a set transport error indicator.
    pub transport_errors: u64,
    /// Payload units dropped because their bytes were incomplete.
    pub dropped_units: u64,
    /// Section loops stopped at an unknown table id.
    pub unknown_tables: u64,
}

/// One complete, typed payload unit produced by the demuxer.
#[derive(Debug, Clone, PartialEq)]
pub enum TsUnit {
    /// A PSI section.
    Psi(Psi),
    /// A PES packet.
    Pes(Pes),
}

/// Per-packet payload disposition.
///
/// Complete units never appear here; they are queued on the parser and retrieved with
/// [`TsParser::take_unit`] since a single packet can complete more than one unit.
#[derive(Debug)]
pub enum Payload<'a> {
    /// The payload bytes were consumed into an in-flight unit.
    Pending,
    /// The payload was skipped (duplicate, transport error, CAT, or trailing stuffing).
    Skipped,
    /// Unhandled payload type; parsing is left to the application.
    Raw(&'a [u8]),
}

/// Top-level parsed structure for one MPEG-TS packet.
#[derive(Debug)]
pub struct Packet<'a> {
    /// Packet link-layer header.
    pub header: PacketHeader,
    /// Optional adaptation field metadata.
    pub adaptation_field: Option<AdaptationField>,
    /// Optional payload data.
    pub payload: Option<Payload<'a>>,
}

/// MPEG-TS parser state capable of assembling payload units.
///
/// Feed complete 188-byte packets to [`TsParser::parse`] and drain assembled units with
/// [`TsParser::take_unit`]; [`Demuxer`] wraps both behind a byte source.
///
/// # Example
///
/// ```no_run
/// use dvbts::TsParser;
/// use std::fs::File;
/// use std::io::Read;
///
/// let mut file = File::open("00000.ts").expect("Unable to open!");
/// let mut parser = TsParser::default();
/// let mut packet = [0_u8; 188];
/// while file.read_exact(&mut packet).is_ok() {
///     parser.parse(&packet).expect("Parse Error!");
///     while let Some(unit) = parser.take_unit() {
///         println!("{:?}", unit);
///     }
/// }
/// ```
pub struct TsParser {
    pending: HashMap<u16, PidState>,
    pmt_pids: HashMap<u16, u16>,
    nit_pid: u16,
    completed: VecDeque<TsUnit>,
    max_psi_unit_len: usize,
    pub(crate) diagnostics: Diagnostics,
}

impl Default for TsParser {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            pmt_pids: HashMap::new(),
            nit_pid: PID_NIT,
            completed: VecDeque::new(),
            max_psi_unit_len: DEFAULT_MAX_PSI_UNIT_LEN,
            diagnostics: Diagnostics::default(),
        }
    }
}

impl TsParser {
    /// Parse data for exactly one 188-byte MPEG-TS packet.
    ///
    /// All information about the packet is returned as [`Packet`]. Payload units spanning
    /// multiple packets are assembled internally; completed units are queued for
    /// [`TsParser::take_unit`].
    pub fn parse<'a>(&mut self, packet: &'a [u8; TS_PACKET_LEN]) -> Result<Packet<'a>> {
        let reader = SliceReader::new(packet);
        self.parse_internal(reader)
    }

    pub(crate) fn parse_internal<'a>(&mut self, mut reader: SliceReader<'a>) -> Result<Packet<'a>> {
        let mut out = Packet {
            header: read_bitfield!(reader, PacketHeader),
            adaptation_field: None,
            payload: None,
        };
        if out.header.sync_byte() != SYNC_BYTE {
            return Err(reader.make_error(ErrorDetails::LostSync));
        }

        let pid = out.header.pid();

        /* Discard null packets early */
        if pid == PID_NULL {
            return Ok(out);
        }

        /* Read adaptation field if it exists */
        if out.header.has_adaptation_field() {
            out.adaptation_field = Some(AdaptationField::parse(&mut reader)?);
        }

        /* Read payload if it exists */
        if out.header.has_payload() {
            if out.header.tei() {
                self.diagnostics.transport_errors += 1;
                out.payload = Some(Payload::Skipped);
            } else {
                let discontinuity = out
                    .adaptation_field
                    .as_ref()
                    .map_or(false, |af| af.discontinuity);
                out.payload =
                    Some(self.read_payload(&out.header, discontinuity, pid, reader)?);
            }
        }

        Ok(out)
    }

    fn read_payload<'a>(
        &mut self,
        header: &PacketHeader,
        discontinuity: bool,
        pid: u16,
        mut reader: SliceReader<'a>,
    ) -> Result<Payload<'a>> {
        let counter = header.continuity_counter();

        if let Some(state) = self.pending.get_mut(&pid) {
            if counter == state.last_counter {
                self.diagnostics.duplicate_packets += 1;
                return Ok(Payload::Skipped);
            }
            if discontinuity || counter != (state.last_counter + 1) & 0xF {
                let stale = state.assembler.take();
                self.pending.remove(&pid);
                self.diagnostics.discontinuities += 1;
                if let Some(assembler) = stale {
                    warn!("Continuity break on PID {:x}; flushing unit early", pid);
                    self.finish_assembler(pid, assembler)?;
                }
                /* This packet begins fresh reassembly state */
                return self.start_unit(pid, counter, &mut reader);
            }
        }

        if header.pusi() {
            /* Flush the in-flight unit as the candidate complete unit */
            if let Some(assembler) = self.pending.get_mut(&pid).and_then(|s| s.assembler.take()) {
                self.finish_assembler(pid, assembler)?;
            }
            self.start_unit(pid, counter, &mut reader)
        } else {
            /* Attempt unit continuation */
            let complete = match self.pending.get_mut(&pid) {
                Some(state) => {
                    state.last_counter = counter;
                    match state.assembler.as_mut() {
                        Some(assembler) => {
                            assembler.extend_from_slice(reader.read_to_end()?)?;
                            assembler.is_complete()
                        }
                        /* Stuffing after a finished unit */
                        None => return Ok(Payload::Skipped),
                    }
                }
                None => return Ok(Payload::Raw(reader.read_to_end()?)),
            };
            if complete {
                if let Some(assembler) =
                    self.pending.get_mut(&pid).and_then(|s| s.assembler.take())
                {
                    self.finish_assembler(pid, assembler)?;
                }
            }
            Ok(Payload::Pending)
        }
    }

    fn start_unit<'a>(
        &mut self,
        pid: u16,
        counter: u8,
        reader: &mut SliceReader<'a>,
    ) -> Result<Payload<'a>> {
        let assembler = if pid == PID_PAT || self.pmt_pids.contains_key(&pid) {
            Some(Assembler::Psi(PsiAssembler::new(
                true,
                self.max_psi_unit_len,
            )))
        } else if is_si_pid(pid) || pid == self.nit_pid {
            Some(Assembler::Psi(PsiAssembler::new(
                false,
                self.max_psi_unit_len,
            )))
        } else if pid == PID_CAT {
            /* CA handling is external; track the counter, deliver nothing */
            None
        } else if reader.remaining_len() >= 6 && pes::is_pes(reader.peek_array_ref::<3>()?) {
            /* PES packet detected */
            Some(Assembler::Pes(PesAssembler::new(reader.remaining_len())))
        } else {
            /* Not enough payload for a PES packet, assume raw; raw PIDs keep no state so
             * every packet reaches the caller's handler */
            self.pending.remove(&pid);
            return Ok(Payload::Raw(reader.read_to_end()?));
        };

        match assembler {
            Some(mut assembler) => {
                assembler.extend_from_slice(reader.read_to_end()?)?;
                let complete = assembler.is_complete();
                self.pending.insert(
                    pid,
                    PidState {
                        assembler: Some(assembler),
                        last_counter: counter,
                    },
                );
                if complete {
                    if let Some(assembler) =
                        self.pending.get_mut(&pid).and_then(|s| s.assembler.take())
                    {
                        self.finish_assembler(pid, assembler)?;
                    }
                }
                Ok(Payload::Pending)
            }
            None => {
                self.pending.insert(
                    pid,
                    PidState {
                        assembler: None,
                        last_counter: counter,
                    },
                );
                Ok(Payload::Skipped)
            }
        }
    }

    fn finish_assembler(&mut self, pid: u16, assembler: Assembler) -> Result<()> {
        match assembler.finish(pid, self) {
            Ok(units) => {
                self.completed.extend(units);
                Ok(())
            }
            Err(error)
                if matches!(
                    error.details,
                    ErrorDetails::PacketOverrun(_)
                        | ErrorDetails::BadPsiHeader
                        | ErrorDetails::BadPesHeader
                ) =>
            {
                /* Truncated or mid-stream-joined units drop without stopping the stream */
                warn!("Discarding unparseable unit on PID {:x}", pid);
                self.diagnostics.dropped_units += 1;
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Updates the program map from delivered PAT sections.
    pub(crate) fn observe_psi(&mut self, pid: u16, section: &Psi) {
        if pid != PID_PAT {
            return;
        }
        if let TableData::Pat(pat) = &section.table {
            self.pmt_pids.clear();
            self.nit_pid = PID_NIT;
            for entry in &pat.entries {
                if entry.program_number == 0 {
                    self.nit_pid = entry.pid;
                } else {
                    self.pmt_pids.insert(entry.pid, entry.program_number);
                }
            }
        }
    }

    /// Takes the next completed payload unit, in completion order.
    pub fn take_unit(&mut self) -> Option<TsUnit> {
        self.completed.pop_front()
    }

    /// Finishes every in-flight unit at end of stream, queueing what parses.
    pub fn flush(&mut self) -> Result<()> {
        let pids: Vec<u16> = self
            .pending
            .iter()
            .filter(|(_, state)| state.assembler.is_some())
            .map(|(pid, _)| *pid)
            .collect();
        for pid in pids {
            if let Some(assembler) = self.pending.get_mut(&pid).and_then(|s| s.assembler.take()) {
                self.finish_assembler(pid, assembler)?;
            }
        }
        Ok(())
    }

    /// Program number a PMT PID was announced for, if any.
    pub fn program_number(&self, pmt_pid: u16) -> Option<u16> {
        self.pmt_pids.get(&pmt_pid).copied()
    }

    /// Counters of recovered anomalies.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Caps how many bytes one PSI payload unit may accumulate (default 1024).
    pub fn set_max_psi_unit_len(&mut self, max: usize) {
        self.max_psi_unit_len = max;
    }
}
