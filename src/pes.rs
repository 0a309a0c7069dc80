//! Packetized elementary stream framing: the 6-byte header, the optional header with its
//! flag-gated fields, and the payload.

use super::clock::{parse_timestamp, timestamp_markers_valid, write_timestamp, ClockReference};
use super::{read_bitfield, write_bitfield, ErrorDetails, Result, SliceReader, SliceWriter};
use log::warn;
use modular_bitfield_msb::prelude::*;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use smallvec::SmallVec;

/// Stream id of padding streams; such packets carry no optional header.
pub const STREAM_ID_PADDING: u8 = 0xBE;
/// Stream id of private stream 2; such packets carry no optional header.
pub const STREAM_ID_PRIVATE_2: u8 = 0xBF;

pub(crate) const START_CODE_PREFIX: u32 = 0x00_0001;

const PTS_DTS_NONE: u8 = 0b00;
const PTS_DTS_PTS_ONLY: u8 = 0b10;
const PTS_DTS_BOTH: u8 = 0b11;

#[bitfield]
#[derive(Debug, Clone)]
struct PesHeaderBits {
    start_code: B24,
    stream_id: B8,
    packet_length: B16,
}

#[bitfield]
#[derive(Debug, Clone)]
struct PesOptionalBits {
    marker: B2,
    scrambling_control: B2,
    priority: bool,
    data_alignment: bool,
    copyright: bool,
    original: bool,
    pts_dts_indicator: B2,
    has_escr: bool,
    has_es_rate: bool,
    has_dsm_trick_mode: bool,
    has_additional_copy_info: bool,
    has_crc: bool,
    has_extension: bool,
    header_length: B8,
}

#[bitfield]
#[derive(Debug, Clone)]
struct PesExtensionFlags {
    has_private_data: bool,
    has_pack_header: bool,
    has_sequence_counter: bool,
    has_pstd_buffer: bool,
    reserved: B3,
    has_extension2: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
enum TrickModeControl {
    FastForward = 0b000,
    SlowMotion = 0b001,
    FreezeFrame = 0b010,
    FastReverse = 0b011,
    SlowReverse = 0b100,
}

/// Field selection of a fast forward or fast reverse trick mode.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TrickModeRate {
    /// Which field(s) the decoder should display.
    pub field_id: u8,
    /// Whether intra slices may be refreshed during the trick mode.
    pub intra_slice_refresh: bool,
    /// How coefficients were restricted.
    pub frequency_truncation: u8,
}

/// DSM trick mode carried in the PES optional header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DsmTrickMode {
    /// Fast forward playback.
    FastForward(TrickModeRate),
    /// Fast reverse playback.
    FastReverse(TrickModeRate),
    /// Freeze frame; the payload selects the displayed field.
    FreezeFrame {
        /// Which field(s) the decoder should display.
        field_id: u8,
    },
    /// Slow motion playback.
    SlowMotion {
        /// How often each field is repeated.
        repeat_control: u8,
    },
    /// Slow reverse playback.
    SlowReverse {
        /// How often each field is repeated.
        repeat_control: u8,
    },
    /// Reserved control value; payload bits preserved.
    Reserved {
        /// The 3-bit trick mode control.
        control: u8,
        /// The remaining 5 bits.
        bits: u8,
    },
}

impl DsmTrickMode {
    fn parse(byte: u8) -> Self {
        let control = byte >> 5;
        let bits = byte & 0x1F;
        match TrickModeControl::from_u8(control) {
            Some(TrickModeControl::FastForward) => Self::FastForward(TrickModeRate::from_bits(bits)),
            Some(TrickModeControl::FastReverse) => Self::FastReverse(TrickModeRate::from_bits(bits)),
            Some(TrickModeControl::FreezeFrame) => Self::FreezeFrame {
                field_id: bits >> 3,
            },
            Some(TrickModeControl::SlowMotion) => Self::SlowMotion {
                repeat_control: bits,
            },
            Some(TrickModeControl::SlowReverse) => Self::SlowReverse {
                repeat_control: bits,
            },
            None => Self::Reserved { control, bits },
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::FastForward(rate) => (TrickModeControl::FastForward as u8) << 5 | rate.to_bits(),
            Self::FastReverse(rate) => (TrickModeControl::FastReverse as u8) << 5 | rate.to_bits(),
            Self::FreezeFrame { field_id } => {
                (TrickModeControl::FreezeFrame as u8) << 5 | (field_id & 0x3) << 3 | 0b111
            }
            Self::SlowMotion { repeat_control } => {
                (TrickModeControl::SlowMotion as u8) << 5 | repeat_control & 0x1F
            }
            Self::SlowReverse { repeat_control } => {
                (TrickModeControl::SlowReverse as u8) << 5 | repeat_control & 0x1F
            }
            Self::Reserved { control, bits } => control << 5 | bits & 0x1F,
        }
    }
}

impl TrickModeRate {
    fn from_bits(bits: u8) -> Self {
        Self {
            field_id: bits >> 3,
            intra_slice_refresh: bits & 0x4 != 0,
            frequency_truncation: bits & 0x3,
        }
    }

    fn to_bits(self) -> u8 {
        (self.field_id & 0x3) << 3
            | (self.intra_slice_refresh as u8) << 2
            | self.frequency_truncation & 0x3
    }
}

/// Program packet sequence counter from the PES extension.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PesSequenceCounter {
    /// 7-bit packet counter.
    pub counter: u8,
    /// Set when the original material was an MPEG-1 system stream.
    pub mpeg1: bool,
    /// Stuffing length used in the original packet header.
    pub original_stuff_length: u8,
}

/// P-STD buffer description from the PES extension.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PStdBuffer {
    /// Buffer size scale: 1024-byte units when set, 128-byte units otherwise.
    pub scale: bool,
    /// 13-bit buffer size.
    pub size: u16,
}

/// PES extension: the fields gated by the extension flag of the optional header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PesExtension {
    /// 16 bytes of private data.
    pub private_data: Option<[u8; 16]>,
    /// Pack header bytes, preserved verbatim.
    pub pack_header: Option<SmallVec<[u8; 8]>>,
    /// Program packet sequence counter.
    pub sequence_counter: Option<PesSequenceCounter>,
    /// P-STD buffer description.
    pub pstd_buffer: Option<PStdBuffer>,
    /// Extension field 2 payload, preserved verbatim.
    pub extension2: Option<SmallVec<[u8; 8]>>,
}

impl PesExtension {
    fn parse(reader: &mut SliceReader) -> Result<Self> {
        let flags = read_bitfield!(reader, PesExtensionFlags);
        let mut out = Self::default();
        if flags.has_private_data() {
            out.private_data = Some(*reader.read_array_ref::<16>()?);
        }
        if flags.has_pack_header() {
            let length = reader.read_u8()? as usize;
            out.pack_header = Some(SmallVec::from_slice(reader.read(length)?));
        }
        if flags.has_sequence_counter() {
            let bytes = reader.read_array_ref::<2>()?;
            out.sequence_counter = Some(PesSequenceCounter {
                counter: bytes[0] & 0x7F,
                mpeg1: bytes[1] & 0x40 != 0,
                original_stuff_length: bytes[1] & 0x3F,
            });
        }
        if flags.has_pstd_buffer() {
            let raw = reader.read_be_u16()?;
            out.pstd_buffer = Some(PStdBuffer {
                scale: raw & 0x2000 != 0,
                size: raw & 0x1FFF,
            });
        }
        if flags.has_extension2() {
            let length = (reader.read_u8()? & 0x7F) as usize;
            out.extension2 = Some(SmallVec::from_slice(reader.read(length)?));
        }
        Ok(out)
    }

    fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        write_bitfield!(
            writer,
            PesExtensionFlags::new()
                .with_has_private_data(self.private_data.is_some())
                .with_has_pack_header(self.pack_header.is_some())
                .with_has_sequence_counter(self.sequence_counter.is_some())
                .with_has_pstd_buffer(self.pstd_buffer.is_some())
                .with_reserved(0b111)
                .with_has_extension2(self.extension2.is_some())
        );
        if let Some(private_data) = &self.private_data {
            writer.write(private_data)?;
        }
        if let Some(pack_header) = &self.pack_header {
            writer.write_u8(pack_header.len() as u8)?;
            writer.write(pack_header)?;
        }
        if let Some(counter) = &self.sequence_counter {
            writer.write_u8(0x80 | counter.counter & 0x7F)?;
            writer.write_u8(
                0x80 | (counter.mpeg1 as u8) << 6 | counter.original_stuff_length & 0x3F,
            )?;
        }
        if let Some(pstd) = &self.pstd_buffer {
            writer.write_be_u16(0x4000 | (pstd.scale as u16) << 13 | pstd.size & 0x1FFF)?;
        }
        if let Some(extension2) = &self.extension2 {
            writer.write_u8(0x80 | extension2.len() as u8)?;
            writer.write(extension2)?;
        }
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        1 + self.private_data.map_or(0, |_| 16)
            + self.pack_header.as_ref().map_or(0, |p| 1 + p.len())
            + self.sequence_counter.map_or(0, |_| 2)
            + self.pstd_buffer.map_or(0, |_| 2)
            + self.extension2.as_ref().map_or(0, |e| 1 + e.len())
    }
}

fn parse_escr(b: &[u8; 6]) -> ClockReference {
    let mut v = 0_u64;
    for byte in b {
        v = v << 8 | u64::from(*byte);
    }
    let base = ((v >> 43) & 0x7) << 30 | ((v >> 27) & 0x7FFF) << 15 | (v >> 11) & 0x7FFF;
    ClockReference {
        base,
        extension: ((v >> 1) & 0x1FF) as u16,
    }
}

fn write_escr(escr: &ClockReference) -> [u8; 6] {
    let mut v = 0b11_u64 << 46;
    v |= ((escr.base >> 30) & 0x7) << 43;
    v |= 1 << 42;
    v |= ((escr.base >> 15) & 0x7FFF) << 27;
    v |= 1 << 26;
    v |= (escr.base & 0x7FFF) << 11;
    v |= 1 << 10;
    v |= u64::from(escr.extension & 0x1FF) << 1;
    v |= 1;
    let bytes = v.to_be_bytes();
    [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]]
}

/// Optional PES header: flag bits plus every field the flags gate.
///
/// `stuffing` is the number of 0xFF filler bytes between the last field and the end of the
/// declared header length, preserved so re-encoding keeps the original data offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PesOptional {
    /// 2-bit scrambling control.
    pub scrambling_control: u8,
    /// PES priority bit.
    pub priority: bool,
    /// Whether the payload starts at an access unit boundary.
    pub data_alignment: bool,
    /// Copyright flag.
    pub copyright: bool,
    /// Original (not a copy) flag.
    pub original: bool,
    /// Presentation timestamp in 90kHz ticks.
    pub pts: Option<u64>,
    /// Decode timestamp in 90kHz ticks; only valid alongside a PTS.
    pub dts: Option<u64>,
    /// Elementary stream clock reference.
    pub escr: Option<ClockReference>,
    /// Elementary stream rate in 50-byte/s units.
    pub es_rate: Option<u32>,
    /// DSM trick mode.
    pub trick_mode: Option<DsmTrickMode>,
    /// 7-bit additional copy info.
    pub additional_copy_info: Option<u8>,
    /// CRC of the previous PES packet.
    pub previous_crc: Option<u16>,
    /// PES extension.
    pub extension: Option<PesExtension>,
    /// Header stuffing byte count.
    pub stuffing: u8,
}

impl PesOptional {
    /// Builds an optional header carrying just a PTS.
    pub fn with_pts(pts: u64) -> Self {
        Self {
            pts: Some(pts),
            ..Self::default()
        }
    }

    /// Builds an optional header carrying a PTS and a DTS.
    pub fn with_pts_dts(pts: u64, dts: u64) -> Self {
        Self {
            pts: Some(pts),
            dts: Some(dts),
            ..Self::default()
        }
    }

    fn pts_dts_indicator(&self) -> u8 {
        match (self.pts.is_some(), self.dts.is_some()) {
            (true, true) => PTS_DTS_BOTH,
            (true, false) => PTS_DTS_PTS_ONLY,
            _ => PTS_DTS_NONE,
        }
    }

    fn parse(reader: &mut SliceReader) -> Result<Self> {
        let bits = read_bitfield!(reader, PesOptionalBits);
        if bits.marker() != 0b10 {
            warn!("Bad PES optional header marker");
            return Err(reader.make_error(ErrorDetails::BadPesHeader));
        }
        let mut out = Self {
            scrambling_control: bits.scrambling_control(),
            priority: bits.priority(),
            data_alignment: bits.data_alignment(),
            copyright: bits.copyright(),
            original: bits.original(),
            ..Self::default()
        };
        let mut o_reader = reader.new_sub_reader(bits.header_length() as usize)?;
        match bits.pts_dts_indicator() {
            PTS_DTS_NONE => {}
            PTS_DTS_PTS_ONLY => {
                out.pts = Some(read_checked_timestamp(&mut o_reader, 0b0010)?);
            }
            PTS_DTS_BOTH => {
                out.pts = Some(read_checked_timestamp(&mut o_reader, 0b0011)?);
                out.dts = Some(read_checked_timestamp(&mut o_reader, 0b0001)?);
            }
            _ => {
                // Indicator 01 is forbidden.
                warn!("Forbidden PTS/DTS indicator");
                return Err(o_reader.make_error(ErrorDetails::BadPesHeader));
            }
        }
        if bits.has_escr() {
            out.escr = Some(parse_escr(o_reader.read_array_ref::<6>()?));
        }
        if bits.has_es_rate() {
            out.es_rate = Some(o_reader.read_be_u24()? >> 1 & 0x3F_FFFF);
        }
        if bits.has_dsm_trick_mode() {
            out.trick_mode = Some(DsmTrickMode::parse(o_reader.read_u8()?));
        }
        if bits.has_additional_copy_info() {
            out.additional_copy_info = Some(o_reader.read_u8()? & 0x7F);
        }
        if bits.has_crc() {
            out.previous_crc = Some(o_reader.read_be_u16()?);
        }
        if bits.has_extension() {
            out.extension = Some(PesExtension::parse(&mut o_reader)?);
        }
        out.stuffing = o_reader.remaining_len() as u8;
        o_reader.skip(o_reader.remaining_len())?;
        Ok(out)
    }

    fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        let header_length = self.header_length();
        if header_length > u8::MAX as usize {
            return Err(writer.make_error(ErrorDetails::InvalidLength(header_length)));
        }
        write_bitfield!(
            writer,
            PesOptionalBits::new()
                .with_marker(0b10)
                .with_scrambling_control(self.scrambling_control)
                .with_priority(self.priority)
                .with_data_alignment(self.data_alignment)
                .with_copyright(self.copyright)
                .with_original(self.original)
                .with_pts_dts_indicator(self.pts_dts_indicator())
                .with_has_escr(self.escr.is_some())
                .with_has_es_rate(self.es_rate.is_some())
                .with_has_dsm_trick_mode(self.trick_mode.is_some())
                .with_has_additional_copy_info(self.additional_copy_info.is_some())
                .with_has_crc(self.previous_crc.is_some())
                .with_has_extension(self.extension.is_some())
                .with_header_length(header_length as u8)
        );
        match self.pts_dts_indicator() {
            PTS_DTS_PTS_ONLY => {
                writer.write(&write_timestamp(0b0010, self.pts.unwrap_or_default()))?;
            }
            PTS_DTS_BOTH => {
                writer.write(&write_timestamp(0b0011, self.pts.unwrap_or_default()))?;
                writer.write(&write_timestamp(0b0001, self.dts.unwrap_or_default()))?;
            }
            _ => {}
        }
        if let Some(escr) = &self.escr {
            writer.write(&write_escr(escr))?;
        }
        if let Some(es_rate) = &self.es_rate {
            writer.write_be_u24(0x80_0000 | (es_rate & 0x3F_FFFF) << 1 | 0x1)?;
        }
        if let Some(trick_mode) = &self.trick_mode {
            writer.write_u8(trick_mode.to_byte())?;
        }
        if let Some(additional_copy_info) = &self.additional_copy_info {
            writer.write_u8(0x80 | additional_copy_info & 0x7F)?;
        }
        if let Some(previous_crc) = &self.previous_crc {
            writer.write_be_u16(*previous_crc)?;
        }
        if let Some(extension) = &self.extension {
            extension.write(writer)?;
        }
        writer.fill(self.stuffing as usize, 0xFF)
    }

    fn header_length(&self) -> usize {
        let timestamps = match self.pts_dts_indicator() {
            PTS_DTS_PTS_ONLY => 5,
            PTS_DTS_BOTH => 10,
            _ => 0,
        };
        timestamps
            + self.escr.map_or(0, |_| 6)
            + self.es_rate.map_or(0, |_| 3)
            + self.trick_mode.map_or(0, |_| 1)
            + self.additional_copy_info.map_or(0, |_| 1)
            + self.previous_crc.map_or(0, |_| 2)
            + self.extension.as_ref().map_or(0, |e| e.encoded_len())
            + self.stuffing as usize
    }

    /// Encoded size: flag bytes, header length byte and every gated field.
    pub fn encoded_len(&self) -> usize {
        3 + self.header_length()
    }
}

fn read_checked_timestamp(reader: &mut SliceReader, nibble: u8) -> Result<u64> {
    let bytes = reader.read_array_ref::<5>()?;
    if bytes[0] >> 4 != nibble || !timestamp_markers_valid(bytes) {
        warn!("Bad timestamp markers in PES header");
        return Err(reader.make_error(ErrorDetails::BadPesHeader));
    }
    Ok(parse_timestamp(bytes))
}

/// The fixed PES header plus the optional header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PesHeader {
    /// Stream id following the start code prefix.
    pub stream_id: u8,
    /// Declared packet length; 0 means the payload runs to the end of the enclosing framing
    /// (legal only for video streams). Recomputed on write when nonzero.
    pub packet_length: u16,
    /// Optional header; absent for padding and private-2 streams.
    pub optional: Option<PesOptional>,
}

impl PesHeader {
    /// Encoded size of start code, fixed header and optional header.
    pub fn encoded_len(&self) -> usize {
        6 + self.optional.as_ref().map_or(0, PesOptional::encoded_len)
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter, payload_len: usize) -> Result<()> {
        let packet_length = if self.packet_length == 0 {
            0
        } else {
            let computed =
                self.optional.as_ref().map_or(0, PesOptional::encoded_len) + payload_len;
            if computed > u16::MAX as usize {
                return Err(writer.make_error(ErrorDetails::InvalidLength(computed)));
            }
            computed as u16
        };
        write_bitfield!(
            writer,
            PesHeaderBits::new()
                .with_start_code(START_CODE_PREFIX)
                .with_stream_id(self.stream_id)
                .with_packet_length(packet_length)
        );
        if let Some(optional) = &self.optional {
            optional.write(writer)?;
        }
        Ok(())
    }
}

/// One whole PES packet: header and payload bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pes {
    /// Fixed and optional header.
    pub header: PesHeader,
    /// Payload bytes.
    pub data: Vec<u8>,
}

impl Pes {
    /// Parses a PES packet from an assembled buffer starting at the 24-bit start code prefix.
    ///
    /// When the declared packet length is 0 the payload runs to the end of the buffer.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = SliceReader::new(data);
        let bits = read_bitfield!(reader, PesHeaderBits);
        if bits.start_code() != START_CODE_PREFIX {
            warn!("Bad PES start code prefix");
            return Err(reader.make_error(ErrorDetails::BadPesHeader));
        }
        let stream_id = bits.stream_id();
        let packet_length = bits.packet_length();
        let mut p_reader = if packet_length == 0 {
            reader.new_sub_reader(reader.remaining_len())?
        } else {
            // Tolerate a short buffer: a unit flushed at a boundary may be truncated.
            reader.new_sub_reader((packet_length as usize).min(reader.remaining_len()))?
        };
        let optional = if stream_id == STREAM_ID_PADDING || stream_id == STREAM_ID_PRIVATE_2 {
            None
        } else {
            Some(PesOptional::parse(&mut p_reader)?)
        };
        Ok(Self {
            header: PesHeader {
                stream_id,
                packet_length,
                optional,
            },
            data: p_reader.read_to_end()?.to_vec(),
        })
    }

    /// Serializes the whole packet.
    pub fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        self.header.write(writer, self.data.len())?;
        writer.write(&self.data)
    }

    /// Encoded size of header plus payload.
    pub fn encoded_len(&self) -> usize {
        self.header.encoded_len() + self.data.len()
    }

    /// Presentation timestamp, when the optional header carries one.
    pub fn pts(&self) -> Option<u64> {
        self.header.optional.as_ref().and_then(|o| o.pts)
    }

    /// Decode timestamp, when the optional header carries one.
    pub fn dts(&self) -> Option<u64> {
        self.header.optional.as_ref().and_then(|o| o.dts)
    }
}

/// Whether an assembled payload begins with the PES start code prefix.
pub(crate) fn is_pes(b: &[u8; 3]) -> bool {
    b[0] == 0 && b[1] == 0 && b[2] == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(pes: &Pes) -> Vec<u8> {
        let mut buf = vec![0_u8; pes.encoded_len()];
        let mut writer = SliceWriter::new(&mut buf);
        pes.write(&mut writer).unwrap();
        assert_eq!(writer.remaining_len(), 0);
        let reparsed = Pes::parse(&buf).unwrap();
        // A nonzero packet length is recomputed on write.
        let mut expected = pes.clone();
        if expected.header.packet_length != 0 {
            expected.header.packet_length =
                (expected.header.encoded_len() - 6 + expected.data.len()) as u16;
        }
        assert_eq!(reparsed, expected);
        buf
    }

    #[test]
    fn test_pts_layout() {
        let pes = Pes {
            header: PesHeader {
                stream_id: 0xE0,
                packet_length: 1,
                optional: Some(PesOptional::with_pts(5_726_623_061)),
            },
            data: vec![0x42; 16],
        };
        let bytes = round_trip(&pes);
        // PTS begins after start code (3), stream id (1), length (2) and 3 optional header
        // bytes; its flag nibble for the PTS-only indicator is 0b0010.
        assert_eq!(bytes[9] >> 4, 0b0010);
        assert_eq!(bytes[9] & 0x1, 0x1);
        assert_eq!(bytes[11] & 0x1, 0x1);
        assert_eq!(bytes[13] & 0x1, 0x1);
    }

    #[test]
    fn test_pts_dts_nibbles() {
        let pes = Pes {
            header: PesHeader {
                stream_id: 0xE0,
                packet_length: 1,
                optional: Some(PesOptional::with_pts_dts(90_000, 87_000)),
            },
            data: vec![1, 2, 3],
        };
        let bytes = round_trip(&pes);
        assert_eq!(bytes[9] >> 4, 0b0011);
        assert_eq!(bytes[14] >> 4, 0b0001);
        assert_eq!(Pes::parse(&bytes).unwrap().dts(), Some(87_000));
    }

    #[test]
    fn test_full_optional_header() {
        let pes = Pes {
            header: PesHeader {
                stream_id: 0xC0,
                packet_length: 1,
                optional: Some(PesOptional {
                    scrambling_control: 0,
                    priority: true,
                    data_alignment: true,
                    copyright: false,
                    original: true,
                    pts: Some(0x1_0000_0000),
                    dts: Some(0xFFFF_FFFF),
                    escr: Some(ClockReference {
                        base: 0x1_2345_6789,
                        extension: 0x1FF,
                    }),
                    es_rate: Some(0x2A_AAAA),
                    trick_mode: Some(DsmTrickMode::FastForward(TrickModeRate {
                        field_id: 0b10,
                        intra_slice_refresh: true,
                        frequency_truncation: 0b01,
                    })),
                    additional_copy_info: Some(0x55),
                    previous_crc: Some(0xBEEF),
                    extension: Some(PesExtension {
                        private_data: Some([0xAB; 16]),
                        pack_header: Some(SmallVec::from_slice(&[0xDE, 0xAD])),
                        sequence_counter: Some(PesSequenceCounter {
                            counter: 0x12,
                            mpeg1: true,
                            original_stuff_length: 0x07,
                        }),
                        pstd_buffer: Some(PStdBuffer {
                            scale: true,
                            size: 0x1234,
                        }),
                        extension2: Some(SmallVec::from_slice(&[0x01, 0x02, 0x03])),
                    }),
                    stuffing: 4,
                }),
            },
            data: vec![0x11; 32],
        };
        round_trip(&pes);
    }

    #[test]
    fn test_trick_modes() {
        for trick_mode in &[
            DsmTrickMode::FastReverse(TrickModeRate::from_bits(0b11011)),
            DsmTrickMode::FreezeFrame { field_id: 0b01 },
            DsmTrickMode::SlowMotion {
                repeat_control: 0b10101,
            },
            DsmTrickMode::SlowReverse {
                repeat_control: 0b00001,
            },
            DsmTrickMode::Reserved {
                control: 0b110,
                bits: 0b01010,
            },
        ] {
            assert_eq!(DsmTrickMode::parse(trick_mode.to_byte()), *trick_mode);
        }
    }

    #[test]
    fn test_unbounded_video_length() {
        let pes = Pes {
            header: PesHeader {
                stream_id: 0xE0,
                packet_length: 0,
                optional: Some(PesOptional::default()),
            },
            data: vec![0x99; 4096],
        };
        let bytes = round_trip(&pes);
        assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]), 0);
    }

    #[test]
    fn test_padding_stream_has_no_optional_header() {
        let mut bytes = vec![0x00, 0x00, 0x01, STREAM_ID_PADDING, 0x00, 0x04];
        bytes.extend_from_slice(&[0xFF; 4]);
        let pes = Pes::parse(&bytes).unwrap();
        assert!(pes.header.optional.is_none());
        assert_eq!(pes.data, vec![0xFF; 4]);
    }

    #[test]
    fn test_bad_marker_bits_rejected() {
        // Optional header first byte 0x00: marker bits are 00 rather than 10.
        let bytes = [0x00, 0x00, 0x01, 0xE0, 0x00, 0x03, 0x00, 0x00, 0x00];
        let error = Pes::parse(&bytes).unwrap_err();
        assert!(matches!(error.details, ErrorDetails::BadPesHeader));
    }

    #[test]
    fn test_forbidden_pts_dts_indicator_rejected() {
        // Second flag byte 0x40: PTS/DTS indicator 01.
        let bytes = [0x00, 0x00, 0x01, 0xE0, 0x00, 0x03, 0x80, 0x40, 0x00];
        let error = Pes::parse(&bytes).unwrap_err();
        assert!(matches!(error.details, ErrorDetails::BadPesHeader));
    }

    #[test]
    fn test_escr_round_trip() {
        let escr = ClockReference {
            base: 0x0_FEDC_BA98,
            extension: 0x15A,
        };
        assert_eq!(parse_escr(&write_escr(&escr)), escr);
    }
}
