use super::clock::{parse_pcr, parse_timestamp, write_pcr, write_timestamp, ClockReference};
use super::{read_bitfield, write_bitfield, ErrorDetails, Result, SliceReader, SliceWriter};
use log::warn;
use modular_bitfield_msb::prelude::*;
use smallvec::SmallVec;

/// Flags byte of an adaptation field, following the length byte.
#[bitfield]
#[derive(Debug, Clone)]
pub(crate) struct AdaptationFlags {
    pub discontinuity: bool,
    pub random_access: bool,
    pub es_priority: bool,
    pub has_pcr: bool,
    pub has_opcr: bool,
    pub has_splice_countdown: bool,
    pub has_private_data: bool,
    pub has_extension: bool,
}

#[bitfield]
#[derive(Debug, Clone)]
struct AdaptationExtensionFlags {
    has_ltw: bool,
    has_piecewise_rate: bool,
    has_seamless_splice: bool,
    reserved: B5,
}

/// Legal time window carried in the adaptation field extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LegalTimeWindow {
    /// Whether the offset below is valid.
    pub valid: bool,
    /// 15-bit offset relative to the PCR.
    pub offset: u16,
}

/// Seamless splice point carried in the adaptation field extension.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SeamlessSplice {
    /// 4-bit splice type qualifying the splice decoding delay.
    pub splice_type: u8,
    /// 33-bit DTS of the next access unit after the splice point.
    pub dts_next_access_unit: u64,
}

/// Optional extension region at the end of the adaptation field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdaptationExtension {
    /// Legal time window, when signalled.
    pub legal_time_window: Option<LegalTimeWindow>,
    /// 22-bit piecewise rate, when signalled.
    pub piecewise_rate: Option<u32>,
    /// Seamless splice point, when signalled.
    pub seamless_splice: Option<SeamlessSplice>,
    /// Reserved bytes trailing the signalled fields, preserved verbatim.
    pub reserved: SmallVec<[u8; 4]>,
}

impl AdaptationExtension {
    fn parse(reader: &mut SliceReader) -> Result<Self> {
        let length = reader.read_u8()? as usize;
        if length < 1 {
            warn!("Bad adaptation extension length");
            return Err(reader.make_error(ErrorDetails::BadAdaptationHeader));
        }
        let mut e_reader = reader.new_sub_reader(length)?;
        let flags = read_bitfield!(e_reader, AdaptationExtensionFlags);
        let mut out = Self::default();
        if flags.has_ltw() {
            let raw = u16::from_be_bytes(*e_reader.read_array_ref::<2>()?);
            out.legal_time_window = Some(LegalTimeWindow {
                valid: raw & 0x8000 != 0,
                offset: raw & 0x7FFF,
            });
        }
        if flags.has_piecewise_rate() {
            out.piecewise_rate = Some(e_reader.read_be_u24()? & 0x3F_FFFF);
        }
        if flags.has_seamless_splice() {
            let bytes = e_reader.read_array_ref::<5>()?;
            out.seamless_splice = Some(SeamlessSplice {
                splice_type: bytes[0] >> 4,
                dts_next_access_unit: parse_timestamp(bytes),
            });
        }
        out.reserved.extend_from_slice(e_reader.read_to_end()?);
        Ok(out)
    }

    fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write_u8((self.encoded_len() - 1) as u8)?;
        write_bitfield!(
            writer,
            AdaptationExtensionFlags::new()
                .with_has_ltw(self.legal_time_window.is_some())
                .with_has_piecewise_rate(self.piecewise_rate.is_some())
                .with_has_seamless_splice(self.seamless_splice.is_some())
                .with_reserved(0b11111)
        );
        if let Some(ltw) = &self.legal_time_window {
            let valid_bit = if ltw.valid { 0x8000 } else { 0 };
            writer.write_be_u16(valid_bit | ltw.offset & 0x7FFF)?;
        }
        if let Some(rate) = &self.piecewise_rate {
            // Top two bits reserved.
            writer.write_be_u24(0xC0_0000 | rate & 0x3F_FFFF)?;
        }
        if let Some(splice) = &self.seamless_splice {
            writer.write(&write_timestamp(
                splice.splice_type,
                splice.dts_next_access_unit,
            ))?;
        }
        writer.write(&self.reserved)
    }

    /// Encoded size including the length byte.
    pub fn encoded_len(&self) -> usize {
        1 + 1
            + self.legal_time_window.map_or(0, |_| 2)
            + self.piecewise_rate.map_or(0, |_| 3)
            + self.seamless_splice.map_or(0, |_| 5)
            + self.reserved.len()
    }
}

/// Non-payload packet metadata.
///
/// `length` is the wire value of the adaptation field length byte and is the single source of
/// truth for the stuffing amount: stuffing bytes fill the gap between the signalled fields and
/// `length`. [`AdaptationField::pad_to`] and [`AdaptationField::stuffing`] size it for writing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdaptationField {
    /// Number of bytes following the length byte on the wire.
    pub length: u8,
    /// Set when the packet is the start of a timing discontinuity.
    pub discontinuity: bool,
    /// Set when the elementary stream may be randomly accessed from here.
    pub random_access: bool,
    /// Elementary stream priority indicator.
    pub es_priority: bool,
    /// Program Clock Reference.
    pub pcr: Option<ClockReference>,
    /// Original Program Clock Reference.
    pub opcr: Option<ClockReference>,
    /// Packets remaining until a splicing point; negative after it.
    pub splice_countdown: Option<i8>,
    /// Transport private data, preserved verbatim.
    pub private_data: Option<SmallVec<[u8; 8]>>,
    /// Adaptation field extension.
    pub extension: Option<AdaptationExtension>,
}

impl AdaptationField {
    /// Builds an adaptation field consisting purely of stuffing, occupying `total` bytes on the
    /// wire including the length byte. `total` must be at least 1.
    pub fn stuffing(total: usize) -> Self {
        Self {
            length: (total - 1) as u8,
            ..Self::default()
        }
    }

    /// Sizes `length` so that the whole field occupies `total` encoded bytes, adding stuffing as
    /// needed. Fails when `total` cannot hold the signalled fields.
    pub fn pad_to(mut self, total: usize) -> Result<Self> {
        if total < self.content_len() + 1 || total > 184 {
            return Err(crate::Error::new(0, ErrorDetails::BadAdaptationHeader));
        }
        self.length = (total - 1) as u8;
        Ok(self)
    }

    /// Sizes `length` to exactly the signalled fields with no stuffing.
    pub fn sized(mut self) -> Self {
        self.length = self.content_len() as u8;
        self
    }

    /// Encoded size including the length byte.
    pub fn encoded_len(&self) -> usize {
        1 + self.length as usize
    }

    /// Size of the flags byte plus every signalled field, excluding length byte and stuffing.
    pub(crate) fn content_len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        1 + self.pcr.map_or(0, |_| 6)
            + self.opcr.map_or(0, |_| 6)
            + self.splice_countdown.map_or(0, |_| 1)
            + self.private_data.as_ref().map_or(0, |p| 1 + p.len())
            + self.extension.as_ref().map_or(0, |e| e.encoded_len())
    }

    fn is_empty(&self) -> bool {
        !(self.discontinuity || self.random_access || self.es_priority)
            && self.pcr.is_none()
            && self.opcr.is_none()
            && self.splice_countdown.is_none()
            && self.private_data.is_none()
            && self.extension.is_none()
            && self.length == 0
    }

    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let length = reader.read_u8()?;
        let mut out = Self {
            length,
            ..Self::default()
        };
        if length == 0 {
            // A single stuffing byte; no flags follow.
            return Ok(out);
        }
        if length > 183 {
            warn!("Bad adaptation field length");
            return Err(reader.make_error(ErrorDetails::BadAdaptationHeader));
        }
        let mut a_reader = reader.new_sub_reader(length as usize)?;
        let flags = read_bitfield!(a_reader, AdaptationFlags);
        out.discontinuity = flags.discontinuity();
        out.random_access = flags.random_access();
        out.es_priority = flags.es_priority();
        if flags.has_pcr() {
            if a_reader.remaining_len() < 6 {
                warn!("Short read of PCR");
                return Err(a_reader.make_error(ErrorDetails::BadAdaptationHeader));
            }
            out.pcr = Some(parse_pcr(a_reader.read_array_ref::<6>()?));
        }
        if flags.has_opcr() {
            if a_reader.remaining_len() < 6 {
                warn!("Short read of OPCR");
                return Err(a_reader.make_error(ErrorDetails::BadAdaptationHeader));
            }
            out.opcr = Some(parse_pcr(a_reader.read_array_ref::<6>()?));
        }
        if flags.has_splice_countdown() {
            out.splice_countdown = Some(a_reader.read_u8()? as i8);
        }
        if flags.has_private_data() {
            let private_length = a_reader.read_u8()? as usize;
            let mut private = SmallVec::new();
            private.extend_from_slice(a_reader.read(private_length)?);
            out.private_data = Some(private);
        }
        if flags.has_extension() {
            out.extension = Some(AdaptationExtension::parse(&mut a_reader)?);
        }
        // Remainder is stuffing, accounted for by `length`.
        a_reader.skip(a_reader.remaining_len())?;
        Ok(out)
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        let content_len = self.content_len();
        if (self.length as usize) < content_len {
            warn!("Adaptation field length below signalled content");
            return Err(writer.make_error(ErrorDetails::BadAdaptationHeader));
        }
        writer.write_u8(self.length)?;
        if self.length == 0 {
            return Ok(());
        }
        write_bitfield!(
            writer,
            AdaptationFlags::new()
                .with_discontinuity(self.discontinuity)
                .with_random_access(self.random_access)
                .with_es_priority(self.es_priority)
                .with_has_pcr(self.pcr.is_some())
                .with_has_opcr(self.opcr.is_some())
                .with_has_splice_countdown(self.splice_countdown.is_some())
                .with_has_private_data(self.private_data.is_some())
                .with_has_extension(self.extension.is_some())
        );
        if let Some(pcr) = &self.pcr {
            writer.write(&write_pcr(pcr))?;
        }
        if let Some(opcr) = &self.opcr {
            writer.write(&write_pcr(opcr))?;
        }
        if let Some(splice_countdown) = self.splice_countdown {
            writer.write_u8(splice_countdown as u8)?;
        }
        if let Some(private) = &self.private_data {
            writer.write_u8(private.len() as u8)?;
            writer.write(private)?;
        }
        if let Some(extension) = &self.extension {
            extension.write(writer)?;
        }
        writer.fill(self.length as usize - content_len, 0xFF)
    }
}
