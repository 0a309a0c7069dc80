//! PSI section framing: header, optional syntax header, table payload dispatch and CRC-32.

use super::{
    read_bitfield, Diagnostics, Error, ErrorDetails, Result, SliceReader, SliceWriter, CRC,
};
use log::warn;
use modular_bitfield_msb::prelude::*;
use num_derive::FromPrimitive;
use smallvec::SmallVec;

pub mod eit;
pub mod nit;
pub mod pat;
pub mod pmt;
pub mod sdt;
pub mod tot;

pub use eit::{Eit, EitEvent};
pub use nit::{Nit, NitTransport};
pub use pat::{Pat, PatEntry};
pub use pmt::{ElementaryStream, Pmt, StreamType, PCR_PID_NONE};
pub use sdt::{Sdt, SdtService};
pub use tot::Tot;

/// Table id constants of the section kinds this crate classifies.
pub mod table_ids {
    /// Program association section.
    pub const PAT: u8 = 0x00;
    /// Program map section.
    pub const PMT: u8 = 0x02;
    /// Network information section, actual network.
    pub const NIT_ACTUAL: u8 = 0x40;
    /// Network information section, other network.
    pub const NIT_OTHER: u8 = 0x41;
    /// Service description section, actual transport stream.
    pub const SDT_ACTUAL: u8 = 0x42;
    /// Service description section, other transport stream.
    pub const SDT_OTHER: u8 = 0x46;
    /// Bouquet association section.
    pub const BAT: u8 = 0x4A;
    /// First id of the event information range.
    pub const EIT_FIRST: u8 = 0x4E;
    /// Last id of the event information range.
    pub const EIT_LAST: u8 = 0x6F;
    /// Time and date section.
    pub const TDT: u8 = 0x70;
    /// Running status section.
    pub const RST: u8 = 0x71;
    /// Stuffing section.
    pub const STUFFING: u8 = 0x72;
    /// Time offset section.
    pub const TOT: u8 = 0x73;
    /// Discontinuity information section.
    pub const DIT: u8 = 0x7E;
    /// Selection information section.
    pub const SIT: u8 = 0x7F;
    /// Null marker terminating the sections of a payload unit.
    pub const NULL: u8 = 0xFF;
}

/// Whether `table_id` belongs to the known section kinds; anything else stops the section loop.
pub fn is_known_table_id(table_id: u8) -> bool {
    matches!(
        table_id,
        table_ids::PAT
            | table_ids::PMT
            | table_ids::NIT_ACTUAL
            | table_ids::NIT_OTHER
            | table_ids::SDT_ACTUAL
            | table_ids::SDT_OTHER
            | table_ids::BAT
            | table_ids::EIT_FIRST..=table_ids::EIT_LAST
            | table_ids::TDT
            | table_ids::RST
            | table_ids::STUFFING
            | table_ids::TOT
            | table_ids::DIT
            | table_ids::SIT
    )
}

/// Whether sections with `table_id` carry the 5-byte syntax header.
pub fn has_syntax_section(table_id: u8) -> bool {
    matches!(
        table_id,
        table_ids::PAT
            | table_ids::PMT
            | table_ids::NIT_ACTUAL
            | table_ids::NIT_OTHER
            | table_ids::SDT_ACTUAL
            | table_ids::SDT_OTHER
            | table_ids::EIT_FIRST..=table_ids::EIT_LAST
    )
}

/// Whether sections with `table_id` end in a CRC-32 word.
pub fn has_crc(table_id: u8) -> bool {
    has_syntax_section(table_id) || table_id == table_ids::TOT
}

/// Longest legal value of the 12-bit section length field.
pub const MAX_SECTION_LENGTH: u16 = 1021;

#[bitfield]
#[derive(Debug, Clone)]
pub(crate) struct PsiHeaderBits {
    pub table_id: B8,
    pub section_syntax_indicator: bool,
    pub private_bit: bool,
    pub reserved: B2,
    pub section_length: B12,
}

#[bitfield]
#[derive(Debug, Clone)]
pub(crate) struct PsiSyntaxBits {
    pub table_id_extension: B16,
    pub reserved: B2,
    pub version: B5,
    pub current_next_indicator: bool,
    pub section_number: B8,
    pub last_section_number: B8,
}

/// Running status of a service or event, carried by SDT and EIT entries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum RunningStatus {
    /// Status undefined.
    Undefined = 0,
    /// Not running.
    NotRunning = 1,
    /// Starts in a few seconds.
    StartsShortly = 2,
    /// Pausing.
    Paused = 3,
    /// Running.
    Running = 4,
    /// Running but off-air.
    OffAir = 5,
}

/// Decoded section syntax header present for PAT, PMT, NIT, SDT and EIT sections.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SectionSyntax {
    /// Table id extension; its meaning depends on the table (transport stream id, program
    /// number, network id or service id).
    pub table_id_extension: u16,
    /// 5-bit version of the table, bumped on every change.
    pub version: u8,
    /// Whether this version is current (or the next one to apply).
    pub current_next_indicator: bool,
    /// Number of this section within the table.
    pub section_number: u8,
    /// Number of the last section of the table.
    pub last_section_number: u8,
}

/// Typed table payload of a PSI section.
#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    /// Program association table.
    Pat(Pat),
    /// Program map table.
    Pmt(Pmt),
    /// Network information table.
    Nit(Nit),
    /// Service description table.
    Sdt(Sdt),
    /// Event information table.
    Eit(Eit),
    /// Time offset table.
    Tot(Tot),
    /// Known section kind without a payload codec (BAT, TDT, RST, DIT, SIT); bytes preserved.
    Raw(Vec<u8>),
}

impl TableData {
    fn parse(table_id: u8, reader: &mut SliceReader) -> Result<Self> {
        Ok(match table_id {
            table_ids::PAT => Self::Pat(Pat::parse(reader)?),
            table_ids::PMT => Self::Pmt(Pmt::parse(reader)?),
            table_ids::NIT_ACTUAL | table_ids::NIT_OTHER => Self::Nit(Nit::parse(reader)?),
            table_ids::SDT_ACTUAL | table_ids::SDT_OTHER => Self::Sdt(Sdt::parse(reader)?),
            table_ids::EIT_FIRST..=table_ids::EIT_LAST => Self::Eit(Eit::parse(reader)?),
            table_ids::TOT => Self::Tot(Tot::parse(reader)?),
            _ => Self::Raw(reader.read_to_end()?.to_vec()),
        })
    }

    fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        match self {
            Self::Pat(pat) => pat.write(writer),
            Self::Pmt(pmt) => pmt.write(writer),
            Self::Nit(nit) => nit.write(writer),
            Self::Sdt(sdt) => sdt.write(writer),
            Self::Eit(eit) => eit.write(writer),
            Self::Tot(tot) => tot.write(writer),
            Self::Raw(raw) => writer.write(raw),
        }
    }

    fn body_len(&self) -> usize {
        match self {
            Self::Pat(pat) => pat.body_len(),
            Self::Pmt(pmt) => pmt.body_len(),
            Self::Nit(nit) => nit.body_len(),
            Self::Sdt(sdt) => sdt.body_len(),
            Self::Eit(eit) => eit.body_len(),
            Self::Tot(tot) => tot.body_len(),
            Self::Raw(raw) => raw.len(),
        }
    }
}

/// One parsed PSI section.
///
/// The section length and syntax indicator of the wire header are derived state and recomputed
/// on write; `table_id` stays explicit because NIT/SDT variants and the EIT range fold meaning
/// into the id itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Psi {
    /// Table id of the section.
    pub table_id: u8,
    /// The private bit from the section header.
    pub private_bit: bool,
    /// Syntax header, for the table kinds that carry one.
    pub syntax: Option<SectionSyntax>,
    /// Typed table payload.
    pub table: TableData,
}

impl Psi {
    /// Parses one section beginning at the reader's position (the table id byte), leaving the
    /// reader at the section end.
    ///
    /// CRC-bearing sections are verified; a [`PsiCrcMismatch`](ErrorDetails::PsiCrcMismatch)
    /// error still advances the reader past the section so the caller can resume at the next
    /// one.
    pub fn parse_section(reader: &mut SliceReader) -> Result<Self> {
        let header = PsiHeaderBits::from_bytes(*reader.peek_array_ref::<3>()?);
        let table_id = header.table_id();
        if !is_known_table_id(table_id) {
            return Err(reader.make_error(ErrorDetails::UnknownTable(table_id)));
        }
        let section_length = header.section_length();
        if section_length > MAX_SECTION_LENGTH {
            return Err(reader.make_error(ErrorDetails::InvalidLength(section_length as usize)));
        }
        let location = reader.location();
        let raw = reader.read(3 + section_length as usize)?;

        let with_crc = has_crc(table_id);
        if with_crc {
            if section_length < 4 {
                return Err(Error::new(
                    location,
                    ErrorDetails::InvalidLength(section_length as usize),
                ));
            }
            let crc_end = raw.len() - 4;
            let mut digest = CRC.digest();
            digest.update(&raw[..crc_end]);
            let expected = u32::from_be_bytes([
                raw[crc_end],
                raw[crc_end + 1],
                raw[crc_end + 2],
                raw[crc_end + 3],
            ]);
            if digest.finalize() != expected {
                warn!("PSI CRC mismatch for table {:#04x}", table_id);
                return Err(Error::new(location, ErrorDetails::PsiCrcMismatch));
            }
        }

        let body_end = raw.len() - if with_crc { 4 } else { 0 };
        let mut s_reader = SliceReader::new(&raw[3..body_end]);
        let syntax = if has_syntax_section(table_id) {
            if !header.section_syntax_indicator() {
                warn!("Missing syntax indicator for table {:#04x}", table_id);
                return Err(Error::new(location, ErrorDetails::BadPsiHeader));
            }
            let bits = read_bitfield!(s_reader, PsiSyntaxBits);
            Some(SectionSyntax {
                table_id_extension: bits.table_id_extension(),
                version: bits.version(),
                current_next_indicator: bits.current_next_indicator(),
                section_number: bits.section_number(),
                last_section_number: bits.last_section_number(),
            })
        } else {
            None
        };
        let table = TableData::parse(table_id, &mut s_reader)?;
        Ok(Self {
            table_id,
            private_bit: header.private_bit(),
            syntax,
            table,
        })
    }

    /// Serializes header, syntax header, payload and (for CRC-bearing tables) the CRC word.
    pub fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        let section_length = self.section_length();
        if section_length > MAX_SECTION_LENGTH as usize {
            return Err(writer.make_error(ErrorDetails::InvalidLength(section_length)));
        }
        let start = writer.location();
        writer.write(
            &PsiHeaderBits::new()
                .with_table_id(self.table_id)
                .with_section_syntax_indicator(self.syntax.is_some())
                .with_private_bit(self.private_bit)
                .with_reserved(0b11)
                .with_section_length(section_length as u16)
                .into_bytes(),
        )?;
        if let Some(syntax) = &self.syntax {
            writer.write(
                &PsiSyntaxBits::new()
                    .with_table_id_extension(syntax.table_id_extension)
                    .with_reserved(0b11)
                    .with_version(syntax.version)
                    .with_current_next_indicator(syntax.current_next_indicator)
                    .with_section_number(syntax.section_number)
                    .with_last_section_number(syntax.last_section_number)
                    .into_bytes(),
            )?;
        }
        self.table.write(writer)?;
        if has_crc(self.table_id) {
            let mut digest = CRC.digest();
            digest.update(&writer.written()[start..]);
            let crc = digest.finalize();
            writer.write_be_u32(crc)?;
        }
        Ok(())
    }

    /// Value of the 12-bit section length field for the current payload.
    pub fn section_length(&self) -> usize {
        self.syntax.map_or(0, |_| 5)
            + self.table.body_len()
            + if has_crc(self.table_id) { 4 } else { 0 }
    }

    /// Encoded size of the whole section including the 3 header bytes.
    pub fn encoded_len(&self) -> usize {
        3 + self.section_length()
    }
}

/// Parses an assembled PSI payload unit: the pointer field, its filler bytes, then every section
/// until the null table id or the end of the buffer.
///
/// Sections failing their CRC check are skipped (counted in `diagnostics`), as are stuffing
/// sections; an unknown table id stops the loop.
pub(crate) fn parse_psi_unit(
    data: &[u8],
    diagnostics: &mut Diagnostics,
) -> Result<SmallVec<[Psi; 2]>> {
    let mut reader = SliceReader::new(data);
    let pointer_field = reader.read_u8()? as usize;
    reader.skip(pointer_field)?;

    let mut out = SmallVec::new();
    while reader.remaining_len() > 0 {
        let table_id = reader.peek(1)?[0];
        if table_id == table_ids::NULL {
            break;
        }
        if !is_known_table_id(table_id) {
            warn!("Stopping section loop at unknown table {:#04x}", table_id);
            diagnostics.unknown_tables += 1;
            break;
        }
        if reader.remaining_len() < 3 {
            return Err(reader.make_error(ErrorDetails::BadPsiHeader));
        }
        match Psi::parse_section(&mut reader) {
            Ok(psi) => {
                if psi.table_id != table_ids::STUFFING {
                    out.push(psi);
                }
            }
            Err(error) if matches!(error.details, ErrorDetails::PsiCrcMismatch) => {
                diagnostics.crc_mismatches += 1;
            }
            Err(error) => return Err(error),
        }
    }
    Ok(out)
}

/// Whether `data` holds a complete set of sections: a full pointer prefix and, for every section
/// started, all of its declared length.
pub(crate) fn is_psi_unit_complete(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let mut offset = 1 + data[0] as usize;
    loop {
        if offset >= data.len() {
            return offset == data.len();
        }
        if data[offset] == table_ids::NULL {
            return true;
        }
        if offset + 3 > data.len() {
            return false;
        }
        let section_length = ((data[offset + 1] & 0x0F) as usize) << 8 | data[offset + 2] as usize;
        offset += 3 + section_length;
        if offset > data.len() {
            return false;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::descriptors::Descriptor;

    /// PAT section carrying program 1 on PID 0x1000.
    pub(crate) const PAT_BYTES: [u8; 16] = [
        0x00, 0xB0, 0x0D, 0x00, 0x01, 0xE1, 0x00, 0x00, 0x00, 0x01, 0xF0, 0x00, 0xE2, 0x95, 0xF6,
        0x9D,
    ];

    /// PMT section for program 1: stream 0x1B on PID 0x100 (PCR), stream 0x0F on PID 0x104 with
    /// a Russian ISO 639 descriptor.
    pub(crate) const PMT_BYTES: [u8; 32] = [
        0x02, 0xB0, 0x1D, 0x00, 0x01, 0xF5, 0x00, 0x00, 0xE1, 0x00, 0xF0, 0x00, 0x1B, 0xE1, 0x00,
        0x00, 0x00, 0x0F, 0xE1, 0x04, 0x00, 0x06, 0x0A, 0x04, 0x72, 0x75, 0x73, 0x00, 0x38, 0x92,
        0x85, 0xAC,
    ];

    fn parse_one(bytes: &[u8]) -> Psi {
        let mut reader = SliceReader::new(bytes);
        let psi = Psi::parse_section(&mut reader).unwrap();
        assert_eq!(reader.remaining_len(), 0);
        psi
    }

    fn write_section(psi: &Psi) -> Vec<u8> {
        let mut buf = [0_u8; 1024 + 3];
        let mut writer = SliceWriter::new(&mut buf);
        psi.write(&mut writer).unwrap();
        writer.written().to_vec()
    }

    #[test]
    fn test_pat_decode() {
        let psi = parse_one(&PAT_BYTES);
        assert_eq!(psi.table_id, table_ids::PAT);
        let syntax = psi.syntax.unwrap();
        assert_eq!(syntax.table_id_extension, 1);
        match &psi.table {
            TableData::Pat(pat) => {
                assert_eq!(pat.entries.len(), 1);
                assert_eq!(pat.entries[0].program_number, 1);
                assert_eq!(pat.entries[0].pid, 0x1000);
            }
            other => panic!("unexpected table: {:?}", other),
        }
    }

    #[test]
    fn test_pat_round_trip() {
        let psi = parse_one(&PAT_BYTES);
        assert_eq!(write_section(&psi), &PAT_BYTES);
    }

    #[test]
    fn test_pmt_decode() {
        let psi = parse_one(&PMT_BYTES);
        assert_eq!(psi.table_id, table_ids::PMT);
        let syntax = psi.syntax.unwrap();
        assert_eq!(syntax.table_id_extension, 1);
        assert_eq!(syntax.version, 26);
        match &psi.table {
            TableData::Pmt(pmt) => {
                assert_eq!(pmt.pcr_pid, 0x100);
                assert_eq!(pmt.streams.len(), 2);
                assert_eq!(pmt.streams[0].stream_type, 0x1B);
                assert_eq!(pmt.streams[0].pid, 0x100);
                assert!(pmt.streams[0].descriptors.is_empty());
                assert_eq!(pmt.streams[1].stream_type, 0x0F);
                assert_eq!(pmt.streams[1].pid, 0x104);
                match &pmt.streams[1].descriptors.descriptors[0] {
                    Descriptor::Iso639Language(iso) => {
                        assert_eq!(iso.entries[0].language.as_slice(), b"rus");
                        assert_eq!(iso.entries[0].audio_type, 0);
                    }
                    other => panic!("unexpected descriptor: {:?}", other),
                }
            }
            other => panic!("unexpected table: {:?}", other),
        }
    }

    #[test]
    fn test_pmt_round_trip() {
        let psi = parse_one(&PMT_BYTES);
        assert_eq!(write_section(&psi), &PMT_BYTES);
    }

    #[test]
    fn test_crc_rejected_on_any_bit_flip() {
        // The CRC-covered region is everything ahead of the CRC word.
        for bit in 0..(PAT_BYTES.len() * 8) {
            let mut corrupted = PAT_BYTES;
            corrupted[bit / 8] ^= 1 << (bit % 8);
            let mut reader = SliceReader::new(&corrupted);
            match Psi::parse_section(&mut reader) {
                Err(error) => {
                    // Bit flips in length or table id fields may fail differently; flips in
                    // the covered payload must fail the checksum.
                    if bit >= 3 * 8 && bit < 12 * 8 {
                        assert!(
                            matches!(error.details, ErrorDetails::PsiCrcMismatch),
                            "bit {}: {:?}",
                            bit,
                            error
                        );
                    }
                }
                Ok(_) => panic!("bit flip at {} went unnoticed", bit),
            }
        }
    }

    #[test]
    fn test_section_length_bound() {
        let mut header = [0_u8; 3];
        header[0] = table_ids::PMT;
        header[1] = 0xB3; // syntax indicator + length 0x3FE
        header[2] = 0xFE;
        let mut reader = SliceReader::new(&header);
        let error = Psi::parse_section(&mut reader).unwrap_err();
        assert!(matches!(error.details, ErrorDetails::InvalidLength(1022)));
    }

    #[test]
    fn test_unit_parse_skips_bad_crc_section() {
        let mut unit = vec![0x00]; // pointer field
        let mut corrupted = PAT_BYTES;
        corrupted[4] ^= 0x01; // flip inside the covered region
        unit.extend_from_slice(&corrupted);
        unit.extend_from_slice(&PMT_BYTES);
        unit.push(0xFF);
        let mut diagnostics = Diagnostics::default();
        let sections = parse_psi_unit(&unit, &mut diagnostics).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].table_id, table_ids::PMT);
        assert_eq!(diagnostics.crc_mismatches, 1);
    }

    #[test]
    fn test_unit_completeness_probe() {
        let mut unit = vec![0x00];
        unit.extend_from_slice(&PAT_BYTES);
        assert!(is_psi_unit_complete(&unit));
        assert!(!is_psi_unit_complete(&unit[..10]));
        unit.push(0xFF);
        unit.push(0xFF);
        assert!(is_psi_unit_complete(&unit));
    }

    #[test]
    fn test_tot_round_trip() {
        use crate::clock::DvbTime;
        use crate::descriptors::{DescriptorList, LocalTimeOffsetDescriptor, LocalTimeOffsetEntry};
        use smallvec::SmallVec;

        let tot = Psi {
            table_id: table_ids::TOT,
            private_bit: true,
            syntax: None,
            table: TableData::Tot(Tot {
                utc_time: DvbTime {
                    mjd: 0xC079,
                    hour: 12,
                    minute: 45,
                    second: 0,
                },
                descriptors: DescriptorList::new(SmallVec::from_vec(vec![
                    Descriptor::LocalTimeOffset(LocalTimeOffsetDescriptor {
                        entries: SmallVec::from_slice(&[LocalTimeOffsetEntry {
                            country_code: *b"DEU",
                            region_id: 0,
                            negative: false,
                            offset_minutes: 60,
                            time_of_change: DvbTime {
                                mjd: 0xC100,
                                hour: 3,
                                minute: 0,
                                second: 0,
                            },
                            next_offset_minutes: 120,
                        }]),
                    }),
                ])),
            }),
        };
        let bytes = write_section(&tot);
        // TOT carries a CRC but no syntax header.
        assert_eq!(bytes.len(), tot.encoded_len());
        let reparsed = parse_one(&bytes);
        assert_eq!(reparsed, tot);
    }

    #[test]
    fn test_sdt_round_trip() {
        use crate::descriptors::ServiceDescriptor;
        use smallvec::SmallVec;

        let sdt = Psi {
            table_id: table_ids::SDT_ACTUAL,
            private_bit: true,
            syntax: Some(SectionSyntax {
                table_id_extension: 0x0044,
                version: 3,
                current_next_indicator: true,
                section_number: 0,
                last_section_number: 0,
            }),
            table: TableData::Sdt(Sdt {
                original_network_id: 0x2114,
                services: vec![SdtService {
                    service_id: 0x0001,
                    has_eit_schedule: false,
                    has_eit_present_following: true,
                    running_status: RunningStatus::Running as u8,
                    free_ca_mode: false,
                    descriptors: SmallVec::from_vec(vec![Descriptor::Service(
                        ServiceDescriptor {
                            service_type: 0x01,
                            provider: SmallVec::from_slice(b"Acme"),
                            name: SmallVec::from_slice(b"News"),
                        },
                    )]),
                }],
            }),
        };
        let bytes = write_section(&sdt);
        let reparsed = parse_one(&bytes);
        assert_eq!(reparsed, sdt);
        assert_eq!(reparsed_status(&reparsed), RunningStatus::Running);
    }

    fn reparsed_status(psi: &Psi) -> RunningStatus {
        match &psi.table {
            TableData::Sdt(sdt) => sdt.services[0].status(),
            other => panic!("unexpected table: {:?}", other),
        }
    }

    #[test]
    fn test_eit_round_trip() {
        use crate::clock::DvbTime;
        use crate::descriptors::ShortEventDescriptor;
        use smallvec::SmallVec;

        let eit = Psi {
            table_id: table_ids::EIT_FIRST,
            private_bit: true,
            syntax: Some(SectionSyntax {
                table_id_extension: 0x0001,
                version: 9,
                current_next_indicator: true,
                section_number: 0,
                last_section_number: 1,
            }),
            table: TableData::Eit(Eit {
                transport_stream_id: 0x0044,
                original_network_id: 0x2114,
                segment_last_section_number: 1,
                last_table_id: table_ids::EIT_FIRST,
                events: vec![EitEvent {
                    event_id: 0x0101,
                    start_time: DvbTime {
                        mjd: 0xC079,
                        hour: 20,
                        minute: 15,
                        second: 0,
                    },
                    duration: 5400,
                    running_status: RunningStatus::Running as u8,
                    free_ca_mode: false,
                    descriptors: SmallVec::from_vec(vec![Descriptor::ShortEvent(
                        ShortEventDescriptor {
                            language: *b"eng",
                            name: SmallVec::from_slice(b"Feature"),
                            text: SmallVec::from_slice(b"A long film"),
                        },
                    )]),
                }],
            }),
        };
        let bytes = write_section(&eit);
        assert_eq!(parse_one(&bytes), eit);
    }

    #[test]
    fn test_nit_round_trip() {
        use smallvec::SmallVec;

        let nit = Psi {
            table_id: table_ids::NIT_ACTUAL,
            private_bit: true,
            syntax: Some(SectionSyntax {
                table_id_extension: 0x3001,
                version: 1,
                current_next_indicator: true,
                section_number: 0,
                last_section_number: 0,
            }),
            table: TableData::Nit(Nit {
                network_descriptors: crate::descriptors::DescriptorList::new(
                    SmallVec::from_vec(vec![Descriptor::NetworkName(SmallVec::from_slice(
                        b"Terrestrial",
                    ))]),
                ),
                loop_reserved: 0xF,
                transports: vec![NitTransport {
                    transport_stream_id: 0x0044,
                    original_network_id: 0x2114,
                    descriptors: crate::descriptors::DescriptorList::default(),
                }],
            }),
        };
        let bytes = write_section(&nit);
        assert_eq!(parse_one(&bytes), nit);
    }
}
