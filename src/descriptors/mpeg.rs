//! Descriptors defined by ISO/IEC 13818-1 itself.

use crate::{read_bitfield, write_bitfield, Result, SliceReader, SliceWriter};
use modular_bitfield_msb::prelude::*;
use smallvec::SmallVec;

/// Registration descriptor (tag 0x05): identifies the format of the elementary stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDescriptor {
    /// 32-bit format identifier issued by the SMPTE registration authority.
    pub format_identifier: u32,
    /// Additional identification info whose meaning is private to the identifier.
    pub additional_identification_info: SmallVec<[u8; 8]>,
}

impl RegistrationDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let format_identifier = reader.read_be_u32()?;
        let mut additional_identification_info = SmallVec::new();
        additional_identification_info.extend_from_slice(reader.read_to_end()?);
        Ok(Self {
            format_identifier,
            additional_identification_info,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write_be_u32(self.format_identifier)?;
        writer.write(&self.additional_identification_info)
    }

    pub(crate) fn payload_len(&self) -> usize {
        4 + self.additional_identification_info.len()
    }
}

/// One language entry of an ISO 639 language descriptor.
///
/// The language code is normally 3 bytes but some encoders emit 2; the inbound width is kept so
/// re-encoding reproduces the original bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Iso639LanguageEntry {
    /// ISO 639-2 language code bytes (2 or 3 of them).
    pub language: SmallVec<[u8; 4]>,
    /// Audio type qualifier (clean effects, hearing impaired, ...).
    pub audio_type: u8,
}

/// ISO 639 language descriptor (tag 0x0A).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Iso639LanguageDescriptor {
    /// Language entries in wire order.
    pub entries: SmallVec<[Iso639LanguageEntry; 2]>,
}

impl Iso639LanguageDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let mut entries = SmallVec::new();
        while reader.remaining_len() > 0 {
            // A trailing 3-byte remainder is a 2-byte language code plus audio type.
            let language_len = if reader.remaining_len() == 3 { 2 } else { 3 };
            let mut language = SmallVec::new();
            language.extend_from_slice(reader.read(language_len)?);
            entries.push(Iso639LanguageEntry {
                language,
                audio_type: reader.read_u8()?,
            });
        }
        Ok(Self { entries })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        for entry in &self.entries {
            writer.write(&entry.language)?;
            writer.write_u8(entry.audio_type)?;
        }
        Ok(())
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.entries.iter().map(|e| e.language.len() + 1).sum()
    }
}

/// Maximum bitrate descriptor (tag 0x0E).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MaximumBitrateDescriptor {
    /// 22-bit bitrate in units of 50 bytes per second.
    pub bitrate: u32,
}

impl MaximumBitrateDescriptor {
    /// Maximum bitrate scaled to bytes per second.
    pub fn bytes_per_second(&self) -> u32 {
        self.bitrate * 50
    }

    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        Ok(Self {
            bitrate: reader.read_be_u24()? & 0x3F_FFFF,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write_be_u24(0xC0_0000 | self.bitrate & 0x3F_FFFF)
    }

    pub(crate) fn payload_len(&self) -> usize {
        3
    }
}

#[bitfield]
#[derive(Debug, Clone)]
struct AvcVideoBits {
    profile_idc: B8,
    constraint_set0: bool,
    constraint_set1: bool,
    constraint_set2: bool,
    compatible_flags: B5,
    level_idc: B8,
    still_present: bool,
    picture_24_hour: bool,
    reserved: B6,
}

/// AVC video descriptor (tag 0x28).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AvcVideoDescriptor {
    /// AVC profile indication.
    pub profile_idc: u8,
    /// constraint_set0_flag from the AVC sequence parameter set.
    pub constraint_set0: bool,
    /// constraint_set1_flag.
    pub constraint_set1: bool,
    /// constraint_set2_flag.
    pub constraint_set2: bool,
    /// Remaining 5 compatibility flags.
    pub compatible_flags: u8,
    /// AVC level indication.
    pub level_idc: u8,
    /// Whether the stream may contain AVC still pictures.
    pub avc_still_present: bool,
    /// Whether the stream may contain AVC 24-hour pictures.
    pub avc_24_hour_picture: bool,
}

impl AvcVideoDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let bits = read_bitfield!(reader, AvcVideoBits);
        Ok(Self {
            profile_idc: bits.profile_idc(),
            constraint_set0: bits.constraint_set0(),
            constraint_set1: bits.constraint_set1(),
            constraint_set2: bits.constraint_set2(),
            compatible_flags: bits.compatible_flags(),
            level_idc: bits.level_idc(),
            avc_still_present: bits.still_present(),
            avc_24_hour_picture: bits.picture_24_hour(),
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        write_bitfield!(
            writer,
            AvcVideoBits::new()
                .with_profile_idc(self.profile_idc)
                .with_constraint_set0(self.constraint_set0)
                .with_constraint_set1(self.constraint_set1)
                .with_constraint_set2(self.constraint_set2)
                .with_compatible_flags(self.compatible_flags)
                .with_level_idc(self.level_idc)
                .with_still_present(self.avc_still_present)
                .with_picture_24_hour(self.avc_24_hour_picture)
                .with_reserved(0b111111)
        );
        Ok(())
    }

    pub(crate) fn payload_len(&self) -> usize {
        4
    }
}
