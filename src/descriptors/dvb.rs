//! Descriptors defined by the DVB SI specification (ETSI EN 300 468).

use crate::clock::{parse_bcd_hhmm, write_bcd_hhmm, DvbTime};
use crate::{read_bitfield, write_bitfield, Result, SliceReader, SliceWriter};
use modular_bitfield_msb::prelude::*;
use smallvec::SmallVec;

/// Service descriptor (tag 0x48): names one service and its provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// DVB service type (digital television, radio, ...).
    pub service_type: u8,
    /// Service provider name bytes.
    pub provider: SmallVec<[u8; 8]>,
    /// Service name bytes.
    pub name: SmallVec<[u8; 8]>,
}

impl ServiceDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let service_type = reader.read_u8()?;
        let provider_len = reader.read_u8()? as usize;
        let mut provider = SmallVec::new();
        provider.extend_from_slice(reader.read(provider_len)?);
        let name_len = reader.read_u8()? as usize;
        let mut name = SmallVec::new();
        name.extend_from_slice(reader.read(name_len)?);
        Ok(Self {
            service_type,
            provider,
            name,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write_u8(self.service_type)?;
        writer.write_u8(self.provider.len() as u8)?;
        writer.write(&self.provider)?;
        writer.write_u8(self.name.len() as u8)?;
        writer.write(&self.name)
    }

    pub(crate) fn payload_len(&self) -> usize {
        3 + self.provider.len() + self.name.len()
    }
}

/// Short event descriptor (tag 0x4D): event name and short text in one language.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortEventDescriptor {
    /// ISO 639-2 language code.
    pub language: [u8; 3],
    /// Event name bytes.
    pub name: SmallVec<[u8; 8]>,
    /// Short description bytes.
    pub text: SmallVec<[u8; 8]>,
}

impl ShortEventDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let language = *reader.read_array_ref::<3>()?;
        let name_len = reader.read_u8()? as usize;
        let mut name = SmallVec::new();
        name.extend_from_slice(reader.read(name_len)?);
        let text_len = reader.read_u8()? as usize;
        let mut text = SmallVec::new();
        text.extend_from_slice(reader.read(text_len)?);
        Ok(Self {
            language,
            name,
            text,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write(&self.language)?;
        writer.write_u8(self.name.len() as u8)?;
        writer.write(&self.name)?;
        writer.write_u8(self.text.len() as u8)?;
        writer.write(&self.text)
    }

    pub(crate) fn payload_len(&self) -> usize {
        5 + self.name.len() + self.text.len()
    }
}

/// One itemized line of an extended event descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedEventItem {
    /// Item description bytes (the field name, e.g. "Director").
    pub description: SmallVec<[u8; 8]>,
    /// Item content bytes.
    pub content: SmallVec<[u8; 8]>,
}

/// Extended event descriptor (tag 0x4E): long event text split over numbered descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedEventDescriptor {
    /// Position of this descriptor in the chain.
    pub number: u8,
    /// Last descriptor number of the chain.
    pub last_number: u8,
    /// ISO 639-2 language code.
    pub language: [u8; 3],
    /// Itemized lines.
    pub items: SmallVec<[ExtendedEventItem; 1]>,
    /// Free-form text bytes.
    pub text: SmallVec<[u8; 8]>,
}

impl ExtendedEventDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let numbers = reader.read_u8()?;
        let language = *reader.read_array_ref::<3>()?;
        let items_len = reader.read_u8()? as usize;
        let mut items_reader = reader.new_sub_reader(items_len)?;
        let mut items = SmallVec::new();
        while items_reader.remaining_len() > 0 {
            let description_len = items_reader.read_u8()? as usize;
            let mut description = SmallVec::new();
            description.extend_from_slice(items_reader.read(description_len)?);
            let content_len = items_reader.read_u8()? as usize;
            let mut content = SmallVec::new();
            content.extend_from_slice(items_reader.read(content_len)?);
            items.push(ExtendedEventItem {
                description,
                content,
            });
        }
        let text_len = reader.read_u8()? as usize;
        let mut text = SmallVec::new();
        text.extend_from_slice(reader.read(text_len)?);
        Ok(Self {
            number: numbers >> 4,
            last_number: numbers & 0x0F,
            language,
            items,
            text,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write_u8(self.number << 4 | self.last_number & 0x0F)?;
        writer.write(&self.language)?;
        let items_len: usize = self
            .items
            .iter()
            .map(|i| 2 + i.description.len() + i.content.len())
            .sum();
        writer.write_u8(items_len as u8)?;
        for item in &self.items {
            writer.write_u8(item.description.len() as u8)?;
            writer.write(&item.description)?;
            writer.write_u8(item.content.len() as u8)?;
            writer.write(&item.content)?;
        }
        writer.write_u8(self.text.len() as u8)?;
        writer.write(&self.text)
    }

    pub(crate) fn payload_len(&self) -> usize {
        6 + self
            .items
            .iter()
            .map(|i| 2 + i.description.len() + i.content.len())
            .sum::<usize>()
            + self.text.len()
    }
}

/// Component descriptor (tag 0x50): identifies one component stream of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// 4-bit stream content extension nibble.
    pub stream_content_ext: u8,
    /// 4-bit stream content nibble.
    pub stream_content: u8,
    /// Component type within the stream content class.
    pub component_type: u8,
    /// Component tag linking to the stream identifier descriptor.
    pub component_tag: u8,
    /// ISO 639-2 language code.
    pub language: [u8; 3],
    /// Text description bytes.
    pub text: SmallVec<[u8; 8]>,
}

impl ComponentDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let content = reader.read_u8()?;
        let component_type = reader.read_u8()?;
        let component_tag = reader.read_u8()?;
        let language = *reader.read_array_ref::<3>()?;
        let mut text = SmallVec::new();
        text.extend_from_slice(reader.read_to_end()?);
        Ok(Self {
            stream_content_ext: content >> 4,
            stream_content: content & 0x0F,
            component_type,
            component_tag,
            language,
            text,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write_u8(self.stream_content_ext << 4 | self.stream_content & 0x0F)?;
        writer.write_u8(self.component_type)?;
        writer.write_u8(self.component_tag)?;
        writer.write(&self.language)?;
        writer.write(&self.text)
    }

    pub(crate) fn payload_len(&self) -> usize {
        6 + self.text.len()
    }
}

/// One classification entry of a content descriptor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ContentEntry {
    /// First-level content nibble (genre).
    pub content_nibble_level_1: u8,
    /// Second-level content nibble (sub-genre).
    pub content_nibble_level_2: u8,
    /// Broadcaster-defined byte.
    pub user_byte: u8,
}

/// Content descriptor (tag 0x54): genre classification of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDescriptor {
    /// Classification entries in wire order.
    pub entries: SmallVec<[ContentEntry; 2]>,
}

impl ContentDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let mut entries = SmallVec::new();
        while reader.remaining_len() > 0 {
            let nibbles = reader.read_u8()?;
            entries.push(ContentEntry {
                content_nibble_level_1: nibbles >> 4,
                content_nibble_level_2: nibbles & 0x0F,
                user_byte: reader.read_u8()?,
            });
        }
        Ok(Self { entries })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        for entry in &self.entries {
            writer.write_u8(entry.content_nibble_level_1 << 4 | entry.content_nibble_level_2 & 0x0F)?;
            writer.write_u8(entry.user_byte)?;
        }
        Ok(())
    }

    pub(crate) fn payload_len(&self) -> usize {
        2 * self.entries.len()
    }
}

/// One country entry of a parental rating descriptor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ParentalRatingEntry {
    /// ISO 3166 country code.
    pub country_code: [u8; 3],
    /// Raw rating value.
    pub rating: u8,
}

impl ParentalRatingEntry {
    /// Recommended minimum age in years: `rating + 3` for ratings 0x01..=0x10, otherwise 0
    /// (undefined or broadcaster-specific).
    pub fn minimum_age(&self) -> u8 {
        match self.rating {
            0x01..=0x10 => self.rating + 3,
            _ => 0,
        }
    }
}

/// Parental rating descriptor (tag 0x55).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentalRatingDescriptor {
    /// Rating entries in wire order.
    pub entries: SmallVec<[ParentalRatingEntry; 2]>,
}

impl ParentalRatingDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let mut entries = SmallVec::new();
        while reader.remaining_len() > 0 {
            entries.push(ParentalRatingEntry {
                country_code: *reader.read_array_ref::<3>()?,
                rating: reader.read_u8()?,
            });
        }
        Ok(Self { entries })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        for entry in &self.entries {
            writer.write(&entry.country_code)?;
            writer.write_u8(entry.rating)?;
        }
        Ok(())
    }

    pub(crate) fn payload_len(&self) -> usize {
        4 * self.entries.len()
    }
}

#[bitfield]
#[derive(Debug, Clone)]
struct TeletextEntryBits {
    teletext_type: B5,
    magazine: B3,
}

/// One page entry of a teletext or VBI teletext descriptor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TeletextEntry {
    /// ISO 639-2 language code.
    pub language: [u8; 3],
    /// 5-bit teletext type (initial page, subtitles, ...).
    pub teletext_type: u8,
    /// 3-bit magazine number.
    pub magazine: u8,
    /// Page number, BCD coded.
    pub page: u8,
}

/// Teletext descriptor (tags 0x46 and 0x56).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeletextDescriptor {
    /// Page entries in wire order.
    pub entries: SmallVec<[TeletextEntry; 2]>,
}

impl TeletextDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let mut entries = SmallVec::new();
        while reader.remaining_len() > 0 {
            let language = *reader.read_array_ref::<3>()?;
            let bits = read_bitfield!(reader, TeletextEntryBits);
            entries.push(TeletextEntry {
                language,
                teletext_type: bits.teletext_type(),
                magazine: bits.magazine(),
                page: reader.read_u8()?,
            });
        }
        Ok(Self { entries })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        for entry in &self.entries {
            writer.write(&entry.language)?;
            write_bitfield!(
                writer,
                TeletextEntryBits::new()
                    .with_teletext_type(entry.teletext_type)
                    .with_magazine(entry.magazine)
            );
            writer.write_u8(entry.page)?;
        }
        Ok(())
    }

    pub(crate) fn payload_len(&self) -> usize {
        5 * self.entries.len()
    }
}

/// One country entry of a local time offset descriptor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct LocalTimeOffsetEntry {
    /// ISO 3166 country code.
    pub country_code: [u8; 3],
    /// 6-bit region identifier within the country.
    pub region_id: u8,
    /// Offset polarity; set when local time lags UTC.
    pub negative: bool,
    /// Current offset from UTC in minutes.
    pub offset_minutes: u16,
    /// When the next offset comes into effect.
    pub time_of_change: DvbTime,
    /// Offset in minutes after the change.
    pub next_offset_minutes: u16,
}

/// Local time offset descriptor (tag 0x58).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTimeOffsetDescriptor {
    /// Country entries in wire order.
    pub entries: SmallVec<[LocalTimeOffsetEntry; 1]>,
}

impl LocalTimeOffsetDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let mut entries = SmallVec::new();
        while reader.remaining_len() > 0 {
            let country_code = *reader.read_array_ref::<3>()?;
            let region = reader.read_u8()?;
            let offset_minutes = parse_bcd_hhmm(reader.read_array_ref::<2>()?);
            let time_of_change = DvbTime::parse(reader.read_array_ref::<5>()?);
            let next_offset_minutes = parse_bcd_hhmm(reader.read_array_ref::<2>()?);
            entries.push(LocalTimeOffsetEntry {
                country_code,
                region_id: region >> 2,
                negative: region & 0x1 != 0,
                offset_minutes,
                time_of_change,
                next_offset_minutes,
            });
        }
        Ok(Self { entries })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        for entry in &self.entries {
            writer.write(&entry.country_code)?;
            // Reserved bit between region and polarity is set.
            writer.write_u8(entry.region_id << 2 | 0x2 | entry.negative as u8)?;
            writer.write(&write_bcd_hhmm(entry.offset_minutes))?;
            writer.write(&entry.time_of_change.write())?;
            writer.write(&write_bcd_hhmm(entry.next_offset_minutes))?;
        }
        Ok(())
    }

    pub(crate) fn payload_len(&self) -> usize {
        13 * self.entries.len()
    }
}

/// One language entry of a subtitling descriptor.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SubtitlingEntry {
    /// ISO 639-2 language code.
    pub language: [u8; 3],
    /// DVB subtitling type (normal, hard of hearing, aspect variants).
    pub subtitling_type: u8,
    /// Composition page identifier.
    pub composition_page_id: u16,
    /// Ancillary page identifier.
    pub ancillary_page_id: u16,
}

/// Subtitling descriptor (tag 0x59).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitlingDescriptor {
    /// Language entries in wire order.
    pub entries: SmallVec<[SubtitlingEntry; 2]>,
}

impl SubtitlingDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let mut entries = SmallVec::new();
        while reader.remaining_len() > 0 {
            entries.push(SubtitlingEntry {
                language: *reader.read_array_ref::<3>()?,
                subtitling_type: reader.read_u8()?,
                composition_page_id: reader.read_be_u16()?,
                ancillary_page_id: reader.read_be_u16()?,
            });
        }
        Ok(Self { entries })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        for entry in &self.entries {
            writer.write(&entry.language)?;
            writer.write_u8(entry.subtitling_type)?;
            writer.write_be_u16(entry.composition_page_id)?;
            writer.write_be_u16(entry.ancillary_page_id)?;
        }
        Ok(())
    }

    pub(crate) fn payload_len(&self) -> usize {
        8 * self.entries.len()
    }
}

#[bitfield]
#[derive(Debug, Clone)]
struct Ac3Flags {
    has_component_type: bool,
    has_bsid: bool,
    has_main_id: bool,
    has_asvc: bool,
    mix_info_exists: bool,
    has_substream1: bool,
    has_substream2: bool,
    has_substream3: bool,
}

/// AC-3 descriptor (tag 0x6A).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ac3Descriptor {
    /// AC-3 component type, when signalled.
    pub component_type: Option<u8>,
    /// Bit stream identification, when signalled.
    pub bsid: Option<u8>,
    /// Main audio service id, when signalled.
    pub main_id: Option<u8>,
    /// Associated service tag, when signalled.
    pub asvc: Option<u8>,
    /// Trailing additional info bytes.
    pub additional_info: SmallVec<[u8; 8]>,
}

impl Ac3Descriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let flags = read_bitfield!(reader, Ac3Flags);
        let mut out = Self::default();
        if flags.has_component_type() {
            out.component_type = Some(reader.read_u8()?);
        }
        if flags.has_bsid() {
            out.bsid = Some(reader.read_u8()?);
        }
        if flags.has_main_id() {
            out.main_id = Some(reader.read_u8()?);
        }
        if flags.has_asvc() {
            out.asvc = Some(reader.read_u8()?);
        }
        out.additional_info.extend_from_slice(reader.read_to_end()?);
        Ok(out)
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        write_bitfield!(
            writer,
            Ac3Flags::new()
                .with_has_component_type(self.component_type.is_some())
                .with_has_bsid(self.bsid.is_some())
                .with_has_main_id(self.main_id.is_some())
                .with_has_asvc(self.asvc.is_some())
        );
        for field in [self.component_type, self.bsid, self.main_id, self.asvc]
            .iter()
            .flatten()
        {
            writer.write_u8(*field)?;
        }
        writer.write(&self.additional_info)
    }

    pub(crate) fn payload_len(&self) -> usize {
        1 + [self.component_type, self.bsid, self.main_id, self.asvc]
            .iter()
            .flatten()
            .count()
            + self.additional_info.len()
    }
}

/// Enhanced AC-3 descriptor (tag 0x7A).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancedAc3Descriptor {
    /// E-AC-3 component type, when signalled.
    pub component_type: Option<u8>,
    /// Bit stream identification, when signalled.
    pub bsid: Option<u8>,
    /// Main audio service id, when signalled.
    pub main_id: Option<u8>,
    /// Associated service tag, when signalled.
    pub asvc: Option<u8>,
    /// Whether mixing metadata is present in the stream.
    pub mix_info_exists: bool,
    /// Component type of independent substream 1, when signalled.
    pub substream1: Option<u8>,
    /// Component type of independent substream 2, when signalled.
    pub substream2: Option<u8>,
    /// Component type of independent substream 3, when signalled.
    pub substream3: Option<u8>,
    /// Trailing additional info bytes.
    pub additional_info: SmallVec<[u8; 8]>,
}

impl EnhancedAc3Descriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let flags = read_bitfield!(reader, Ac3Flags);
        let mut out = Self {
            mix_info_exists: flags.mix_info_exists(),
            ..Self::default()
        };
        if flags.has_component_type() {
            out.component_type = Some(reader.read_u8()?);
        }
        if flags.has_bsid() {
            out.bsid = Some(reader.read_u8()?);
        }
        if flags.has_main_id() {
            out.main_id = Some(reader.read_u8()?);
        }
        if flags.has_asvc() {
            out.asvc = Some(reader.read_u8()?);
        }
        if flags.has_substream1() {
            out.substream1 = Some(reader.read_u8()?);
        }
        if flags.has_substream2() {
            out.substream2 = Some(reader.read_u8()?);
        }
        if flags.has_substream3() {
            out.substream3 = Some(reader.read_u8()?);
        }
        out.additional_info.extend_from_slice(reader.read_to_end()?);
        Ok(out)
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        write_bitfield!(
            writer,
            Ac3Flags::new()
                .with_has_component_type(self.component_type.is_some())
                .with_has_bsid(self.bsid.is_some())
                .with_has_main_id(self.main_id.is_some())
                .with_has_asvc(self.asvc.is_some())
                .with_mix_info_exists(self.mix_info_exists)
                .with_has_substream1(self.substream1.is_some())
                .with_has_substream2(self.substream2.is_some())
                .with_has_substream3(self.substream3.is_some())
        );
        for field in [
            self.component_type,
            self.bsid,
            self.main_id,
            self.asvc,
            self.substream1,
            self.substream2,
            self.substream3,
        ]
        .iter()
        .flatten()
        {
            writer.write_u8(*field)?;
        }
        writer.write(&self.additional_info)
    }

    pub(crate) fn payload_len(&self) -> usize {
        1 + [
            self.component_type,
            self.bsid,
            self.main_id,
            self.asvc,
            self.substream1,
            self.substream2,
            self.substream3,
        ]
        .iter()
        .flatten()
        .count()
            + self.additional_info.len()
    }
}

#[bitfield]
#[derive(Debug, Clone)]
struct SupplementaryAudioBits {
    mix_type: bool,
    editorial_classification: B5,
    reserved: B1,
    has_language: bool,
}

/// Supplementary audio descriptor, carried under extension tag 0x06.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplementaryAudioDescriptor {
    /// Whether the stream is a complete mix or a supplementary stream for mixing.
    pub mix_type: bool,
    /// 5-bit editorial classification (audio description, clean audio, ...).
    pub editorial_classification: u8,
    /// ISO 639-2 language code, when present.
    pub language: Option<[u8; 3]>,
    /// Trailing private data bytes.
    pub private_data: SmallVec<[u8; 8]>,
}

impl SupplementaryAudioDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let bits = read_bitfield!(reader, SupplementaryAudioBits);
        let language = if bits.has_language() {
            Some(*reader.read_array_ref::<3>()?)
        } else {
            None
        };
        let mut private_data = SmallVec::new();
        private_data.extend_from_slice(reader.read_to_end()?);
        Ok(Self {
            mix_type: bits.mix_type(),
            editorial_classification: bits.editorial_classification(),
            language,
            private_data,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        write_bitfield!(
            writer,
            SupplementaryAudioBits::new()
                .with_mix_type(self.mix_type)
                .with_editorial_classification(self.editorial_classification)
                .with_reserved(1)
                .with_has_language(self.language.is_some())
        );
        if let Some(language) = &self.language {
            writer.write(language)?;
        }
        writer.write(&self.private_data)
    }

    pub(crate) fn payload_len(&self) -> usize {
        1 + self.language.map_or(0, |_| 3) + self.private_data.len()
    }
}

/// Extension descriptor (tag 0x7F): payload dispatched on a secondary tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionDescriptor {
    /// Supplementary audio (extension tag 0x06).
    SupplementaryAudio(SupplementaryAudioDescriptor),
    /// Any other extension, preserved verbatim.
    Other {
        /// Extension tag.
        tag: u8,
        /// Raw payload bytes.
        data: SmallVec<[u8; 8]>,
    },
}

const EXTENSION_SUPPLEMENTARY_AUDIO: u8 = 0x06;

impl ExtensionDescriptor {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let tag = reader.read_u8()?;
        match tag {
            EXTENSION_SUPPLEMENTARY_AUDIO => Ok(Self::SupplementaryAudio(
                SupplementaryAudioDescriptor::parse(reader)?,
            )),
            _ => {
                let mut data = SmallVec::new();
                data.extend_from_slice(reader.read_to_end()?);
                Ok(Self::Other { tag, data })
            }
        }
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        match self {
            Self::SupplementaryAudio(audio) => {
                writer.write_u8(EXTENSION_SUPPLEMENTARY_AUDIO)?;
                audio.write(writer)
            }
            Self::Other { tag, data } => {
                writer.write_u8(*tag)?;
                writer.write(data)
            }
        }
    }

    pub(crate) fn payload_len(&self) -> usize {
        1 + match self {
            Self::SupplementaryAudio(audio) => audio.payload_len(),
            Self::Other { data, .. } => data.len(),
        }
    }
}
