//! Tag-length-value descriptor records carried by PSI tables.
//!
//! Descriptors appear in length-prefixed loops inside the PMT, NIT, SDT, EIT and TOT. Each
//! descriptor is dispatched on its tag to a typed variant; tags without a decoder (and payloads
//! that fail to decode) are preserved byte-for-byte so that re-encoding reproduces the original
//! stream.

use super::{read_bitfield, write_bitfield, ErrorDetails, Result, SliceReader, SliceWriter};
use log::warn;
use modular_bitfield_msb::prelude::*;
use smallvec::SmallVec;

pub mod dvb;
pub mod mpeg;

pub use dvb::{
    Ac3Descriptor, ComponentDescriptor, ContentDescriptor, ContentEntry, EnhancedAc3Descriptor,
    ExtendedEventDescriptor, ExtendedEventItem, ExtensionDescriptor, LocalTimeOffsetDescriptor,
    LocalTimeOffsetEntry, ParentalRatingDescriptor, ParentalRatingEntry, ServiceDescriptor,
    ShortEventDescriptor, SubtitlingDescriptor, SubtitlingEntry, SupplementaryAudioDescriptor,
    TeletextDescriptor, TeletextEntry,
};
pub use mpeg::{
    AvcVideoDescriptor, Iso639LanguageDescriptor, Iso639LanguageEntry, MaximumBitrateDescriptor,
    RegistrationDescriptor,
};

mod tags {
    pub const REGISTRATION: u8 = 0x05;
    pub const DATA_STREAM_ALIGNMENT: u8 = 0x06;
    pub const ISO639_LANGUAGE: u8 = 0x0A;
    pub const MAXIMUM_BITRATE: u8 = 0x0E;
    pub const PRIVATE_DATA_INDICATOR: u8 = 0x0F;
    pub const AVC_VIDEO: u8 = 0x28;
    pub const NETWORK_NAME: u8 = 0x40;
    pub const SERVICE_LIST: u8 = 0x41;
    pub const VBI_TELETEXT: u8 = 0x46;
    pub const SERVICE: u8 = 0x48;
    pub const SHORT_EVENT: u8 = 0x4D;
    pub const EXTENDED_EVENT: u8 = 0x4E;
    pub const COMPONENT: u8 = 0x50;
    pub const STREAM_IDENTIFIER: u8 = 0x52;
    pub const CONTENT: u8 = 0x54;
    pub const PARENTAL_RATING: u8 = 0x55;
    pub const TELETEXT: u8 = 0x56;
    pub const LOCAL_TIME_OFFSET: u8 = 0x58;
    pub const SUBTITLING: u8 = 0x59;
    pub const PRIVATE_DATA_SPECIFIER: u8 = 0x5F;
    pub const AC3: u8 = 0x6A;
    pub const ENHANCED_AC3: u8 = 0x7A;
    pub const EXTENSION: u8 = 0x7F;
    pub const USER_DEFINED_FIRST: u8 = 0x80;
    pub const USER_DEFINED_LAST: u8 = 0xFE;
}

/// Descriptor with a tag in the user-defined range 0x80..=0xFE; the payload is private.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDefinedDescriptor {
    /// Descriptor tag.
    pub tag: u8,
    /// Opaque payload bytes.
    pub data: SmallVec<[u8; 8]>,
}

/// Descriptor this crate has no decoder for, preserved verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownDescriptor {
    /// Descriptor tag.
    pub tag: u8,
    /// Raw payload bytes.
    pub data: SmallVec<[u8; 8]>,
}

/// One tag-dispatched descriptor record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// Registration (0x05).
    Registration(RegistrationDescriptor),
    /// Data stream alignment (0x06).
    DataStreamAlignment(u8),
    /// ISO 639 language (0x0A).
    Iso639Language(Iso639LanguageDescriptor),
    /// Maximum bitrate (0x0E).
    MaximumBitrate(MaximumBitrateDescriptor),
    /// Private data indicator (0x0F).
    PrivateDataIndicator(u32),
    /// AVC video (0x28).
    AvcVideo(AvcVideoDescriptor),
    /// DVB network name (0x40); text bytes kept raw.
    NetworkName(SmallVec<[u8; 8]>),
    /// DVB service list (0x41); kept raw.
    ServiceList(SmallVec<[u8; 8]>),
    /// VBI teletext (0x46).
    VbiTeletext(TeletextDescriptor),
    /// DVB service (0x48).
    Service(ServiceDescriptor),
    /// Short event (0x4D).
    ShortEvent(ShortEventDescriptor),
    /// Extended event (0x4E).
    ExtendedEvent(ExtendedEventDescriptor),
    /// Component (0x50).
    Component(ComponentDescriptor),
    /// Stream identifier (0x52); the component tag.
    StreamIdentifier(u8),
    /// Content classification (0x54).
    Content(ContentDescriptor),
    /// Parental rating (0x55).
    ParentalRating(ParentalRatingDescriptor),
    /// Teletext (0x56).
    Teletext(TeletextDescriptor),
    /// Local time offset (0x58).
    LocalTimeOffset(LocalTimeOffsetDescriptor),
    /// Subtitling (0x59).
    Subtitling(SubtitlingDescriptor),
    /// Private data specifier (0x5F).
    PrivateDataSpecifier(u32),
    /// AC-3 audio (0x6A).
    Ac3(Ac3Descriptor),
    /// Enhanced AC-3 audio (0x7A).
    EnhancedAc3(EnhancedAc3Descriptor),
    /// Extension descriptor (0x7F).
    Extension(ExtensionDescriptor),
    /// User-defined tag (0x80..=0xFE).
    UserDefined(UserDefinedDescriptor),
    /// Unhandled tag, preserved byte-for-byte.
    Unknown(UnknownDescriptor),
}

impl Descriptor {
    /// Wire tag of this descriptor.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Registration(_) => tags::REGISTRATION,
            Self::DataStreamAlignment(_) => tags::DATA_STREAM_ALIGNMENT,
            Self::Iso639Language(_) => tags::ISO639_LANGUAGE,
            Self::MaximumBitrate(_) => tags::MAXIMUM_BITRATE,
            Self::PrivateDataIndicator(_) => tags::PRIVATE_DATA_INDICATOR,
            Self::AvcVideo(_) => tags::AVC_VIDEO,
            Self::NetworkName(_) => tags::NETWORK_NAME,
            Self::ServiceList(_) => tags::SERVICE_LIST,
            Self::VbiTeletext(_) => tags::VBI_TELETEXT,
            Self::Service(_) => tags::SERVICE,
            Self::ShortEvent(_) => tags::SHORT_EVENT,
            Self::ExtendedEvent(_) => tags::EXTENDED_EVENT,
            Self::Component(_) => tags::COMPONENT,
            Self::StreamIdentifier(_) => tags::STREAM_IDENTIFIER,
            Self::Content(_) => tags::CONTENT,
            Self::ParentalRating(_) => tags::PARENTAL_RATING,
            Self::Teletext(_) => tags::TELETEXT,
            Self::LocalTimeOffset(_) => tags::LOCAL_TIME_OFFSET,
            Self::Subtitling(_) => tags::SUBTITLING,
            Self::PrivateDataSpecifier(_) => tags::PRIVATE_DATA_SPECIFIER,
            Self::Ac3(_) => tags::AC3,
            Self::EnhancedAc3(_) => tags::ENHANCED_AC3,
            Self::Extension(_) => tags::EXTENSION,
            Self::UserDefined(user) => user.tag,
            Self::Unknown(unknown) => unknown.tag,
        }
    }

    /// Parses one descriptor (tag, length and payload) from the reader.
    ///
    /// Payloads that fail to decode, or that leave undecoded trailing bytes, degrade to
    /// [`Descriptor::Unknown`] so the bytes survive a re-encode; the reader always ends up at the
    /// declared end of the descriptor.
    pub fn parse(reader: &mut SliceReader) -> Result<Self> {
        let tag = reader.read_u8()?;
        let length = reader.read_u8()? as usize;
        let raw = reader.read(length)?;
        if (tags::USER_DEFINED_FIRST..=tags::USER_DEFINED_LAST).contains(&tag) {
            return Ok(Self::UserDefined(UserDefinedDescriptor {
                tag,
                data: SmallVec::from_slice(raw),
            }));
        }
        let mut d_reader = SliceReader::new(raw);
        match Self::parse_payload(tag, &mut d_reader) {
            Ok(out) if d_reader.remaining_len() == 0 => Ok(out),
            Ok(_) => {
                warn!(
                    "Descriptor {:#04x} left {} trailing bytes; keeping raw",
                    tag,
                    d_reader.remaining_len()
                );
                Ok(Self::unknown_from(tag, raw))
            }
            Err(_) => {
                warn!("Malformed descriptor {:#04x}; keeping raw", tag);
                Ok(Self::unknown_from(tag, raw))
            }
        }
    }

    fn unknown_from(tag: u8, raw: &[u8]) -> Self {
        Self::Unknown(UnknownDescriptor {
            tag,
            data: SmallVec::from_slice(raw),
        })
    }

    fn parse_payload(tag: u8, reader: &mut SliceReader) -> Result<Self> {
        Ok(match tag {
            tags::REGISTRATION => Self::Registration(RegistrationDescriptor::parse(reader)?),
            tags::DATA_STREAM_ALIGNMENT => Self::DataStreamAlignment(reader.read_u8()?),
            tags::ISO639_LANGUAGE => Self::Iso639Language(Iso639LanguageDescriptor::parse(reader)?),
            tags::MAXIMUM_BITRATE => Self::MaximumBitrate(MaximumBitrateDescriptor::parse(reader)?),
            tags::PRIVATE_DATA_INDICATOR => Self::PrivateDataIndicator(reader.read_be_u32()?),
            tags::AVC_VIDEO => Self::AvcVideo(AvcVideoDescriptor::parse(reader)?),
            tags::NETWORK_NAME => Self::NetworkName(SmallVec::from_slice(reader.read_to_end()?)),
            tags::SERVICE_LIST => Self::ServiceList(SmallVec::from_slice(reader.read_to_end()?)),
            tags::VBI_TELETEXT => Self::VbiTeletext(TeletextDescriptor::parse(reader)?),
            tags::SERVICE => Self::Service(ServiceDescriptor::parse(reader)?),
            tags::SHORT_EVENT => Self::ShortEvent(ShortEventDescriptor::parse(reader)?),
            tags::EXTENDED_EVENT => Self::ExtendedEvent(ExtendedEventDescriptor::parse(reader)?),
            tags::COMPONENT => Self::Component(ComponentDescriptor::parse(reader)?),
            tags::STREAM_IDENTIFIER => Self::StreamIdentifier(reader.read_u8()?),
            tags::CONTENT => Self::Content(ContentDescriptor::parse(reader)?),
            tags::PARENTAL_RATING => Self::ParentalRating(ParentalRatingDescriptor::parse(reader)?),
            tags::TELETEXT => Self::Teletext(TeletextDescriptor::parse(reader)?),
            tags::LOCAL_TIME_OFFSET => {
                Self::LocalTimeOffset(LocalTimeOffsetDescriptor::parse(reader)?)
            }
            tags::SUBTITLING => Self::Subtitling(SubtitlingDescriptor::parse(reader)?),
            tags::PRIVATE_DATA_SPECIFIER => Self::PrivateDataSpecifier(reader.read_be_u32()?),
            tags::AC3 => Self::Ac3(Ac3Descriptor::parse(reader)?),
            tags::ENHANCED_AC3 => Self::EnhancedAc3(EnhancedAc3Descriptor::parse(reader)?),
            tags::EXTENSION => Self::Extension(ExtensionDescriptor::parse(reader)?),
            _ => {
                let mut data = SmallVec::new();
                data.extend_from_slice(reader.read_to_end()?);
                Self::Unknown(UnknownDescriptor { tag, data })
            }
        })
    }

    /// Serializes tag, length and payload.
    pub fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write_u8(self.tag())?;
        writer.write_u8(self.payload_len() as u8)?;
        match self {
            Self::Registration(d) => d.write(writer),
            Self::DataStreamAlignment(alignment_type) => writer.write_u8(*alignment_type),
            Self::Iso639Language(d) => d.write(writer),
            Self::MaximumBitrate(d) => d.write(writer),
            Self::PrivateDataIndicator(indicator) => writer.write_be_u32(*indicator),
            Self::AvcVideo(d) => d.write(writer),
            Self::NetworkName(name) => writer.write(name),
            Self::ServiceList(services) => writer.write(services),
            Self::VbiTeletext(d) => d.write(writer),
            Self::Service(d) => d.write(writer),
            Self::ShortEvent(d) => d.write(writer),
            Self::ExtendedEvent(d) => d.write(writer),
            Self::Component(d) => d.write(writer),
            Self::StreamIdentifier(component_tag) => writer.write_u8(*component_tag),
            Self::Content(d) => d.write(writer),
            Self::ParentalRating(d) => d.write(writer),
            Self::Teletext(d) => d.write(writer),
            Self::LocalTimeOffset(d) => d.write(writer),
            Self::Subtitling(d) => d.write(writer),
            Self::PrivateDataSpecifier(specifier) => writer.write_be_u32(*specifier),
            Self::Ac3(d) => d.write(writer),
            Self::EnhancedAc3(d) => d.write(writer),
            Self::Extension(d) => d.write(writer),
            Self::UserDefined(user) => writer.write(&user.data),
            Self::Unknown(unknown) => writer.write(&unknown.data),
        }
    }

    /// Encoded payload size, excluding the two tag and length bytes.
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Registration(d) => d.payload_len(),
            Self::DataStreamAlignment(_) => 1,
            Self::Iso639Language(d) => d.payload_len(),
            Self::MaximumBitrate(d) => d.payload_len(),
            Self::PrivateDataIndicator(_) => 4,
            Self::AvcVideo(d) => d.payload_len(),
            Self::NetworkName(name) => name.len(),
            Self::ServiceList(services) => services.len(),
            Self::VbiTeletext(d) => d.payload_len(),
            Self::Service(d) => d.payload_len(),
            Self::ShortEvent(d) => d.payload_len(),
            Self::ExtendedEvent(d) => d.payload_len(),
            Self::Component(d) => d.payload_len(),
            Self::StreamIdentifier(_) => 1,
            Self::Content(d) => d.payload_len(),
            Self::ParentalRating(d) => d.payload_len(),
            Self::Teletext(d) => d.payload_len(),
            Self::LocalTimeOffset(d) => d.payload_len(),
            Self::Subtitling(d) => d.payload_len(),
            Self::PrivateDataSpecifier(_) => 4,
            Self::Ac3(d) => d.payload_len(),
            Self::EnhancedAc3(d) => d.payload_len(),
            Self::Extension(d) => d.payload_len(),
            Self::UserDefined(user) => user.data.len(),
            Self::Unknown(unknown) => unknown.data.len(),
        }
    }

    /// Encoded size including the tag and length bytes.
    pub fn encoded_len(&self) -> usize {
        2 + self.payload_len()
    }
}

/// Parses bare descriptor records until `reader` is exhausted.
pub(crate) fn parse_descriptor_items(
    reader: &mut SliceReader,
) -> Result<SmallVec<[Descriptor; 4]>> {
    let mut out = SmallVec::new();
    while reader.remaining_len() > 0 {
        if reader.remaining_len() < 2 {
            warn!("Descriptor loop ends mid-record; discarding trailer");
            reader.skip(reader.remaining_len())?;
            break;
        }
        match Descriptor::parse(reader) {
            Ok(descriptor) => out.push(descriptor),
            Err(error) if matches!(error.details, ErrorDetails::PacketOverrun(_)) => {
                /* The declared end lies past the loop; nothing more can be framed */
                warn!("Descriptor length overruns its loop; discarding trailer");
                reader.skip(reader.remaining_len())?;
                break;
            }
            Err(error) => return Err(error),
        }
    }
    Ok(out)
}

pub(crate) fn write_descriptor_items(
    descriptors: &[Descriptor],
    writer: &mut SliceWriter,
) -> Result<()> {
    for descriptor in descriptors {
        descriptor.write(writer)?;
    }
    Ok(())
}

pub(crate) fn descriptor_items_len(descriptors: &[Descriptor]) -> usize {
    descriptors.iter().map(Descriptor::encoded_len).sum()
}

#[bitfield]
#[derive(Debug, Clone)]
struct DescriptorLoopHeader {
    reserved: B4,
    length: B12,
}

/// A descriptor loop prefixed by 4 reserved bits and a 12-bit total length.
///
/// The reserved nibble is preserved from the input so re-encoding is bit-exact even for streams
/// that leave it zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorList {
    /// The 4 reserved bits ahead of the loop length.
    pub reserved: u8,
    /// Descriptors in wire order.
    pub descriptors: SmallVec<[Descriptor; 4]>,
}

impl Default for DescriptorList {
    fn default() -> Self {
        Self {
            reserved: 0xF,
            descriptors: SmallVec::new(),
        }
    }
}

impl DescriptorList {
    /// Builds a list holding `descriptors` with the customary all-ones reserved nibble.
    pub fn new(descriptors: SmallVec<[Descriptor; 4]>) -> Self {
        Self {
            reserved: 0xF,
            descriptors,
        }
    }

    /// Whether the loop holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let header = read_bitfield!(reader, DescriptorLoopHeader);
        let mut d_reader = reader.new_sub_reader(header.length() as usize)?;
        Ok(Self {
            reserved: header.reserved(),
            descriptors: parse_descriptor_items(&mut d_reader)?,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        write_bitfield!(
            writer,
            DescriptorLoopHeader::new()
                .with_reserved(self.reserved)
                .with_length(descriptor_items_len(&self.descriptors) as u16)
        );
        write_descriptor_items(&self.descriptors, writer)
    }

    /// Encoded size including the two prefix bytes.
    pub fn encoded_len(&self) -> usize {
        2 + descriptor_items_len(&self.descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip_bytes(bytes: &[u8]) -> Descriptor {
        let mut reader = SliceReader::new(bytes);
        let descriptor = Descriptor::parse(&mut reader).unwrap();
        assert_eq!(reader.remaining_len(), 0);
        let mut buf = [0_u8; 512];
        let mut writer = SliceWriter::new(&mut buf);
        descriptor.write(&mut writer).unwrap();
        assert_eq!(writer.written(), bytes);
        descriptor
    }

    fn round_trip_record(descriptor: Descriptor) {
        let mut buf = [0_u8; 512];
        let mut writer = SliceWriter::new(&mut buf);
        descriptor.write(&mut writer).unwrap();
        assert_eq!(writer.location(), descriptor.encoded_len());
        let written = writer.location();
        let mut reader = SliceReader::new(&buf[..written]);
        assert_eq!(Descriptor::parse(&mut reader).unwrap(), descriptor);
    }

    #[test]
    fn test_iso639_three_byte_language() {
        let descriptor = round_trip_bytes(&[0x0A, 0x04, 0x72, 0x75, 0x73, 0x00]);
        match descriptor {
            Descriptor::Iso639Language(iso) => {
                assert_eq!(iso.entries.len(), 1);
                assert_eq!(iso.entries[0].language.as_slice(), b"rus");
                assert_eq!(iso.entries[0].audio_type, 0);
            }
            other => panic!("unexpected descriptor: {:?}", other),
        }
    }

    #[test]
    fn test_iso639_two_byte_language() {
        // Degenerate form seen in the wild: 2 bytes of language plus the audio type.
        let descriptor = round_trip_bytes(&[0x0A, 0x03, 0x66, 0x72, 0x01]);
        match descriptor {
            Descriptor::Iso639Language(iso) => {
                assert_eq!(iso.entries[0].language.as_slice(), b"fr");
                assert_eq!(iso.entries[0].audio_type, 1);
            }
            other => panic!("unexpected descriptor: {:?}", other),
        }
    }

    #[test]
    fn test_maximum_bitrate_semantics() {
        let descriptor = round_trip_bytes(&[0x0E, 0x03, 0xC0, 0x00, 0x64]);
        match descriptor {
            Descriptor::MaximumBitrate(rate) => {
                assert_eq!(rate.bitrate, 100);
                assert_eq!(rate.bytes_per_second(), 5000);
            }
            other => panic!("unexpected descriptor: {:?}", other),
        }
    }

    #[test]
    fn test_service_descriptor() {
        let mut bytes = vec![0x48, 0x0C, 0x01];
        bytes.extend_from_slice(&[0x04]);
        bytes.extend_from_slice(b"Acme");
        bytes.extend_from_slice(&[0x05]);
        bytes.extend_from_slice(b"News1");
        let descriptor = round_trip_bytes(&bytes);
        match descriptor {
            Descriptor::Service(service) => {
                assert_eq!(service.service_type, 1);
                assert_eq!(service.provider.as_slice(), b"Acme");
                assert_eq!(service.name.as_slice(), b"News1");
            }
            other => panic!("unexpected descriptor: {:?}", other),
        }
    }

    #[test]
    fn test_parental_rating_minimum_age() {
        let entry = |rating| ParentalRatingEntry {
            country_code: *b"SWE",
            rating,
        };
        assert_eq!(entry(0x00).minimum_age(), 0);
        assert_eq!(entry(0x01).minimum_age(), 4);
        assert_eq!(entry(0x10).minimum_age(), 19);
        assert_eq!(entry(0x11).minimum_age(), 0);
        round_trip_record(Descriptor::ParentalRating(ParentalRatingDescriptor {
            entries: SmallVec::from_slice(&[entry(0x09)]),
        }));
    }

    #[test]
    fn test_unknown_tag_preserved() {
        let descriptor = round_trip_bytes(&[0x13, 0x03, 0xDE, 0xAD, 0x42]);
        assert!(matches!(descriptor, Descriptor::Unknown(_)));
        assert_eq!(descriptor.tag(), 0x13);
    }

    #[test]
    fn test_user_defined_tag_preserved() {
        let descriptor = round_trip_bytes(&[0x83, 0x02, 0x01, 0x02]);
        assert!(matches!(descriptor, Descriptor::UserDefined(_)));
    }

    #[test]
    fn test_malformed_payload_degrades_to_unknown() {
        // Service descriptor whose provider length overruns the payload.
        let descriptor = round_trip_bytes(&[0x48, 0x03, 0x01, 0x09, 0x41]);
        assert!(matches!(descriptor, Descriptor::Unknown(_)));
    }

    #[test]
    fn test_extension_supplementary_audio() {
        round_trip_record(Descriptor::Extension(ExtensionDescriptor::SupplementaryAudio(
            SupplementaryAudioDescriptor {
                mix_type: true,
                editorial_classification: 0x01,
                language: Some(*b"eng"),
                private_data: SmallVec::new(),
            },
        )));
    }

    #[test]
    fn test_structured_round_trips() {
        round_trip_record(Descriptor::Registration(RegistrationDescriptor {
            format_identifier: u32::from_be_bytes(*b"CUEI"),
            additional_identification_info: SmallVec::new(),
        }));
        round_trip_record(Descriptor::AvcVideo(AvcVideoDescriptor {
            profile_idc: 100,
            constraint_set0: true,
            constraint_set1: false,
            constraint_set2: true,
            compatible_flags: 0x05,
            level_idc: 41,
            avc_still_present: false,
            avc_24_hour_picture: true,
        }));
        round_trip_record(Descriptor::ShortEvent(ShortEventDescriptor {
            language: *b"eng",
            name: SmallVec::from_slice(b"Evening news"),
            text: SmallVec::from_slice(b"Headlines"),
        }));
        round_trip_record(Descriptor::Component(ComponentDescriptor {
            stream_content_ext: 0xF,
            stream_content: 0x1,
            component_type: 0x03,
            component_tag: 0x42,
            language: *b"deu",
            text: SmallVec::from_slice(b"HD video"),
        }));
        round_trip_record(Descriptor::Teletext(TeletextDescriptor {
            entries: SmallVec::from_slice(&[TeletextEntry {
                language: *b"fin",
                teletext_type: 0x02,
                magazine: 0x1,
                page: 0x20,
            }]),
        }));
        round_trip_record(Descriptor::Subtitling(SubtitlingDescriptor {
            entries: SmallVec::from_slice(&[SubtitlingEntry {
                language: *b"fra",
                subtitling_type: 0x10,
                composition_page_id: 0x0001,
                ancillary_page_id: 0x0002,
            }]),
        }));
        round_trip_record(Descriptor::Ac3(Ac3Descriptor {
            component_type: Some(0x42),
            bsid: None,
            main_id: Some(0x01),
            asvc: None,
            additional_info: SmallVec::from_slice(&[0xAA]),
        }));
        round_trip_record(Descriptor::EnhancedAc3(EnhancedAc3Descriptor {
            component_type: Some(0x42),
            bsid: Some(0x10),
            main_id: None,
            asvc: None,
            mix_info_exists: true,
            substream1: Some(0x01),
            substream2: None,
            substream3: Some(0x03),
            additional_info: SmallVec::new(),
        }));
        round_trip_record(Descriptor::Content(ContentDescriptor {
            entries: SmallVec::from_slice(&[ContentEntry {
                content_nibble_level_1: 0x2,
                content_nibble_level_2: 0x3,
                user_byte: 0x00,
            }]),
        }));
        round_trip_record(Descriptor::ExtendedEvent(ExtendedEventDescriptor {
            number: 0,
            last_number: 1,
            language: *b"eng",
            items: SmallVec::from_vec(vec![ExtendedEventItem {
                description: SmallVec::from_slice(b"Director"),
                content: SmallVec::from_slice(b"Jane Doe"),
            }]),
            text: SmallVec::from_slice(b"A film."),
        }));
    }

    #[test]
    fn test_local_time_offset_round_trip() {
        let bytes = [
            0x58, 0x0D, // tag, length
            0x53, 0x57, 0x45, // "SWE"
            0x02, // region 0, reserved, positive polarity
            0x01, 0x00, // +01:00
            0xC0, 0x79, 0x02, 0x00, 0x00, // change at MJD 0xC079 02:00:00
            0x02, 0x00, // +02:00
        ];
        let descriptor = round_trip_bytes(&bytes);
        match descriptor {
            Descriptor::LocalTimeOffset(offset) => {
                let entry = &offset.entries[0];
                assert_eq!(&entry.country_code, b"SWE");
                assert!(!entry.negative);
                assert_eq!(entry.offset_minutes, 60);
                assert_eq!(entry.next_offset_minutes, 120);
                assert_eq!(entry.time_of_change.mjd, 0xC079);
            }
            other => panic!("unexpected descriptor: {:?}", other),
        }
    }

    #[test]
    fn test_descriptor_list_reserved_nibble_preserved() {
        let bytes = [0x00, 0x03, 0x52, 0x01, 0x42];
        let mut reader = SliceReader::new(&bytes);
        let list = DescriptorList::parse(&mut reader).unwrap();
        assert_eq!(list.reserved, 0);
        assert_eq!(list.descriptors.len(), 1);
        let mut buf = [0_u8; 16];
        let mut writer = SliceWriter::new(&mut buf);
        list.write(&mut writer).unwrap();
        assert_eq!(writer.written(), &bytes);
    }
}
