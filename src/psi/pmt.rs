//! Program map table payload.

use crate::descriptors::DescriptorList;
use crate::{read_bitfield, write_bitfield, Result, SliceReader, SliceWriter};
use modular_bitfield_msb::prelude::*;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// PID value signalling that a program carries no PCR.
pub const PCR_PID_NONE: u16 = 0x1FFF;

#[bitfield]
#[derive(Debug, Clone)]
struct PcrPidBits {
    reserved: B3,
    pcr_pid: B13,
}

#[bitfield]
#[derive(Debug, Clone)]
struct EsHeaderBits {
    stream_type: B8,
    reserved: B3,
    pid: B13,
}

/// Well-known elementary stream type codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum StreamType {
    /// ISO/IEC 11172-2 (MPEG-1) video.
    Mpeg1Video = 0x01,
    /// ITU-T H.262 / ISO/IEC 13818-2 (MPEG-2) video.
    Mpeg2Video = 0x02,
    /// ISO/IEC 11172-3 (MPEG-1) audio.
    Mpeg1Audio = 0x03,
    /// ISO/IEC 13818-3 (MPEG-2) audio.
    Mpeg2Audio = 0x04,
    /// Private sections.
    PrivateSections = 0x05,
    /// PES packets containing private data (teletext, DVB subtitles, AC-3 in DVB).
    PrivateData = 0x06,
    /// ISO/IEC 13818-7 ADTS AAC audio.
    AdtsAac = 0x0F,
    /// ISO/IEC 14496-3 LATM AAC audio.
    LatmAac = 0x11,
    /// ITU-T H.264 / ISO/IEC 14496-10 (AVC) video.
    H264Video = 0x1B,
    /// ITU-T H.265 / ISO/IEC 23008-2 (HEVC) video.
    H265Video = 0x24,
    /// ATSC AC-3 audio.
    Ac3Audio = 0x81,
}

/// One elementary stream entry of a PMT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementaryStream {
    /// Stream type code.
    pub stream_type: u8,
    /// PID carrying the stream.
    pub pid: u16,
    /// Stream-level descriptors.
    pub descriptors: DescriptorList,
}

impl ElementaryStream {
    /// Decoded stream type, when the code is one this crate names.
    pub fn stream_type_kind(&self) -> Option<StreamType> {
        StreamType::from_u8(self.stream_type)
    }
}

/// Program Map Table payload: the elementary streams of one program.
#[derive(Debug, Clone, PartialEq)]
pub struct Pmt {
    /// PID carrying the program clock reference, or [`PCR_PID_NONE`].
    pub pcr_pid: u16,
    /// Program-level descriptors.
    pub program_descriptors: DescriptorList,
    /// Elementary streams in wire order.
    pub streams: Vec<ElementaryStream>,
}

impl Default for Pmt {
    fn default() -> Self {
        Self {
            pcr_pid: PCR_PID_NONE,
            program_descriptors: DescriptorList::default(),
            streams: Vec::new(),
        }
    }
}

impl Pmt {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let pcr = read_bitfield!(reader, PcrPidBits);
        let program_descriptors = DescriptorList::parse(reader)?;
        let mut streams = Vec::new();
        while reader.remaining_len() > 0 {
            let header = read_bitfield!(reader, EsHeaderBits);
            streams.push(ElementaryStream {
                stream_type: header.stream_type(),
                pid: header.pid(),
                descriptors: DescriptorList::parse(reader)?,
            });
        }
        Ok(Self {
            pcr_pid: pcr.pcr_pid(),
            program_descriptors,
            streams,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        write_bitfield!(
            writer,
            PcrPidBits::new()
                .with_reserved(0b111)
                .with_pcr_pid(self.pcr_pid)
        );
        self.program_descriptors.write(writer)?;
        for stream in &self.streams {
            write_bitfield!(
                writer,
                EsHeaderBits::new()
                    .with_stream_type(stream.stream_type)
                    .with_reserved(0b111)
                    .with_pid(stream.pid)
            );
            stream.descriptors.write(writer)?;
        }
        Ok(())
    }

    pub(crate) fn body_len(&self) -> usize {
        2 + self.program_descriptors.encoded_len()
            + self
                .streams
                .iter()
                .map(|s| 3 + s.descriptors.encoded_len())
                .sum::<usize>()
    }
}
