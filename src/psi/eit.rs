//! Event information table payload.

use super::RunningStatus;
use crate::clock::{parse_bcd_hhmmss, write_bcd_hhmmss, DvbTime};
use crate::descriptors::{
    descriptor_items_len, parse_descriptor_items, write_descriptor_items, Descriptor,
};
use crate::{read_bitfield, write_bitfield, Result, SliceReader, SliceWriter};
use modular_bitfield_msb::prelude::*;
use num_traits::FromPrimitive;
use smallvec::SmallVec;

#[bitfield]
#[derive(Debug, Clone)]
struct EitEventBits {
    running_status: B3,
    free_ca_mode: bool,
    loop_length: B12,
}

/// One event entry of an EIT section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EitEvent {
    /// Event id, unique within the service.
    pub event_id: u16,
    /// Event start time in UTC.
    pub start_time: DvbTime,
    /// Event duration in seconds (carried as BCD `HHMMSS`).
    pub duration: u32,
    /// Raw 3-bit running status code; see [`EitEvent::status`].
    pub running_status: u8,
    /// Whether one or more streams of the event are CA-controlled.
    pub free_ca_mode: bool,
    /// Event descriptors (short event, extended event, content, parental rating, ...).
    pub descriptors: SmallVec<[Descriptor; 4]>,
}

impl EitEvent {
    /// Decoded running status.
    pub fn status(&self) -> RunningStatus {
        RunningStatus::from_u8(self.running_status & 0x7).unwrap_or(RunningStatus::Undefined)
    }
}

/// Event Information Table payload: the events of one service.
///
/// The service id travels in the section syntax header as the table id extension; which of the
/// present/following or schedule flavors a section belongs to is determined by its table id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Eit {
    /// Transport stream carrying the service.
    pub transport_stream_id: u16,
    /// Network the transport stream originates from.
    pub original_network_id: u16,
    /// Last section number of this segment.
    pub segment_last_section_number: u8,
    /// Last table id of the event schedule chain.
    pub last_table_id: u8,
    /// Event entries in wire order.
    pub events: Vec<EitEvent>,
}

impl Eit {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let transport_stream_id = reader.read_be_u16()?;
        let original_network_id = reader.read_be_u16()?;
        let segment_last_section_number = reader.read_u8()?;
        let last_table_id = reader.read_u8()?;
        let mut events = Vec::new();
        while reader.remaining_len() > 0 {
            let event_id = reader.read_be_u16()?;
            let start_time = DvbTime::parse(reader.read_array_ref::<5>()?);
            let duration = parse_bcd_hhmmss(reader.read_array_ref::<3>()?);
            let bits = read_bitfield!(reader, EitEventBits);
            let mut d_reader = reader.new_sub_reader(bits.loop_length() as usize)?;
            events.push(EitEvent {
                event_id,
                start_time,
                duration,
                running_status: bits.running_status(),
                free_ca_mode: bits.free_ca_mode(),
                descriptors: parse_descriptor_items(&mut d_reader)?,
            });
        }
        Ok(Self {
            transport_stream_id,
            original_network_id,
            segment_last_section_number,
            last_table_id,
            events,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write_be_u16(self.transport_stream_id)?;
        writer.write_be_u16(self.original_network_id)?;
        writer.write_u8(self.segment_last_section_number)?;
        writer.write_u8(self.last_table_id)?;
        for event in &self.events {
            writer.write_be_u16(event.event_id)?;
            writer.write(&event.start_time.write())?;
            writer.write(&write_bcd_hhmmss(event.duration))?;
            write_bitfield!(
                writer,
                EitEventBits::new()
                    .with_running_status(event.running_status)
                    .with_free_ca_mode(event.free_ca_mode)
                    .with_loop_length(descriptor_items_len(&event.descriptors) as u16)
            );
            write_descriptor_items(&event.descriptors, writer)?;
        }
        Ok(())
    }

    pub(crate) fn body_len(&self) -> usize {
        6 + self
            .events
            .iter()
            .map(|e| 12 + descriptor_items_len(&e.descriptors))
            .sum::<usize>()
    }
}
