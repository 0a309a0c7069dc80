//! Service description table payload.

use super::RunningStatus;
use crate::descriptors::{
    descriptor_items_len, parse_descriptor_items, write_descriptor_items, Descriptor,
};
use crate::{read_bitfield, write_bitfield, Result, SliceReader, SliceWriter};
use modular_bitfield_msb::prelude::*;
use num_traits::FromPrimitive;
use smallvec::SmallVec;

#[bitfield]
#[derive(Debug, Clone)]
struct SdtServiceBits {
    service_id: B16,
    reserved: B6,
    has_eit_schedule: bool,
    has_eit_present_following: bool,
    running_status: B3,
    free_ca_mode: bool,
    loop_length: B12,
}

/// One service entry of an SDT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SdtService {
    /// Service id (same value as the PMT's program number).
    pub service_id: u16,
    /// Whether EIT schedule information is present for the service.
    pub has_eit_schedule: bool,
    /// Whether EIT present/following information is present for the service.
    pub has_eit_present_following: bool,
    /// Raw 3-bit running status code; see [`SdtService::status`].
    pub running_status: u8,
    /// Whether one or more streams of the service are CA-controlled.
    pub free_ca_mode: bool,
    /// Service descriptors (service name, data broadcast, ...).
    pub descriptors: SmallVec<[Descriptor; 4]>,
}

impl SdtService {
    /// Decoded running status.
    pub fn status(&self) -> RunningStatus {
        RunningStatus::from_u8(self.running_status & 0x7).unwrap_or(RunningStatus::Undefined)
    }
}

/// Service Description Table payload: the services of one transport stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sdt {
    /// Network the described transport stream originates from.
    pub original_network_id: u16,
    /// Service entries in wire order.
    pub services: Vec<SdtService>,
}

impl Sdt {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let original_network_id = reader.read_be_u16()?;
        // One reserved byte follows the original network id.
        reader.skip(1)?;
        let mut services = Vec::new();
        while reader.remaining_len() > 0 {
            let bits = read_bitfield!(reader, SdtServiceBits);
            let mut d_reader = reader.new_sub_reader(bits.loop_length() as usize)?;
            services.push(SdtService {
                service_id: bits.service_id(),
                has_eit_schedule: bits.has_eit_schedule(),
                has_eit_present_following: bits.has_eit_present_following(),
                running_status: bits.running_status(),
                free_ca_mode: bits.free_ca_mode(),
                descriptors: parse_descriptor_items(&mut d_reader)?,
            });
        }
        Ok(Self {
            original_network_id,
            services,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write_be_u16(self.original_network_id)?;
        writer.write_u8(0xFF)?;
        for service in &self.services {
            write_bitfield!(
                writer,
                SdtServiceBits::new()
                    .with_service_id(service.service_id)
                    .with_reserved(0b111111)
                    .with_has_eit_schedule(service.has_eit_schedule)
                    .with_has_eit_present_following(service.has_eit_present_following)
                    .with_running_status(service.running_status)
                    .with_free_ca_mode(service.free_ca_mode)
                    .with_loop_length(descriptor_items_len(&service.descriptors) as u16)
            );
            write_descriptor_items(&service.descriptors, writer)?;
        }
        Ok(())
    }

    pub(crate) fn body_len(&self) -> usize {
        3 + self
            .services
            .iter()
            .map(|s| 5 + descriptor_items_len(&s.descriptors))
            .sum::<usize>()
    }
}
