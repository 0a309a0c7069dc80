//! Network information table payload.

use crate::descriptors::DescriptorList;
use crate::{read_bitfield, write_bitfield, Result, SliceReader, SliceWriter};
use modular_bitfield_msb::prelude::*;

#[bitfield]
#[derive(Debug, Clone)]
struct TransportLoopHeader {
    reserved: B4,
    length: B12,
}

#[bitfield]
#[derive(Debug, Clone)]
struct TransportEntryBits {
    transport_stream_id: B16,
    original_network_id: B16,
}

/// One transport stream entry of a NIT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NitTransport {
    /// Transport stream being described.
    pub transport_stream_id: u16,
    /// Network the transport stream originates from.
    pub original_network_id: u16,
    /// Delivery-system and service-list descriptors for the transport.
    pub descriptors: DescriptorList,
}

/// Network Information Table payload: transport streams making up a network.
///
/// The network id itself travels in the section syntax header as the table id extension.
#[derive(Debug, Clone, PartialEq)]
pub struct Nit {
    /// Network-level descriptors (network name et al).
    pub network_descriptors: DescriptorList,
    /// The 4 reserved bits ahead of the transport stream loop length.
    pub loop_reserved: u8,
    /// Transport stream entries in wire order.
    pub transports: Vec<NitTransport>,
}

impl Default for Nit {
    fn default() -> Self {
        Self {
            network_descriptors: DescriptorList::default(),
            loop_reserved: 0xF,
            transports: Vec::new(),
        }
    }
}

impl Nit {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let network_descriptors = DescriptorList::parse(reader)?;
        let loop_header = read_bitfield!(reader, TransportLoopHeader);
        let mut t_reader = reader.new_sub_reader(loop_header.length() as usize)?;
        let mut transports = Vec::new();
        while t_reader.remaining_len() > 0 {
            let entry = read_bitfield!(t_reader, TransportEntryBits);
            transports.push(NitTransport {
                transport_stream_id: entry.transport_stream_id(),
                original_network_id: entry.original_network_id(),
                descriptors: DescriptorList::parse(&mut t_reader)?,
            });
        }
        Ok(Self {
            network_descriptors,
            loop_reserved: loop_header.reserved(),
            transports,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        self.network_descriptors.write(writer)?;
        let loop_len: usize = self
            .transports
            .iter()
            .map(|t| 4 + t.descriptors.encoded_len())
            .sum();
        write_bitfield!(
            writer,
            TransportLoopHeader::new()
                .with_reserved(self.loop_reserved)
                .with_length(loop_len as u16)
        );
        for transport in &self.transports {
            write_bitfield!(
                writer,
                TransportEntryBits::new()
                    .with_transport_stream_id(transport.transport_stream_id)
                    .with_original_network_id(transport.original_network_id)
            );
            transport.descriptors.write(writer)?;
        }
        Ok(())
    }

    pub(crate) fn body_len(&self) -> usize {
        self.network_descriptors.encoded_len()
            + 2
            + self
                .transports
                .iter()
                .map(|t| 4 + t.descriptors.encoded_len())
                .sum::<usize>()
    }
}
