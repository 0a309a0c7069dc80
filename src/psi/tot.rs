//! Time offset table payload.

use crate::clock::DvbTime;
use crate::descriptors::DescriptorList;
use crate::{Result, SliceReader, SliceWriter};

/// Time Offset Table payload: current UTC time plus local time offset descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tot {
    /// Current time in UTC.
    pub utc_time: DvbTime,
    /// Descriptor loop, normally holding a local time offset descriptor.
    pub descriptors: DescriptorList,
}

impl Tot {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        Ok(Self {
            utc_time: DvbTime::parse(reader.read_array_ref::<5>()?),
            descriptors: DescriptorList::parse(reader)?,
        })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        writer.write(&self.utc_time.write())?;
        self.descriptors.write(writer)
    }

    pub(crate) fn body_len(&self) -> usize {
        5 + self.descriptors.encoded_len()
    }
}
