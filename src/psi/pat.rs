//! Program association table payload.

use crate::{read_bitfield, write_bitfield, Result, SliceReader, SliceWriter};
use modular_bitfield_msb::prelude::*;
use smallvec::SmallVec;

#[bitfield]
#[derive(Debug, Clone)]
struct PatEntryBits {
    program_number: B16,
    reserved: B3,
    pid: B13,
}

/// One association of a program number with its PMT PID.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PatEntry {
    /// Program number; 0 associates the network PID instead of a program.
    pub program_number: u16,
    /// PMT PID of the program, or the NIT PID for program number 0.
    pub pid: u16,
}

/// Program Association Table payload: the program line-up of the transport stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pat {
    /// Associations in wire order.
    pub entries: SmallVec<[PatEntry; 4]>,
}

impl Pat {
    pub(crate) fn parse(reader: &mut SliceReader) -> Result<Self> {
        let mut entries = SmallVec::with_capacity(reader.remaining_len() / 4);
        while reader.remaining_len() >= 4 {
            let bits = read_bitfield!(reader, PatEntryBits);
            entries.push(PatEntry {
                program_number: bits.program_number(),
                pid: bits.pid(),
            });
        }
        Ok(Self { entries })
    }

    pub(crate) fn write(&self, writer: &mut SliceWriter) -> Result<()> {
        for entry in &self.entries {
            write_bitfield!(
                writer,
                PatEntryBits::new()
                    .with_program_number(entry.program_number)
                    .with_reserved(0b111)
                    .with_pid(entry.pid)
            );
        }
        Ok(())
    }

    pub(crate) fn body_len(&self) -> usize {
        4 * self.entries.len()
    }

    /// PIDs of every program map table listed (program number 0 excluded).
    pub fn pmt_pids(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries
            .iter()
            .filter(|e| e.program_number != 0)
            .map(|e| e.pid)
    }

    /// The NIT PID, when a program number 0 association is present.
    pub fn network_pid(&self) -> Option<u16> {
        self.entries
            .iter()
            .find(|e| e.program_number == 0)
            .map(|e| e.pid)
    }
}
