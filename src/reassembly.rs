//! Per-PID assembly of PSI payload units and PES packets spanning multiple TS packets.

use super::pes::Pes;
use super::psi::{is_psi_unit_complete, parse_psi_unit};
use super::{ErrorDetails, Result, TsParser, TsUnit};
use enum_dispatch::enum_dispatch;
use smallvec::SmallVec;

/// Accumulates the payload bytes of one in-flight unit and knows when they form a complete
/// record.
#[enum_dispatch]
pub(crate) trait UnitAssembler {
    /// Appends the payload of one TS packet.
    fn extend_from_slice(&mut self, slice: &[u8]) -> Result<()>;

    /// Whether the accumulated bytes form a complete unit that may be finished before the next
    /// payload unit start arrives.
    fn is_complete(&self) -> bool;

    /// Parses the accumulated bytes into typed units.
    fn finish(self, pid: u16, parser: &mut TsParser) -> Result<SmallVec<[TsUnit; 2]>>;
}

#[enum_dispatch(UnitAssembler)]
pub(crate) enum Assembler {
    Psi(PsiAssembler),
    Pes(PesAssembler),
}

/// Assembler for PSI payload units (pointer field plus one or more sections).
pub(crate) struct PsiAssembler {
    data: Vec<u8>,
    /// Early completion is only safe for the PAT PID and known PMT PIDs, where a single table
    /// occupies the unit; other PSI PIDs may append further sections in later packets.
    early_completion: bool,
    max_len: usize,
}

impl PsiAssembler {
    pub fn new(early_completion: bool, max_len: usize) -> Self {
        Self {
            data: Vec::new(),
            early_completion,
            max_len,
        }
    }
}

impl UnitAssembler for PsiAssembler {
    fn extend_from_slice(&mut self, slice: &[u8]) -> Result<()> {
        if self.data.len() + slice.len() > self.max_len {
            return Err(super::Error::new(
                self.data.len(),
                ErrorDetails::InvalidLength(self.data.len() + slice.len()),
            ));
        }
        self.data.extend_from_slice(slice);
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.early_completion && is_psi_unit_complete(&self.data)
    }

    fn finish(self, pid: u16, parser: &mut TsParser) -> Result<SmallVec<[TsUnit; 2]>> {
        let sections = parse_psi_unit(&self.data, &mut parser.diagnostics)?;
        let mut out = SmallVec::new();
        for section in sections {
            parser.observe_psi(pid, &section);
            out.push(TsUnit::Psi(section));
        }
        Ok(out)
    }
}

/// Assembler for PES packets; completes on the declared packet length, or at the next unit
/// boundary when the length is 0 (unbounded video).
pub(crate) struct PesAssembler {
    data: Vec<u8>,
}

impl PesAssembler {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    fn expected_len(&self) -> Option<usize> {
        if self.data.len() < 6 {
            return None;
        }
        match u16::from_be_bytes([self.data[4], self.data[5]]) {
            0 => None,
            length => Some(6 + length as usize),
        }
    }
}

impl UnitAssembler for PesAssembler {
    fn extend_from_slice(&mut self, slice: &[u8]) -> Result<()> {
        self.data.extend_from_slice(slice);
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.expected_len()
            .map_or(false, |expected| self.data.len() >= expected)
    }

    fn finish(self, _pid: u16, _parser: &mut TsParser) -> Result<SmallVec<[TsUnit; 2]>> {
        let mut out = SmallVec::new();
        out.push(TsUnit::Pes(Pes::parse(&self.data)?));
        Ok(out)
    }
}

/// Reassembly state of one PID.
pub(crate) struct PidState {
    /// In-flight unit, if any; stays `None` between a finished unit and the next unit start so
    /// the continuity counter keeps being tracked.
    pub assembler: Option<Assembler>,
    /// Continuity counter of the last payload-bearing packet.
    pub last_counter: u8,
}
