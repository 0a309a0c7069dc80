//! Demuxer facade: drives the framer and packet parser from a byte source and yields typed
//! payload units.

use super::framer::{Framer, PacketSize};
use super::{Diagnostics, Error, ErrorDetails, Payload, Result, TsParser, TsUnit};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a [`RawPayloadHandler`] did with the bytes offered to it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RawPayloadAction {
    /// The handler consumed the payload.
    Consumed,
    /// The payload should be counted as dropped.
    Skip,
}

/// Caller-supplied parser for payloads on PIDs the demuxer cannot classify as PSI or PES.
///
/// The handler sees the raw payload bytes of each such packet in arrival order, along with the
/// payload unit start flag for its own reassembly.
pub trait RawPayloadHandler {
    /// Offers one packet's payload bytes.
    fn handle(&mut self, pid: u16, unit_start: bool, payload: &[u8]) -> RawPayloadAction;
}

/// Demuxer over any [`Read`] byte source.
///
/// Yields one [`TsUnit`] per completed PSI section or PES packet, in the order their
/// completing TS packet appears in the source.
///
/// # Example
///
/// ```no_run
/// use dvbts::{Demuxer, TsUnit};
/// use std::fs::File;
///
/// let file = File::open("stream.ts").expect("Unable to open!");
/// let mut demuxer = Demuxer::new(file);
/// while let Some(unit) = demuxer.next_unit().expect("Parse Error!") {
///     match unit {
///         TsUnit::Psi(psi) => println!("{:?}", psi),
///         TsUnit::Pes(pes) => println!("{:?}", pes),
///     }
/// }
/// ```
pub struct Demuxer<R> {
    framer: Framer<R>,
    parser: TsParser,
    raw_handler: Option<Box<dyn RawPayloadHandler>>,
    cancel: Option<Arc<AtomicBool>>,
    dropped_payloads: u64,
    flushed: bool,
}

impl<R: Read> Demuxer<R> {
    /// Creates a demuxer that auto-detects the packet pitch of `source`.
    pub fn new(source: R) -> Self {
        Self {
            framer: Framer::new(source),
            parser: TsParser::default(),
            raw_handler: None,
            cancel: None,
            dropped_payloads: 0,
            flushed: false,
        }
    }

    /// Creates a demuxer locked to a known packet pitch.
    pub fn with_packet_size(source: R, size: PacketSize) -> Self {
        Self {
            framer: Framer::with_packet_size(source, size),
            parser: TsParser::default(),
            raw_handler: None,
            cancel: None,
            dropped_payloads: 0,
            flushed: false,
        }
    }

    /// Installs a parser for payloads on unclassified PIDs.
    pub fn set_raw_payload_handler(&mut self, handler: Box<dyn RawPayloadHandler>) {
        self.raw_handler = Some(handler);
    }

    /// Installs a cancellation flag, checked between packets.
    pub fn set_cancellation(&mut self, cancel: Arc<AtomicBool>) {
        self.cancel = Some(cancel);
    }

    /// Caps how many bytes one PSI payload unit may accumulate (default 1024).
    pub fn set_max_psi_unit_len(&mut self, max: usize) {
        self.parser.set_max_psi_unit_len(max);
    }

    /// Yields the next typed payload unit, pulling packets from the source as needed.
    ///
    /// Returns `Ok(None)` once the source is exhausted and every pending unit has been
    /// flushed. A fired cancellation flag surfaces as a [`Cancelled`](ErrorDetails::Cancelled)
    /// error with all per-PID state left intact.
    pub fn next_unit(&mut self) -> Result<Option<TsUnit>> {
        loop {
            if let Some(unit) = self.parser.take_unit() {
                return Ok(Some(unit));
            }
            if self.flushed {
                return Ok(None);
            }
            if let Some(cancel) = &self.cancel {
                if cancel.load(Ordering::Relaxed) {
                    return Err(Error::new(0, ErrorDetails::Cancelled));
                }
            }
            match self.framer.next_frame()? {
                Some(frame) => {
                    let packet = self.parser.parse(&frame.packet)?;
                    if let Some(Payload::Raw(bytes)) = packet.payload {
                        let action = match self.raw_handler.as_mut() {
                            Some(handler) => {
                                handler.handle(packet.header.pid(), packet.header.pusi(), bytes)
                            }
                            None => RawPayloadAction::Skip,
                        };
                        if action == RawPayloadAction::Skip {
                            self.dropped_payloads += 1;
                        }
                    }
                }
                None => {
                    self.parser.flush()?;
                    self.flushed = true;
                }
            }
        }
    }

    /// Counters of recovered anomalies.
    pub fn diagnostics(&self) -> &Diagnostics {
        self.parser.diagnostics()
    }

    /// Payload-bearing packets neither classified nor consumed by a handler.
    pub fn dropped_payloads(&self) -> u64 {
        self.dropped_payloads
    }

    /// The detected (or configured) packet pitch, once known.
    pub fn packet_size(&self) -> Option<PacketSize> {
        self.framer.packet_size()
    }

    /// Access to the underlying packet parser (program map, diagnostics).
    pub fn parser(&self) -> &TsParser {
        &self.parser
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::{table_ids, TableData};
    use crate::tests::build_packet;
    use crate::PID_PAT;

    fn pat_packet() -> [u8; 188] {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&crate::psi::tests::PAT_BYTES);
        build_packet(PID_PAT, true, 0, &payload)
    }

    fn pmt_packet() -> [u8; 188] {
        let mut payload = vec![0x00];
        payload.extend_from_slice(&crate::psi::tests::PMT_BYTES);
        build_packet(0x1000, true, 0, &payload)
    }

    #[test]
    fn test_units_emerge_in_stream_order() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&pat_packet());
        bytes.extend_from_slice(&pmt_packet());
        // Bounded PES on the announced elementary PID.
        let pes = [
            0x00, 0x00, 0x01, 0xC0, 0x00, 0x05, 0x80, 0x00, 0x00, 0x42, 0x43,
        ];
        bytes.extend_from_slice(&build_packet(0x104, true, 0, &pes));

        let mut demuxer = Demuxer::new(bytes.as_slice());
        match demuxer.next_unit().unwrap().unwrap() {
            TsUnit::Psi(section) => assert_eq!(section.table_id, table_ids::PAT),
            other => panic!("unexpected unit: {:?}", other),
        }
        match demuxer.next_unit().unwrap().unwrap() {
            TsUnit::Psi(section) => match section.table {
                TableData::Pmt(pmt) => assert_eq!(pmt.pcr_pid, 0x100),
                other => panic!("unexpected table: {:?}", other),
            },
            other => panic!("unexpected unit: {:?}", other),
        }
        match demuxer.next_unit().unwrap().unwrap() {
            TsUnit::Pes(pes) => assert_eq!(pes.data, vec![0x42, 0x43]),
            other => panic!("unexpected unit: {:?}", other),
        }
        assert!(demuxer.next_unit().unwrap().is_none());
        assert!(demuxer.next_unit().unwrap().is_none());
    }

    #[test]
    fn test_cat_delivers_nothing() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&build_packet(crate::PID_CAT, true, 0, &[0x01, 0xB0, 0x00]));
        let mut demuxer = Demuxer::new(bytes.as_slice());
        assert!(demuxer.next_unit().unwrap().is_none());
        assert_eq!(demuxer.dropped_payloads(), 0);
    }

    struct Collector(std::rc::Rc<std::cell::RefCell<Vec<(u16, usize)>>>);

    impl RawPayloadHandler for Collector {
        fn handle(&mut self, pid: u16, _unit_start: bool, payload: &[u8]) -> RawPayloadAction {
            self.0.borrow_mut().push((pid, payload.len()));
            RawPayloadAction::Consumed
        }
    }

    #[test]
    fn test_raw_handler_sees_unclassified_payloads() {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&build_packet(0x0500, true, 0, &[0xAB; 10]));
        let mut demuxer = Demuxer::new(bytes.as_slice());
        demuxer.set_raw_payload_handler(Box::new(Collector(seen.clone())));
        assert!(demuxer.next_unit().unwrap().is_none());
        assert_eq!(seen.borrow().as_slice(), &[(0x0500, 184)]);
        assert_eq!(demuxer.dropped_payloads(), 0);
    }

    #[test]
    fn test_unhandled_payload_counted_dropped() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&build_packet(0x0500, true, 0, &[0xAB; 10]));
        let mut demuxer = Demuxer::new(bytes.as_slice());
        assert!(demuxer.next_unit().unwrap().is_none());
        assert_eq!(demuxer.dropped_payloads(), 1);
    }

    #[test]
    fn test_cancellation_between_packets() {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&pat_packet());
        bytes.extend_from_slice(&pmt_packet());
        let mut demuxer = Demuxer::new(bytes.as_slice());
        demuxer.set_cancellation(cancel.clone());
        assert!(demuxer.next_unit().unwrap().is_some());
        cancel.store(true, Ordering::Relaxed);
        let error = demuxer.next_unit().unwrap_err();
        assert!(matches!(error.details, ErrorDetails::Cancelled));
        // State stays intact: clearing the flag resumes where it left off.
        cancel.store(false, Ordering::Relaxed);
        assert!(demuxer.next_unit().unwrap().is_some());
    }
}
