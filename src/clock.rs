//! Clock references (PCR/OPCR/ESCR, PTS/DTS) and the DVB MJD/BCD time encodings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use std::fmt::{Debug, Formatter};
use std::time::Duration;

/// Expands to [`format_args`] for a 90kHz timestamp of any integer type.
///
/// Format is <hours>:<minutes>:<seconds>:<90kHz-ticks>
///
/// # Example
///
/// ```
/// use dvbts::pts_format_args;
/// assert_eq!(std::fmt::format(pts_format_args!(900000)), "0:0:10:0");
/// ```
#[macro_export]
macro_rules! pts_format_args {
    ($pts:expr) => {
        format_args!(
            "{}:{}:{}:{}",
            $pts / (90000 * 60 * 60),
            $pts / (90000 * 60) % 60,
            $pts / 90000 % 60,
            $pts % 90000
        )
    };
}

/// 42-bit clock sample used for PCR, OPCR and ESCR fields.
///
/// The 27MHz tick count is `base * 300 + extension`.
#[derive(Default, Copy, Clone, PartialEq, Eq)]
pub struct ClockReference {
    /// 33-bits of a 90kHz base clock. May be formatted with [`pts_format_args`].
    pub base: u64,
    /// 9-bits of a 27MHz clock rolling over every 300 counts to the base.
    pub extension: u16,
}

impl ClockReference {
    /// 27MHz system clock frequency.
    pub const TICKS_PER_SECOND: u64 = 27_000_000;

    /// Builds a clock reference from a 27MHz tick count.
    pub fn from_ticks(ticks: u64) -> Self {
        Self {
            base: (ticks / 300) & 0x1_FFFF_FFFF,
            extension: (ticks % 300) as u16,
        }
    }

    /// Builds a clock reference from a 90kHz tick count with a zero extension.
    pub fn from_90khz(base: u64) -> Self {
        Self {
            base: base & 0x1_FFFF_FFFF,
            extension: 0,
        }
    }

    /// 27MHz tick count.
    pub fn ticks(&self) -> u64 {
        self.base * 300 + u64::from(self.extension)
    }

    /// Tick count scaled to nanoseconds.
    pub fn nanoseconds(&self) -> u64 {
        self.ticks() * 1000 / 27
    }

    /// Tick count as a [`Duration`] since the clock origin.
    pub fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.nanoseconds())
    }

    /// Wall-clock instant of this sample, given the instant the clock counted from.
    pub fn to_date_time(&self, epoch: DateTime<Utc>) -> DateTime<Utc> {
        epoch + chrono::Duration::nanoseconds(self.nanoseconds() as i64)
    }
}

impl Debug for ClockReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockReference")
            .field("base", &pts_format_args!(self.base))
            .field("extension", &self.extension)
            .finish()
    }
}

pub(crate) fn parse_pcr(b: &[u8; 6]) -> ClockReference {
    let mut base: u64 = (b[0] as u64) << 25;
    base |= (b[1] as u64) << 17;
    base |= (b[2] as u64) << 9;
    base |= (b[3] as u64) << 1;
    base |= (b[4] as u64) >> 7;

    let mut extension: u16 = ((b[4] & 0x1) as u16) << 8;
    extension |= b[5] as u16;
    ClockReference { base, extension }
}

pub(crate) fn write_pcr(pcr: &ClockReference) -> [u8; 6] {
    [
        (pcr.base >> 25) as u8,
        (pcr.base >> 17) as u8,
        (pcr.base >> 9) as u8,
        (pcr.base >> 1) as u8,
        // Low base bit, 6 reserved bits, high extension bit.
        ((pcr.base as u8) << 7) | 0x7E | ((pcr.extension >> 8) as u8 & 0x1),
        pcr.extension as u8,
    ]
}

pub(crate) fn parse_timestamp(b: &[u8; 5]) -> u64 {
    let mut ts: u64 = ((b[0] & 0x0E) as u64) << 29;
    ts |= (b[1] as u64) << 22;
    ts |= ((b[2] & 0xFE) as u64) << 14;
    ts |= (b[3] as u64) << 7;
    ts |= ((b[4] & 0xFE) as u64) >> 1;
    ts
}

/// Marker bits interleave the three timestamp fragments; all must be set.
pub(crate) fn timestamp_markers_valid(b: &[u8; 5]) -> bool {
    b[0] & 0x1 == 0x1 && b[2] & 0x1 == 0x1 && b[4] & 0x1 == 0x1
}

pub(crate) fn write_timestamp(nibble: u8, ts: u64) -> [u8; 5] {
    [
        (nibble << 4) | (((ts >> 30) as u8) & 0x7) << 1 | 0x1,
        (ts >> 22) as u8,
        (((ts >> 15) as u8) << 1) | 0x1,
        (ts >> 7) as u8,
        ((ts as u8) << 1) | 0x1,
    ]
}

fn bcd_decode(b: u8) -> u8 {
    (b >> 4) * 10 + (b & 0x0F)
}

fn bcd_encode(v: u8) -> u8 {
    ((v / 10) << 4) | (v % 10)
}

/// DVB timestamp: 16-bit Modified Julian Date plus 6 BCD digits of UTC time.
///
/// Used by TOT sections, EIT event start times, and the local time offset descriptor.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DvbTime {
    /// Modified Julian Date day count (day 0 is 1858-11-17).
    pub mjd: u16,
    /// Hour of day, 0-23.
    pub hour: u8,
    /// Minute, 0-59.
    pub minute: u8,
    /// Second, 0-59.
    pub second: u8,
}

impl DvbTime {
    pub(crate) fn parse(b: &[u8; 5]) -> Self {
        Self {
            mjd: u16::from_be_bytes([b[0], b[1]]),
            hour: bcd_decode(b[2]),
            minute: bcd_decode(b[3]),
            second: bcd_decode(b[4]),
        }
    }

    pub(crate) fn write(&self) -> [u8; 5] {
        let mjd = self.mjd.to_be_bytes();
        [
            mjd[0],
            mjd[1],
            bcd_encode(self.hour),
            bcd_encode(self.minute),
            bcd_encode(self.second),
        ]
    }

    /// Converts to a wall-clock UTC instant.
    ///
    /// Returns [`None`] when the BCD digits do not form a valid time of day.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        let date = mjd_epoch() + chrono::Duration::days(i64::from(self.mjd));
        let time = NaiveTime::from_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )?;
        Some(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
    }

    /// Builds a DVB timestamp from a wall-clock UTC instant.
    pub fn from_utc(dt: &DateTime<Utc>) -> Self {
        let naive = dt.naive_utc();
        let days = naive.date().signed_duration_since(mjd_epoch()).num_days();
        Self {
            mjd: days as u16,
            hour: naive.time().hour() as u8,
            minute: naive.time().minute() as u8,
            second: naive.time().second() as u8,
        }
    }
}

fn mjd_epoch() -> NaiveDate {
    // Infallible: day 0 of the Modified Julian Date scale.
    NaiveDate::from_ymd_opt(1858, 11, 17).unwrap()
}

/// Decode a 24-bit BCD `HHMMSS` duration to seconds.
pub(crate) fn parse_bcd_hhmmss(b: &[u8; 3]) -> u32 {
    u32::from(bcd_decode(b[0])) * 3600 + u32::from(bcd_decode(b[1])) * 60 + u32::from(bcd_decode(b[2]))
}

/// Encode a duration in seconds as 24-bit BCD `HHMMSS`.
pub(crate) fn write_bcd_hhmmss(seconds: u32) -> [u8; 3] {
    [
        bcd_encode((seconds / 3600) as u8),
        bcd_encode((seconds / 60 % 60) as u8),
        bcd_encode((seconds % 60) as u8),
    ]
}

/// Decode a 16-bit BCD `HHMM` offset to minutes.
pub(crate) fn parse_bcd_hhmm(b: &[u8; 2]) -> u16 {
    u16::from(bcd_decode(b[0])) * 60 + u16::from(bcd_decode(b[1]))
}

/// Encode an offset in minutes as 16-bit BCD `HHMM`.
pub(crate) fn write_bcd_hhmm(minutes: u16) -> [u8; 2] {
    [bcd_encode((minutes / 60) as u8), bcd_encode((minutes % 60) as u8)]
}
