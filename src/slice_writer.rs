use super::{Error, ErrorDetails, Result};

/// Write-side counterpart of [`SliceReader`](crate::SliceReader): serializes data into a
/// `&mut [u8]` slice while tracking the location for informative [`ShortWrite`] errors.
///
/// Bit packing happens inside the bitfield types (MSB first within each byte); this sink only
/// deals in whole bytes.
///
/// [`ShortWrite`]: crate::ErrorDetails::ShortWrite
///
/// # Example
///
/// ```
/// use dvbts::SliceWriter;
/// let mut buf = [0_u8; 4];
/// let mut writer = SliceWriter::new(&mut buf);
/// writer.write_be_u16(0x1234)?;
/// assert_eq!(writer.written(), &[0x12, 0x34]);
/// # Ok::<(), dvbts::Error>(())
/// ```
#[derive(Debug)]
pub struct SliceWriter<'a> {
    slice: &'a mut [u8],
    location: usize,
}

impl<'a> SliceWriter<'a> {
    /// Initializes a writer over any mutable byte slice.
    pub fn new(slice: &'a mut [u8]) -> Self {
        Self { slice, location: 0 }
    }

    /// Creates an [`Error`] using the contained location.
    pub fn make_error(&self, details: ErrorDetails) -> Error {
        Error::new(self.location, details)
    }

    /// Number of bytes written so far.
    pub fn location(&self) -> usize {
        self.location
    }

    /// Number of bytes still available in the underlying slice.
    pub fn remaining_len(&self) -> usize {
        self.slice.len() - self.location
    }

    /// View of everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.slice[..self.location]
    }

    /// Copy `bytes` into the slice and advance.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining_len() {
            Err(self.make_error(ErrorDetails::ShortWrite(bytes.len())))
        } else {
            self.slice[self.location..self.location + bytes.len()].copy_from_slice(bytes);
            self.location += bytes.len();
            Ok(())
        }
    }

    /// Write one byte.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write(&[value])
    }

    /// Write two bytes as big-endian [`u16`].
    pub fn write_be_u16(&mut self, value: u16) -> Result<()> {
        self.write(&value.to_be_bytes())
    }

    /// Write the low three bytes of `value` as a big-endian `u24`.
    pub fn write_be_u24(&mut self, value: u32) -> Result<()> {
        self.write(&value.to_be_bytes()[1..])
    }

    /// Write four bytes as big-endian [`u32`].
    pub fn write_be_u32(&mut self, value: u32) -> Result<()> {
        self.write(&value.to_be_bytes())
    }

    /// Write `length` copies of `byte`; used for stuffing regions.
    pub fn fill(&mut self, length: usize, byte: u8) -> Result<()> {
        if length > self.remaining_len() {
            Err(self.make_error(ErrorDetails::ShortWrite(length)))
        } else {
            for b in &mut self.slice[self.location..self.location + length] {
                *b = byte;
            }
            self.location += length;
            Ok(())
        }
    }

    /// Fill every remaining byte of the slice with `byte` and advance to the end.
    pub fn fill_remaining(&mut self, byte: u8) {
        let remaining = self.remaining_len();
        // Infallible: fill() of exactly the remaining length cannot overrun.
        self.fill(remaining, byte).unwrap();
    }
}

/// Convenience macro to serialize a modular bitfield into a [`SliceWriter`].
///
/// Mirror of [`read_bitfield!`](crate::read_bitfield): consumes the bitfield value and emits its
/// exact byte representation. Must be expanded in a function that returns
/// [`Result`](crate::Result).
///
/// # Example
///
/// ```
/// use modular_bitfield_msb::prelude::*;
/// use dvbts::{write_bitfield, SliceWriter};
/// #[bitfield]
/// pub(crate) struct MyBitfield {
///     pub a_bit: B1,
///     #[skip]
///     padding: B7,
/// }
///
/// let mut buf = [0_u8; 1];
/// let mut writer = SliceWriter::new(&mut buf);
/// write_bitfield!(writer, MyBitfield::new().with_a_bit(1));
/// assert_eq!(buf, [0x80]);
/// # Ok::<(), dvbts::Error>(())
/// ```
#[macro_export]
macro_rules! write_bitfield {
    ($writer:expr, $bitfield:expr) => {
        $writer.write(&$bitfield.into_bytes())?
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_write_reports_location() {
        let mut buf = [0_u8; 3];
        let mut writer = SliceWriter::new(&mut buf);
        writer.write_be_u16(0xBEEF).unwrap();
        let err = writer.write_be_u16(0xCAFE).unwrap_err();
        assert_eq!(err.location, 2);
        assert!(matches!(err.details, ErrorDetails::ShortWrite(2)));
    }

    #[test]
    fn test_fill_remaining() {
        let mut buf = [0_u8; 4];
        let mut writer = SliceWriter::new(&mut buf);
        writer.write_u8(0x47).unwrap();
        writer.fill_remaining(0xFF);
        assert_eq!(writer.remaining_len(), 0);
        assert_eq!(buf, [0x47, 0xFF, 0xFF, 0xFF]);
    }
}
