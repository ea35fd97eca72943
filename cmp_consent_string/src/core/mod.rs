use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, Numeric};
use std::collections::BTreeSet;
use std::io;
use std::iter::repeat_with;

pub mod base64;

/// Bit-level reader over a byte buffer, big-endian bit order.
///
/// All multi-bit values are read most-significant bit first. Reading past
/// the end of the buffer surfaces as an [`io::Error`] of kind
/// `UnexpectedEof`, never as a panic.
pub struct DataReader<'a> {
    bit_reader: BitReader<&'a [u8], BigEndian>,
}

impl<'a> DataReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bit_reader: BitReader::endian(bytes, BigEndian),
        }
    }

    pub fn read_bool(&mut self) -> io::Result<bool> {
        self.bit_reader.read_bit()
    }

    pub fn read_fixed_integer<N: Numeric>(&mut self, bits: u32) -> io::Result<N> {
        self.bit_reader.read(bits)
    }

    /// Reads `chars` letters, 6 bits each, packed as an offset from `'a'`.
    ///
    /// Values above 25 decode to characters beyond `'z'` and are left for
    /// the caller to reject.
    pub fn read_string(&mut self, chars: usize) -> io::Result<String> {
        repeat_with(|| self.read_fixed_integer::<u8>(6))
            .take(chars)
            .map(|r| r.map(|n| (n + b'a') as char))
            .collect::<Result<String, _>>()
    }

    /// Reads a 36-bit timestamp counting deciseconds since the Unix epoch.
    pub fn read_datetime_as_deciseconds(&mut self) -> io::Result<u64> {
        self.read_fixed_integer(36)
    }

    /// Reads `bits` bits; bit i (1-based) set means id i is in the set.
    pub fn read_fixed_bitfield(&mut self, bits: usize) -> io::Result<BTreeSet<u16>> {
        let mut result = BTreeSet::new();
        for i in 1..=bits {
            let b = self.read_bool()?;
            if b {
                result.insert(i as u16);
            }
        }

        Ok(result)
    }

    /// Reads a range-encoded id list: a 16-bit entry count, then for each
    /// entry a 1-bit flag selecting a single 16-bit id (0) or a 16-bit
    /// start/end pair (1).
    pub fn read_integer_range(&mut self) -> io::Result<Vec<u16>> {
        let n = self.read_fixed_integer::<u16>(16)?;
        let mut range = vec![];

        for _ in 0..n {
            let is_group = self.read_bool()?;
            if is_group {
                let start = self.read_fixed_integer::<u16>(16)?;
                let end = self.read_fixed_integer::<u16>(16)?;

                for id in start..=end {
                    range.push(id);
                }
            } else {
                let id = self.read_fixed_integer::<u16>(16)?;
                range.push(id);
            }
        }

        Ok(range)
    }
}

/// Bit-level writer, the mirror of [`DataReader`].
///
/// Bits accumulate into an internal byte buffer; [`DataWriter::into_bytes`]
/// flushes the final partial byte with zero padding and reports the exact
/// number of bits written, which the base64 layer needs to emit the right
/// number of characters.
pub struct DataWriter {
    bit_writer: BitWriter<Vec<u8>, BigEndian>,
    bit_len: usize,
}

impl DataWriter {
    pub fn new() -> Self {
        Self {
            bit_writer: BitWriter::endian(Vec::new(), BigEndian),
            bit_len: 0,
        }
    }

    pub fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.bit_writer.write_bit(value)?;
        self.bit_len += 1;
        Ok(())
    }

    /// Writes `value` as `bits` bits, most-significant bit first.
    /// The value must fit in the field width.
    pub fn write_fixed_integer(&mut self, value: u64, bits: u32) -> io::Result<()> {
        debug_assert!(
            bits >= 64 || value < 1 << bits,
            "value {value} does not fit in {bits} bits"
        );
        self.bit_writer.write(bits, value)?;
        self.bit_len += bits as usize;
        Ok(())
    }

    /// Writes each letter as 6 bits, packed as an offset from `'a'`.
    /// Expects lower-case ASCII input.
    pub fn write_string(&mut self, s: &str) -> io::Result<()> {
        for b in s.bytes() {
            self.write_fixed_integer(u64::from(b - b'a'), 6)?;
        }
        Ok(())
    }

    /// Writes a 36-bit timestamp counting deciseconds since the Unix epoch.
    pub fn write_datetime_as_deciseconds(&mut self, deciseconds: u64) -> io::Result<()> {
        self.write_fixed_integer(deciseconds, 36)
    }

    /// Writes `bits` bits; bit i (1-based) is set iff id i is in the set.
    /// Ids outside `[1, bits]` are not representable and are skipped.
    pub fn write_fixed_bitfield(&mut self, ids: &BTreeSet<u16>, bits: usize) -> io::Result<()> {
        for i in 1..=bits {
            self.write_bool(ids.contains(&(i as u16)))?;
        }
        Ok(())
    }

    /// Writes the range encoding of `ids`: a 16-bit entry count, then one
    /// entry per contiguous run. Runs of length >= 2 are always merged into
    /// a single start/end entry so the output is deterministic and minimal.
    pub fn write_integer_range(&mut self, ids: &BTreeSet<u16>) -> io::Result<()> {
        let runs = contiguous_runs(ids);
        self.write_fixed_integer(runs.len() as u64, 16)?;

        for (start, end) in runs {
            if start == end {
                self.write_bool(false)?;
                self.write_fixed_integer(u64::from(start), 16)?;
            } else {
                self.write_bool(true)?;
                self.write_fixed_integer(u64::from(start), 16)?;
                self.write_fixed_integer(u64::from(end), 16)?;
            }
        }

        Ok(())
    }

    /// Flushes the trailing partial byte with zero bits and returns the
    /// buffer together with the exact bit length.
    pub fn into_bytes(mut self) -> io::Result<(Vec<u8>, usize)> {
        self.bit_writer.byte_align()?;
        Ok((self.bit_writer.into_writer(), self.bit_len))
    }
}

impl Default for DataWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapses a sorted id set into maximal runs of consecutive ids,
/// as (start, end) pairs with start == end for isolated ids.
pub fn contiguous_runs(ids: &BTreeSet<u16>) -> Vec<(u16, u16)> {
    let mut runs: Vec<(u16, u16)> = Vec::new();
    for &id in ids {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == id => *end = id,
            _ => runs.push((id, id)),
        }
    }
    runs
}

/// Size in bits of the range encoding of `ids`, without producing it.
/// Used to pick the smaller of the two vendor encodings.
pub fn integer_range_bit_len(ids: &BTreeSet<u16>) -> usize {
    16 + contiguous_runs(ids)
        .iter()
        .map(|(start, end)| if start == end { 17 } else { 33 })
        .sum::<usize>()
}
