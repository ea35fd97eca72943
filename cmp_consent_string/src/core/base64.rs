use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid character {0}")]
    InvalidCharacter(u8),
}

/// Custom base64 implementation, 6-bits aligned, no padding,
/// using the URL Safe Base64 dictionary.
///
/// The standard byte-aligned codecs cannot be used here: consent strings
/// carry an arbitrary number of bits and must encode to exactly
/// `ceil(bits / 6)` characters.
pub fn decode(s: &str) -> Result<Vec<u8>, DecodeError> {
    // output buffer should not be larger than input string, so we pre-allocate enough bytes as to avoid realloc
    // which is slow, and could cause allocation of a bigger capacity than needed (x2 or more)
    let mut buffer = Vec::with_capacity(s.len());
    let mut bw = BitWriter::endian(&mut buffer, BigEndian);

    // write 6 bits for every decoded character
    for b in s.bytes() {
        let value = base64_value(b).ok_or(DecodeError::InvalidCharacter(b))?;
        bw.write(6, value).expect("write into vec should not fail");
    }

    // flush the remaining value if we're not 8-bit aligned at this point
    bw.byte_align().expect("write into vec should not fail");

    Ok(buffer)
}

/// Encodes the first `bit_len` bits of `bytes`, padding with zero bits up
/// to the next multiple of 6.
pub fn encode(bytes: &[u8], bit_len: usize) -> String {
    let chars = bit_len.div_ceil(6);
    let mut br = BitReader::endian(bytes.chain(std::io::repeat(0)), BigEndian);

    (0..chars)
        .map(|_| br.read::<u8>(6).map(base64_char))
        .collect::<Result<String, _>>()
        .expect("read from zero-padded buffer should not fail")
}

fn base64_value(b: u8) -> Option<u8> {
    match b {
        b'A'..=b'Z' => Some(b - b'A'),
        b'a'..=b'z' => Some(b - b'a' + 26),
        b'0'..=b'9' => Some(b - b'0' + 52),
        b'-' => Some(62),
        b'_' => Some(63),
        _ => None,
    }
}

fn base64_char(b: u8) -> char {
    (match b {
        0..=25 => b'A' + b,
        26..=51 => b'a' + b - 26,
        52..=61 => b'0' + b - 52,
        62 => b'-',
        _ => b'_',
    }) as char
}
