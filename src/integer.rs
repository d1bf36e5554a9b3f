//! Variable-width integers in the range 1..2^20 (X.891 C.25, C.27, C.28, C.29).
//!
//! Fast Infoset integers are keyed by the bit position at which the field
//! starts inside its octet: the fewer bits remain in the first octet, the
//! earlier the encoding escalates to follow-up octets. Each encoding
//! splits its domain into bands; the band discriminator occupies the
//! leading bits of the field and the band offset is subtracted before the
//! payload bits are written.
//!
//! Die `lead`-Parameter enthalten die bereits gesetzten Identifier-Bits
//! des ersten Octets; die Encoder-Funktionen ver-ODER-n das Feld hinein
//! und schreiben das fertige Octet.

use std::io::{Read, Write};

use crate::buffer::{InputBuffer, OutputBuffer};
use crate::{Error, Result};

/// Upper bound of every vocabulary index domain (X.891 7.2.18).
pub const MAX_VALUE: u32 = 1 << 20;

// ---------------------------------------------------------------------------
// Field starting on the second bit: 7 payload bits in the first octet
// (X.891 C.25; zero form C.26).
// Bands: 1..64 / 65..8256 / 8257..2^20.
// ---------------------------------------------------------------------------

/// Encodes `value` (1..2^20) starting on the second bit of an octet whose
/// first bit(s) are given in `lead`.
pub fn encode_on_second_bit<W: Write>(
    out: &mut OutputBuffer<W>,
    lead: u8,
    value: u32,
) -> Result<()> {
    debug_assert!((1..=MAX_VALUE).contains(&value), "integer {value} out of 1..2^20");
    if value <= 64 {
        out.write_byte(lead | (value - 1) as u8)
    } else if value <= 8256 {
        let v = value - 65;
        out.write_byte(lead | 0x40 | (v >> 8) as u8)?;
        out.write_byte(v as u8)
    } else {
        let v = value - 8257;
        out.write_byte(lead | 0x60 | (v >> 16) as u8)?;
        out.write_byte((v >> 8) as u8)?;
        out.write_byte(v as u8)
    }
}

/// The distinguished zero form `1111111` on the second bit (X.891 C.26).
pub fn encode_zero_on_second_bit<W: Write>(out: &mut OutputBuffer<W>, lead: u8) -> Result<()> {
    out.write_byte(lead | 0x7F)
}

/// Decodes an integer whose field started on the second bit of `first`.
pub fn decode_on_second_bit<R: Read>(input: &mut InputBuffer<R>, first: u8) -> Result<u32> {
    let field = u32::from(first & 0x7F);
    if field & 0x40 == 0 {
        Ok(field + 1)
    } else if field & 0x60 == 0x40 {
        let b2 = u32::from(input.read_byte()?);
        Ok(((field & 0x1F) << 8 | b2) + 65)
    } else if field & 0x70 == 0x60 {
        let b2 = u32::from(input.read_byte()?);
        let b3 = u32::from(input.read_byte()?);
        let value = ((field & 0x0F) << 16 | b2 << 8 | b3) + 8257;
        if value > MAX_VALUE {
            return Err(Error::InvalidIntegerEncoding);
        }
        Ok(value)
    } else {
        // '1110xxx' und '1111xxx' sind hier nicht vergeben (0x7F behandelt
        // der Aufrufer als Null-Form, 0x78..0x7B als Literal-QName-Flag).
        Err(Error::InvalidIntegerEncoding)
    }
}

// ---------------------------------------------------------------------------
// Field starting on the third bit: 6 payload bits in the first octet
// (X.891 C.27). Bands: 1..32 / 33..2080 / 2081..526368 / 526369..2^20.
// ---------------------------------------------------------------------------

pub fn encode_on_third_bit<W: Write>(
    out: &mut OutputBuffer<W>,
    lead: u8,
    value: u32,
) -> Result<()> {
    debug_assert!((1..=MAX_VALUE).contains(&value), "integer {value} out of 1..2^20");
    if value <= 32 {
        out.write_byte(lead | (value - 1) as u8)
    } else if value <= 2080 {
        let v = value - 33;
        out.write_byte(lead | 0x20 | (v >> 8) as u8)?;
        out.write_byte(v as u8)
    } else if value <= 526_368 {
        let v = value - 2081;
        out.write_byte(lead | 0x28 | (v >> 16) as u8)?;
        out.write_byte((v >> 8) as u8)?;
        out.write_byte(v as u8)
    } else {
        let v = value - 526_369;
        out.write_byte(lead | 0x30)?;
        out.write_byte((v >> 16) as u8)?;
        out.write_byte((v >> 8) as u8)?;
        out.write_byte(v as u8)
    }
}

pub fn decode_on_third_bit<R: Read>(input: &mut InputBuffer<R>, first: u8) -> Result<u32> {
    let field = u32::from(first & 0x3F);
    if field & 0x20 == 0 {
        Ok(field + 1)
    } else if field & 0x38 == 0x20 {
        let b2 = u32::from(input.read_byte()?);
        Ok(((field & 0x07) << 8 | b2) + 33)
    } else if field & 0x38 == 0x28 {
        let b2 = u32::from(input.read_byte()?);
        let b3 = u32::from(input.read_byte()?);
        Ok(((field & 0x07) << 16 | b2 << 8 | b3) + 2081)
    } else if field == 0x30 {
        let b2 = u32::from(input.read_byte()?);
        let b3 = u32::from(input.read_byte()?);
        let b4 = u32::from(input.read_byte()?);
        let value = ((b2 & 0x0F) << 16 | b3 << 8 | b4) + 526_369;
        if value > MAX_VALUE {
            return Err(Error::InvalidIntegerEncoding);
        }
        Ok(value)
    } else {
        Err(Error::InvalidIntegerEncoding)
    }
}

// ---------------------------------------------------------------------------
// Field starting on the fourth bit: 5 payload bits in the first octet
// (X.891 C.28). Bands: 1..16 / 17..1040 / 1041..263184 / 263185..2^20.
// ---------------------------------------------------------------------------

pub fn encode_on_fourth_bit<W: Write>(
    out: &mut OutputBuffer<W>,
    lead: u8,
    value: u32,
) -> Result<()> {
    debug_assert!((1..=MAX_VALUE).contains(&value), "integer {value} out of 1..2^20");
    if value <= 16 {
        out.write_byte(lead | (value - 1) as u8)
    } else if value <= 1040 {
        let v = value - 17;
        out.write_byte(lead | 0x10 | (v >> 8) as u8)?;
        out.write_byte(v as u8)
    } else if value <= 263_184 {
        let v = value - 1041;
        out.write_byte(lead | 0x18 | (v >> 16) as u8)?;
        out.write_byte((v >> 8) as u8)?;
        out.write_byte(v as u8)
    } else {
        let v = value - 263_185;
        out.write_byte(lead | 0x1C)?;
        out.write_byte((v >> 16) as u8)?;
        out.write_byte((v >> 8) as u8)?;
        out.write_byte(v as u8)
    }
}

pub fn decode_on_fourth_bit<R: Read>(input: &mut InputBuffer<R>, first: u8) -> Result<u32> {
    let field = u32::from(first & 0x1F);
    if field & 0x10 == 0 {
        Ok(field + 1)
    } else if field & 0x1C == 0x10 {
        let b2 = u32::from(input.read_byte()?);
        Ok(((field & 0x03) << 8 | b2) + 17)
    } else if field & 0x1C == 0x18 {
        let b2 = u32::from(input.read_byte()?);
        let b3 = u32::from(input.read_byte()?);
        Ok(((field & 0x03) << 16 | b2 << 8 | b3) + 1041)
    } else if field == 0x1C {
        let b2 = u32::from(input.read_byte()?);
        let b3 = u32::from(input.read_byte()?);
        let b4 = u32::from(input.read_byte()?);
        let value = ((b2 & 0x0F) << 16 | b3 << 8 | b4) + 263_185;
        if value > MAX_VALUE {
            return Err(Error::InvalidIntegerEncoding);
        }
        Ok(value)
    } else {
        Err(Error::InvalidIntegerEncoding)
    }
}

// ---------------------------------------------------------------------------
// Integers 1..256 in a full octet (X.891 C.29): restricted-alphabet and
// encoding-algorithm indices inside encoded character strings. The eight
// bits straddle two octets at the call sites, so the codec composes them
// with masks there; this helper only documents the value mapping.
// ---------------------------------------------------------------------------

/// Maps a 1..256 table index to its 8-bit wire form (value - 1).
#[inline]
pub fn octet_index_to_wire(value: u32) -> u8 {
    debug_assert!((1..=256).contains(&value));
    (value - 1) as u8
}

/// Maps an 8-bit wire form back to the 1..256 table index.
#[inline]
pub fn octet_index_from_wire(wire: u8) -> u32 {
    u32::from(wire) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_second_bit_wrapper(out: &mut OutputBuffer<&mut Vec<u8>>, lead: u8, value: u32) -> Result<()> {
        encode_on_second_bit(out, lead, value)
    }
    fn decode_second_bit_wrapper(input: &mut InputBuffer<&[u8]>, first: u8) -> Result<u32> {
        decode_on_second_bit(input, first)
    }
    fn encode_third_bit_wrapper(out: &mut OutputBuffer<&mut Vec<u8>>, lead: u8, value: u32) -> Result<()> {
        encode_on_third_bit(out, lead, value)
    }
    fn decode_third_bit_wrapper(input: &mut InputBuffer<&[u8]>, first: u8) -> Result<u32> {
        decode_on_third_bit(input, first)
    }
    fn encode_fourth_bit_wrapper(out: &mut OutputBuffer<&mut Vec<u8>>, lead: u8, value: u32) -> Result<()> {
        encode_on_fourth_bit(out, lead, value)
    }
    fn decode_fourth_bit_wrapper(input: &mut InputBuffer<&[u8]>, first: u8) -> Result<u32> {
        decode_on_fourth_bit(input, first)
    }

    fn round_trip(
        encode: impl Fn(&mut OutputBuffer<&mut Vec<u8>>, u8, u32) -> Result<()>,
        decode: impl Fn(&mut InputBuffer<&[u8]>, u8) -> Result<u32>,
        value: u32,
    ) -> (u32, usize) {
        let mut bytes = Vec::new();
        {
            let mut out = OutputBuffer::new(&mut bytes);
            encode(&mut out, 0, value).unwrap();
            out.flush().unwrap();
        }
        let len = bytes.len();
        let mut input = InputBuffer::new(&bytes[..]);
        let first = input.read_byte().unwrap();
        (decode(&mut input, first).unwrap(), len)
    }

    // X.891 C.25: band boundaries 64/65, 8256/8257, 2^20.
    #[test]
    fn second_bit_boundaries() {
        for (value, width) in [
            (1, 1),
            (64, 1),
            (65, 2),
            (8256, 2),
            (8257, 3),
            (MAX_VALUE, 3),
        ] {
            let (decoded, len) = round_trip(encode_second_bit_wrapper, decode_second_bit_wrapper, value);
            assert_eq!(decoded, value);
            assert_eq!(len, width, "width for {value}");
        }
    }

    // X.891 C.27: band boundaries 32/33, 2080/2081, 526368/526369, 2^20.
    #[test]
    fn third_bit_boundaries() {
        for (value, width) in [
            (1, 1),
            (32, 1),
            (33, 2),
            (2080, 2),
            (2081, 3),
            (526_368, 3),
            (526_369, 4),
            (MAX_VALUE, 4),
        ] {
            let (decoded, len) = round_trip(encode_third_bit_wrapper, decode_third_bit_wrapper, value);
            assert_eq!(decoded, value);
            assert_eq!(len, width, "width for {value}");
        }
    }

    // X.891 C.28: band boundaries 16/17, 1040/1041, 263184/263185, 2^20.
    #[test]
    fn fourth_bit_boundaries() {
        for (value, width) in [
            (1, 1),
            (16, 1),
            (17, 2),
            (1040, 2),
            (1041, 3),
            (263_184, 3),
            (263_185, 4),
            (MAX_VALUE, 4),
        ] {
            let (decoded, len) = round_trip(encode_fourth_bit_wrapper, decode_fourth_bit_wrapper, value);
            assert_eq!(decoded, value);
            assert_eq!(len, width, "width for {value}");
        }
    }

    // X.891 C.26: zero form is all-ones in the seven field bits.
    #[test]
    fn zero_form() {
        let mut bytes = Vec::new();
        {
            let mut out = OutputBuffer::new(&mut bytes);
            encode_zero_on_second_bit(&mut out, 0x80).unwrap();
            out.flush().unwrap();
        }
        assert_eq!(bytes, [0xFF]);
    }

    // Unassigned discriminators must not decode.
    #[test]
    fn invalid_discriminators() {
        let data = [0u8; 4];
        let mut input = InputBuffer::new(&data[..]);
        assert_eq!(
            decode_on_second_bit(&mut input, 0x70),
            Err(Error::InvalidIntegerEncoding)
        );
        let mut input = InputBuffer::new(&data[..]);
        assert_eq!(
            decode_on_third_bit(&mut input, 0x38),
            Err(Error::InvalidIntegerEncoding)
        );
        let mut input = InputBuffer::new(&data[..]);
        assert_eq!(
            decode_on_fourth_bit(&mut input, 0x14),
            Err(Error::InvalidIntegerEncoding)
        );
    }

    // Three-octet forms that decode above 2^20 are rejected.
    #[test]
    fn out_of_range_rejected() {
        // second bit: '110' + 4 bits payload, dann 2 Octets: Maximalwert
        let data = [0xFF, 0xFF];
        let mut input = InputBuffer::new(&data[..]);
        assert_eq!(
            decode_on_second_bit(&mut input, 0x6F),
            Err(Error::InvalidIntegerEncoding)
        );
    }

    #[test]
    fn exhaustive_small_domain() {
        for value in 1..=4200u32 {
            let (d, _) = round_trip(encode_second_bit_wrapper, decode_second_bit_wrapper, value);
            assert_eq!(d, value);
            let (d, _) = round_trip(encode_third_bit_wrapper, decode_third_bit_wrapper, value);
            assert_eq!(d, value);
            let (d, _) = round_trip(encode_fourth_bit_wrapper, decode_fourth_bit_wrapper, value);
            assert_eq!(d, value);
        }
    }
}
