//! Built-in encoding-algorithm value codecs (X.891 10.2..10.11).
//!
//! Each built-in algorithm defines a wire form (the octets carried in the
//! stream) and a string form (the character data an XML view of the
//! document shows). Numeric values are big-endian; the string forms are
//! locale-invariant.

use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::{Error, Result};

/// The ten built-in encoding algorithms, by wire table index (X.891 10.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAlgorithm {
    Hex = 1,
    Base64 = 2,
    Short = 3,
    Int = 4,
    Long = 5,
    Boolean = 6,
    Float = 7,
    Double = 8,
    Uuid = 9,
    Cdata = 10,
}

impl BuiltinAlgorithm {
    /// Wire table index, 1..10.
    #[inline]
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Some(match index {
            1 => Self::Hex,
            2 => Self::Base64,
            3 => Self::Short,
            4 => Self::Int,
            5 => Self::Long,
            6 => Self::Boolean,
            7 => Self::Float,
            8 => Self::Double,
            9 => Self::Uuid,
            10 => Self::Cdata,
            _ => return None,
        })
    }

    /// Converts a wire payload to its string form.
    pub fn octets_to_text(self, octets: &[u8]) -> Result<String> {
        match self {
            Self::Hex => Ok(hex_upper(octets)),
            Self::Base64 => Ok(BASE64.encode(octets)),
            Self::Short => join_fixed(octets, 2, "short", |c| {
                i16::from_be_bytes([c[0], c[1]]).to_string()
            }),
            Self::Int => join_fixed(octets, 4, "int", |c| {
                i32::from_be_bytes([c[0], c[1], c[2], c[3]]).to_string()
            }),
            Self::Long => join_fixed(octets, 8, "long", |c| {
                i64::from_be_bytes(c.try_into().expect("chunk is 8 octets")).to_string()
            }),
            Self::Boolean => booleans_to_text(octets),
            Self::Float => join_fixed(octets, 4, "float", |c| {
                f32::from_be_bytes([c[0], c[1], c[2], c[3]]).to_string()
            }),
            Self::Double => join_fixed(octets, 8, "double", |c| {
                f64::from_be_bytes(c.try_into().expect("chunk is 8 octets")).to_string()
            }),
            Self::Uuid => join_fixed(octets, 16, "uuid", uuid_text),
            Self::Cdata => String::from_utf8(octets.to_vec())
                .map_err(|_| Error::InvalidCharacterString),
        }
    }
}

/// A typed value to be carried by one of the built-in algorithms.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Hex(Vec<u8>),
    Base64(Vec<u8>),
    Shorts(Vec<i16>),
    Ints(Vec<i32>),
    Longs(Vec<i64>),
    Booleans(Vec<bool>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    Uuids(Vec<[u8; 16]>),
    Cdata(String),
}

impl TypedValue {
    /// The algorithm that carries this value.
    pub fn algorithm(&self) -> BuiltinAlgorithm {
        match self {
            Self::Hex(_) => BuiltinAlgorithm::Hex,
            Self::Base64(_) => BuiltinAlgorithm::Base64,
            Self::Shorts(_) => BuiltinAlgorithm::Short,
            Self::Ints(_) => BuiltinAlgorithm::Int,
            Self::Longs(_) => BuiltinAlgorithm::Long,
            Self::Booleans(_) => BuiltinAlgorithm::Boolean,
            Self::Floats(_) => BuiltinAlgorithm::Float,
            Self::Doubles(_) => BuiltinAlgorithm::Double,
            Self::Uuids(_) => BuiltinAlgorithm::Uuid,
            Self::Cdata(_) => BuiltinAlgorithm::Cdata,
        }
    }

    /// The wire form (X.891 10.2..10.11).
    pub fn to_octets(&self) -> Vec<u8> {
        match self {
            Self::Hex(bytes) | Self::Base64(bytes) => bytes.clone(),
            Self::Shorts(values) => values.iter().flat_map(|v| v.to_be_bytes()).collect(),
            Self::Ints(values) => values.iter().flat_map(|v| v.to_be_bytes()).collect(),
            Self::Longs(values) => values.iter().flat_map(|v| v.to_be_bytes()).collect(),
            Self::Booleans(values) => booleans_to_octets(values),
            Self::Floats(values) => values.iter().flat_map(|v| v.to_be_bytes()).collect(),
            Self::Doubles(values) => values.iter().flat_map(|v| v.to_be_bytes()).collect(),
            Self::Uuids(values) => values.iter().flatten().copied().collect(),
            Self::Cdata(text) => text.as_bytes().to_vec(),
        }
    }
}

fn hex_upper(octets: &[u8]) -> String {
    let mut s = String::with_capacity(octets.len() * 2);
    for b in octets {
        let _ = write!(s, "{b:02X}");
    }
    s
}

fn join_fixed(
    octets: &[u8],
    width: usize,
    name: &'static str,
    render: impl Fn(&[u8]) -> String,
) -> Result<String> {
    if octets.len() % width != 0 {
        return Err(Error::InvalidAlgorithmData(
            format!("{name} payload length is not a multiple of {width}").into(),
        ));
    }
    let mut parts = Vec::with_capacity(octets.len() / width);
    for chunk in octets.chunks(width) {
        parts.push(render(chunk));
    }
    Ok(parts.join(" "))
}

fn uuid_text(chunk: &[u8]) -> String {
    format!(
        "{}-{}-{}-{}-{}",
        hex_lower(&chunk[0..4]),
        hex_lower(&chunk[4..6]),
        hex_lower(&chunk[6..8]),
        hex_lower(&chunk[8..10]),
        hex_lower(&chunk[10..16]),
    )
}

fn hex_lower(octets: &[u8]) -> String {
    let mut s = String::with_capacity(octets.len() * 2);
    for b in octets {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Boolean wire form (X.891 10.7): the first four bits give the count of
/// unused bits in the final octet, then one bit per value, MSB first.
fn booleans_to_octets(values: &[bool]) -> Vec<u8> {
    let total = 4 + values.len();
    let unused = (8 - total % 8) % 8;
    let mut out = Vec::with_capacity(total / 8 + 1);
    let mut accum: u16 = unused as u16;
    let mut accum_bits: u8 = 4;
    for &v in values {
        accum = accum << 1 | u16::from(v);
        accum_bits += 1;
        if accum_bits == 8 {
            out.push(accum as u8);
            accum = 0;
            accum_bits = 0;
        }
    }
    if accum_bits > 0 {
        out.push((accum << (8 - accum_bits)) as u8);
    }
    out
}

fn booleans_to_text(octets: &[u8]) -> Result<String> {
    if octets.is_empty() {
        return Err(Error::InvalidAlgorithmData("boolean payload is empty".into()));
    }
    let unused = usize::from(octets[0] >> 4);
    let total_bits = octets.len() * 8;
    let count = total_bits
        .checked_sub(4 + unused)
        .ok_or_else(|| Error::InvalidAlgorithmData("boolean pad count exceeds payload".into()))?;
    let mut parts = Vec::with_capacity(count);
    for i in 0..count {
        let bit = 4 + i;
        let set = octets[bit / 8] >> (7 - bit % 8) & 1 == 1;
        parts.push(if set { "true" } else { "false" });
    }
    Ok(parts.join(" "))
}
