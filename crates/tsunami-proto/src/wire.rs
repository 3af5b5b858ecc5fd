//! # Wire Primitives: Field-Tagged Binary Encoding
//!
//! Low-level building blocks of the protobuf binary format: varints, field
//! keys, length-delimited values, and the opaque storage of fields a
//! decoder does not recognise.
//!
//! ## Compatibility Invariant
//!
//! Unknown fields are never dropped. Every field whose tag is not in the
//! descriptor table is captured verbatim (tag number, wire type, raw value
//! bytes) and re-emitted unchanged when the message is encoded again, so
//! relays that run an older schema do not lose data from newer producers.

use std::fmt;

use crate::error::DecodeError;

/// Largest field number representable in a field key.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Longest legal varint encoding, in bytes.
const MAX_VARINT_LEN: usize = 10;

/// The six wire types of the binary encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Variable-length integer (int32, uint32, bool, enum).
    Varint,
    /// Eight little-endian bytes.
    Fixed64,
    /// Varint length prefix followed by that many bytes (string, message).
    LengthDelimited,
    /// Start of a group (deprecated, only seen as an unknown field).
    StartGroup,
    /// End of a group.
    EndGroup,
    /// Four little-endian bytes.
    Fixed32,
}

impl WireType {
    /// Parse the low three bits of a field key.
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::LengthDelimited),
            3 => Ok(Self::StartGroup),
            4 => Ok(Self::EndGroup),
            5 => Ok(Self::Fixed32),
            other => Err(DecodeError::InvalidWireType(other)),
        }
    }

    /// Numeric wire type as written into the field key.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::LengthDelimited => 2,
            Self::StartGroup => 3,
            Self::EndGroup => 4,
            Self::Fixed32 => 5,
        }
    }

    /// Lowercase name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Varint => "varint",
            Self::Fixed64 => "fixed64",
            Self::LengthDelimited => "length-delimited",
            Self::StartGroup => "start-group",
            Self::EndGroup => "end-group",
            Self::Fixed32 => "fixed32",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append `value` as a base-128 varint.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Number of bytes `encode_varint` writes for `value`.
pub fn encoded_len_varint(value: u64) -> usize {
    // 1 byte per started group of 7 significant bits, minimum 1.
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Append the key (field number and wire type) of a field.
pub fn encode_key(number: u32, wire_type: WireType, buf: &mut Vec<u8>) {
    let key = (u64::from(number) << 3) | u64::from(wire_type.as_u8());
    encode_varint(key, buf);
}

/// Append a length-delimited value: varint length, then the bytes.
pub fn encode_length_delimited(number: u32, bytes: &[u8], buf: &mut Vec<u8>) {
    encode_key(number, WireType::LengthDelimited, buf);
    encode_varint(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

/// Cursor over an encoded buffer.
///
/// All reads are bounds-checked and report truncation as a
/// [`DecodeError`]; a `Reader` never panics on malformed input.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns true once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Offset of the next byte to read.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or(DecodeError::Truncated { context })?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated { context });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Read a base-128 varint.
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_byte("varint")?;
            // The tenth byte may only contribute the single remaining bit.
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(DecodeError::VarintOverflow);
            }
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte < 0x80 {
                return Ok(value);
            }
        }
        Err(DecodeError::VarintOverflow)
    }

    /// Read a field key and split it into field number and wire type.
    pub fn read_key(&mut self) -> Result<(u32, WireType), DecodeError> {
        let key = self.read_varint()?;
        let wire_type = WireType::from_u8((key & 0x07) as u8)?;
        let number = key >> 3;
        if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
            return Err(DecodeError::InvalidFieldNumber(number));
        }
        Ok((number as u32, wire_type))
    }

    /// Read a varint length prefix and return the bytes it covers.
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        let length = self.read_varint()?;
        let remaining = self.remaining();
        if length > remaining as u64 {
            return Err(DecodeError::LengthOutOfBounds { length, remaining });
        }
        self.take(length as usize, "length-delimited value")
    }

    /// Skip over the value of a field without interpreting it and return
    /// its raw bytes (everything after the key).
    ///
    /// Groups are skipped recursively up to `depth_remaining` levels deep;
    /// the returned span of a group includes its end-group key.
    pub fn skip_value(
        &mut self,
        number: u32,
        wire_type: WireType,
        depth_remaining: u32,
    ) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8, "fixed64")?;
            }
            WireType::Fixed32 => {
                self.take(4, "fixed32")?;
            }
            WireType::LengthDelimited => {
                self.read_length_delimited()?;
            }
            WireType::StartGroup => self.skip_group(number, depth_remaining)?,
            WireType::EndGroup => return Err(DecodeError::UnexpectedEndGroup(number)),
        }
        Ok(&self.buf[start..self.pos])
    }

    fn skip_group(&mut self, group_number: u32, depth_remaining: u32) -> Result<(), DecodeError> {
        let depth_remaining = depth_remaining
            .checked_sub(1)
            .ok_or(DecodeError::RecursionLimitExceeded)?;
        loop {
            if self.is_empty() {
                return Err(DecodeError::UnterminatedGroup(group_number));
            }
            let (number, wire_type) = self.read_key()?;
            if wire_type == WireType::EndGroup {
                if number == group_number {
                    return Ok(());
                }
                return Err(DecodeError::UnexpectedEndGroup(number));
            }
            self.skip_value(number, wire_type, depth_remaining)?;
        }
    }
}

/// A single field the decoder did not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownField {
    /// Field tag number.
    pub number: u32,
    /// Wire type the field arrived with.
    pub wire_type: WireType,
    /// Raw encoded value, excluding the key.
    pub data: Vec<u8>,
}

/// Unrecognised fields of one message, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UnknownFields {
    fields: Vec<UnknownField>,
}

impl UnknownFields {
    /// Returns true if no unknown field was captured.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of captured fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over the captured fields in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &UnknownField> {
        self.fields.iter()
    }

    /// Capture a field.
    pub fn push(&mut self, number: u32, wire_type: WireType, data: &[u8]) {
        self.fields.push(UnknownField {
            number,
            wire_type,
            data: data.to_vec(),
        });
    }

    /// Drop every captured field.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Re-emit every captured field exactly as it was received.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        for field in &self.fields {
            encode_key(field.number, field.wire_type, buf);
            buf.extend_from_slice(&field.data);
        }
    }
}
