//! # Message Codec
//!
//! The [`Message`] trait shared by every record of the schema, and the
//! field-level helpers the record implementations are written with.
//!
//! ## Encoding rules
//!
//! - Scalars holding their default value (empty string, `false`, `0`) are
//!   not written.
//! - A present sub-message is always written, even when empty, so that
//!   "filter absent" and "filter present but empty" survive a round trip.
//! - Repeated strings are written one entry per element, in order.
//! - Unknown fields are written last, exactly as received.
//!
//! ## Decoding rules
//!
//! - A known tag with the wrong wire type is rejected.
//! - For singular scalars the last occurrence wins; repeated occurrences of
//!   a sub-message are merged.
//! - Decoding is all-or-nothing: the partially built value is discarded on
//!   the first error.

use serde::{Deserialize, Serialize};

use crate::descriptor::{FieldDescriptor, MessageDescriptor};
use crate::error::{DecodeError, EncodeError};
use crate::wire::{self, Reader, UnknownFields, WireType};

/// Default nesting limit for sub-messages and unknown groups.
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Reject enum values outside the known set instead of preserving them.
    pub strict_enums: bool,
    /// Maximum nesting depth of sub-messages and unknown groups.
    pub recursion_limit: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict_enums: false,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

/// Per-call decoding state threaded through nested messages.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext {
    options: DecodeOptions,
    depth_remaining: u32,
}

impl DecodeContext {
    /// Context for a top-level message.
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            options,
            depth_remaining: options.recursion_limit,
        }
    }

    /// The options this decode was started with.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Nesting levels still available.
    pub fn depth_remaining(&self) -> u32 {
        self.depth_remaining
    }

    /// Context for a sub-message one level deeper.
    pub fn enter_nested(&self) -> Result<Self, DecodeError> {
        let depth_remaining = self
            .depth_remaining
            .checked_sub(1)
            .ok_or(DecodeError::RecursionLimitExceeded)?;
        Ok(Self {
            options: self.options,
            depth_remaining,
        })
    }
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

/// A record of the schema that can be encoded to and decoded from the
/// binary wire format.
pub trait Message: Default + Sized {
    /// Static description of the message's fields.
    fn descriptor() -> &'static MessageDescriptor;

    /// Write every known field, in tag order.
    fn encode_fields(&self, buf: &mut Vec<u8>);

    /// Decode one occurrence of a known field whose wire type has already
    /// been checked against the descriptor.
    fn merge_field(
        &mut self,
        field: &FieldDescriptor,
        reader: &mut Reader<'_>,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>;

    /// Fields received on the wire that this schema version does not know.
    fn unknown_fields(&self) -> &UnknownFields;

    /// Mutable access to the preserved unknown fields.
    fn unknown_fields_mut(&mut self) -> &mut UnknownFields;

    /// Append the encoded message (without a length prefix) to `buf`.
    fn encode_raw(&self, buf: &mut Vec<u8>) {
        self.encode_fields(buf);
        self.unknown_fields().encode(buf);
    }

    /// Encode the message into a new buffer. Never fails.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_raw(&mut buf);
        buf
    }

    /// Size of the encoded message in bytes.
    fn encoded_len(&self) -> usize {
        self.encode_to_vec().len()
    }

    /// Encode into a caller-provided buffer and return the number of bytes
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError::InsufficientCapacity` if `dst` is shorter than
    /// the encoded message; `dst` is left untouched in that case.
    fn encode(&self, dst: &mut [u8]) -> Result<usize, EncodeError> {
        let encoded = self.encode_to_vec();
        if encoded.len() > dst.len() {
            return Err(EncodeError::InsufficientCapacity {
                required: encoded.len(),
                remaining: dst.len(),
            });
        }
        dst[..encoded.len()].copy_from_slice(&encoded);
        Ok(encoded.len())
    }

    /// Encode with a varint length prefix, for streams of messages.
    fn encode_length_delimited_to_vec(&self) -> Vec<u8> {
        let body = self.encode_to_vec();
        let mut buf = Vec::with_capacity(body.len() + wire::encoded_len_varint(body.len() as u64));
        wire::encode_varint(body.len() as u64, &mut buf);
        buf.extend_from_slice(&body);
        buf
    }

    /// Merge the fields encoded in `bytes` into `self`.
    fn merge(&mut self, bytes: &[u8], ctx: DecodeContext) -> Result<(), DecodeError> {
        let descriptor = Self::descriptor();
        let mut reader = Reader::new(bytes);
        while !reader.is_empty() {
            let (number, wire_type) = reader.read_key()?;
            match descriptor.field(number) {
                Some(field) => {
                    let expected = field.kind.wire_type();
                    if wire_type != expected {
                        return Err(DecodeError::WireTypeMismatch {
                            message: descriptor.name,
                            field: field.name,
                            number,
                            expected,
                            actual: wire_type,
                        });
                    }
                    self.merge_field(field, &mut reader, ctx)?;
                }
                None => {
                    let data = reader.skip_value(number, wire_type, ctx.depth_remaining())?;
                    self.unknown_fields_mut().push(number, wire_type, data);
                }
            }
        }
        Ok(())
    }

    /// Decode a message with default options.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_with(bytes, DecodeOptions::default())
    }

    /// Decode a message with explicit options.
    fn decode_with(bytes: &[u8], options: DecodeOptions) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        message.merge(bytes, DecodeContext::new(options))?;
        Ok(message)
    }

    /// Decode one length-prefixed message from the front of `bytes`.
    ///
    /// Returns the message and the number of bytes consumed, so that a
    /// stream can be walked one message at a time.
    fn decode_length_delimited(
        bytes: &[u8],
        options: DecodeOptions,
    ) -> Result<(Self, usize), DecodeError> {
        let mut reader = Reader::new(bytes);
        let body = reader.read_length_delimited()?;
        let message = Self::decode_with(body, options)?;
        Ok((message, reader.position()))
    }
}

/// Write a singular string field, omitting the empty string.
pub(crate) fn encode_string(number: u32, value: &str, buf: &mut Vec<u8>) {
    if !value.is_empty() {
        wire::encode_length_delimited(number, value.as_bytes(), buf);
    }
}

/// Write every element of a repeated string field, empty ones included.
pub(crate) fn encode_repeated_string(number: u32, values: &[String], buf: &mut Vec<u8>) {
    for value in values {
        wire::encode_length_delimited(number, value.as_bytes(), buf);
    }
}

/// Write a varint field, omitting zero.
pub(crate) fn encode_varint_field(number: u32, value: u64, buf: &mut Vec<u8>) {
    if value != 0 {
        wire::encode_key(number, WireType::Varint, buf);
        wire::encode_varint(value, buf);
    }
}

/// Write a present sub-message, even when it encodes to zero bytes.
pub(crate) fn encode_message<M: Message>(number: u32, message: &M, buf: &mut Vec<u8>) {
    let body = message.encode_to_vec();
    wire::encode_length_delimited(number, &body, buf);
}

/// Read a string field value.
pub(crate) fn read_string(
    reader: &mut Reader<'_>,
    message: &'static str,
    field: &'static str,
) -> Result<String, DecodeError> {
    let bytes = reader.read_length_delimited()?;
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| DecodeError::InvalidUtf8 { message, field })
}

/// Read a `bool` field value; any non-zero varint is `true`.
pub(crate) fn read_bool(reader: &mut Reader<'_>) -> Result<bool, DecodeError> {
    Ok(reader.read_varint()? != 0)
}

/// Read a `uint32` field value, truncating wider varints.
pub(crate) fn read_uint32(reader: &mut Reader<'_>) -> Result<u32, DecodeError> {
    Ok(reader.read_varint()? as u32)
}

/// Read an enum field value as its `int32` representation.
pub(crate) fn read_enum(reader: &mut Reader<'_>) -> Result<i32, DecodeError> {
    Ok(reader.read_varint()? as i32)
}

/// Merge an occurrence of a sub-message field into `slot`.
pub(crate) fn merge_message<M: Message>(
    slot: &mut Option<M>,
    reader: &mut Reader<'_>,
    ctx: DecodeContext,
) -> Result<(), DecodeError> {
    let body = reader.read_length_delimited()?;
    let nested = ctx.enter_nested()?;
    slot.get_or_insert_with(M::default).merge(body, nested)
}

/// Preserve a known field that a record's `merge_field` has no arm for.
///
/// Keeps the data instead of dropping it if the descriptor table grows
/// ahead of a record implementation.
pub(crate) fn preserve_unhandled(
    unknown: &mut UnknownFields,
    field: &FieldDescriptor,
    reader: &mut Reader<'_>,
    ctx: DecodeContext,
) -> Result<(), DecodeError> {
    let wire_type = field.kind.wire_type();
    let data = reader.skip_value(field.number, wire_type, ctx.depth_remaining())?;
    unknown.push(field.number, wire_type, data);
    Ok(())
}
