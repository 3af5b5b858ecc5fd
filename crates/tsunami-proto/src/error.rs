//! # Error Types
//!
//! Errors raised by the schema layer. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Decoding is all-or-nothing: a message either decodes completely or
//!   yields exactly one `DecodeError`.
//! - Encoding a well-typed value into a growable buffer never fails.
//!   `EncodeError` only exists for caller-provided fixed-size buffers.
//! - Semantically questionable but well-typed data (an unspecified plugin
//!   type, an empty name) is never an error here; see [`crate::validate`].

use thiserror::Error;

use crate::wire::WireType;

/// Top-level error type for the plugin schema crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    /// Binary decoding failed.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Binary encoding failed.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A version or version range expression could not be parsed.
    #[error("version error: {0}")]
    Version(#[from] VersionError),

    /// A plugin type name that is neither a wire name nor a number.
    #[error("unknown plugin type {0:?}")]
    UnknownPluginType(String),
}

/// Malformed input encountered while decoding a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended in the middle of a value.
    #[error("buffer truncated while reading {context}")]
    Truncated {
        /// What was being read when the buffer ran out.
        context: &'static str,
    },

    /// A varint was longer than 10 bytes or overflowed 64 bits.
    #[error("varint overflows 64 bits")]
    VarintOverflow,

    /// A field key carried a field number outside `1..=2^29-1`.
    #[error("invalid field number {0}")]
    InvalidFieldNumber(u64),

    /// A field key carried wire type 6 or 7.
    #[error("invalid wire type {0}")]
    InvalidWireType(u8),

    /// A known field arrived with a wire type incompatible with its
    /// declared type.
    #[error("field {message}.{field} (tag {number}) expects wire type {expected}, got {actual}")]
    WireTypeMismatch {
        /// Message that declares the field.
        message: &'static str,
        /// Field name.
        field: &'static str,
        /// Field tag number.
        number: u32,
        /// Wire type implied by the declared field type.
        expected: WireType,
        /// Wire type found on the wire.
        actual: WireType,
    },

    /// A length prefix pointed past the end of the buffer.
    #[error("length-delimited value of {length} bytes exceeds the {remaining} remaining bytes")]
    LengthOutOfBounds {
        /// Declared length.
        length: u64,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A string field did not contain valid UTF-8.
    #[error("field {message}.{field} is not valid UTF-8")]
    InvalidUtf8 {
        /// Message that declares the field.
        message: &'static str,
        /// Field name.
        field: &'static str,
    },

    /// An end-group tag appeared without a matching start-group tag.
    #[error("unexpected end-group tag for field {0}")]
    UnexpectedEndGroup(u32),

    /// The buffer ended inside a group.
    #[error("unterminated group for field {0}")]
    UnterminatedGroup(u32),

    /// Nesting exceeded the configured recursion limit.
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,

    /// An enum value outside the known set, rejected because strict enum
    /// checking was requested.
    #[error("unknown {enum_name} value {value}")]
    UnknownEnumValue {
        /// Fully qualified enum name.
        enum_name: &'static str,
        /// The numeric value found on the wire.
        value: i32,
    },
}

/// Failure to encode into a caller-provided buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The destination buffer is too small for the encoded message.
    #[error("insufficient buffer capacity: {required} bytes required, {remaining} available")]
    InsufficientCapacity {
        /// Encoded size of the message.
        required: usize,
        /// Size of the destination buffer.
        remaining: usize,
    },
}

/// A version string or version range expression that cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// Empty version or range string.
    #[error("version string cannot be empty")]
    Empty,

    /// The version has no meaningful token.
    #[error("version string {0:?} must contain at least one non-empty field")]
    NoSignificantToken(String),

    /// The range expression is malformed.
    #[error("invalid version range {range:?}: {reason}")]
    InvalidRange {
        /// The offending expression.
        range: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}
