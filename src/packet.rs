//! Wire-format definitions for protocol datagrams.
//!
//! Every datagram exchanged between client and server is either a [`Request`]
//! (client → server) or an [`Answer`] (server → client).  This module is
//! responsible for:
//! - Defining the on-wire binary layout of both directions.
//! - Serialising into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back, returning errors for malformed or
//!   truncated input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//! Request:
//! +------+----------------+----------------+----------------------+
//! | kind |     length     |    sequence    |  payload (≤ 512 B)   |
//! | 1 B  |      8 B       |      8 B       |    `length` bytes    |
//! +------+----------------+----------------+----------------------+
//!
//! Answer:
//! +------+----------------+----------------+
//! | kind |      aux       |   seq_field    |
//! | 1 B  |      8 B       |      8 B       |
//! +------+----------------+----------------+
//! ```
//!
//! `seq_field` is kind-dependent: for `Ok`/`Hello` it carries the cumulative
//! next-expected sequence number (every sequence strictly below it is
//! confirmed delivered); for `Warn`/`Err` it carries an [`ErrorCode`].

use thiserror::Error;

/// Maximum payload bytes carried by one data request.
pub const MAX_PAYLOAD: usize = 512;

/// Byte length of the fixed request header on the wire.
/// kind(1) + length(8) + sequence(8)
pub const REQUEST_HEADER_LEN: usize = 17;

/// Byte length of an answer on the wire: kind(1) + aux(8) + seq_field(8).
pub const ANSWER_WIRE_LEN: usize = 17;

// Byte offsets of each field within a serialised request.
const REQ_OFF_KIND: usize = 0;
const REQ_OFF_LENGTH: usize = 1;
const REQ_OFF_SEQUENCE: usize = 9;

// Byte offsets of each field within a serialised answer.
const ANSW_OFF_KIND: usize = 0;
const ANSW_OFF_AUX: usize = 1;
const ANSW_OFF_SEQ_FIELD: usize = 9;

// Wire tags for the two kind fields.
const TAG_REQ_HELLO: u8 = b'H';
const TAG_REQ_DATA: u8 = b'D';
const TAG_REQ_CLOSE: u8 = b'C';
const TAG_ANSW_HELLO: u8 = b'H';
const TAG_ANSW_OK: u8 = b'O';
const TAG_ANSW_WARN: u8 = b'W';
const TAG_ANSW_ERR: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Error codes carried in the `seq_field` of `Warn` / `Err` answers.
///
/// Values 4–6 are reserved for future protocol errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No error.
    None,
    /// Sequence number outside the acceptable range.
    WrongSequence,
    /// The application sink rejected the payload.
    SinkError,
    /// Unrecognised request kind.
    IllegalRequest,
    /// Internal server failure (e.g. the sink refused to start a transfer).
    Internal,
}

impl ErrorCode {
    /// Numeric value placed in the `seq_field` on the wire.
    pub const fn as_u64(self) -> u64 {
        match self {
            ErrorCode::None => 0,
            ErrorCode::WrongSequence => 1,
            ErrorCode::SinkError => 2,
            ErrorCode::IllegalRequest => 3,
            ErrorCode::Internal => 7,
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Request type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Session start; always carries sequence number 0.
    Hello,
    /// One payload unit.
    Data,
    /// Session end; consumes a sequence number like data does.
    Close,
}

/// A client → server datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub kind: RequestKind,
    /// ARQ sequence number (monotonic per session, starting at 0).
    pub sequence: u64,
    pub payload: Vec<u8>,
}

impl Request {
    /// Session-start request.  The Hello itself occupies sequence number 0.
    pub fn hello() -> Self {
        Self {
            kind: RequestKind::Hello,
            sequence: 0,
            payload: Vec::new(),
        }
    }

    /// Data request carrying one payload unit.
    pub fn data(sequence: u64, payload: Vec<u8>) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        Self {
            kind: RequestKind::Data,
            sequence,
            payload,
        }
    }

    /// Session-end request.
    pub fn close(sequence: u64) -> Self {
        Self {
            kind: RequestKind::Close,
            sequence,
            payload: Vec::new(),
        }
    }

    /// Serialise this request into a newly allocated byte vector.
    ///
    /// The `length` field is computed from the actual payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; REQUEST_HEADER_LEN + self.payload.len()];
        buf[REQ_OFF_KIND] = match self.kind {
            RequestKind::Hello => TAG_REQ_HELLO,
            RequestKind::Data => TAG_REQ_DATA,
            RequestKind::Close => TAG_REQ_CLOSE,
        };
        buf[REQ_OFF_LENGTH..REQ_OFF_LENGTH + 8]
            .copy_from_slice(&(self.payload.len() as u64).to_be_bytes());
        buf[REQ_OFF_SEQUENCE..REQ_OFF_SEQUENCE + 8]
            .copy_from_slice(&self.sequence.to_be_bytes());
        buf[REQUEST_HEADER_LEN..].copy_from_slice(&self.payload);
        buf
    }

    /// Parse a [`Request`] from a raw byte slice.
    ///
    /// Returns [`Err`] if `buf` is shorter than [`REQUEST_HEADER_LEN`], the
    /// kind byte is unknown, the `length` field exceeds [`MAX_PAYLOAD`], or
    /// the `length` field disagrees with the remaining bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < REQUEST_HEADER_LEN {
            return Err(PacketError::BufferTooShort);
        }

        let kind = match buf[REQ_OFF_KIND] {
            TAG_REQ_HELLO => RequestKind::Hello,
            TAG_REQ_DATA => RequestKind::Data,
            TAG_REQ_CLOSE => RequestKind::Close,
            other => return Err(PacketError::UnknownKind(other)),
        };
        let length = u64::from_be_bytes(
            buf[REQ_OFF_LENGTH..REQ_OFF_LENGTH + 8].try_into().unwrap(),
        );
        let sequence = u64::from_be_bytes(
            buf[REQ_OFF_SEQUENCE..REQ_OFF_SEQUENCE + 8].try_into().unwrap(),
        );

        if length > MAX_PAYLOAD as u64 {
            return Err(PacketError::PayloadTooLong(length));
        }
        if buf.len() != REQUEST_HEADER_LEN + length as usize {
            return Err(PacketError::LengthMismatch);
        }

        Ok(Self {
            kind,
            sequence,
            payload: buf[REQUEST_HEADER_LEN..].to_vec(),
        })
    }
}

// ---------------------------------------------------------------------------
// Answer
// ---------------------------------------------------------------------------

/// Answer type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Session-start acknowledgment.
    Hello,
    /// Cumulative acknowledgment.
    Ok,
    /// Recoverable failure; the client keeps retrying.
    Warn,
    /// Terminal failure for the exchange.
    Err,
}

/// A server → client datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answer {
    pub kind: AnswerKind,
    /// Reserved for future use; always 0.
    pub aux: u64,
    /// Next-expected sequence (Ok/Hello) or an [`ErrorCode`] value (Warn/Err).
    pub seq_field: u64,
}

impl Answer {
    /// Session-start acknowledgment confirming sequence 0.
    pub fn hello(next_expected: u64) -> Self {
        Self {
            kind: AnswerKind::Hello,
            aux: 0,
            seq_field: next_expected,
        }
    }

    /// Cumulative acknowledgment: everything below `next_expected` arrived.
    pub fn ok(next_expected: u64) -> Self {
        Self {
            kind: AnswerKind::Ok,
            aux: 0,
            seq_field: next_expected,
        }
    }

    /// Recoverable failure carrying an error code.
    pub fn warn(code: ErrorCode) -> Self {
        Self {
            kind: AnswerKind::Warn,
            aux: 0,
            seq_field: code.as_u64(),
        }
    }

    /// Terminal failure carrying an error code.
    pub fn err(code: ErrorCode) -> Self {
        Self {
            kind: AnswerKind::Err,
            aux: 0,
            seq_field: code.as_u64(),
        }
    }

    /// Serialise this answer into its fixed-size wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; ANSWER_WIRE_LEN];
        buf[ANSW_OFF_KIND] = match self.kind {
            AnswerKind::Hello => TAG_ANSW_HELLO,
            AnswerKind::Ok => TAG_ANSW_OK,
            AnswerKind::Warn => TAG_ANSW_WARN,
            AnswerKind::Err => TAG_ANSW_ERR,
        };
        buf[ANSW_OFF_AUX..ANSW_OFF_AUX + 8].copy_from_slice(&self.aux.to_be_bytes());
        buf[ANSW_OFF_SEQ_FIELD..ANSW_OFF_SEQ_FIELD + 8]
            .copy_from_slice(&self.seq_field.to_be_bytes());
        buf
    }

    /// Parse an [`Answer`] from a raw byte slice.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < ANSWER_WIRE_LEN {
            return Err(PacketError::BufferTooShort);
        }
        if buf.len() != ANSWER_WIRE_LEN {
            return Err(PacketError::LengthMismatch);
        }

        let kind = match buf[ANSW_OFF_KIND] {
            TAG_ANSW_HELLO => AnswerKind::Hello,
            TAG_ANSW_OK => AnswerKind::Ok,
            TAG_ANSW_WARN => AnswerKind::Warn,
            TAG_ANSW_ERR => AnswerKind::Err,
            other => return Err(PacketError::UnknownKind(other)),
        };
        let aux = u64::from_be_bytes(buf[ANSW_OFF_AUX..ANSW_OFF_AUX + 8].try_into().unwrap());
        let seq_field = u64::from_be_bytes(
            buf[ANSW_OFF_SEQ_FIELD..ANSW_OFF_SEQ_FIELD + 8].try_into().unwrap(),
        );

        Ok(Self {
            kind,
            aux,
            seq_field,
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Buffer shorter than the fixed header size.
    #[error("buffer too short to contain a header")]
    BufferTooShort,
    /// `length` field does not match the actual remaining bytes.
    #[error("length field does not match remaining bytes")]
    LengthMismatch,
    /// `length` field claims more than the payload cap.
    #[error("length field claims {0} bytes, above the payload cap")]
    PayloadTooLong(u64),
    /// The kind byte is not one of the defined tags.
    #[error("unknown kind byte {0:#04x}")]
    UnknownKind(u8),
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
