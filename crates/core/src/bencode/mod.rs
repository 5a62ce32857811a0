//! Bencode codec and magnet link derivation.
//!
//! Decodes the self-describing binary format torrent descriptors use
//! (integers, byte strings, lists, dictionaries), re-encodes the `info`
//! dictionary canonically and derives the content-addressed magnet URI
//! from its SHA-1 digest.

mod codec;
mod magnet;
mod value;

pub use codec::{decode, encode};
pub use magnet::derive_magnet;
pub use value::Value;

use thiserror::Error;

/// Errors produced while decoding a bencoded buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BencodeError {
    #[error("unexpected end of buffer at offset {0}")]
    UnexpectedEnd(usize),

    #[error("invalid value prefix 0x{0:02x} at offset {1}")]
    InvalidPrefix(u8, usize),

    #[error("invalid integer literal at offset {0}")]
    InvalidInteger(usize),

    #[error("byte string length at offset {0} exceeds remaining buffer")]
    LengthOutOfBounds(usize),

    #[error("dictionary key at offset {0} is not a byte string")]
    NonStringKey(usize),

    #[error("trailing bytes after top-level value at offset {0}")]
    TrailingBytes(usize),
}

/// Errors produced while deriving a magnet link from a torrent buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MagnetError {
    #[error("torrent buffer is not valid bencode: {0}")]
    Malformed(#[from] BencodeError),

    #[error("torrent has no info dictionary")]
    NoInfoField,
}
