//! Datagram payload builder and sequential field reader.
//!
//! The transport moves opaque byte payloads; this module gives applications a
//! convenient way to pack typed fields into a payload and to read them back in
//! the same order.
//!
//! Field layout:
//! ```text
//! integers / floats : little-endian, fixed width
//! bool              : 1 byte, 0 = false, anything else = true
//! string / blob     : [len:u16][bytes:len]
//! string32 / blob32 : [len:u32][bytes:len]
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading fields out of a datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatagramError {
    /// Fewer bytes remain than the field needs.
    #[error("insufficient data: need {needed} bytes at offset {offset}, {available} available")]
    InsufficientData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A string field does not contain valid UTF-8.
    #[error("string at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),

    /// A length-prefixed field is too long for its prefix.
    #[error("field of {len} bytes does not fit a {prefix_bits}-bit length prefix")]
    FieldTooLong { len: usize, prefix_bits: u8 },
}

/// An owned, growable payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Datagram {
    data: Vec<u8>,
}

macro_rules! add_le {
    ($($fn_name:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $fn_name(&mut self, value: $ty) -> &mut Self {
                self.data.extend_from_slice(&value.to_le_bytes());
                self
            }
        )*
    };
}

impl Datagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Wraps bytes received from the transport.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self { data: bytes.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn add_bool(&mut self, value: bool) -> &mut Self {
        self.data.push(u8::from(value));
        self
    }

    add_le!(
        add_u8: u8,
        add_u16: u16,
        add_u32: u32,
        add_u64: u64,
        add_i8: i8,
        add_i16: i16,
        add_i32: i32,
        add_i64: i64,
        add_f32: f32,
        add_f64: f64,
    );

    /// Appends a string with a 16-bit length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`DatagramError::FieldTooLong`] for strings over 65535 bytes;
    /// nothing is written in that case.
    pub fn add_string(&mut self, value: &str) -> Result<&mut Self, DatagramError> {
        self.add_blob(value.as_bytes())
    }

    /// Appends a string with a 32-bit length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`DatagramError::FieldTooLong`] for strings over `u32::MAX` bytes.
    pub fn add_string32(&mut self, value: &str) -> Result<&mut Self, DatagramError> {
        self.add_blob32(value.as_bytes())
    }

    /// Appends raw bytes with a 16-bit length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`DatagramError::FieldTooLong`] for blobs over 65535 bytes.
    pub fn add_blob(&mut self, value: &[u8]) -> Result<&mut Self, DatagramError> {
        let len = u16::try_from(value.len()).map_err(|_| DatagramError::FieldTooLong {
            len: value.len(),
            prefix_bits: 16,
        })?;
        self.add_u16(len);
        self.data.extend_from_slice(value);
        Ok(self)
    }

    /// Appends raw bytes with a 32-bit length prefix.
    ///
    /// # Errors
    ///
    /// Returns [`DatagramError::FieldTooLong`] for blobs over `u32::MAX` bytes.
    pub fn add_blob32(&mut self, value: &[u8]) -> Result<&mut Self, DatagramError> {
        let len = u32::try_from(value.len()).map_err(|_| DatagramError::FieldTooLong {
            len: value.len(),
            prefix_bits: 32,
        })?;
        self.add_u32(len);
        self.data.extend_from_slice(value);
        Ok(self)
    }

    /// Appends raw bytes with no prefix.
    pub fn append_data(&mut self, value: &[u8]) -> &mut Self {
        self.data.extend_from_slice(value);
        self
    }
}

impl From<Vec<u8>> for Datagram {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl AsRef<[u8]> for Datagram {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

// ── Iterator ──────────────────────────────────────────────────────────────────

/// Sequential reader over an owned [`Datagram`].
///
/// The read position only moves forward.  A failed read leaves the position
/// where it was, so callers can inspect [`Self::remaining_size`] and recover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatagramIterator {
    datagram: Datagram,
    position: usize,
}

macro_rules! get_le {
    ($($fn_name:ident: $ty:ty),* $(,)?) => {
        $(
            pub fn $fn_name(&mut self) -> Result<$ty, DatagramError> {
                let bytes = self.take(std::mem::size_of::<$ty>())?;
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                Ok(<$ty>::from_le_bytes(raw))
            }
        )*
    };
}

impl DatagramIterator {
    /// Creates a reader positioned at offset 0.
    pub fn new(datagram: Datagram) -> Self {
        Self {
            datagram,
            position: 0,
        }
    }

    pub fn datagram(&self) -> &Datagram {
        &self.datagram
    }

    pub fn into_datagram(self) -> Datagram {
        self.datagram
    }

    /// Current read offset in bytes.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining_size(&self) -> usize {
        self.datagram.len() - self.position
    }

    /// Moves the read position back to offset 0.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn skip_bytes(&mut self, count: usize) -> Result<(), DatagramError> {
        self.take(count).map(|_| ())
    }

    pub fn get_bool(&mut self) -> Result<bool, DatagramError> {
        Ok(self.get_u8()? != 0)
    }

    get_le!(
        get_u8: u8,
        get_u16: u16,
        get_u32: u32,
        get_u64: u64,
        get_i8: i8,
        get_i16: i16,
        get_i32: i32,
        get_i64: i64,
        get_f32: f32,
        get_f64: f64,
    );

    /// Reads a string written by [`Datagram::add_string`].
    pub fn get_string(&mut self) -> Result<String, DatagramError> {
        let start = self.position;
        let bytes = self.get_blob()?;
        String::from_utf8(bytes).map_err(|_| {
            self.position = start;
            DatagramError::InvalidUtf8(start)
        })
    }

    /// Reads a string written by [`Datagram::add_string32`].
    pub fn get_string32(&mut self) -> Result<String, DatagramError> {
        let start = self.position;
        let bytes = self.get_blob32()?;
        String::from_utf8(bytes).map_err(|_| {
            self.position = start;
            DatagramError::InvalidUtf8(start)
        })
    }

    /// Reads bytes written by [`Datagram::add_blob`].
    pub fn get_blob(&mut self) -> Result<Vec<u8>, DatagramError> {
        let start = self.position;
        let len = usize::from(self.get_u16()?);
        self.take(len).map(<[u8]>::to_vec).map_err(|e| {
            self.position = start;
            e
        })
    }

    /// Reads bytes written by [`Datagram::add_blob32`].
    pub fn get_blob32(&mut self) -> Result<Vec<u8>, DatagramError> {
        let start = self.position;
        let len = self.get_u32()? as usize;
        self.take(len).map(<[u8]>::to_vec).map_err(|e| {
            self.position = start;
            e
        })
    }

    /// Reads exactly `count` unprefixed bytes.
    pub fn extract_bytes(&mut self, count: usize) -> Result<Vec<u8>, DatagramError> {
        self.take(count).map(<[u8]>::to_vec)
    }

    /// Returns everything after the read position and moves it to the end.
    pub fn get_remaining_bytes(&mut self) -> Vec<u8> {
        let rest = self.datagram.as_bytes()[self.position..].to_vec();
        self.position = self.datagram.len();
        rest
    }

    fn take(&mut self, count: usize) -> Result<&[u8], DatagramError> {
        let available = self.remaining_size();
        if count > available {
            return Err(DatagramError::InsufficientData {
                offset: self.position,
                needed: count,
                available,
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.datagram.as_bytes()[start..start + count])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
