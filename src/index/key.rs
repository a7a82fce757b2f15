//! Order-preserving key encoding
//!
//! Values encode to self-delimiting byte strings whose byte order equals
//! [`Value::cmp_raw`]. Composite keys are plain concatenations, so every
//! key that starts with the encoding of a prefix sorts within
//! `[prefix, prefix_successor)`.
//!
//! Layout per component:
//! - number: `0x10`, 8 bytes total-order f64 bits, 8 bytes exact i64 part
//! - text:   `0x20`, bytes with `0x00` escaped as `0x00 0xFF`, then `0x00 0x00`
//! - bytes:  `0x30`, escaped the same way as text
//! - NULL:   `0xFE`

use crate::value::{Number, Value};

pub const NUMBER_TAG: u8 = 0x10;
pub const TEXT_TAG: u8 = 0x20;
pub const BYTES_TAG: u8 = 0x30;
pub const NULL_TAG: u8 = 0xFE;

const NUMBER_LEN: usize = 17;

/// An encoded, comparable index key
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexKey(Vec<u8>);

impl IndexKey {
    /// Creates an empty composite key
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes a single value
    pub fn from_value(value: &Value) -> Self {
        let mut key = Self::new();
        key.push(value);
        key
    }

    /// Encodes several values as one composite key
    pub fn composite<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut key = Self::new();
        for value in values {
            key.push(value);
        }
        key
    }

    /// Appends one component
    pub fn push(&mut self, value: &Value) {
        if let Some(number) = value.as_number() {
            self.push_number(number);
            return;
        }
        match value {
            Value::Text(s) => self.push_escaped(TEXT_TAG, s.as_bytes()),
            Value::Bytes(b) => self.push_escaped(BYTES_TAG, b),
            _ => self.0.push(NULL_TAG),
        }
    }

    fn push_number(&mut self, number: Number) {
        // Total-ordering bits: flip all bits of negatives, the sign bit of positives
        let bits = number.as_f64().to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        let exact = (number.as_i64() as u64) ^ (1 << 63);
        self.0.push(NUMBER_TAG);
        self.0.extend_from_slice(&ordered.to_be_bytes());
        self.0.extend_from_slice(&exact.to_be_bytes());
    }

    fn push_escaped(&mut self, tag: u8, bytes: &[u8]) {
        self.0.reserve(bytes.len() + 3);
        self.0.push(tag);
        for &b in bytes {
            self.0.push(b);
            if b == 0x00 {
                self.0.push(0xFF);
            }
        }
        self.0.extend_from_slice(&[0x00, 0x00]);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Smallest byte string greater than every key starting with this one.
    ///
    /// Returns `None` when no such bound exists (all bytes are `0xFF`).
    pub fn prefix_successor(&self) -> Option<Vec<u8>> {
        prefix_successor(&self.0)
    }
}

impl From<IndexKey> for Vec<u8> {
    fn from(key: IndexKey) -> Self {
        key.0
    }
}

/// Smallest byte string greater than every string starting with `prefix`.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut out = prefix.to_vec();
    while let Some(last) = out.pop() {
        if last < 0xFF {
            out.push(last + 1);
            return Some(out);
        }
    }
    None
}

/// Byte length of the first `components` components of an encoded key.
///
/// Returns `None` if the key holds fewer components or is malformed.
pub fn component_prefix_len(key: &[u8], components: usize) -> Option<usize> {
    let mut pos = 0;
    for _ in 0..components {
        match *key.get(pos)? {
            NUMBER_TAG => pos += NUMBER_LEN,
            NULL_TAG => pos += 1,
            TEXT_TAG | BYTES_TAG => {
                pos += 1;
                loop {
                    let b = *key.get(pos)?;
                    if b == 0x00 {
                        let next = *key.get(pos + 1)?;
                        pos += 2;
                        if next == 0x00 {
                            break;
                        }
                    } else {
                        pos += 1;
                    }
                }
            }
            _ => return None,
        }
    }
    (pos <= key.len()).then_some(pos)
}
