//! Fixed-width record codecs.
//!
//! All integers are little-endian. Names and strings are truncated on a
//! char boundary so that at least one NUL byte always terminates the field.
//!
//! Parameter record:
//! ```text
//! [param_name_len: name, NUL padded]
//! [4: type tag] [4: domain index] [4: read word] [4: write word]
//! [16: value]
//! ```
//!
//! Value field by type:
//! ```text
//! Integer32  [4: value]
//! Integer64  [8: value]
//! String     [4: string index] [4: size incl. NUL]
//! Blob       [4: first block] [4: block count] [4: byte size]
//! ```

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::layout::StoreLayout;
use crate::param::{AccessRights, ParamType};

const VALUE_LEN: usize = 16;

/// Largest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Encode `name` into a NUL-padded field of `width` bytes.
///
/// At most `width - 1` bytes of the name are kept.
pub fn encode_name(name: &str, width: usize) -> Vec<u8> {
    let mut buf = vec![0u8; width];
    let kept = truncate_on_char_boundary(name, width.saturating_sub(1));
    buf[..kept.len()].copy_from_slice(kept.as_bytes());
    buf
}

/// Decode a NUL-terminated field.
pub fn decode_name(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Encode a string record. Returns the record and the stored size, which
/// counts the terminating NUL.
pub fn encode_string(value: &str, record_len: usize) -> (Vec<u8>, u32) {
    let record = encode_name(value, record_len);
    let kept = truncate_on_char_boundary(value, record_len.saturating_sub(1));
    (record, kept.len() as u32 + 1)
}

/// Decode a string record.
pub fn decode_string(record: &[u8]) -> String {
    decode_name(record)
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(word)
}

fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), TypeError> {
    if bytes.len() != expected {
        return Err(TypeError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// A named group of parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub name: String,
}

impl DomainRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Encode into a record of `layout.domain_record_size()` bytes.
    ///
    /// The trailing enumerator slot is left zero; readers fill it in.
    pub fn encode(&self, layout: &StoreLayout) -> Vec<u8> {
        let mut buf = encode_name(&self.name, layout.domain_name_len);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8], layout: &StoreLayout) -> Result<Self, TypeError> {
        check_len(bytes, layout.domain_record_size())?;
        Ok(Self {
            name: decode_name(&bytes[..layout.domain_name_len]),
        })
    }
}

/// Type-specific payload of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterValue {
    Integer32(u32),
    Integer64(u64),
    String {
        index: u32,
        size: u32,
    },
    Blob {
        index: u32,
        number_of_blocks: u32,
        size: u32,
    },
}

impl ParameterValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Integer32(_) => ParamType::Integer32,
            Self::Integer64(_) => ParamType::Integer64,
            Self::String { .. } => ParamType::String,
            Self::Blob { .. } => ParamType::Blob,
        }
    }

    fn encode(&self) -> [u8; VALUE_LEN] {
        let mut buf = [0u8; VALUE_LEN];
        match *self {
            Self::Integer32(v) => buf[0..4].copy_from_slice(&v.to_le_bytes()),
            Self::Integer64(v) => buf[0..8].copy_from_slice(&v.to_le_bytes()),
            Self::String { index, size } => {
                buf[0..4].copy_from_slice(&index.to_le_bytes());
                buf[4..8].copy_from_slice(&size.to_le_bytes());
            }
            Self::Blob {
                index,
                number_of_blocks,
                size,
            } => {
                buf[0..4].copy_from_slice(&index.to_le_bytes());
                buf[4..8].copy_from_slice(&number_of_blocks.to_le_bytes());
                buf[8..12].copy_from_slice(&size.to_le_bytes());
            }
        }
        buf
    }

    fn decode(ty: ParamType, bytes: &[u8]) -> Self {
        match ty {
            ParamType::Integer32 => Self::Integer32(read_u32(bytes, 0)),
            ParamType::Integer64 => Self::Integer64(read_u64(bytes, 0)),
            ParamType::String => Self::String {
                index: read_u32(bytes, 0),
                size: read_u32(bytes, 4),
            },
            ParamType::Blob => Self::Blob {
                index: read_u32(bytes, 0),
                number_of_blocks: read_u32(bytes, 4),
                size: read_u32(bytes, 8),
            },
        }
    }
}

/// A single typed configuration value belonging to one domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub name: String,
    pub domain_index: u32,
    pub read_access: AccessRights,
    pub write_access: AccessRights,
    pub value: ParameterValue,
}

impl ParameterRecord {
    pub fn param_type(&self) -> ParamType {
        self.value.param_type()
    }

    /// Encode into a record of `layout.parameter_record_size()` bytes.
    pub fn encode(&self, layout: &StoreLayout) -> Vec<u8> {
        let mut buf = encode_name(&self.name, layout.param_name_len);
        buf.extend_from_slice(&self.param_type().tag().to_le_bytes());
        buf.extend_from_slice(&self.domain_index.to_le_bytes());
        buf.extend_from_slice(&self.read_access.to_word().to_le_bytes());
        buf.extend_from_slice(&self.write_access.to_word().to_le_bytes());
        buf.extend_from_slice(&self.value.encode());
        buf
    }

    pub fn decode(bytes: &[u8], layout: &StoreLayout) -> Result<Self, TypeError> {
        check_len(bytes, layout.parameter_record_size())?;
        let at = layout.param_name_len;
        let ty = ParamType::from_tag(read_u32(bytes, at))?;
        Ok(Self {
            name: decode_name(&bytes[..at]),
            domain_index: read_u32(bytes, at + 4),
            read_access: AccessRights::from_word(read_u32(bytes, at + 8))?,
            write_access: AccessRights::from_word(read_u32(bytes, at + 12))?,
            value: ParameterValue::decode(ty, &bytes[at + 16..at + 16 + VALUE_LEN]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: ParameterValue) -> ParameterRecord {
        ParameterRecord {
            name: "param".into(),
            domain_index: 3,
            read_access: AccessRights::All,
            write_access: AccessRights::None,
            value,
        }
    }

    #[test]
    fn name_is_null_padded() {
        let field = encode_name("abc", 8);
        assert_eq!(field, b"abc\0\0\0\0\0");
        assert_eq!(decode_name(&field), "abc");
    }

    #[test]
    fn name_truncated_keeps_terminator() {
        let field = encode_name("abcdefghij", 4);
        assert_eq!(field, b"abc\0");
    }

    #[test]
    fn name_truncation_respects_char_boundary() {
        // "é" is two bytes; only one fits after "ab" in a 4-byte field
        let field = encode_name("abé", 4);
        assert_eq!(field, b"ab\0\0");
    }

    #[test]
    fn string_size_counts_terminator() {
        let (record, size) = encode_string("hello", 16);
        assert_eq!(size, 6);
        assert_eq!(record.len(), 16);
        assert_eq!(&record[..6], b"hello\0");
        assert_eq!(decode_string(&record), "hello");
    }

    #[test]
    fn string_truncated_at_capacity() {
        let (record, size) = encode_string("0123456789", 8);
        assert_eq!(size, 8);
        assert_eq!(&record, b"0123456\0");
    }

    #[test]
    fn domain_record_layout() {
        let layout = StoreLayout::default();
        let bytes = DomainRecord::new("network").encode(&layout);
        assert_eq!(bytes.len(), layout.domain_record_size());
        assert_eq!(&bytes[..8], b"network\0");
        assert_eq!(&bytes[32..], &[0, 0, 0, 0]);
        assert_eq!(DomainRecord::decode(&bytes, &layout).unwrap().name, "network");
    }

    #[test]
    fn parameter_record_integer32_layout() {
        let layout = StoreLayout::default();
        let bytes = sample(ParameterValue::Integer32(10)).encode(&layout);
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[32..36], &1u32.to_le_bytes());
        assert_eq!(&bytes[36..40], &3u32.to_le_bytes());
        assert_eq!(&bytes[40..44], &u32::MAX.to_le_bytes());
        assert_eq!(&bytes[44..48], &0u32.to_le_bytes());
        assert_eq!(&bytes[48..52], &10u32.to_le_bytes());
        assert!(bytes[52..].iter().all(|&b| b == 0));
    }

    #[test]
    fn parameter_record_decodes_every_kind() {
        let layout = StoreLayout::default();
        for value in [
            ParameterValue::Integer32(0xDEAD_BEEF),
            ParameterValue::Integer64(u64::MAX - 1),
            ParameterValue::String { index: 7, size: 12 },
            ParameterValue::Blob {
                index: 2,
                number_of_blocks: 5,
                size: 300,
            },
        ] {
            let record = sample(value);
            let decoded = ParameterRecord::decode(&record.encode(&layout), &layout).unwrap();
            assert_eq!(decoded, record);
        }
    }

    #[test]
    fn parameter_record_wrong_length() {
        let layout = StoreLayout::default();
        let err = ParameterRecord::decode(&[0u8; 10], &layout).unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 64,
                actual: 10
            }
        );
    }

    #[test]
    fn parameter_record_bad_tag() {
        let layout = StoreLayout::default();
        let bytes = vec![0u8; layout.parameter_record_size()];
        let err = ParameterRecord::decode(&bytes, &layout).unwrap_err();
        assert_eq!(err, TypeError::UnknownTypeTag(0));
    }

    #[test]
    fn parameter_value_serializes_to_json() {
        let json = serde_json::to_string(&ParameterValue::String { index: 1, size: 4 }).unwrap();
        assert!(json.contains("\"index\":1"));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn encoded_name_always_fits_and_terminates(name in ".{0,64}", width in 2usize..48) {
                let field = encode_name(&name, width);
                prop_assert_eq!(field.len(), width);
                prop_assert_eq!(field[width - 1], 0);
                prop_assert!(name.starts_with(&decode_name(&field)));
            }
        }
    }
}
