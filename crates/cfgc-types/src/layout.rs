use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Bytes of a parameter record that follow the name field:
/// type, domain index, read word, write word (4 bytes each) and a 16-byte value.
pub const PARAMETER_FIXED_LEN: usize = 32;

/// Bytes of a domain record that follow the name field (reserved enumerator slot).
pub const DOMAIN_FIXED_LEN: usize = 4;

/// Upper bound for any single configurable length.
pub const MAX_FIELD_LEN: usize = 64 * 1024;

/// Record-size parameters of a compiled store.
///
/// Every field has a default, so a TOML layout file only needs to name the
/// values it overrides:
///
/// ```toml
/// max_string_len = 256
/// blob_block_len = 512
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreLayout {
    /// Width of the null-padded domain name field.
    pub domain_name_len: usize,
    /// Width of the null-padded parameter name field.
    pub param_name_len: usize,
    /// Size of one string record, terminator included.
    pub max_string_len: usize,
    /// Size of one blob block.
    pub blob_block_len: usize,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            domain_name_len: 32,
            param_name_len: 32,
            max_string_len: 128,
            blob_block_len: 64,
        }
    }
}

impl StoreLayout {
    /// Parse a layout from TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, TypeError> {
        let layout: Self =
            toml::from_str(text).map_err(|e| TypeError::InvalidLayout(e.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    /// Recover the layout of an existing store from its backend record sizes.
    pub fn from_record_sizes(
        domain_record: usize,
        parameter_record: usize,
        string_record: usize,
        blob_block: usize,
    ) -> Result<Self, TypeError> {
        if domain_record <= DOMAIN_FIXED_LEN || parameter_record <= PARAMETER_FIXED_LEN {
            return Err(TypeError::InvalidLayout(format!(
                "record sizes too small: domain {domain_record}, parameter {parameter_record}"
            )));
        }
        let layout = Self {
            domain_name_len: domain_record - DOMAIN_FIXED_LEN,
            param_name_len: parameter_record - PARAMETER_FIXED_LEN,
            max_string_len: string_record,
            blob_block_len: blob_block,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Check every length is usable.
    pub fn validate(&self) -> Result<(), TypeError> {
        let fields = [
            ("domain_name_len", self.domain_name_len, 2),
            ("param_name_len", self.param_name_len, 2),
            ("max_string_len", self.max_string_len, 2),
            ("blob_block_len", self.blob_block_len, 1),
        ];
        for (name, value, min) in fields {
            if value < min || value > MAX_FIELD_LEN {
                return Err(TypeError::InvalidLayout(format!(
                    "{name} must be in [{min}, {MAX_FIELD_LEN}], got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Size of one domain record.
    pub fn domain_record_size(&self) -> usize {
        self.domain_name_len + DOMAIN_FIXED_LEN
    }

    /// Size of one parameter record.
    pub fn parameter_record_size(&self) -> usize {
        self.param_name_len + PARAMETER_FIXED_LEN
    }

    /// Size of one string record.
    pub fn string_record_size(&self) -> usize {
        self.max_string_len
    }

    /// Size of one blob block.
    pub fn blob_block_size(&self) -> usize {
        self.blob_block_len
    }
}
