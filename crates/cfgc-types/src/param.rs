use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Closed set of parameter kinds a store can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Integer32,
    Integer64,
    String,
    Blob,
}

impl ParamType {
    /// Resolve a type token from a definition document.
    ///
    /// Only the exact, case-sensitive tokens `uint32`, `uint64`, `string`
    /// and `blob` are recognized.
    pub fn resolve(token: &str) -> Result<Self, TypeError> {
        match token {
            "uint32" => Ok(Self::Integer32),
            "uint64" => Ok(Self::Integer64),
            "string" => Ok(Self::String),
            "blob" => Ok(Self::Blob),
            other => Err(TypeError::UnknownParamType(other.to_string())),
        }
    }

    /// The token this type is written as in a definition document.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Integer32 => "uint32",
            Self::Integer64 => "uint64",
            Self::String => "string",
            Self::Blob => "blob",
        }
    }

    /// On-disk type tag.
    pub fn tag(&self) -> u32 {
        match self {
            Self::Integer32 => 1,
            Self::Integer64 => 2,
            Self::String => 3,
            Self::Blob => 4,
        }
    }

    /// Parse an on-disk type tag.
    pub fn from_tag(tag: u32) -> Result<Self, TypeError> {
        match tag {
            1 => Ok(Self::Integer32),
            2 => Ok(Self::Integer64),
            3 => Ok(Self::String),
            4 => Ok(Self::Blob),
            other => Err(TypeError::UnknownTypeTag(other)),
        }
    }
}

impl FromStr for ParamType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Global access permission of a parameter.
///
/// Per-component permissions are not modelled: a parameter is either
/// accessible by every component or by none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessRights {
    #[default]
    None,
    All,
}

const ACCESS_NONE: u32 = 0;
const ACCESS_ALL: u32 = u32::MAX;

impl AccessRights {
    /// Parse an access-setting token (`true` or `false`, exact match).
    pub fn parse_setting(token: &str) -> Result<bool, TypeError> {
        match token {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(TypeError::InvalidAccessSetting(other.to_string())),
        }
    }

    pub fn from_flag(granted: bool) -> Self {
        if granted {
            Self::All
        } else {
            Self::None
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::All)
    }

    /// On-disk access word.
    pub fn to_word(&self) -> u32 {
        match self {
            Self::None => ACCESS_NONE,
            Self::All => ACCESS_ALL,
        }
    }

    pub fn from_word(word: u32) -> Result<Self, TypeError> {
        match word {
            ACCESS_NONE => Ok(Self::None),
            ACCESS_ALL => Ok(Self::All),
            other => Err(TypeError::InvalidAccessWord(other)),
        }
    }
}
