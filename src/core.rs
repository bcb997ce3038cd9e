use std::fmt;
use std::str::FromStr;

use crate::error::{RaceError, RaceResult};

/// Calendar year of a data point.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Year(pub i32);

impl Year {
    /// Integer year a decimal year falls in (floor, so `1973.9` is still 1973).
    pub fn floor_of(decimal: f64) -> Self {
        Self(decimal.floor() as i32)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Three-letter country identifier (ISO 3166-1 alpha-3), stored uppercase.
///
/// `Ord` on this type is the explicit tie-break key for ranking sorts.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Iso3([u8; 3]);

impl Iso3 {
    pub fn new(code: &str) -> RaceResult<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(RaceError::validation(format!(
                "country code must be three ASCII letters, got '{code}'"
            )));
        }
        Ok(Self([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }

    pub fn as_str(&self) -> &str {
        // Invariant: constructed from ASCII letters only.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for Iso3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Iso3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Iso3({})", self.as_str())
    }
}

impl FromStr for Iso3 {
    type Err = RaceError;

    fn from_str(s: &str) -> RaceResult<Self> {
        Self::new(s)
    }
}

impl serde::Serialize for Iso3 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Iso3 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Display language for localized labels. Surfaces pick one; the data model
/// always carries both.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Zh,
}

impl Lang {
    /// The companion language, for secondary labels.
    pub fn other(self) -> Self {
        match self {
            Self::En => Self::Zh,
            Self::Zh => Self::En,
        }
    }
}

/// Parses a `#RRGGBB` hex color into an RGB triple.
pub fn parse_hex_rgb(hex: &str) -> RaceResult<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(RaceError::validation(format!(
            "color must be #RRGGBB, got '{hex}'"
        )));
    }

    let channel = |range: std::ops::Range<usize>| -> RaceResult<u8> {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| RaceError::validation(format!("bad hex color '{hex}'")))
    };

    Ok((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}
