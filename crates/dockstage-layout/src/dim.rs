#![forbid(unsafe_code)]

//! Declared panel sizes.
//!
//! A size in a view model is either a plain number (absolute pixels), a
//! numeric string (parsed as pixels), or a string ending in `%` (percentage
//! of the reference dimension). Parsing is deliberately lenient: malformed
//! input degrades to a zero dimension instead of failing the layout pass.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A declared width or height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dim {
    /// Absolute pixels.
    Px(f64),
    /// Percentage of the reference dimension (0.0 to 100.0, not clamped).
    Percent(f64),
}

impl Dim {
    /// Resolve against a reference dimension, producing pixels.
    #[inline]
    pub fn resolve(&self, reference: f64) -> f64 {
        match self {
            Self::Px(v) => *v,
            Self::Percent(p) => p * reference / 100.0,
        }
    }

    /// Lenient string parse.
    ///
    /// Takes the leading integer prefix of the string (sign included,
    /// fraction truncated), treating a trailing `%` as a percentage marker.
    /// A string with no leading digits parses as zero pixels.
    pub fn parse(s: &str) -> Self {
        let t = s.trim();
        if let Some(body) = t.strip_suffix('%') {
            Self::Percent(leading_int(body))
        } else {
            Self::Px(leading_int(t))
        }
    }
}

impl Default for Dim {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

impl From<f64> for Dim {
    fn from(v: f64) -> Self {
        Self::Px(v)
    }
}

impl From<&str> for Dim {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl FromStr for Dim {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(v) => write!(f, "{v}"),
            Self::Percent(p) => write!(f, "{p}%"),
        }
    }
}

/// Integer prefix of a decimal string, as f64. No digits parses as 0.
fn leading_int(s: &str) -> f64 {
    let t = s.trim();
    let (sign, rest) = match t.as_bytes().first() {
        Some(b'-') => (-1.0, &t[1..]),
        Some(b'+') => (1.0, &t[1..]),
        _ => (1.0, t),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        0.0
    } else {
        digits.parse::<f64>().map(|v| sign * v).unwrap_or(0.0)
    }
}

impl Serialize for Dim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Px(v) => serializer.serialize_f64(*v),
            Self::Percent(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Dim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DimVisitor)
    }
}

struct DimVisitor;

impl Visitor<'_> for DimVisitor {
    type Value = Dim;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a size string like \"120\" or \"50%\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Dim, E> {
        Ok(Dim::Px(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Dim, E> {
        Ok(Dim::Px(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Dim, E> {
        Ok(Dim::Px(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Dim, E> {
        Ok(Dim::parse(v))
    }
}
