//! # Fixed-Capacity Strings
//!
//! `BoundedStr<N>` stores at most `N` bytes inline, so every header and
//! identity that embeds one is `Copy` and has a fixed size. A string longer
//! than `N` is rejected, both when built locally and when decoded from the
//! wire; it is never silently truncated.

use crate::errors::TypeError;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A UTF-8 string with a fixed byte capacity of `N`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundedStr<const N: usize> {
    len: usize,
    bytes: [u8; N],
}

impl<const N: usize> BoundedStr<N> {
    /// Byte capacity of this string type.
    pub const CAPACITY: usize = N;

    /// Builds a bounded string, failing if `s` is longer than `N` bytes.
    pub fn new(s: &str) -> Result<Self, TypeError> {
        if s.len() > N {
            return Err(TypeError::StringTooLong {
                len: s.len(),
                capacity: N,
            });
        }

        let mut bytes = [0u8; N];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Ok(Self {
            len: s.len(),
            bytes,
        })
    }

    /// The stored text.
    pub fn as_str(&self) -> &str {
        // Only ever filled from a `&str`, so the prefix is valid UTF-8.
        std::str::from_utf8(&self.bytes[..self.len]).unwrap_or_default()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the string is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for BoundedStr<N> {
    fn default() -> Self {
        Self {
            len: 0,
            bytes: [0u8; N],
        }
    }
}

impl<const N: usize> fmt::Debug for BoundedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<const N: usize> fmt::Display for BoundedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> FromStr for BoundedStr<N> {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<const N: usize> PartialEq<str> for BoundedStr<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<const N: usize> PartialEq<&str> for BoundedStr<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl<const N: usize> Serialize for BoundedStr<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, const N: usize> Deserialize<'de> for BoundedStr<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(D::Error::custom)
    }
}
