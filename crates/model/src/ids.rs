//! Fixed-width identifier types.
//!
//! Each identifier always holds canonical text: exactly `WIDTH` lowercase hex
//! digits. There are two ways in:
//!
//! - [`normalize()`](TitleId::normalize) is lenient and follows
//!   [`normalize_hex`](crate::hex::normalize_hex) (padding, left-truncation,
//!   junk removal). It's what the loader uses on whatever the file contains.
//! - [`FromStr`] is strict and meant for user-entered values: after trimming
//!   and removing a `0x` prefix the input must be exactly `WIDTH` hex digits,
//!   otherwise [`ErrorKind::Validation`] is raised.

use crate::error::{Error, ErrorKind};
use crate::hex::{Case, is_hex, normalize_hex, normalize_int, normalize_value};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident, $width:literal, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Number of hex digits in the canonical form.
            pub const WIDTH: usize = $width;
            /// Human readable name, used in validation messages.
            pub const KIND: &'static str = $kind;

            /// Lenient normalization; `None` when nothing hex-like remains.
            pub fn normalize(input: impl AsRef<str>) -> Option<Self> {
                Self::non_empty(normalize_hex(input, Some(Self::WIDTH), Case::Lower))
            }

            /// Lenient normalization of a raw JSON value.
            pub fn normalize_value(value: &Value) -> Option<Self> {
                Self::non_empty(normalize_value(value, Some(Self::WIDTH), Case::Lower))
            }

            pub fn from_int(value: u64) -> Self {
                Self(normalize_int(value, Some(Self::WIDTH), Case::Lower))
            }

            fn non_empty(normalized: String) -> Option<Self> {
                (!normalized.is_empty()).then_some(Self(normalized))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn to_upper(&self) -> String {
                self.0.to_ascii_uppercase()
            }
        }

        impl FromStr for $name {
            type Err = Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                let digits = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                if digits.len() != Self::WIDTH || !is_hex(digits) {
                    exn::bail!(ErrorKind::Validation {
                        kind: Self::KIND,
                        width: Self::WIDTH,
                        value: s.to_string(),
                    });
                }
                Ok(Self(digits.to_ascii_lowercase()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = ErrorKind;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse().map_err(|e: Error| (*e).clone())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                f.write_str(&self.0)
            }
        }
    };
}

hex_id!(
    /// 8-hex identifier of a game title; primary key of the database.
    TitleId,
    8,
    "TitleID"
);
hex_id!(
    /// 16-hex identifier of a piece of downloadable content. By convention
    /// (not enforced) the first 8 digits are the owning [`TitleId`].
    ContentId,
    16,
    "ContentID"
);
hex_id!(
    /// 16-hex identifier of a title-update package.
    TuId,
    16,
    "Title Update ID"
);
hex_id!(
    /// 40-hex SHA1 digest, the key of a "known" title update.
    Sha1Hex,
    40,
    "SHA1"
);

impl TitleId {
    /// The `n`-th content id in this title's namespace: `<title><n:08x>`.
    pub fn content_id(&self, n: u32) -> ContentId {
        ContentId(format!("{}{n:08x}", self.0))
    }
}

impl ContentId {
    /// Whether this content id follows the `<title id><suffix>` convention.
    pub fn belongs_to(&self, title_id: &TitleId) -> bool {
        self.0.starts_with(title_id.as_str())
    }
}
