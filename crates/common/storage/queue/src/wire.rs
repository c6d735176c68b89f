// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire format selection for queue documents.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Result, error::UnknownVariantSnafu};

/// Encoding strategy the storage engine uses for queue documents.
///
/// This is a closed set: names that do not match a variant are rejected
/// rather than mapped to a default.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
    strum_macros::EnumIter,
)]
#[serde(try_from = "String", into = "&'static str")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WireType {
    #[default]
    Binary,
    BinaryLight,
    FieldlessBinary,
    CompressedBinary,
    Text,
    Json,
    Raw,
}

impl WireType {
    /// Parses a wire type name, failing on anything outside the known set.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::UnknownVariant`](crate::QueueError) for an
    /// unrecognized name.
    pub fn from_name(name: &str) -> Result<Self> { parse_variant("wire type", name) }

    /// Returns `true` for the self-describing binary encodings.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::Binary | Self::BinaryLight | Self::FieldlessBinary | Self::CompressedBinary
        )
    }
}

impl TryFrom<String> for WireType {
    type Error = crate::QueueError;

    fn try_from(value: String) -> Result<Self> { Self::from_name(&value) }
}

/// Parses `value` as one of the variants of a closed option enum.
pub(crate) fn parse_variant<T: FromStr>(field: &'static str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| UnknownVariantSnafu { field, value }.build())
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;
    use test_case::test_case;

    use super::*;

    #[test_case("binary", WireType::Binary ; "lower case")]
    #[test_case("BINARY", WireType::Binary ; "upper case")]
    #[test_case("fieldless_binary", WireType::FieldlessBinary ; "snake case")]
    #[test_case(" text ", WireType::Text ; "surrounding whitespace")]
    fn test_from_name(name: &str, expected: WireType) {
        assert_eq!(WireType::from_name(name).unwrap(), expected);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = WireType::from_name("xml").unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Unknown wire type 'xml'");
    }

    #[test]
    fn test_display_round_trips_through_from_name() {
        for wire_type in WireType::iter() {
            assert_eq!(WireType::from_name(&wire_type.to_string()).unwrap(), wire_type);
        }
    }

    #[test]
    fn test_binary_family() {
        assert!(WireType::default().is_binary());
        assert!(WireType::CompressedBinary.is_binary());
        assert!(!WireType::Text.is_binary());
        assert!(!WireType::Json.is_binary());
    }
}
