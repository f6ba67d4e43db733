//! Worker response formats.
//!
//! The worker either echoes the matched text verbatim or emits one JSON
//! document per matching line. Both formats honour the one-frame-per-input
//! contract; only the content of non-empty frames differs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Flags passed to the worker when JSON details are requested.
pub const JSON_DETAIL_FLAGS: [&str; 3] = [
    "--format=json",
    "--with-details",
    "--with-scored-highlights",
];

/// Shape of the non-empty frames emitted by the worker.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResponseFormat {
    /// The worker prints the matched text.
    #[default]
    Plain,
    /// The worker prints a JSON document with match details and highlights.
    Json,
}

impl ResponseFormat {
    /// Extra worker flags required to produce this format.
    #[must_use]
    pub fn worker_flags(self) -> &'static [&'static str] {
        match self {
            Self::Plain => &[],
            Self::Json => &JSON_DETAIL_FLAGS,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("plain", ResponseFormat::Plain)]
    #[case("JSON", ResponseFormat::Json)]
    #[case("Json", ResponseFormat::Json)]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: ResponseFormat) {
        let parsed: ResponseFormat = input.parse().expect("format should parse");
        assert_eq!(parsed, expected);
    }

    #[rstest]
    fn rejects_unknown_format() {
        assert!("yaml".parse::<ResponseFormat>().is_err());
    }

    #[rstest]
    fn plain_format_adds_no_flags() {
        assert!(ResponseFormat::Plain.worker_flags().is_empty());
    }

    #[rstest]
    fn json_format_requests_details() {
        assert_eq!(
            ResponseFormat::Json.worker_flags(),
            &["--format=json", "--with-details", "--with-scored-highlights"]
        );
    }
}
