//! Location identifiers
//!
//! A stored object is addressed by `s3://{region}/{bucket}/{key}`. The string is
//! the only public handle for an object and is re-parsed on every call.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

pub const LOCATION_SCHEME: &str = "s3";

static LOCATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^s3://([^/]+)/([^/]+)/([^/]+)$").expect("location pattern is a valid regex")
});

/// Decomposed location identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub region: String,
    pub bucket: String,
    pub key: String,
}

impl Location {
    pub fn new(
        region: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse `s3://{region}/{bucket}/{key}`.
    ///
    /// Every segment must be non-empty and free of `/`. No percent-decoding is done.
    pub fn parse(uri: &str) -> Result<Self> {
        if uri.is_empty() {
            return Err(Error::invalid_argument("file uri is empty"));
        }

        let captures = LOCATION_PATTERN.captures(uri).ok_or_else(|| {
            Error::invalid_argument(format!(
                "file uri {} not in s3://{{region}}/{{bucket}}/{{key}} format",
                uri
            ))
        })?;

        Ok(Self::new(&captures[1], &captures[2], &captures[3]))
    }

    /// True when this location lives in `region` (ASCII case-insensitive).
    pub fn is_in_region(&self, region: &str) -> bool {
        self.region.eq_ignore_ascii_case(region)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}/{}/{}",
            LOCATION_SCHEME, self.region, self.bucket, self.key
        )
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Location::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        let location = Location::parse("s3://us-east-1/my-bucket/my-file.txt").unwrap();
        assert_eq!(location.region, "us-east-1");
        assert_eq!(location.bucket, "my-bucket");
        assert_eq!(location.key, "my-file.txt");
    }

    #[test]
    fn test_parse_keeps_segments_verbatim() {
        let location = Location::parse("s3://EU_WEST_1/b.with.dots/qa.a%20b c").unwrap();
        assert_eq!(location.region, "EU_WEST_1");
        assert_eq!(location.bucket, "b.with.dots");
        assert_eq!(location.key, "qa.a%20b c");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let cases = [
            "",
            "s3://",
            "s3://us-east-1",
            "s3://us-east-1/bucket",
            "s3://us-east-1/bucket/",
            "s3://us-east-1//key",
            "s3:///bucket/key",
            "s3://us-east-1/bucket/dir/key",
            "gs://us-east-1/bucket/key",
            "s3:/us-east-1/bucket/key",
            " s3://us-east-1/bucket/key",
        ];

        for uri in cases {
            let err = Location::parse(uri).unwrap_err();
            assert!(err.is_invalid_argument(), "expected InvalidArgument for {uri:?}");
        }
    }

    #[test]
    fn test_display_round_trips() {
        let location = Location::new("ap-south-1", "media", "qa.1234");
        let uri = location.to_string();
        assert_eq!(uri, "s3://ap-south-1/media/qa.1234");
        assert_eq!(uri.parse::<Location>().unwrap(), location);
    }

    #[test]
    fn test_region_match_ignores_case() {
        let location = Location::new("US-EAST-1", "b", "k");
        assert!(location.is_in_region("us-east-1"));
        assert!(!location.is_in_region("us-west-2"));
    }
}
