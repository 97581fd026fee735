use std::str::FromStr;

use http::HeaderMap;

use crate::headers::{CHECKSUM, PARTS_COUNT, VERSION_ID};
use crate::{ContentRange, HeaderParseError};

/// Metadata describing a remote distribution (or one part of it), read from the response
/// headers of a download probe or part fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Head {
    pub version: Option<String>,
    pub checksum: Option<String>,
    pub content_length: Option<u64>,
    /// Absent header means a single-part distribution.
    pub part_count: u32,
    pub content_range: Option<ContentRange>,
}

impl Head {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, HeaderParseError> {
        let part_count = parse_header::<u32>(headers, PARTS_COUNT)?.unwrap_or(1);

        Ok(Self {
            version: header_str(headers, VERSION_ID)?.map(str::to_owned),
            checksum: header_str(headers, CHECKSUM)?.map(str::to_owned),
            content_length: parse_header::<u64>(headers, "content-length")?,
            part_count,
            content_range: parse_header::<ContentRange>(headers, "content-range")?,
        })
    }

    pub fn is_multipart(&self) -> bool {
        self.part_count > 1
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, HeaderParseError> {
    headers
        .get(name)
        .map(|v| v.to_str().map_err(|_| HeaderParseError::NotAscii { name }))
        .transpose()
}

fn parse_header<T: FromStr>(headers: &HeaderMap, name: &'static str) -> Result<Option<T>, HeaderParseError> {
    let Some(value) = header_str(headers, name)? else {
        return Ok(None);
    };
    value
        .trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| HeaderParseError::InvalidValue {
            name,
            value: value.to_owned(),
        })
}
