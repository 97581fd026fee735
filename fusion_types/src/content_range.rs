use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::HeaderParseError;

const CONTENT_RANGE: &str = "Content-Range";

/// An HTTP `Content-Range: bytes start-end/total` value.  Both `start` and `end` are inclusive;
/// `total` is `None` when the server sends `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn new(start: u64, end: u64, total: Option<u64>) -> Self {
        Self { start, end, total }
    }

    /// Number of bytes covered by the range.  Both ends are inclusive, so only a range with
    /// `end < start` is empty.
    pub fn len(&self) -> u64 {
        self.end.checked_sub(self.start).map_or(0, |d| d.saturating_add(1))
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl FromStr for ContentRange {
    type Err = HeaderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HeaderParseError::InvalidValue {
            name: CONTENT_RANGE,
            value: s.to_owned(),
        };

        let spec = s.trim().strip_prefix("bytes").ok_or_else(invalid)?.trim_start();
        let (range, total) = spec.split_once('/').ok_or_else(invalid)?;
        let (start, end) = range.split_once('-').ok_or_else(invalid)?;

        let start: u64 = start.trim().parse().map_err(|_| invalid())?;
        let end: u64 = end.trim().parse().map_err(|_| invalid())?;
        let total = match total.trim() {
            "*" => None,
            t => Some(t.parse::<u64>().map_err(|_| invalid())?),
        };

        if end < start || total.is_some_and(|t| end >= t) {
            return Err(invalid());
        }

        Ok(Self { start, end, total })
    }
}

impl Display for ContentRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.total {
            Some(total) => write!(f, "bytes {}-{}/{}", self.start, self.end, total),
            None => write!(f, "bytes {}-{}/*", self.start, self.end),
        }
    }
}
