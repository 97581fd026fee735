use std::fmt;
use std::str::FromStr;

/// A byte count that can be written in configuration as a human-readable size, e.g. "8mb" or "50MiB".
///
/// Units are binary: "kb" is 1024 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(u64);

impl ByteSize {
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<&str> for ByteSize {
    /// Panics on a malformed literal; meant for compile-time defaults only.
    fn from(value: &str) -> Self {
        value.parse().unwrap_or_else(|e| panic!("invalid byte size literal {value:?}: {e}"))
    }
}

impl FromStr for ByteSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);

        let value: u64 = digits.parse().map_err(|e| format!("cannot parse {digits:?}: {e}"))?;

        let multiplier: u64 = match unit.trim() {
            "" | "b" => 1,
            "k" | "kb" | "kib" => 1 << 10,
            "m" | "mb" | "mib" => 1 << 20,
            "g" | "gb" | "gib" => 1 << 30,
            "t" | "tb" | "tib" => 1 << 40,
            other => return Err(format!("unknown unit {other:?}")),
        };

        value
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| format!("{s} overflows u64"))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}b", self.0)
    }
}
