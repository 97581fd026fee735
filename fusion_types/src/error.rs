use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeaderParseError {
    #[error("Header {name} is not valid ASCII")]
    NotAscii { name: &'static str },

    #[error("Header {name} has invalid value {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
