#![cfg_attr(feature = "strict", deny(warnings))]

pub mod auth;
pub mod errors;

pub mod byte_size;
pub use byte_size::ByteSize;

pub mod configuration_utils;

mod guards;
pub use guards::EnvVarGuard;

pub mod pipe;
pub use pipe::{ChannelSender, ChannelStream, pipe};
