pub mod macros;

pub mod fusion_config;
pub mod groups;

// Re-exported for use inside the config_group! macro expansion.
pub use utils::configuration_utils::ParsableConfigValue;
pub use utils::ByteSize;

pub use fusion_config::FusionConfig;

/// Prefix for every configuration environment variable, e.g. FUSION_TRANSFER_UPLOAD_PART_SIZE.
pub const ENV_PREFIX: &str = "FUSION";
