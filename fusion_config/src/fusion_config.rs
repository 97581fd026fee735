use crate::groups::{client, log, transfer};

/// All configuration values for the Fusion client, grouped by concern.
#[derive(Debug, Clone, Default)]
pub struct FusionConfig {
    pub client: client::ConfigValues,
    pub transfer: transfer::ConfigValues,
    pub log: log::ConfigValues,
}

impl FusionConfig {
    /// Defaults with environment overrides (`FUSION_<GROUP>_<FIELD>`) applied.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.client.apply_env_overrides();
        self.transfer.apply_env_overrides();
        self.log.apply_env_overrides();
    }

    /// Upload parallelism, falling back to the host's available parallelism.
    pub fn upload_concurrency(&self) -> usize {
        self.transfer.upload_thread_pool_size.unwrap_or_else(host_parallelism).max(1)
    }

    /// Download parallelism, falling back to the host's available parallelism.
    pub fn download_concurrency(&self) -> usize {
        self.transfer.download_thread_pool_size.unwrap_or_else(host_parallelism).max(1)
    }
}

fn host_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
