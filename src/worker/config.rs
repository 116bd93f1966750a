//! Worker configuration

use crate::sheet::SheetSchema;
use std::time::Duration;

/// Named presets for the two sheet layouts in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Email B, language D, status K; 1s between rows, 10s between cycles
    Registration,
    /// Email B, status L; no row delay, 30s between cycles
    Compact,
}

impl Profile {
    pub fn schema(&self) -> SheetSchema {
        match self {
            Profile::Registration => SheetSchema::registration(),
            Profile::Compact => SheetSchema::compact(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        match self {
            Profile::Registration => Duration::from_secs(10),
            Profile::Compact => Duration::from_secs(30),
        }
    }

    pub fn row_delay(&self) -> Duration {
        match self {
            Profile::Registration => Duration::from_secs(1),
            Profile::Compact => Duration::ZERO,
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between cycles
    pub poll_interval: Duration,

    /// Pause after each processed row (zero disables it)
    pub row_delay: Duration,

    /// Column layout of the sheet
    pub schema: SheetSchema,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::for_profile(Profile::Registration)
    }
}

impl WorkerConfig {
    /// Create a new config builder
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::default()
    }

    /// Config matching a named profile
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            poll_interval: profile.poll_interval(),
            row_delay: profile.row_delay(),
            schema: profile.schema(),
        }
    }
}

/// Builder for WorkerConfig
#[derive(Default)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Start from a profile's defaults
    pub fn profile(mut self, profile: Profile) -> Self {
        self.config = WorkerConfig::for_profile(profile);
        self
    }

    /// Set poll interval
    pub fn poll_interval(mut self, duration: Duration) -> Self {
        self.config.poll_interval = duration;
        self
    }

    /// Set poll interval in seconds
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval = Duration::from_secs(secs);
        self
    }

    /// Set the pause after each row
    pub fn row_delay(mut self, duration: Duration) -> Self {
        self.config.row_delay = duration;
        self
    }

    /// Replace the sheet layout
    pub fn schema(mut self, schema: SheetSchema) -> Self {
        self.config.schema = schema;
        self
    }

    /// Build the config
    pub fn build(self) -> WorkerConfig {
        self.config
    }
}
