//! Process-wide capability configuration
//!
//! Read once from the environment at startup and immutable for the process
//! lifetime. Turns "subsystem available or not" into an explicit, testable
//! configuration value instead of ambient import state: every optional
//! pipeline stage branches on one of these booleans.

use crate::error::{Result, SampletagError};
use tracing::debug;

/// Environment variable names, read once at process start
pub const ENV_SAFE_MODE: &str = "SAMPLETAG_SAFE_MODE";
pub const ENV_DISABLE_TIMBRAL: &str = "SAMPLETAG_DISABLE_TIMBRAL";
pub const ENV_DISABLE_MODELS: &str = "SAMPLETAG_DISABLE_MODELS";
pub const ENV_DISABLE_FINGERPRINT: &str = "SAMPLETAG_DISABLE_FINGERPRINT";
pub const ENV_NUM_THREADS: &str = "SAMPLETAG_NUM_THREADS";

/// Which optional extractor families are enabled for this process
#[derive(Debug, Clone)]
pub struct CapabilityConfig {
    /// Timbral analysis (HPSS, transient, brightness/warmth/roughness)
    pub timbral_enabled: bool,
    /// Model-backed predictions (instrument, genre/mood)
    pub models_enabled: bool,
    /// Audio fingerprinting
    pub fingerprint_enabled: bool,
    /// Numeric thread-pool size. Deliberately 1 by default: many worker
    /// processes run side by side and over-subscribed native pools
    /// destabilize each other.
    pub num_threads: usize,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            timbral_enabled: true,
            models_enabled: true,
            fingerprint_enabled: true,
            num_threads: 1,
        }
    }
}

impl CapabilityConfig {
    /// Read capabilities from the environment. Safe mode disables all
    /// optional subsystems at once; individual disables stack on top.
    pub fn from_env() -> Self {
        let safe_mode = env_flag(ENV_SAFE_MODE);

        let mut config = Self::default();
        if safe_mode {
            config.timbral_enabled = false;
            config.models_enabled = false;
            config.fingerprint_enabled = false;
        }
        if env_flag(ENV_DISABLE_TIMBRAL) {
            config.timbral_enabled = false;
        }
        if env_flag(ENV_DISABLE_MODELS) {
            config.models_enabled = false;
        }
        if env_flag(ENV_DISABLE_FINGERPRINT) {
            config.fingerprint_enabled = false;
        }
        if let Ok(v) = std::env::var(ENV_NUM_THREADS) {
            if let Ok(n) = v.trim().parse::<usize>() {
                config.num_threads = n.clamp(1, num_cpus::get());
            }
        }

        debug!(?config, "Resolved capability configuration");
        config
    }

    /// Pin the global rayon pool to the configured thread count.
    /// Must be called once, before any pipeline work.
    pub fn configure_thread_pool(&self) -> Result<()> {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build_global()
        {
            Ok(()) => {
                debug!("Configured thread pool with {} threads", self.num_threads);
                Ok(())
            }
            Err(e) => {
                // If the pool is already initialized (e.g., in tests), that's OK
                if e.to_string().contains("already been initialized") {
                    debug!("Thread pool already initialized, using existing pool");
                    Ok(())
                } else {
                    Err(SampletagError::ConfigError(format!(
                        "Failed to configure thread pool: {}",
                        e
                    )))
                }
            }
        }
    }

    /// All-off configuration, equivalent to safe mode
    pub fn safe_mode() -> Self {
        Self {
            timbral_enabled: false,
            models_enabled: false,
            fingerprint_enabled: false,
            num_threads: 1,
        }
    }
}

/// Interpret an environment variable as a boolean flag.
/// "1", "true", "yes", "on" (any case) enable it; everything else does not.
fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}
