//! Build configuration.

use serde::{Deserialize, Serialize};

/// Options for a build pass.
///
/// ```
/// use nodegeo_core::BuildConfig;
///
/// let config: BuildConfig = serde_json::from_str(r#"{ "seed": 7 }"#).unwrap();
/// assert_eq!(config.seed, Some(7));
/// assert!(!config.verbose);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Seed for random sampling. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Log every built block at debug level.
    pub verbose: bool,
}

impl BuildConfig {
    /// A config with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }
}
