// PERFPREP RUNTIME CONFIGURATION
// BUILT FROM CLI FLAGS. NO FILE FORMAT: EVERY KNOB HAS A DEFAULT CONSTANT HERE.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::tunables::GOVERNOR_TOKENS;

// PERFORMANCE-CORE THRESHOLD IN KHZ (sysfs base_frequency UNIT): 3.2 GHZ
pub const DEFAULT_ECORE_THRESHOLD_KHZ: u64 = 3_200_000;

// GOVERNOR WRITTEN WHEN FREQUENCY SCALING IS RE-ENABLED.
// intel_pstate ONLY OFFERS performance/powersave, SO powersave IS THE SAFE PICK.
pub const DEFAULT_GOVERNOR: &str = "powersave";

// GOVERNOR WRITTEN WHEN FREQUENCY SCALING IS PINNED FOR PROFILING
pub const ARMED_GOVERNOR: &str = "performance";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    // PREFIX PREPENDED TO EVERY KERNEL PATH ("/" ON A REAL HOST)
    pub root: PathBuf,
    pub ecore_threshold_khz: u64,
    pub default_governor: String,
    // NEVER PROMPT FOR A PASSWORD: sudo -n
    pub non_interactive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
            ecore_threshold_khz: DEFAULT_ECORE_THRESHOLD_KHZ,
            default_governor: DEFAULT_GOVERNOR.to_string(),
            non_interactive: false,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.ecore_threshold_khz == 0 {
            return Err(Error::InvalidConfig(
                "efficiency-core threshold must be nonzero".into(),
            ));
        }
        if !GOVERNOR_TOKENS.contains(&self.default_governor.as_str()) {
            return Err(Error::InvalidConfig(format!(
                "unknown governor '{}' (expected one of: {})",
                self.default_governor,
                GOVERNOR_TOKENS.join(", ")
            )));
        }
        if !self.root.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "root {} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }
}
