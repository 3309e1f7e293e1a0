use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::seed::DEFAULT_MODEL;

/// Per-model parameters that make simulated predictors distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceProfile {
    pub bias_offset: f64,
    pub noise_std_dev: f64,
    /// Added to the hashed seed.
    pub seed_salt: u64,
}

impl VarianceProfile {
    /// Used for `default` and any unrecognised model name.
    pub const DEFAULT: VarianceProfile =
        VarianceProfile { bias_offset: 0.0, noise_std_dev: 10.0, seed_salt: 5000 };
}

#[derive(Debug, Clone)]
pub struct ProfileTable {
    profiles: BTreeMap<String, VarianceProfile>,
    aliases: BTreeMap<String, String>,
    fallback: VarianceProfile,
}

impl ProfileTable {
    pub fn from_config(config: &EngineConfig) -> Self {
        ProfileTable {
            profiles: config.profiles.clone(),
            aliases: config.aliases.clone(),
            fallback: config.default_profile,
        }
    }

    /// Trimmed, lower-cased, alias-resolved. Empty becomes `default`;
    /// unknown names pass through so they still seed distinctly.
    pub fn canonical_name(&self, raw: &str) -> String {
        let name = raw.trim().to_ascii_lowercase();
        if name.is_empty() {
            return DEFAULT_MODEL.to_string();
        }
        match self.aliases.get(&name) {
            Some(target) => target.clone(),
            None => name,
        }
    }

    /// Never fails: unknown names get the default profile.
    pub fn profile(&self, canonical: &str) -> VarianceProfile {
        self.profiles.get(canonical).copied().unwrap_or(self.fallback)
    }

    pub fn is_known(&self, canonical: &str) -> bool {
        self.profiles.contains_key(canonical)
    }

    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}
