//! Konfigurasi channel
//!
//! Default bisa di-override lewat environment:
//! - `CORONG_CAPACITY`   jumlah slot (N), kapasitas efektif N-1
//! - `CORONG_SPIN_LIMIT` jumlah spin sebelum yield saat menunggu slot

use crate::core::DEFAULT_SPIN_LIMIT;
use crate::error::ConfigError;

pub const DEFAULT_CAPACITY: usize = 1024;
pub const CAPACITY_ENV: &str = "CORONG_CAPACITY";
pub const SPIN_LIMIT_ENV: &str = "CORONG_SPIN_LIMIT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Jumlah slot fisik (N). Kapasitas efektif N-1.
    pub capacity: usize,
    /// Spin sebelum yield saat slot masih dipegang thread lain
    pub spin_limit: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            spin_limit: DEFAULT_SPIN_LIMIT,
        }
    }
}

impl ChannelConfig {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_spin_limit(mut self, spin_limit: u32) -> Self {
        self.spin_limit = spin_limit;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < 2 {
            return Err(ConfigError::CapacityTooSmall(self.capacity));
        }
        if self.spin_limit == 0 {
            return Err(ConfigError::ZeroSpinLimit);
        }
        Ok(())
    }

    /// Default + override dari environment, lalu divalidasi
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(CAPACITY_ENV) {
            config.capacity = parse_env(CAPACITY_ENV, value)?;
        }
        if let Some(value) = lookup(SPIN_LIMIT_ENV) {
            config.spin_limit = parse_env(SPIN_LIMIT_ENV, value)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_is_valid() {
        let config = ChannelConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_tiny_capacity() {
        assert_eq!(
            ChannelConfig::new(1).validate(),
            Err(ConfigError::CapacityTooSmall(1))
        );
        assert_eq!(
            ChannelConfig::new(8).with_spin_limit(0).validate(),
            Err(ConfigError::ZeroSpinLimit)
        );
        assert!(ChannelConfig::default().with_capacity(2).validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config =
            ChannelConfig::from_lookup(lookup(&[(CAPACITY_ENV, "64"), (SPIN_LIMIT_ENV, " 8 ")]))
                .unwrap();
        assert_eq!(config, ChannelConfig::new(64).with_spin_limit(8));

        let config = ChannelConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ChannelConfig::default());
    }

    #[test]
    fn test_env_invalid_values() {
        let err = ChannelConfig::from_lookup(lookup(&[(CAPACITY_ENV, "banyak")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                name: CAPACITY_ENV,
                value: "banyak".to_string()
            }
        );

        let err = ChannelConfig::from_lookup(lookup(&[(CAPACITY_ENV, "1")])).unwrap_err();
        assert_eq!(err, ConfigError::CapacityTooSmall(1));
    }
}
