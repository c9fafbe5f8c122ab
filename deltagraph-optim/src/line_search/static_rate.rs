use super::LineSearchStrategy;
use crate::cursor::LineSearchCursor;
use crate::error::OptimError;
use crate::monitor::Monitor;
use deltagraph_core::PointSample;
use serde::{Deserialize, Serialize};

/// Tunables for [`StaticRateSearch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticRateConfig {
    pub rate: f64,
    /// Smallest rate tried before giving up on the direction.
    pub min_rate: f64,
}

impl Default for StaticRateConfig {
    fn default() -> Self {
        StaticRateConfig {
            rate: 1e-3,
            min_rate: 1e-20,
        }
    }
}

impl StaticRateConfig {
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_min_rate(mut self, min_rate: f64) -> Self {
        self.min_rate = min_rate;
        self
    }
}

/// Takes a fixed step; if the loss does not fall, halves the rate and tries
/// again.
///
/// A halved rate carries over to later searches. Each accepted step doubles
/// it again, up to the configured `rate`.
#[derive(Debug, Clone)]
pub struct StaticRateSearch {
    config: StaticRateConfig,
    rate: f64,
}

impl Default for StaticRateSearch {
    fn default() -> Self {
        let config = StaticRateConfig::default();
        StaticRateSearch {
            rate: config.rate,
            config,
        }
    }
}

impl StaticRateSearch {
    /// # Errors
    /// Returns `OptimError::ConfigurationError` unless
    /// `0 < min_rate <= rate` and both are finite.
    pub fn new(config: StaticRateConfig) -> Result<Self, OptimError> {
        let valid = config.min_rate.is_finite()
            && config.rate.is_finite()
            && 0.0 < config.min_rate
            && config.min_rate <= config.rate;
        if !valid {
            return Err(OptimError::ConfigurationError(format!(
                "static rate needs 0 < min_rate <= rate, got rate={} min_rate={}",
                config.rate, config.min_rate
            )));
        }
        Ok(StaticRateSearch {
            rate: config.rate,
            config,
        })
    }

    pub fn config(&self) -> &StaticRateConfig {
        &self.config
    }

    /// The rate the next search starts from.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl LineSearchStrategy for StaticRateSearch {
    fn step(
        &mut self,
        cursor: &mut dyn LineSearchCursor,
        monitor: &mut dyn Monitor,
    ) -> Result<PointSample, OptimError> {
        let origin = cursor.step(0.0, monitor)?.point;
        while self.rate >= self.config.min_rate {
            let probe = cursor.step(self.rate, monitor)?;
            if probe.value().is_finite() && probe.value() < origin.value() {
                self.rate = (self.rate * 2.0).min(self.config.rate);
                return Ok(probe.point);
            }
            self.rate *= 0.5;
            log::debug!("static rate backed off to {:.3e}", self.rate);
        }
        log::warn!("static rate fell below {:.1e} without improvement", self.config.min_rate);
        self.rate = self.config.min_rate;
        Ok(origin)
    }

    fn name(&self) -> &str {
        "static_rate"
    }
}
