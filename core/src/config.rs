//! Run configuration, loaded from a JSON file.
//!
//! Every field has a default, so an empty object `{}` is a valid
//! configuration that reproduces the standard behaviour.

use crate::{
    error::{RiskError, RiskResult},
    linear::SgdConfig,
    schema::FeatureSchema,
    sms_signals::{SmsKeywords, SmsSignalRules},
    split::{SplitStrategy, DEFAULT_TRAIN_FRACTION},
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SELECTION_HOLDOUT_FRACTION: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub train_fraction: f64,
    pub split: SplitStrategy,
    pub sms: SmsKeywords,
    /// Number of features sequential forward selection picks.
    pub selection_target: usize,
    /// Share of training users held out to score selection candidates.
    /// The classifier is fit on the remaining training users.
    pub selection_holdout_fraction: f64,
    /// Drop training users whose logs are entirely empty.
    pub skip_empty_training_users: bool,
    pub sgd: SgdConfig,
    /// Overrides the standard schema when present.
    pub schema: Option<FeatureSchema>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            train_fraction: DEFAULT_TRAIN_FRACTION,
            split: SplitStrategy::default(),
            sms: SmsKeywords::default(),
            selection_target: 5,
            selection_holdout_fraction: DEFAULT_SELECTION_HOLDOUT_FRACTION,
            skip_empty_training_users: true,
            sgd: SgdConfig::default(),
            schema: None,
        }
    }
}

impl RiskConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: RiskConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RiskResult<()> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(RiskError::InvalidConfig {
                reason: format!("train_fraction {} must be in (0, 1)", self.train_fraction),
            });
        }
        if !(self.selection_holdout_fraction > 0.0 && self.selection_holdout_fraction < 1.0) {
            return Err(RiskError::InvalidConfig {
                reason: format!(
                    "selection_holdout_fraction {} must be in (0, 1)",
                    self.selection_holdout_fraction
                ),
            });
        }
        if !(self.sgd.learning_rate > 0.0 && self.sgd.learning_rate.is_finite()) {
            return Err(RiskError::InvalidConfig {
                reason: format!("sgd.learning_rate {} must be positive", self.sgd.learning_rate),
            });
        }
        if self.sgd.l2_penalty < 0.0 {
            return Err(RiskError::InvalidConfig {
                reason: format!("sgd.l2_penalty {} must be non-negative", self.sgd.l2_penalty),
            });
        }
        if self.sms.currency_unit.trim().is_empty() {
            return Err(RiskError::InvalidConfig {
                reason: "sms.currency_unit must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Reseed every random stream from one master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.split = SplitStrategy::Shuffled { seed };
        self.sgd.seed = seed;
        self
    }

    pub fn feature_schema(&self) -> FeatureSchema {
        self.schema.clone().unwrap_or_else(FeatureSchema::standard)
    }

    pub fn sms_rules(&self) -> RiskResult<SmsSignalRules> {
        SmsSignalRules::new(&self.sms)
    }
}
