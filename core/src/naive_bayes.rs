//! Gaussian Naive Bayes over the feature schema.
//!
//! Training summarises each class (good, bad) as a per-feature mean and
//! sample standard deviation. Classification compares, per class, the sum
//! of log Gaussian densities over the chosen features; the larger sum wins
//! and ties go to `Label::Good`.
//!
//! A feature with zero standard deviation is a hard discriminator:
//! probability 1 on an exact match with the class mean, 0 otherwise.

use crate::{
    error::{RiskError, RiskResult},
    feature_vector::{FeatureVector, LabeledInstance},
    schema::FeatureSchema,
    types::Label,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const MIN_CLASS_INSTANCES: usize = 2;

// ── Densities ────────────────────────────────────────────────────────────────

/// Gaussian probability density at `x`.
pub fn gaussian_density(x: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return if x == mean { 1.0 } else { 0.0 };
    }
    let exponent = (-(x - mean).powi(2) / (2.0 * std_dev.powi(2))).exp();
    exponent / ((2.0 * PI).sqrt() * std_dev)
}

/// Natural log of `gaussian_density`, computed without underflow.
/// Returns `f64::NEG_INFINITY` for the zero-probability case.
pub fn gaussian_log_density(x: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return if x == mean { 0.0 } else { f64::NEG_INFINITY };
    }
    let z = (x - mean) / std_dev;
    -0.5 * z * z - std_dev.ln() - 0.5 * (2.0 * PI).ln()
}

// ── Class statistics ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStat {
    pub mean: f64,
    pub std_dev: f64,
}

impl FeatureStat {
    /// Mean and sample (n − 1) standard deviation. Needs at least 2 values.
    fn from_values(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Self { mean, std_dev: variance.sqrt() }
    }

    pub fn log_density(&self, x: f64) -> f64 {
        gaussian_log_density(x, self.mean, self.std_dev)
    }

    pub fn density(&self, x: f64) -> f64 {
        gaussian_density(x, self.mean, self.std_dev)
    }
}

/// Per-feature summary of one class, aligned with the schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStatistics {
    pub label: Label,
    pub instance_count: usize,
    pub stats: Vec<FeatureStat>,
}

impl ClassStatistics {
    pub fn compute(schema: &FeatureSchema, label: Label, vectors: &[&FeatureVector]) -> RiskResult<Self> {
        if vectors.len() < MIN_CLASS_INSTANCES {
            return Err(RiskError::InsufficientClassData { label, count: vectors.len() });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != schema.len()) {
            return Err(RiskError::ShapeMismatch { expected: schema.len(), actual: bad.len() });
        }

        let mut column = Vec::with_capacity(vectors.len());
        let stats = (0..schema.len())
            .map(|i| {
                column.clear();
                column.extend(vectors.iter().map(|v| v.values()[i].as_f64()));
                FeatureStat::from_values(&column)
            })
            .collect();

        Ok(Self { label, instance_count: vectors.len(), stats })
    }

    pub fn stat(&self, index: usize) -> Option<&FeatureStat> {
        self.stats.get(index)
    }

    /// Sum of log densities of `vector` over the feature indices given.
    pub fn log_likelihood(&self, vector: &FeatureVector, features: &[usize]) -> f64 {
        features
            .iter()
            .map(|&i| match (self.stats.get(i), vector.value_at(i)) {
                (Some(stat), Some(v)) => stat.log_density(v.as_f64()),
                _ => f64::NEG_INFINITY,
            })
            .sum()
    }
}

// ── Classifier ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    schema: FeatureSchema,
    good: ClassStatistics,
    bad: ClassStatistics,
}

impl GaussianNaiveBayes {
    /// Fit both classes. Fails before computing anything if either class
    /// has fewer than two instances.
    pub fn train(schema: &FeatureSchema, instances: &[LabeledInstance]) -> RiskResult<Self> {
        let (good, bad): (Vec<&LabeledInstance>, Vec<&LabeledInstance>) =
            instances.iter().partition(|i| i.label == Label::Good);

        for (label, members) in [(Label::Good, &good), (Label::Bad, &bad)] {
            if members.len() < MIN_CLASS_INSTANCES {
                return Err(RiskError::InsufficientClassData { label, count: members.len() });
            }
        }

        let good: Vec<&FeatureVector> = good.iter().map(|i| &i.vector).collect();
        let bad: Vec<&FeatureVector> = bad.iter().map(|i| &i.vector).collect();

        Ok(Self {
            schema: schema.clone(),
            good: ClassStatistics::compute(schema, Label::Good, &good)?,
            bad: ClassStatistics::compute(schema, Label::Bad, &bad)?,
        })
    }

    /// Build a classifier from precomputed statistics.
    pub fn from_statistics(
        schema: &FeatureSchema,
        good: ClassStatistics,
        bad: ClassStatistics,
    ) -> RiskResult<Self> {
        for stats in [&good, &bad] {
            if stats.stats.len() != schema.len() {
                return Err(RiskError::ShapeMismatch {
                    expected: schema.len(),
                    actual: stats.stats.len(),
                });
            }
        }
        Ok(Self { schema: schema.clone(), good, bad })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn statistics(&self, label: Label) -> &ClassStatistics {
        match label {
            Label::Good => &self.good,
            Label::Bad => &self.bad,
        }
    }

    /// Classify using resolved feature indices.
    pub fn classify_indices(&self, vector: &FeatureVector, features: &[usize]) -> Label {
        let good = self.good.log_likelihood(vector, features);
        let bad = self.bad.log_likelihood(vector, features);
        if bad > good { Label::Bad } else { Label::Good }
    }

    /// Classify using the named subset of features.
    pub fn classify<S: AsRef<str>>(&self, vector: &FeatureVector, features: &[S]) -> RiskResult<Label> {
        let indices = self.schema.resolve(features)?;
        Ok(self.classify_indices(vector, &indices))
    }

    /// Classify using every schema feature.
    pub fn classify_all_features(&self, vector: &FeatureVector) -> Label {
        let all: Vec<usize> = (0..self.schema.len()).collect();
        self.classify_indices(vector, &all)
    }

    /// Fraction of `instances` labelled correctly using `features`.
    pub fn accuracy_indices(&self, features: &[usize], instances: &[LabeledInstance]) -> RiskResult<f64> {
        if instances.is_empty() {
            return Err(RiskError::EmptyEvaluationSet);
        }
        let correct = instances
            .iter()
            .filter(|i| self.classify_indices(&i.vector, features) == i.label)
            .count();
        Ok(correct as f64 / instances.len() as f64)
    }

    pub fn accuracy<S: AsRef<str>>(&self, features: &[S], instances: &[LabeledInstance]) -> RiskResult<f64> {
        let indices = self.schema.resolve(features)?;
        self.accuracy_indices(&indices, instances)
    }
}
