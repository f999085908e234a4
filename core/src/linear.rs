//! Linear classifier seam.
//!
//! The train/evaluate loop only depends on the narrow `LinearClassifier`
//! contract: fit on a numeric matrix with labels, predict one row.
//! `SgdLogisticRegression` is the in-crate implementation: logistic loss,
//! L2 penalty, seeded per-epoch shuffling over z-scored columns.

use crate::{
    error::{RiskError, RiskResult},
    rng::{StreamRng, StreamSlot},
    types::Label,
};
use log::debug;
use serde::{Deserialize, Serialize};

pub trait LinearClassifier {
    fn train(&mut self, rows: &[Vec<f64>], labels: &[Label]) -> RiskResult<()>;

    fn predict(&self, row: &[f64]) -> RiskResult<Label>;

    fn name(&self) -> &'static str {
        "linear"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgdConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2_penalty: f64,
    pub seed: u64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            epochs: 50,
            l2_penalty: 0.0001,
            seed: 7,
        }
    }
}

/// Column means and deviations fit on the training matrix.
#[derive(Debug, Clone, PartialEq)]
struct Standardizer {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Standardizer {
    fn fit(rows: &[Vec<f64>], width: usize) -> Self {
        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        let mut scales = vec![0.0; width];
        for row in rows {
            for ((s, x), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (x - m).powi(2) / n;
            }
        }
        // Constant columns keep scale 1 so they standardise to 0.
        for s in &mut scales {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }
        Self { means, scales }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.means)
            .zip(&self.scales)
            .map(|((x, m), s)| (x - m) / s)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Fitted {
    scaler: Standardizer,
    weights: Vec<f64>,
    bias: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[derive(Debug, Clone)]
pub struct SgdLogisticRegression {
    config: SgdConfig,
    fitted: Option<Fitted>,
}

impl SgdLogisticRegression {
    pub fn new(config: SgdConfig) -> Self {
        Self { config, fitted: None }
    }

    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    /// Probability that `row` is a bad loanee.
    pub fn predict_proba(&self, row: &[f64]) -> RiskResult<f64> {
        let fitted = self.fitted.as_ref().ok_or(RiskError::NotTrained { model: "sgd_logistic" })?;
        if row.len() != fitted.weights.len() {
            return Err(RiskError::ShapeMismatch {
                expected: fitted.weights.len(),
                actual: row.len(),
            });
        }
        let x = fitted.scaler.transform(row);
        let logit = x.iter().zip(&fitted.weights).map(|(a, w)| a * w).sum::<f64>() + fitted.bias;
        Ok(sigmoid(logit))
    }
}

impl Default for SgdLogisticRegression {
    fn default() -> Self {
        Self::new(SgdConfig::default())
    }
}

impl LinearClassifier for SgdLogisticRegression {
    fn train(&mut self, rows: &[Vec<f64>], labels: &[Label]) -> RiskResult<()> {
        if rows.len() != labels.len() {
            return Err(RiskError::ShapeMismatch { expected: rows.len(), actual: labels.len() });
        }
        let Some(first) = rows.first() else {
            return Err(RiskError::EmptyTrainingSet);
        };
        let width = first.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(RiskError::ShapeMismatch { expected: width, actual: bad.len() });
        }

        let scaler = Standardizer::fit(rows, width);
        let scaled: Vec<Vec<f64>> = rows.iter().map(|r| scaler.transform(r)).collect();
        let mut weights = vec![0.0; width];
        let mut bias = 0.0;

        let mut rng = StreamRng::for_slot(self.config.seed, StreamSlot::LinearSgd);
        let mut order: Vec<usize> = (0..scaled.len()).collect();
        let lr = self.config.learning_rate;
        let l2 = self.config.l2_penalty;

        for epoch in 0..self.config.epochs {
            rng.shuffle(&mut order);
            let mut loss = 0.0;
            for &i in &order {
                let x = &scaled[i];
                let y = labels[i].as_f64();
                let p = sigmoid(x.iter().zip(&weights).map(|(a, w)| a * w).sum::<f64>() + bias);
                let error = p - y;
                for (w, xi) in weights.iter_mut().zip(x) {
                    *w -= lr * (error * xi + l2 * *w);
                }
                bias -= lr * error;
                loss -= y * p.max(1e-12).ln() + (1.0 - y) * (1.0 - p).max(1e-12).ln();
            }
            debug!("sgd epoch {epoch}: mean log-loss {:.5}", loss / scaled.len() as f64);
        }

        self.fitted = Some(Fitted { scaler, weights, bias });
        Ok(())
    }

    fn predict(&self, row: &[f64]) -> RiskResult<Label> {
        Ok(if self.predict_proba(row)? > 0.5 { Label::Bad } else { Label::Good })
    }

    fn name(&self) -> &'static str {
        "sgd_logistic"
    }
}
