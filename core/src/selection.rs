//! Sequential forward selection over a trained Naive Bayes model.
//!
//! Greedy: each step tries every remaining feature appended to the current
//! selection and keeps the one with the best accuracy on the evaluation
//! set. Ties keep the earliest candidate in schema order. The result is a
//! locally improving subset, not a guaranteed optimum.

use crate::{
    error::{RiskError, RiskResult},
    feature_vector::LabeledInstance,
    naive_bayes::GaussianNaiveBayes,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// One greedy step: the feature added and the accuracy with it included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionStep {
    pub feature: String,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SequentialForwardSelector {
    target: usize,
}

impl SequentialForwardSelector {
    pub fn new(target: usize) -> Self {
        Self { target }
    }

    /// Ordered feature names, at most `target` of them.
    pub fn select(
        &self,
        model: &GaussianNaiveBayes,
        evaluation: &[LabeledInstance],
    ) -> RiskResult<Vec<String>> {
        Ok(self
            .select_with_scores(model, evaluation)?
            .into_iter()
            .map(|s| s.feature)
            .collect())
    }

    pub fn select_with_scores(
        &self,
        model: &GaussianNaiveBayes,
        evaluation: &[LabeledInstance],
    ) -> RiskResult<Vec<SelectionStep>> {
        if evaluation.is_empty() {
            return Err(RiskError::EmptyEvaluationSet);
        }

        let schema = model.schema();
        let mut candidates: Vec<usize> = (0..schema.len()).collect();
        let mut selected: Vec<usize> = Vec::with_capacity(self.target);
        let mut steps = Vec::with_capacity(self.target);

        while selected.len() < self.target && !candidates.is_empty() {
            let mut trial = selected.clone();
            trial.push(0);

            let mut best: Option<(usize, f64)> = None;
            for (pos, &candidate) in candidates.iter().enumerate() {
                if let Some(last) = trial.last_mut() {
                    *last = candidate;
                }
                let accuracy = model.accuracy_indices(&trial, evaluation)?;
                if best.map_or(true, |(_, a)| accuracy > a) {
                    best = Some((pos, accuracy));
                }
            }

            let Some((pos, accuracy)) = best else { break };
            let chosen = candidates.remove(pos);
            selected.push(chosen);

            let feature = schema.defs()[chosen].name.clone();
            debug!("sfs step {}: +{feature} accuracy={accuracy:.4}", selected.len());
            steps.push(SelectionStep { feature, accuracy });
        }

        Ok(steps)
    }
}
