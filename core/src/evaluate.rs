//! Train/evaluate loop.
//!
//! EXECUTION ORDER (fixed):
//!   1. Partition the aggregated population into train and test users.
//!   2. Build training vectors against the clock's "now".
//!   3. Fit the chosen classifier: Naive Bayes, or a linear classifier.
//!      With forward selection, the training users are split again; Naive
//!      Bayes is fit on one part and candidates are scored on the held-out
//!      part. Test users are never seen before step 4.
//!   4. Re-read the clock and build each test vector against that instant,
//!      predict, and compare with the known label.
//!
//! Because steps 2 and 4 read the clock separately, a test user's timestamp
//! features reflect elapsed time at scoring, not at training.

use crate::{
    aggregate::UserAggregates,
    clock::EvaluationClock,
    config::RiskConfig,
    error::{RiskError, RiskResult},
    feature_vector::{FeatureVector, FeatureVectorBuilder, LabeledInstance},
    labels::LabelMap,
    linear::LinearClassifier,
    naive_bayes::GaussianNaiveBayes,
    schema::FeatureSchema,
    rng::StreamSlot,
    selection::{SelectionStep, SequentialForwardSelector},
    types::{Label, Timestamp, UserId},
};
use log::{debug, info};
use serde::Serialize;
use std::fmt;

// ── Public types ─────────────────────────────────────────────────────────────

pub enum ClassifierChoice {
    /// Gaussian Naive Bayes; `select` runs forward selection for that many
    /// features, otherwise every schema feature is used.
    NaiveBayes { select: Option<usize> },
    Linear(Box<dyn LinearClassifier>),
}

impl ClassifierChoice {
    fn name(&self) -> String {
        match self {
            Self::NaiveBayes { select: None } => "naive_bayes".into(),
            Self::NaiveBayes { select: Some(n) } => format!("naive_bayes+sfs{n}"),
            Self::Linear(c) => c.name().into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionOutcome {
    pub user_id: UserId,
    pub predicted: Label,
    pub actual: Label,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub classifier: String,
    pub trained_at: Timestamp,
    pub scored_at: Timestamp,
    pub training_users: usize,
    pub dropped_training_users: Vec<UserId>,
    /// Training users the classifier was fit on.
    pub fit_users: Vec<UserId>,
    /// Training users held out to score forward-selection candidates.
    /// Empty when no selection ran.
    pub selection_users: Vec<UserId>,
    pub selected_features: Option<Vec<SelectionStep>>,
    pub outcomes: Vec<PredictionOutcome>,
    pub correct: usize,
    pub total: usize,
    /// Vectors the classifier was fit on, for persistence by the caller.
    #[serde(skip)]
    pub training_vectors: Vec<FeatureVector>,
}

impl EvaluationReport {
    /// Fraction of test users labelled correctly, in [0, 1].
    pub fn accuracy(&self) -> f64 {
        self.correct as f64 / self.total as f64
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} correct", self.correct, self.total)
    }
}

// ── Fitted model ─────────────────────────────────────────────────────────────

struct FitOutcome {
    fitted: Fitted,
    selected_features: Option<Vec<SelectionStep>>,
    fit_users: Vec<UserId>,
    selection_users: Vec<UserId>,
}

fn user_ids(instances: &[LabeledInstance]) -> Vec<UserId> {
    instances.iter().map(|i| i.vector.user_id.clone()).collect()
}

enum Fitted {
    NaiveBayes { model: GaussianNaiveBayes, features: Vec<usize> },
    Linear(Box<dyn LinearClassifier>),
}

impl Fitted {
    fn predict(&self, vector: &FeatureVector) -> RiskResult<Label> {
        match self {
            Fitted::NaiveBayes { model, features } => Ok(model.classify_indices(vector, features)),
            Fitted::Linear(clf) => clf.predict(&vector.to_row()),
        }
    }
}

// ── Loop ─────────────────────────────────────────────────────────────────────

pub struct TrainEvaluateLoop<'a, C: EvaluationClock> {
    schema: &'a FeatureSchema,
    config: &'a RiskConfig,
    clock: C,
}

impl<'a, C: EvaluationClock> TrainEvaluateLoop<'a, C> {
    pub fn new(schema: &'a FeatureSchema, config: &'a RiskConfig, clock: C) -> Self {
        Self { schema, config, clock }
    }

    pub fn run(
        &self,
        population: Vec<UserAggregates>,
        labels: &LabelMap,
        classifier: ClassifierChoice,
    ) -> RiskResult<EvaluationReport> {
        let population_size = population.len();
        let split = self.config.split.partition(population, self.config.train_fraction)?;
        info!(
            "split {population_size} users: {} train, {} test",
            split.train.len(),
            split.test.len()
        );

        // Training vectors
        let trained_at = self.clock.now();
        let builder = FeatureVectorBuilder::new(self.schema, trained_at);
        let mut dropped = Vec::new();
        let mut training = Vec::with_capacity(split.train.len());
        for user in &split.train {
            if self.config.skip_empty_training_users && !user.has_data() {
                debug!("user={} has no log data, dropped from training", user.user_id);
                dropped.push(user.user_id.clone());
                continue;
            }
            let vector = builder.build_from_aggregates(user);
            training.push(LabeledInstance::new(vector, labels.label_for(&user.user_id)));
        }
        if training.is_empty() {
            return Err(RiskError::EmptyTrainingSet);
        }

        // Fit
        let name = classifier.name();
        let FitOutcome { fitted, selected_features, fit_users, selection_users } =
            self.fit(classifier, &training)?;

        // Score
        let scored_at = self.clock.now();
        let builder = FeatureVectorBuilder::new(self.schema, scored_at);
        let mut outcomes = Vec::with_capacity(split.test.len());
        for user in &split.test {
            let vector = builder.build_from_aggregates(user);
            let predicted = fitted.predict(&vector)?;
            let actual = labels.label_for(&user.user_id);
            let correct = predicted == actual;
            info!(
                "user={} predicted={predicted} actual={actual} {}",
                user.user_id,
                if correct { "correct" } else { "wrong" }
            );
            outcomes.push(PredictionOutcome { user_id: user.user_id.clone(), predicted, actual, correct });
        }

        let correct = outcomes.iter().filter(|o| o.correct).count();
        let total = outcomes.len();
        if total == 0 {
            return Err(RiskError::DegenerateSplit {
                population: population_size,
                train: split.train.len(),
                test: 0,
            });
        }
        info!("{name}: {correct}/{total} correct");

        Ok(EvaluationReport {
            classifier: name,
            trained_at,
            scored_at,
            training_users: training.len(),
            dropped_training_users: dropped,
            fit_users,
            selection_users,
            selected_features,
            outcomes,
            correct,
            total,
            training_vectors: training.into_iter().map(|i| i.vector).collect(),
        })
    }

    fn fit(&self, classifier: ClassifierChoice, training: &[LabeledInstance]) -> RiskResult<FitOutcome> {
        match classifier {
            ClassifierChoice::NaiveBayes { select: Some(n) } => {
                let holdout = self.config.split.partition_on(
                    training.to_vec(),
                    1.0 - self.config.selection_holdout_fraction,
                    StreamSlot::SelectionHoldout,
                )?;
                debug!(
                    "selection holdout: fit on {}, score candidates on {}",
                    holdout.train.len(),
                    holdout.test.len()
                );

                let model = GaussianNaiveBayes::train(self.schema, &holdout.train)?;
                let steps = SequentialForwardSelector::new(n).select_with_scores(&model, &holdout.test)?;
                let names: Vec<&str> = steps.iter().map(|s| s.feature.as_str()).collect();
                let features = self.schema.resolve(&names)?;
                Ok(FitOutcome {
                    fitted: Fitted::NaiveBayes { model, features },
                    selected_features: Some(steps),
                    fit_users: user_ids(&holdout.train),
                    selection_users: user_ids(&holdout.test),
                })
            }
            ClassifierChoice::NaiveBayes { select: None } => {
                let model = GaussianNaiveBayes::train(self.schema, training)?;
                let features = (0..self.schema.len()).collect();
                Ok(FitOutcome {
                    fitted: Fitted::NaiveBayes { model, features },
                    selected_features: None,
                    fit_users: user_ids(training),
                    selection_users: Vec::new(),
                })
            }
            ClassifierChoice::Linear(mut clf) => {
                let rows: Vec<Vec<f64>> = training.iter().map(|i| i.vector.to_row()).collect();
                let labels: Vec<Label> = training.iter().map(|i| i.label).collect();
                clf.train(&rows, &labels)?;
                Ok(FitOutcome {
                    fitted: Fitted::Linear(clf),
                    selected_features: None,
                    fit_users: user_ids(training),
                    selection_users: Vec::new(),
                })
            }
        }
    }
}
