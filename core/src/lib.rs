//! loanee-core: device-log feature extraction and credit-risk classification.
//!
//! Data flow:
//!   raw logs → LogAggregator (calls, contacts, sms)
//!            → FeatureVectorBuilder
//!            → GaussianNaiveBayes (+ SequentialForwardSelector) | LinearClassifier
//!            → TrainEvaluateLoop → EvaluationReport

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod feature_vector;
pub mod labels;
pub mod linear;
pub mod log_source;
pub mod naive_bayes;
pub mod records;
pub mod rng;
pub mod schema;
pub mod selection;
pub mod sms_signals;
pub mod split;
pub mod store;
pub mod types;
