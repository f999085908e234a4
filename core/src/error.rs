use crate::types::Label;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed {category} record for user {user_id}, device {device}, file {file}: {reason}")]
    MalformedRecord {
        user_id: String,
        device: String,
        category: String,
        file: String,
        reason: String,
    },

    #[error("Class '{label}' has {count} training instance(s); at least 2 are required")]
    InsufficientClassData { label: Label, count: usize },

    #[error("Degenerate split: {population} users gave {train} training and {test} test users")]
    DegenerateSplit {
        population: usize,
        train: usize,
        test: usize,
    },

    #[error("Feature '{name}' is not in the schema")]
    UnknownFeature { name: String },

    #[error("Invalid feature schema: {reason}")]
    InvalidSchema { reason: String },

    #[error("Shape mismatch: expected {expected} columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Model '{model}' used before training")]
    NotTrained { model: &'static str },

    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Evaluation set is empty; accuracy is undefined")]
    EmptyEvaluationSet,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RiskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RiskError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type RiskResult<T> = Result<T, RiskError>;
