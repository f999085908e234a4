//! Feature vectors: one fixed-schema record per user.
//!
//! Every vector carries exactly the schema's features, in the schema's
//! order. Features missing from every category mapping are zero.

use crate::{
    aggregate::{CategoryFeatures, UserAggregates},
    error::{RiskError, RiskResult},
    schema::{FeatureSchema, FeatureValue},
    types::{Label, Timestamp, UserId},
};
use log::trace;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub user_id: UserId,
    /// Instant that timestamp features were measured against.
    pub evaluated_at: Timestamp,
    values: Vec<FeatureValue>,
}

impl FeatureVector {
    /// Assemble a vector from already-coerced values in schema order.
    pub fn from_values(
        schema: &FeatureSchema,
        user_id: impl Into<UserId>,
        evaluated_at: Timestamp,
        values: Vec<FeatureValue>,
    ) -> RiskResult<Self> {
        if values.len() != schema.len() {
            return Err(RiskError::ShapeMismatch {
                expected: schema.len(),
                actual: values.len(),
            });
        }
        Ok(Self { user_id: user_id.into(), evaluated_at, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    pub fn value_at(&self, index: usize) -> Option<FeatureValue> {
        self.values.get(index).copied()
    }

    pub fn get(&self, schema: &FeatureSchema, name: &str) -> RiskResult<FeatureValue> {
        let i = schema.index_of(name)?;
        self.value_at(i).ok_or(RiskError::ShapeMismatch {
            expected: schema.len(),
            actual: self.values.len(),
        })
    }

    /// (name, value) pairs in schema order.
    pub fn entries<'a>(
        &'a self,
        schema: &'a FeatureSchema,
    ) -> impl Iterator<Item = (&'a str, FeatureValue)> + 'a {
        schema.names().zip(self.values.iter().copied())
    }

    /// Numeric row for the linear classifier.
    pub fn to_row(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.as_f64()).collect()
    }
}

/// A feature vector with its known label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledInstance {
    pub vector: FeatureVector,
    pub label: Label,
}

impl LabeledInstance {
    pub fn new(vector: FeatureVector, label: Label) -> Self {
        Self { vector, label }
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Merges per-category mappings into schema-conformant vectors.
///
/// Pure: the same inputs and `evaluated_at` always give the same vector.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVectorBuilder<'s> {
    schema: &'s FeatureSchema,
    evaluated_at: Timestamp,
}

impl<'s> FeatureVectorBuilder<'s> {
    pub fn new(schema: &'s FeatureSchema, evaluated_at: Timestamp) -> Self {
        Self { schema, evaluated_at }
    }

    pub fn build(&self, user_id: impl Into<UserId>, categories: &[CategoryFeatures]) -> FeatureVector {
        let user_id = user_id.into();
        let values = self
            .schema
            .defs()
            .iter()
            .map(|def| {
                match categories.iter().find_map(|c| c.get(def.name.as_str())) {
                    Some(&raw) => def.kind.coerce(raw, self.evaluated_at),
                    None => FeatureValue::zero(def.kind),
                }
            })
            .collect::<Vec<_>>();

        for category in categories {
            for name in category.keys() {
                if !self.schema.contains(name) {
                    trace!("user={user_id}: feature '{name}' not in schema, ignored");
                }
            }
        }

        FeatureVector { user_id, evaluated_at: self.evaluated_at, values }
    }

    pub fn build_from_aggregates(&self, aggregates: &UserAggregates) -> FeatureVector {
        self.build(aggregates.user_id.clone(), &aggregates.all_category_features())
    }
}
