//! Feature schema: the ordered, immutable set of recognised features.
//!
//! RULE: No component reads the schema from ambient state.
//! A `FeatureSchema` value is built once per run and passed explicitly
//! to the builder, the classifiers and the feature store.
//!
//! Every raw value is turned into a typed `FeatureValue` by exactly one
//! function, `FeatureKind::coerce`.

use crate::{
    error::{RiskError, RiskResult},
    types::Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Kinds and values ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Int,
    Bool,
    Timestamp,
}

impl FeatureKind {
    /// Coerce a raw aggregate value to this kind.
    ///
    /// Timestamps become seconds elapsed since `evaluated_at`; a raw 0 means
    /// "never observed" and stays 0.
    pub fn coerce(self, raw: i64, evaluated_at: Timestamp) -> FeatureValue {
        match self {
            FeatureKind::Int => FeatureValue::Count(raw),
            FeatureKind::Bool => FeatureValue::Flag(raw != 0),
            FeatureKind::Timestamp if raw == 0 => FeatureValue::Elapsed(0),
            FeatureKind::Timestamp => FeatureValue::Elapsed(evaluated_at - raw),
        }
    }
}

/// A coerced, typed feature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FeatureValue {
    Count(i64),
    Flag(bool),
    Elapsed(i64),
}

impl FeatureValue {
    /// Integer encoding used for persistence (flags as 0/1).
    pub fn as_i64(self) -> i64 {
        match self {
            FeatureValue::Count(v) | FeatureValue::Elapsed(v) => v,
            FeatureValue::Flag(b) => b as i64,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.as_i64() as f64
    }

    /// The zero value of a kind, used for features absent from every category.
    pub fn zero(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Int => FeatureValue::Count(0),
            FeatureKind::Bool => FeatureValue::Flag(false),
            FeatureKind::Timestamp => FeatureValue::Elapsed(0),
        }
    }

    /// Rebuild a value from its persisted integer encoding.
    pub fn from_stored(kind: FeatureKind, stored: i64) -> Self {
        match kind {
            FeatureKind::Int => FeatureValue::Count(stored),
            FeatureKind::Bool => FeatureValue::Flag(stored != 0),
            FeatureKind::Timestamp => FeatureValue::Elapsed(stored),
        }
    }
}

// ── Schema ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDef {
    pub name: String,
    pub kind: FeatureKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FeatureDef>", into = "Vec<FeatureDef>")]
pub struct FeatureSchema {
    defs: Vec<FeatureDef>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    pub fn new(defs: Vec<FeatureDef>) -> RiskResult<Self> {
        if defs.is_empty() {
            return Err(RiskError::InvalidSchema {
                reason: "schema declares no features".into(),
            });
        }
        let mut index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if def.name.trim().is_empty() {
                return Err(RiskError::InvalidSchema {
                    reason: format!("feature #{i} has an empty name"),
                });
            }
            if index.insert(def.name.clone(), i).is_some() {
                return Err(RiskError::InvalidSchema {
                    reason: format!("duplicate feature '{}'", def.name),
                });
            }
        }
        Ok(Self { defs, index })
    }

    /// The standard device-log schema, in declared order.
    pub fn standard() -> Self {
        use FeatureKind::{Bool, Int, Timestamp as Ts};
        let defs = [
            // calls
            ("earliest_call", Ts),
            ("latest_call", Ts),
            ("unique_calls", Int),
            ("total_calls", Int),
            // contacts
            ("last_time_contacted", Ts),
            ("max_times_contacted", Int),
            ("unique_contacts", Int),
            ("unique_contacts_with_phone", Int),
            // sms
            ("earliest_sms", Ts),
            ("latest_sms", Ts),
            ("unique_sms", Int),
            ("total_sms", Int),
            ("probable_loaned_before", Bool),
            ("probable_max_loan", Int),
            ("probable_credit_before", Bool),
            ("probable_max_credit", Int),
            ("probable_missed_payment", Bool),
        ]
        .into_iter()
        .map(|(name, kind)| FeatureDef { name: name.to_string(), kind })
        .collect::<Vec<_>>();

        let index = defs
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self { defs, index }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn defs(&self) -> &[FeatureDef] {
        &self.defs
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|d| d.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn index_of(&self, name: &str) -> RiskResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| RiskError::UnknownFeature { name: name.to_string() })
    }

    /// Resolve a list of feature names to column indices, in the given order.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> RiskResult<Vec<usize>> {
        names.iter().map(|n| self.index_of(n.as_ref())).collect()
    }
}

impl TryFrom<Vec<FeatureDef>> for FeatureSchema {
    type Error = RiskError;

    fn try_from(defs: Vec<FeatureDef>) -> RiskResult<Self> {
        FeatureSchema::new(defs)
    }
}

impl From<FeatureSchema> for Vec<FeatureDef> {
    fn from(schema: FeatureSchema) -> Self {
        schema.defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_zero_stays_zero() {
        assert_eq!(FeatureKind::Timestamp.coerce(0, 1_000), FeatureValue::Elapsed(0));
        assert_eq!(FeatureKind::Timestamp.coerce(400, 1_000), FeatureValue::Elapsed(600));
    }

    #[test]
    fn bool_coerces_any_nonzero_to_one() {
        assert_eq!(FeatureKind::Bool.coerce(7, 0).as_i64(), 1);
        assert_eq!(FeatureKind::Bool.coerce(0, 0).as_i64(), 0);
    }

    #[test]
    fn duplicate_names_rejected() {
        let defs = vec![
            FeatureDef { name: "a".into(), kind: FeatureKind::Int },
            FeatureDef { name: "a".into(), kind: FeatureKind::Bool },
        ];
        assert!(matches!(
            FeatureSchema::new(defs),
            Err(RiskError::InvalidSchema { .. })
        ));
    }

    #[test]
    fn schema_round_trips_through_json() {
        let json = r#"[{"name":"x","kind":"int"},{"name":"y","kind":"timestamp"}]"#;
        let schema: FeatureSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.index_of("y").unwrap(), 1);
        assert!(serde_json::from_str::<FeatureSchema>("[]").is_err());
    }
}
