//! Credit signals derived from free-text SMS bodies.
//!
//! Amount extraction looks for a currency unit next to a number, trying
//! "amount before unit" first and only falling back to "unit before amount"
//! when the first ordering finds nothing. Grouping commas are stripped and
//! the largest amount in the message wins.

use crate::error::{RiskError, RiskResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY_UNIT: &str = "ksh";

static DEFAULT_EXTRACTOR: Lazy<AmountExtractor> = Lazy::new(|| {
    AmountExtractor::new(DEFAULT_CURRENCY_UNIT).expect("Valid default currency patterns")
});

// ── Amount extraction ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AmountExtractor {
    amount_then_unit: Regex,
    unit_then_amount: Regex,
}

impl AmountExtractor {
    pub fn new(unit: &str) -> RiskResult<Self> {
        let unit = unit.trim().to_lowercase();
        if unit.is_empty() {
            return Err(RiskError::InvalidConfig {
                reason: "currency unit must not be empty".into(),
            });
        }
        let unit = regex::escape(&unit);
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| RiskError::InvalidConfig {
                reason: format!("bad currency pattern: {e}"),
            })
        };
        Ok(Self {
            amount_then_unit: compile(format!(r"([0-9,]+)(?:\.[0-9]{{1,2}})?\s?{unit}"))?,
            unit_then_amount: compile(format!(r"{unit}s?\.?\s*([0-9,]+)(?:\.[0-9]{{1,2}})?"))?,
        })
    }

    /// Largest whole-unit amount mentioned in `message`, if any.
    ///
    /// `message` must already be lower-cased.
    pub fn max_amount(&self, message: &str) -> Option<i64> {
        let from_first = Self::amounts(&self.amount_then_unit, message);
        let amounts = if from_first.is_empty() {
            Self::amounts(&self.unit_then_amount, message)
        } else {
            from_first
        };
        amounts.into_iter().max()
    }

    fn amounts(pattern: &Regex, message: &str) -> Vec<i64> {
        pattern
            .captures_iter(message)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().replace(',', ""))
            .filter(|digits| !digits.is_empty())
            .filter_map(|digits| digits.parse::<i64>().ok())
            .collect()
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        DEFAULT_EXTRACTOR.clone()
    }
}

// ── Keyword rules ────────────────────────────────────────────────────────────

/// Keyword lists, serialisable so they can live in the run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsKeywords {
    pub currency_unit: String,
    pub loan: Vec<String>,
    pub credit: Vec<String>,
    pub missed_payment: Vec<String>,
}

impl Default for SmsKeywords {
    fn default() -> Self {
        Self {
            currency_unit: DEFAULT_CURRENCY_UNIT.into(),
            loan: vec!["loan".into(), "borrow".into()],
            credit: vec!["balance".into()],
            missed_payment: vec!["missed".into(), "unpaid".into()],
        }
    }
}

/// Signals read from a single message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmsSignals {
    pub max_amount: Option<i64>,
    pub loan: bool,
    pub credit: bool,
    pub missed_payment: bool,
}

#[derive(Debug, Clone)]
pub struct SmsSignalRules {
    extractor: AmountExtractor,
    loan: Vec<String>,
    credit: Vec<String>,
    missed_payment: Vec<String>,
}

impl SmsSignalRules {
    pub fn new(keywords: &SmsKeywords) -> RiskResult<Self> {
        let fold = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        Ok(Self {
            extractor: AmountExtractor::new(&keywords.currency_unit)?,
            loan: fold(&keywords.loan),
            credit: fold(&keywords.credit),
            missed_payment: fold(&keywords.missed_payment),
        })
    }

    /// Classify one message body.
    ///
    /// Only messages quoting a currency amount carry a signal. Loan wording
    /// takes precedence over balance wording; the missed-payment check is
    /// independent of both.
    pub fn analyze(&self, body: &str) -> SmsSignals {
        let message = body.to_lowercase();
        let Some(amount) = self.extractor.max_amount(&message) else {
            return SmsSignals::default();
        };

        let mentions = |words: &[String]| words.iter().any(|w| message.contains(w.as_str()));
        let loan = mentions(&self.loan);
        SmsSignals {
            max_amount: Some(amount),
            loan,
            credit: !loan && mentions(&self.credit),
            missed_payment: mentions(&self.missed_payment),
        }
    }
}

impl Default for SmsSignalRules {
    fn default() -> Self {
        let keywords = SmsKeywords::default();
        Self {
            extractor: AmountExtractor::default(),
            loan: keywords.loan,
            credit: keywords.credit,
            missed_payment: keywords.missed_payment,
        }
    }
}
