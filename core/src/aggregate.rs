//! Log aggregation: one summary per log category per user.
//!
//! Aggregates accumulate across every device a user owns:
//!   - earliest timestamps take the minimum
//!   - latest timestamps take the maximum
//!   - counterparty sets are unioned
//!   - counts are summed, flags are OR-ed, amounts take the maximum
//!
//! `merge` is commutative and associative, so device order never
//! changes the result. A category with no records produces an empty
//! feature mapping rather than an error.

use crate::{
    records::{CallRecord, ContactRecord, LogCategory, SmsRecord, UserLogs},
    sms_signals::SmsSignalRules,
    types::{Timestamp, UserId},
};
use log::debug;
use std::collections::{BTreeMap, HashSet};

/// Feature name → raw value for one category.
pub type CategoryFeatures = BTreeMap<&'static str, i64>;

fn min_ts(a: Option<Timestamp>, b: Option<Timestamp>) -> Option<Timestamp> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) | (None, x) => x,
    }
}

fn max_ts(a: Option<Timestamp>, b: Option<Timestamp>) -> Option<Timestamp> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) | (None, x) => x,
    }
}

// ── Calls ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallAggregate {
    pub earliest: Option<Timestamp>,
    pub latest: Option<Timestamp>,
    pub counterparties: HashSet<String>,
    pub total: i64,
}

impl CallAggregate {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CallRecord>) -> Self {
        let mut agg = Self::default();
        for r in records {
            agg.absorb(r);
        }
        agg
    }

    pub fn absorb(&mut self, record: &CallRecord) {
        self.earliest = min_ts(self.earliest, Some(record.timestamp));
        self.latest = max_ts(self.latest, Some(record.timestamp));
        self.counterparties.insert(record.counterparty.clone());
        self.total += 1;
    }

    pub fn merge(&mut self, other: &Self) {
        self.earliest = min_ts(self.earliest, other.earliest);
        self.latest = max_ts(self.latest, other.latest);
        self.counterparties.extend(other.counterparties.iter().cloned());
        self.total += other.total;
    }

    pub fn features(&self) -> CategoryFeatures {
        if self.total == 0 {
            return CategoryFeatures::new();
        }
        BTreeMap::from([
            ("earliest_call", self.earliest.unwrap_or(0)),
            ("latest_call", self.latest.unwrap_or(0)),
            ("unique_calls", self.counterparties.len() as i64),
            ("total_calls", self.total),
        ])
    }
}

// ── Contacts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactAggregate {
    pub last_contacted: Timestamp,
    pub max_times_contacted: i64,
    pub total: i64,
    pub with_phone: i64,
}

impl ContactAggregate {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ContactRecord>) -> Self {
        let mut agg = Self::default();
        for r in records {
            agg.absorb(r);
        }
        agg
    }

    pub fn absorb(&mut self, record: &ContactRecord) {
        self.last_contacted = self.last_contacted.max(record.last_contacted);
        self.max_times_contacted = self.max_times_contacted.max(record.times_contacted);
        self.total += 1;
        if record.has_phone_number() {
            self.with_phone += 1;
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.last_contacted = self.last_contacted.max(other.last_contacted);
        self.max_times_contacted = self.max_times_contacted.max(other.max_times_contacted);
        self.total += other.total;
        self.with_phone += other.with_phone;
    }

    pub fn features(&self) -> CategoryFeatures {
        if self.total == 0 {
            return CategoryFeatures::new();
        }
        BTreeMap::from([
            ("last_time_contacted", self.last_contacted),
            ("max_times_contacted", self.max_times_contacted),
            ("unique_contacts", self.total),
            ("unique_contacts_with_phone", self.with_phone),
        ])
    }
}

// ── SMS ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmsAggregate {
    pub earliest: Option<Timestamp>,
    pub latest: Option<Timestamp>,
    pub counterparties: HashSet<String>,
    pub total: i64,
    pub loaned_before: bool,
    pub max_loan: i64,
    pub credit_before: bool,
    pub max_credit: i64,
    pub missed_payment: bool,
}

impl SmsAggregate {
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a SmsRecord>,
        rules: &SmsSignalRules,
    ) -> Self {
        let mut agg = Self::default();
        for r in records {
            agg.absorb(r, rules);
        }
        agg
    }

    pub fn absorb(&mut self, record: &SmsRecord, rules: &SmsSignalRules) {
        self.earliest = min_ts(self.earliest, Some(record.timestamp));
        self.latest = max_ts(self.latest, Some(record.timestamp));
        self.counterparties.insert(record.counterparty.clone());
        self.total += 1;

        let signals = rules.analyze(&record.body);
        let amount = signals.max_amount.unwrap_or(0);
        if signals.loan {
            self.loaned_before = true;
            self.max_loan = self.max_loan.max(amount);
        } else if signals.credit {
            self.credit_before = true;
            self.max_credit = self.max_credit.max(amount);
        }
        self.missed_payment |= signals.missed_payment;
    }

    pub fn merge(&mut self, other: &Self) {
        self.earliest = min_ts(self.earliest, other.earliest);
        self.latest = max_ts(self.latest, other.latest);
        self.counterparties.extend(other.counterparties.iter().cloned());
        self.total += other.total;
        self.loaned_before |= other.loaned_before;
        self.max_loan = self.max_loan.max(other.max_loan);
        self.credit_before |= other.credit_before;
        self.max_credit = self.max_credit.max(other.max_credit);
        self.missed_payment |= other.missed_payment;
    }

    pub fn features(&self) -> CategoryFeatures {
        if self.total == 0 {
            return CategoryFeatures::new();
        }
        BTreeMap::from([
            ("earliest_sms", self.earliest.unwrap_or(0)),
            ("latest_sms", self.latest.unwrap_or(0)),
            ("unique_sms", self.counterparties.len() as i64),
            ("total_sms", self.total),
            ("probable_loaned_before", self.loaned_before as i64),
            ("probable_max_loan", self.max_loan),
            ("probable_credit_before", self.credit_before as i64),
            ("probable_max_credit", self.max_credit),
            ("probable_missed_payment", self.missed_payment as i64),
        ])
    }
}

// ── Per-user ─────────────────────────────────────────────────────────────────

/// All three category aggregates for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAggregates {
    pub user_id: UserId,
    pub calls: CallAggregate,
    pub contacts: ContactAggregate,
    pub sms: SmsAggregate,
    /// Number of records or files skipped while reading this user's logs.
    pub skipped: usize,
}

impl UserAggregates {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self { user_id: user_id.into(), ..Default::default() }
    }

    pub fn merge(&mut self, other: &Self) {
        self.calls.merge(&other.calls);
        self.contacts.merge(&other.contacts);
        self.sms.merge(&other.sms);
        self.skipped += other.skipped;
    }

    pub fn has_data(&self) -> bool {
        self.calls.total + self.contacts.total + self.sms.total > 0
    }

    pub fn category_features(&self, category: LogCategory) -> CategoryFeatures {
        match category {
            LogCategory::Calls => self.calls.features(),
            LogCategory::Contacts => self.contacts.features(),
            LogCategory::Sms => self.sms.features(),
        }
    }

    /// Per-category features in `LogCategory::ALL` order.
    pub fn all_category_features(&self) -> Vec<CategoryFeatures> {
        LogCategory::ALL.iter().map(|c| self.category_features(*c)).collect()
    }
}

/// Turns a user's raw logs into per-category aggregates.
#[derive(Debug, Clone, Default)]
pub struct LogAggregator {
    rules: SmsSignalRules,
}

impl LogAggregator {
    pub fn new(rules: SmsSignalRules) -> Self {
        Self { rules }
    }

    pub fn aggregate(&self, logs: &UserLogs) -> UserAggregates {
        let mut out = UserAggregates::new(logs.user_id.clone());
        out.skipped = logs.skipped.len();

        for device in &logs.devices {
            let mut per_device = UserAggregates::new(logs.user_id.clone());
            per_device.calls = CallAggregate::from_records(&device.calls);
            per_device.contacts = ContactAggregate::from_records(&device.contacts);
            per_device.sms = SmsAggregate::from_records(&device.sms, &self.rules);
            debug!(
                "aggregated user={} device={} calls={} contacts={} sms={}",
                logs.user_id,
                device.device,
                per_device.calls.total,
                per_device.contacts.total,
                per_device.sms.total
            );
            out.merge(&per_device);
        }
        out
    }
}
