//! Raw device-log records, one struct per log category.
//!
//! Records are decoded from the JSON arrays found under each device
//! directory. They are read once per run and never persisted.

use crate::{
    error::RiskError,
    types::{DeviceId, Timestamp, UserId},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    Calls,
    Contacts,
    Sms,
}

impl LogCategory {
    pub const ALL: [LogCategory; 3] = [LogCategory::Calls, LogCategory::Contacts, LogCategory::Sms];

    /// Subdirectory name under a device directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Calls => "call_log",
            Self::Contacts => "contact_list",
            Self::Sms => "sms_log",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(rename = "datetime", deserialize_with = "lenient_i64")]
    pub timestamp: Timestamp,
    #[serde(rename = "phone_number")]
    pub counterparty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(rename = "last_time_contacted", deserialize_with = "lenient_i64")]
    pub last_contacted: Timestamp,
    #[serde(rename = "times_contacted", deserialize_with = "lenient_i64")]
    pub times_contacted: i64,
    #[serde(rename = "phone_numbers", default, deserialize_with = "phone_list")]
    pub phone_numbers: Vec<serde_json::Value>,
}

impl ContactRecord {
    pub fn has_phone_number(&self) -> bool {
        !self.phone_numbers.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsRecord {
    #[serde(rename = "datetime", deserialize_with = "lenient_i64")]
    pub timestamp: Timestamp,
    #[serde(rename = "sms_address")]
    pub counterparty: String,
    #[serde(rename = "message_body", default)]
    pub body: String,
}

/// Devices export timestamps and counts either as JSON numbers or as
/// numeric strings.
fn lenient_i64<'de, D: Deserializer<'de>>(de: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrText {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match NumOrText::deserialize(de)? {
        NumOrText::Int(v) => Ok(v),
        NumOrText::Float(v) if v.is_finite() => Ok(v as i64),
        NumOrText::Float(v) => Err(serde::de::Error::custom(format!("non-finite number {v}"))),
        NumOrText::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| serde::de::Error::custom(format!("'{s}' is not an integer: {e}"))),
    }
}

fn phone_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<serde_json::Value>, D::Error> {
    Ok(Option::<Vec<serde_json::Value>>::deserialize(de)?.unwrap_or_default())
}

// ── Per-user containers ──────────────────────────────────────────────────────

/// All records read from one device directory.
#[derive(Debug, Clone, Default)]
pub struct DeviceLogs {
    pub device: DeviceId,
    pub calls: Vec<CallRecord>,
    pub contacts: Vec<ContactRecord>,
    pub sms: Vec<SmsRecord>,
}

impl DeviceLogs {
    pub fn new(device: impl Into<DeviceId>) -> Self {
        Self { device: device.into(), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.contacts.is_empty() && self.sms.is_empty()
    }
}

/// Everything read for one user, across all of their devices.
#[derive(Debug, Default)]
pub struct UserLogs {
    pub user_id: UserId,
    pub devices: Vec<DeviceLogs>,
    /// Records, files or directories that could not be read and were skipped.
    pub skipped: Vec<RiskError>,
}

impl UserLogs {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self { user_id: user_id.into(), ..Default::default() }
    }

    pub fn with_device(mut self, device: DeviceLogs) -> Self {
        self.devices.push(device);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.devices.iter().all(DeviceLogs::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_record_accepts_string_timestamp() {
        let rec: CallRecord =
            serde_json::from_str(r#"{"datetime": "1450000000", "phone_number": "+254700"}"#).unwrap();
        assert_eq!(rec.timestamp, 1_450_000_000);
    }

    #[test]
    fn contact_with_null_phone_numbers_has_no_phone() {
        let rec: ContactRecord = serde_json::from_str(
            r#"{"last_time_contacted": 5, "times_contacted": 2, "phone_numbers": null}"#,
        )
        .unwrap();
        assert!(!rec.has_phone_number());
    }

    #[test]
    fn sms_missing_address_is_rejected() {
        let res = serde_json::from_str::<SmsRecord>(r#"{"datetime": 1, "message_body": "hi"}"#);
        assert!(res.is_err());
    }
}
