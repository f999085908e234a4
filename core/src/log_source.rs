//! Reads the per-user, per-device log directory tree.
//!
//! Layout: `<root>/<user_id>/<device>/{call_log,contact_list,sms_log}/*`,
//! each file a JSON array of records. A missing category directory is
//! simply empty. A file that is not a JSON array, or a single record that
//! fails to decode, is skipped and reported in `UserLogs::skipped`.
//!
//! RULE: Only a missing user directory fails `load_user`.
//! A device or category directory that cannot be listed is reported in
//! `UserLogs::skipped` and the rest of the user's logs still load.

use crate::{
    error::{RiskError, RiskResult},
    records::{DeviceLogs, LogCategory, UserLogs},
};
use log::warn;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct LogSource {
    root: PathBuf,
}

fn sorted_entries(dir: &Path, want_dirs: bool) -> RiskResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| RiskError::io(dir, e))? {
        let entry = entry.map_err(|e| RiskError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() == want_dirs {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn is_not_found(err: &RiskError) -> bool {
    matches!(err, RiskError::Io { source, .. } if source.kind() == ErrorKind::NotFound)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl LogSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// User directory names, sorted.
    pub fn list_users(&self) -> RiskResult<Vec<String>> {
        Ok(sorted_entries(&self.root, true)?
            .iter()
            .map(|p| file_name(p))
            .collect())
    }

    pub fn load_user(&self, user_id: &str) -> RiskResult<UserLogs> {
        let user_dir = self.root.join(user_id);
        let mut logs = UserLogs::new(user_id);

        let device_dirs = match sorted_entries(&user_dir, true) {
            Ok(dirs) => dirs,
            Err(err) if is_not_found(&err) => return Err(err),
            Err(err) => {
                warn!("skipping devices of user={user_id}: {err}");
                logs.skipped.push(err);
                return Ok(logs);
            }
        };

        for device_dir in device_dirs {
            let mut device = DeviceLogs::new(file_name(&device_dir));
            let mut reader = CategoryReader { user_id, device: &device.device, skipped: &mut logs.skipped };
            device.calls = reader.read(&device_dir, LogCategory::Calls);
            device.contacts = reader.read(&device_dir, LogCategory::Contacts);
            device.sms = reader.read(&device_dir, LogCategory::Sms);
            logs.devices.push(device);
        }
        Ok(logs)
    }
}

struct CategoryReader<'a> {
    user_id: &'a str,
    device: &'a str,
    skipped: &'a mut Vec<RiskError>,
}

impl CategoryReader<'_> {
    /// Records of one category. Never fails: anything unreadable is
    /// pushed to `skipped` and the records read so far are returned.
    fn read<T: DeserializeOwned>(&mut self, device_dir: &Path, category: LogCategory) -> Vec<T> {
        let dir = device_dir.join(category.dir_name());
        let files = match sorted_entries(&dir, false) {
            Ok(files) => files,
            Err(err) if is_not_found(&err) => return Vec::new(),
            Err(err) => {
                warn!("skipping {category} of user={} device={}: {err}", self.user_id, self.device);
                self.skipped.push(err);
                return Vec::new();
            }
        };

        let (user_id, device) = (self.user_id, self.device);
        let mut records = Vec::new();
        for file in files {
            let name = file_name(&file);
            let malformed = |reason: String| RiskError::MalformedRecord {
                user_id: user_id.to_string(),
                device: device.to_string(),
                category: category.to_string(),
                file: name.clone(),
                reason,
            };

            let content = match fs::read_to_string(&file) {
                Ok(c) => c,
                Err(e) => {
                    let err = malformed(format!("unreadable: {e}"));
                    warn!("skipping file: {err}");
                    self.skipped.push(err);
                    continue;
                }
            };
            let raw: Vec<serde_json::Value> = match serde_json::from_str(&content) {
                Ok(v) => v,
                Err(e) => {
                    let err = malformed(format!("not a JSON array of records: {e}"));
                    warn!("skipping file: {err}");
                    self.skipped.push(err);
                    continue;
                }
            };

            for (i, value) in raw.into_iter().enumerate() {
                match serde_json::from_value::<T>(value) {
                    Ok(rec) => records.push(rec),
                    Err(e) => {
                        let err = malformed(format!("record #{i}: {e}"));
                        warn!("skipping record: {err}");
                        self.skipped.push(err);
                    }
                }
            }
        }
        records
    }
}
