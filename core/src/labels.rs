//! Bad-loanee label source.
//!
//! Relevant lines look like `#<key: value, key: value, ...>`. The value of
//! the `User id` key names a delinquent borrower; every other user is good.

use crate::{
    error::{RiskError, RiskResult},
    types::{Label, UserId},
};
use std::collections::HashSet;
use std::path::Path;

const USER_ID_KEY: &str = "User id";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    bad: HashSet<UserId>,
}

impl LabelMap {
    pub fn from_bad<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<UserId>,
    {
        Self { bad: ids.into_iter().map(Into::into).collect() }
    }

    pub fn label_for(&self, user_id: &str) -> Label {
        if self.bad.contains(user_id) { Label::Bad } else { Label::Good }
    }

    pub fn bad_count(&self) -> usize {
        self.bad.len()
    }
}

pub fn parse_bad_loanees(text: &str) -> LabelMap {
    let bad = text
        .lines()
        .filter_map(|line| line.trim_end().strip_prefix("#<")?.strip_suffix('>'))
        .flat_map(|body| body.split(','))
        .filter_map(|pair| pair.split_once(": "))
        .filter(|(k, _)| k.trim() == USER_ID_KEY)
        .map(|(_, v)| v.trim().trim_matches('"').trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    LabelMap { bad }
}

pub fn load_bad_loanees(path: impl AsRef<Path>) -> RiskResult<LabelMap> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| RiskError::io(path, e))?;
    Ok(parse_bad_loanees(&text))
}
