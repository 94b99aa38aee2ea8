use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::CASE_ID_MARKER;

lazy_static! {
    static ref CASE_ID_REGEX: Regex = Regex::new(&format!(
        "{}([0-9]+)",
        regex::escape(CASE_ID_MARKER)
    ))
    .unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("failed to convert case ID {digits:?} to an integer (test: {source_text:?})")]
    InvalidNumber { digits: String, source_text: String },
}

/// Numeric id of a TestRail case. Rendered as `C<id>`, as TestRail does.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CaseId(u64);

impl CaseId {
    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn parse_digits(digits: &str, source_text: &str) -> Result<Self, ExtractionError> {
        digits
            .parse::<u64>()
            .map(CaseId)
            .map_err(|_| ExtractionError::InvalidNumber {
                digits: digits.to_string(),
                source_text: source_text.to_string(),
            })
    }
}

#[cfg(test)]
impl From<u64> for CaseId {
    fn from(id: u64) -> Self {
        CaseId(id)
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Every case id embedded in `name`, in order of appearance.
pub fn extract_case_ids(name: &str) -> Result<Vec<CaseId>, ExtractionError> {
    CASE_ID_REGEX
        .captures_iter(name)
        .filter_map(|caps| caps.get(1))
        .map(|digits| CaseId::parse_digits(digits.as_str(), name))
        .collect()
}
