use lazy_static::lazy_static;
use regex::Regex;

use crate::case_id::{CaseId, ExtractionError};

lazy_static! {
    static ref UNKNOWN_CASE_REGEX: Regex = Regex::new(r"case C([0-9]+) unknown").unwrap();
}

/// Reads the case ids a failed submission was rejected for.
///
/// An empty result means the error is not a rejection and cannot be recovered
/// from by dropping cases.
pub trait RejectionParser {
    fn rejected_cases(&self, error_text: &str) -> Result<Vec<CaseId>, ExtractionError>;
}

/// TestRail answers `400 Bad Request` with `case C<id> unknown` for every case
/// that is not part of the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownCaseRejection;

impl RejectionParser for UnknownCaseRejection {
    fn rejected_cases(&self, error_text: &str) -> Result<Vec<CaseId>, ExtractionError> {
        UNKNOWN_CASE_REGEX
            .captures_iter(error_text)
            .filter_map(|caps| caps.get(1))
            .map(|digits| CaseId::parse_digits(digits.as_str(), error_text))
            .collect()
    }
}
