use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::case_id::CaseId;
use crate::constants::{STATUS_ID_FAILED, STATUS_ID_PASSED, STATUS_ID_SKIPPED};
use crate::results::{OutcomeRecord, PendingResults, Status};

/// One entry of the `add_results_for_cases` request body.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SendableResult {
    pub case_id: CaseId,
    pub status_id: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct SendableResults {
    pub results: Vec<SendableResult>,
}

impl SendableResults {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn case_ids(&self) -> Vec<CaseId> {
        self.results.iter().map(|r| r.case_id).collect()
    }
}

/// Formats a duration as a TestRail timespan such as `"1h 2m 5s"`.
///
/// Rounds to the nearest second. Any non-zero duration is at least `"1s"`
/// since TestRail cannot store less. A zero duration has no timespan.
pub fn encode_elapsed(elapsed: Duration) -> Option<String> {
    if elapsed.is_zero() {
        return None;
    }
    let total = (elapsed.as_secs_f64().round() as u64).max(1);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    let parts: Vec<String> = [(hours, "h"), (minutes, "m"), (seconds, "s")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect();
    Some(parts.join(" "))
}

/// Encodes a record, or `None` for records that are never sent.
pub fn encode_result(case_id: CaseId, record: &OutcomeRecord) -> Option<SendableResult> {
    let (status_id, comment) = match record.status {
        Status::Passed => (STATUS_ID_PASSED, String::new()),
        Status::Failed => (STATUS_ID_FAILED, record.message.clone()),
        Status::Skipped => {
            log::debug!(
                "Not sending {} (status {}): skipped",
                case_id,
                STATUS_ID_SKIPPED
            );
            return None;
        }
    };
    Some(SendableResult {
        case_id,
        status_id,
        comment,
        elapsed: encode_elapsed(record.elapsed),
    })
}

pub fn build_payload(pending: &PendingResults) -> SendableResults {
    SendableResults {
        results: pending
            .iter()
            .filter_map(|(case_id, record)| encode_result(case_id, record))
            .collect(),
    }
}
