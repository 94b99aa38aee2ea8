use std::collections::BTreeMap;
use std::time::Duration;

use crate::case_id::{extract_case_ids, CaseId, ExtractionError};
use crate::junit::{Failure, TestCase, TestSuite};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

/// Final status of one case after all of its observations were merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub status: Status,
    pub message: String,
    pub elapsed: Duration,
}

impl OutcomeRecord {
    pub fn passed(elapsed: Duration) -> Self {
        Self {
            status: Status::Passed,
            message: String::new(),
            elapsed,
        }
    }

    pub fn skipped(elapsed: Duration) -> Self {
        Self {
            status: Status::Skipped,
            message: String::new(),
            elapsed,
        }
    }

    pub fn failed(message: String, elapsed: Duration) -> Self {
        Self {
            status: Status::Failed,
            message,
            elapsed,
        }
    }

    /// A failure marker beats a skip marker, which beats the passing default.
    pub fn from_test_case(comment: &str, case: &TestCase) -> Self {
        let elapsed = case.elapsed();
        if let Some(failure) = case.failure() {
            Self::failed(failure_comment(comment, failure), elapsed)
        } else if case.is_skipped() {
            Self::skipped(elapsed)
        } else {
            Self::passed(elapsed)
        }
    }
}

fn failure_comment(comment: &str, failure: &Failure) -> String {
    format!("{}\n\n{}", comment, failure.description())
}

/// Results waiting to be sent to TestRail, keyed by case id.
///
/// Keys iterate in ascending order so payloads come out sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingResults {
    results: BTreeMap<CaseId, OutcomeRecord>,
}

impl PendingResults {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, case_id: CaseId) -> Option<&OutcomeRecord> {
        self.results.get(&case_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CaseId, &OutcomeRecord)> {
        self.results.iter().map(|(id, record)| (*id, record))
    }

    pub fn case_ids(&self) -> Vec<CaseId> {
        self.results.keys().copied().collect()
    }

    /// Merges one observation. A stored failure is never replaced; anything
    /// else is overwritten by the newer observation. Returns whether the
    /// observation was kept.
    pub fn add_outcome(&mut self, case_id: CaseId, record: OutcomeRecord) -> bool {
        if let Some(existing) = self.results.get(&case_id) {
            if existing.status == Status::Failed {
                log::debug!(
                    "Keeping earlier failure for {}, discarding {:?}",
                    case_id,
                    record.status
                );
                return false;
            }
        }
        self.results.insert(case_id, record);
        true
    }

    /// Merges every tagged test case in `suites`.
    ///
    /// Case ids are extracted for the whole tree before anything is merged, so
    /// an extraction error leaves the set untouched. Returns the number of
    /// observations that were seen.
    pub fn add_suites(
        &mut self,
        comment: &str,
        suites: &[TestSuite],
    ) -> Result<usize, ExtractionError> {
        let mut observations = Vec::new();
        for suite in suites {
            for case in &suite.cases {
                let case_ids = extract_case_ids(&case.name)?;
                if case_ids.is_empty() {
                    log::debug!("No case id in {} -> {}", suite.name, case.name);
                    continue;
                }
                let record = OutcomeRecord::from_test_case(comment, case);
                observations.extend(case_ids.into_iter().map(|id| (id, record.clone())));
            }
        }

        let seen = observations.len();
        for (case_id, record) in observations {
            self.add_outcome(case_id, record);
        }
        Ok(seen)
    }

    pub fn remove_result(&mut self, case_id: CaseId) -> Option<OutcomeRecord> {
        self.results.remove(&case_id)
    }
}
