use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::case_id::ExtractionError;
use crate::client::{AddedResult, ResultsApi, StatusError};
use crate::config::ConfigError;
use crate::junit;
use crate::payload::{build_payload, SendableResults};
use crate::rejection::{RejectionParser, UnknownCaseRejection};
use crate::results::PendingResults;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to upload test results to TestRail: {0}")]
    Fatal(String),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// TestRail accepted a non-empty set of results.
    Succeeded {
        attempts: usize,
        results: Vec<AddedResult>,
    },
    /// Every attempt was used without TestRail accepting anything.
    Exhausted { attempts: usize },
    /// Nothing sendable was left, so no request was made.
    NothingToUpload,
    DryRun(SendableResults),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub run_id: u64,
    pub comment: String,
    pub max_attempts: usize,
    pub dry_run: bool,
    pub files: Vec<PathBuf>,
}

impl UploadOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_id == 0 {
            return Err(ConfigError::ZeroValue("run-id"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("ignore-failures"));
        }
        if self.files.is_empty() {
            return Err(ConfigError::NoInputFiles);
        }
        Ok(())
    }
}

/// Parses every report and merges the tagged cases. Any unreadable report
/// fails the whole load.
pub fn load_pending_results(comment: &str, files: &[PathBuf]) -> anyhow::Result<PendingResults> {
    let mut suites = Vec::new();
    for file in files {
        log::info!("Parsing file: {}", file.display());
        suites.extend(junit::parse_file(file)?);
    }

    let mut pending = PendingResults::new();
    let observations = pending.add_suites(comment, &suites)?;
    log::info!(
        "Found {} observation(s) for {} case(s) in {} suite(s)",
        observations,
        pending.len(),
        suites.len()
    );
    Ok(pending)
}

/// Submits `pending` to run `run_id`, dropping cases TestRail rejects as
/// unknown and resubmitting, for at most `max_attempts` requests.
pub async fn submit_with_retries<A, P>(
    api: &A,
    rejection_parser: &P,
    run_id: u64,
    max_attempts: usize,
    pending: &mut PendingResults,
) -> Result<UploadOutcome, UploadError>
where
    A: ResultsApi,
    P: RejectionParser,
{
    for attempt in 1..=max_attempts {
        let payload = build_payload(pending);
        if payload.is_empty() {
            log::warn!("No results left to upload");
            return Ok(UploadOutcome::NothingToUpload);
        }

        log::info!(
            "Uploading {} result(s) to run {} (attempt {}/{})",
            payload.len(),
            run_id,
            attempt,
            max_attempts
        );
        match api.add_results_for_cases(run_id, &payload).await {
            Ok(results) if !results.is_empty() => {
                return Ok(UploadOutcome::Succeeded {
                    attempts: attempt,
                    results,
                });
            }
            Ok(_) => log::warn!("No results uploaded"),
            Err(e) => {
                let error_text = format!("{:#}", e);
                if !is_bad_request(&e) {
                    return Err(UploadError::Fatal(error_text));
                }
                let rejected = rejection_parser.rejected_cases(&error_text)?;
                if rejected.is_empty() {
                    return Err(UploadError::Fatal(error_text));
                }
                for case_id in rejected {
                    if pending.remove_result(case_id).is_some() {
                        log::warn!("Dropping result for {}: unknown to run {}", case_id, run_id);
                    } else {
                        log::debug!("{} was rejected but has no pending result", case_id);
                    }
                }
            }
        }
    }

    Ok(UploadOutcome::Exhausted {
        attempts: max_attempts,
    })
}

/// Unknown cases are only reported with a `400 Bad Request`.
fn is_bad_request(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<StatusError>()
            .is_some_and(|status_error| status_error.status == StatusCode::BAD_REQUEST)
    })
}

pub async fn run_upload<A: ResultsApi>(
    api: &A,
    options: &UploadOptions,
) -> anyhow::Result<UploadOutcome> {
    options.validate()?;
    let mut pending = load_pending_results(&options.comment, &options.files)?;

    if options.dry_run {
        log::info!("Dry run, skipping upload.");
        return Ok(UploadOutcome::DryRun(build_payload(&pending)));
    }

    Ok(submit_with_retries(
        api,
        &UnknownCaseRejection,
        options.run_id,
        options.max_attempts,
        &mut pending,
    )
    .await?)
}
