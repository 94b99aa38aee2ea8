use std::path::PathBuf;

use chrono::Utc;

use crate::cache::CaseCache;
use crate::client::TestRailClient;
use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub project_id: u64,
    pub suite_id: u64,
    pub file: Option<PathBuf>,
}

impl DownloadOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id == 0 {
            return Err(ConfigError::ZeroValue("project-id"));
        }
        if self.suite_id == 0 {
            return Err(ConfigError::ZeroValue("suite-id"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Unchanged,
    Written { path: PathBuf, updated: usize },
    /// No output file was given; the refreshed cache is returned as YAML.
    Printed { yaml: String, updated: usize },
}

pub async fn run_download(
    client: &TestRailClient,
    options: &DownloadOptions,
) -> anyhow::Result<DownloadOutcome> {
    options.validate()?;

    let mut cache = match &options.file {
        Some(path) => CaseCache::load_or_new(path, options.project_id, options.suite_id)?,
        None => CaseCache::new(options.project_id, options.suite_id),
    };

    let cases = client
        .get_cases(options.project_id, options.suite_id)
        .await
        .map_err(|e| e.context("Error getting cases"))?;
    let updated = cache.merge_cases(&cases, Utc::now())?;
    log::info!(
        "{} of {} case(s) changed since {}",
        updated,
        cases.len(),
        cache.last_updated
    );

    if updated == 0 {
        return Ok(DownloadOutcome::Unchanged);
    }

    match &options.file {
        Some(path) => {
            cache.save(path)?;
            log::info!("Wrote {} case(s) to {}", cache.cases.len(), path.display());
            Ok(DownloadOutcome::Written {
                path: path.clone(),
                updated,
            })
        }
        None => Ok(DownloadOutcome::Printed {
            yaml: cache.to_yaml()?,
            updated,
        }),
    }
}
