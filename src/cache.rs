use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::Case;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Error reading file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Error writing suite data to output file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Error unmarshaling suite data: {0}")]
    Decode(#[source] serde_yaml::Error),
    #[error("Error marshaling suite data: {0}")]
    Encode(#[source] serde_yaml::Error),
    #[error("Error parsing last_updated time {0:?}: {1}")]
    LastUpdated(String, #[source] chrono::ParseError),
}

/// Case titles of one TestRail suite, refreshed incrementally by `download`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CaseCache {
    pub project_id: u64,
    pub suite_id: u64,
    pub last_updated: String,
    #[serde(default)]
    pub cases: BTreeMap<u64, String>,
}

impl CaseCache {
    pub fn new(project_id: u64, suite_id: u64) -> Self {
        Self {
            project_id,
            suite_id,
            last_updated: format_timestamp(DateTime::<Utc>::UNIX_EPOCH),
            cases: BTreeMap::new(),
        }
    }

    /// Loads the cache at `path`, or starts an empty one when the file does
    /// not exist or belongs to another project or suite.
    pub fn load_or_new(path: &Path, project_id: u64, suite_id: u64) -> Result<Self, CacheError> {
        if !path.exists() {
            return Ok(Self::new(project_id, suite_id));
        }
        let data = std::fs::read_to_string(path).map_err(|source| CacheError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cache = Self::from_yaml(&data)?;
        if cache.project_id != project_id || cache.suite_id != suite_id {
            log::warn!(
                "Ignoring cache for project {} suite {} in {}",
                cache.project_id,
                cache.suite_id,
                path.display()
            );
            return Ok(Self::new(project_id, suite_id));
        }
        Ok(cache)
    }

    pub fn from_yaml(data: &str) -> Result<Self, CacheError> {
        serde_yaml::from_str(data).map_err(CacheError::Decode)
    }

    pub fn to_yaml(&self) -> Result<String, CacheError> {
        serde_yaml::to_string(self).map_err(CacheError::Encode)
    }

    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        std::fs::write(path, self.to_yaml()?).map_err(|source| CacheError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn last_updated(&self) -> Result<DateTime<Utc>, CacheError> {
        DateTime::parse_from_rfc3339(&self.last_updated)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| CacheError::LastUpdated(self.last_updated.clone(), e))
    }

    /// Stores every case modified after `last_updated`, then stamps the cache
    /// with `now` if anything was stored. Returns the number of cases stored.
    pub fn merge_cases(&mut self, cases: &[Case], now: DateTime<Utc>) -> Result<usize, CacheError> {
        let last_updated = self.last_updated()?;
        let mut updated = 0;
        for case in cases {
            let updated_on = DateTime::from_timestamp(case.updated_on, 0).unwrap_or_default();
            if last_updated < updated_on {
                self.cases.insert(case.id, case.title.clone());
                updated += 1;
            }
        }
        if updated > 0 {
            self.last_updated = format_timestamp(now);
        }
        Ok(updated)
    }
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
