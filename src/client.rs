use anyhow::Context;
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

use crate::config::Config;
use crate::payload::SendableResults;
use crate::utils::status_code_help;

pub const TESTRAIL_API_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
const API_PATH_PREFIX: &str = "index.php?/";

// Tokio-retry uses base ^ retry * factor formula.
// This will give us 8ms, 64ms, 512ms, 4096ms, 32768ms
const RETRY_BASE_MS: u64 = 8;
const RETRY_FACTOR: u64 = 1;
const RETRY_COUNT: usize = 5;

/// Non-2xx answer from TestRail. Displays as `"400 Bad Request: <body>"`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status}: {body}")]
pub struct StatusError {
    pub status: StatusCode,
    pub body: String,
}

/// A result row as returned by `add_results_for_cases`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct AddedResult {
    pub id: u64,
    #[serde(default)]
    pub test_id: Option<u64>,
    #[serde(default)]
    pub status_id: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub elapsed: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Case {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub updated_on: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
}

/// `get_cases` answers with a bare array on older TestRail versions and with
/// a paginated object on newer ones.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum CasesPage {
    Bulk(Vec<Case>),
    Paginated {
        cases: Vec<Case>,
        #[serde(rename = "_links", default)]
        links: PageLinks,
    },
}

/// The part of the TestRail API the result upload depends on.
#[allow(async_fn_in_trait)]
pub trait ResultsApi {
    async fn add_results_for_cases(
        &self,
        run_id: u64,
        results: &SendableResults,
    ) -> anyhow::Result<Vec<AddedResult>>;
}

pub struct TestRailClient {
    host: String,
    username: String,
    token: String,
    client: Client,
}

impl TestRailClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.append(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let client = Client::builder()
            .timeout(TESTRAIL_API_TIMEOUT)
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            host: config.api_address.clone(),
            username: config.username.clone(),
            token: config.token.clone(),
            client,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}{}",
            self.host,
            API_PATH_PREFIX,
            endpoint.trim_start_matches('/')
        )
    }

    pub async fn get_cases(&self, project_id: u64, suite_id: u64) -> anyhow::Result<Vec<Case>> {
        let mut cases = Vec::new();
        let mut next = Some(format!(
            "/api/v2/get_cases/{}&suite_id={}",
            project_id, suite_id
        ));

        while let Some(endpoint) = next.take() {
            let url = self.url(&endpoint);
            let page = RetryIf::spawn(
                default_delay(),
                || self.get_cases_page(&url),
                should_retry,
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to get cases for project {} suite {}",
                    project_id, suite_id
                )
            })?;

            match page {
                CasesPage::Bulk(page_cases) => cases.extend(page_cases),
                CasesPage::Paginated {
                    cases: page_cases,
                    links,
                } => {
                    cases.extend(page_cases);
                    next = links.next;
                }
            }
        }

        log::debug!("Fetched {} case(s)", cases.len());
        Ok(cases)
    }

    async fn get_cases_page(&self, url: &str) -> anyhow::Result<CasesPage> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .await?;

        check_status(response)
            .await?
            .json::<CasesPage>()
            .await
            .context("Failed to get response body as json")
    }
}

impl ResultsApi for TestRailClient {
    async fn add_results_for_cases(
        &self,
        run_id: u64,
        results: &SendableResults,
    ) -> anyhow::Result<Vec<AddedResult>> {
        let url = self.url(&format!("/api/v2/add_results_for_cases/{}", run_id));
        log::debug!("POST {} with {} result(s)", url, results.len());

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.token))
            .json(results)
            .send()
            .await
            .with_context(|| format!("Failed to add results to run {}", run_id))?;

        check_status(response)
            .await
            .with_context(|| format!("Failed to add results to run {}", run_id))?
            .json::<Vec<AddedResult>>()
            .await
            .context("Failed to get response body as json")
    }
}

async fn check_status(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    log::debug!("TestRail answered {}: {}", status, body);
    if status.is_client_error() && status != StatusCode::BAD_REQUEST {
        log::warn!("{}", status_code_help(status));
    }
    Err(StatusError { status, body }.into())
}

fn should_retry(error: &anyhow::Error) -> bool {
    error.chain().all(|cause| {
        if let Some(status_error) = cause.downcast_ref::<StatusError>() {
            !status_error.status.is_client_error()
        } else if let Some(reqwest_error) = cause.downcast_ref::<reqwest::Error>() {
            !reqwest_error.is_decode() && !reqwest_error.is_builder()
        } else {
            true
        }
    })
}

fn default_delay() -> std::iter::Take<ExponentialBackoff> {
    ExponentialBackoff::from_millis(RETRY_BASE_MS)
        .factor(RETRY_FACTOR)
        .take(RETRY_COUNT)
}
