use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::spawn;
use trailer::client::AddedResult;
use trailer::config::Config;
use trailer::payload::SendableResults;

const ADD_RESULTS_FOR_CASES: &str = "/api/v2/add_results_for_cases/";
const GET_CASES: &str = "/api/v2/get_cases/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    AddResultsForCases {
        run_id: u64,
        results: SendableResults,
        authorization: Option<String>,
    },
    GetCases(String),
}

#[derive(Debug, Default)]
pub struct MockServerState {
    pub requests: Mutex<Vec<RequestPayload>>,
    pub host: String,
    add_results_responses: Mutex<VecDeque<(StatusCode, String)>>,
    cases_responses: HashMap<String, String>,
}

impl MockServerState {
    #[allow(dead_code)]
    pub fn config(&self) -> Config {
        Config {
            username: String::from("user@example.com"),
            token: String::from("test-token"),
            api_address: self.host.clone(),
        }
    }

    /// Case ids of every `add_results_for_cases` request, in request order.
    #[allow(dead_code)]
    pub fn submitted_case_ids(&self) -> Vec<Vec<u64>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter_map(|request| match request {
                RequestPayload::AddResultsForCases { results, .. } => Some(
                    results
                        .results
                        .iter()
                        .map(|result| result.case_id.get())
                        .collect(),
                ),
                RequestPayload::GetCases(_) => None,
            })
            .collect()
    }
}

pub type SharedMockServerState = Arc<MockServerState>;

#[derive(Debug, Default)]
pub struct MockServerBuilder {
    add_results_responses: VecDeque<(StatusCode, String)>,
    cases_responses: HashMap<String, String>,
}

#[allow(dead_code)]
impl MockServerBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Queues an answer for the next `add_results_for_cases` call. Once the
    /// queue is empty every submitted result is accepted.
    pub fn add_results_response<T: Into<String>>(mut self, status: StatusCode, body: T) -> Self {
        self.add_results_responses.push_back((status, body.into()));
        self
    }

    /// Serves `body` for the `get_cases` request whose query is `query`.
    pub fn cases_response<Q: Into<String>, B: Into<String>>(mut self, query: Q, body: B) -> Self {
        self.cases_responses.insert(query.into(), body.into());
        self
    }

    /// NOTE: must use a multithreaded executor to have the server run while running tests
    pub async fn spawn_mock_server(self) -> SharedMockServerState {
        let listener = TcpListener::bind("localhost:0").await.unwrap();
        let random_port = listener.local_addr().unwrap().port();
        let host = format!("http://localhost:{random_port}");

        let state = Arc::new(MockServerState {
            host,
            add_results_responses: Mutex::new(self.add_results_responses),
            cases_responses: self.cases_responses,
            ..Default::default()
        });

        let app = Router::new().route("/index.php", any(testrail_handler));

        let spawn_state = state.clone();
        spawn(async move {
            axum::serve(listener, app.with_state(spawn_state))
                .await
                .unwrap();
        });

        state
    }
}

fn json_response(status: StatusCode, body: String) -> Response<String> {
    let mut res = Response::new(body);
    *res.status_mut() = status;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    res
}

fn accept_all(results: &SendableResults) -> String {
    let accepted: Vec<AddedResult> = results
        .results
        .iter()
        .enumerate()
        .map(|(i, result)| AddedResult {
            id: i as u64 + 1,
            test_id: Some(result.case_id.get() + 1000),
            status_id: Some(result.status_id),
            comment: Some(result.comment.clone()),
            elapsed: result.elapsed.clone(),
        })
        .collect();
    serde_json::to_string(&accepted).unwrap()
}

async fn testrail_handler(
    State(state): State<SharedMockServerState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response<String> {
    let query = query.unwrap_or_default();

    if let Some(run_id) = query.strip_prefix(ADD_RESULTS_FOR_CASES) {
        let results: SendableResults = serde_json::from_slice(&body).unwrap();
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        state
            .requests
            .lock()
            .unwrap()
            .push(RequestPayload::AddResultsForCases {
                run_id: run_id.parse().unwrap(),
                results: results.clone(),
                authorization,
            });
        let answer = state.add_results_responses.lock().unwrap().pop_front();
        return match answer {
            Some((status, body)) => json_response(status, body),
            None => json_response(StatusCode::OK, accept_all(&results)),
        };
    }

    if query.starts_with(GET_CASES) {
        state
            .requests
            .lock()
            .unwrap()
            .push(RequestPayload::GetCases(query.clone()));
        if let Some(body) = state.cases_responses.get(&query) {
            return json_response(StatusCode::OK, body.clone());
        }
    }

    json_response(
        StatusCode::NOT_FOUND,
        String::from(r#"{ "error": "not found" }"#),
    )
}
