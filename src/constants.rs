pub const EXIT_SUCCESS: i32 = exitcode::OK;

pub const TESTRAIL_USERNAME_ENV: &str = "TESTRAIL_USERNAME";
pub const TESTRAIL_TOKEN_ENV: &str = "TESTRAIL_TOKEN";
pub const TESTRAIL_URL_ENV: &str = "TESTRAIL_URL";
pub const TRAILER_LOG_ENV: &str = "TRAILER_LOG";

pub const DEFAULT_ORIGIN: &str = "https://docker.testrail.com";

/// Literal that precedes a case id inside a test case name, e.g. `TestRailC1234`.
pub const CASE_ID_MARKER: &str = "TestRailC";

pub const STATUS_ID_PASSED: u32 = 1;
pub const STATUS_ID_SKIPPED: u32 = 3;
pub const STATUS_ID_FAILED: u32 = 5;
