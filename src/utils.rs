pub fn status_code_help(status: reqwest::StatusCode) -> String {
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            "Your TestRail credentials may be incorrect - \
             check TESTRAIL_USERNAME and TESTRAIL_TOKEN \
             (My Settings -> API Keys)."
        }
        reqwest::StatusCode::NOT_FOUND => {
            "The TestRail address may be incorrect - \
             check TESTRAIL_URL."
        }
        _ => "For more help, check the TestRail API documentation.",
    }
    .to_string()
}

pub fn from_non_empty_or_default<R, F: Fn(String) -> R>(
    s: Option<String>,
    default: R,
    from_non_empty: F,
) -> R {
    if let Some(s) = s {
        if !s.trim().is_empty() {
            return from_non_empty(s);
        }
    }
    default
}
