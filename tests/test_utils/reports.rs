use std::path::{Path, PathBuf};

#[allow(dead_code)]
pub const SINGLE_SUITE_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="api" tests="3" failures="1" errors="0" time="12.5">
  <testcase name="creates a user TestRailC10" classname="users" time="1.25"></testcase>
  <testcase name="rejects duplicates TestRailC20" classname="users" time="0.5">
    <failure type="AssertionError">expected 409, got 200</failure>
  </testcase>
  <testcase name="not tracked in TestRail" classname="users" time="0.1"></testcase>
</testsuite>"#;

#[allow(dead_code)]
pub const MULTI_SUITE_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuites name="Mocha Tests" time="15.358" tests="3" failures="0">
  <testsuite name="Root Suite" tests="0" failures="0" time="0">
  </testsuite>
  <testsuite name="web" tests="3" failures="0" errors="0" time="3">
    <testcase name="logs in TestRailC30" classname="web" time="2"></testcase>
    <testcase name="creates a user again TestRailC10" classname="web" time="1"></testcase>
    <testcase name="exports TestRailC40" classname="web" time="0"><skipped/></testcase>
  </testsuite>
</testsuites>"#;

#[allow(dead_code)]
pub fn write_report(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
