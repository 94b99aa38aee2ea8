use std::path::Path;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use thiserror::Error;

const TAG_TEST_SUITE: &[u8] = b"testsuite";
const TAG_TEST_SUITES: &[u8] = b"testsuites";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to parse any testsuites from xml file: {0}")]
    Unparseable(String),
    #[error("failed to read xml file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Skipped {
    #[serde(rename = "@message", default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Failure {
    #[serde(rename = "@message", default)]
    pub message: Option<String>,
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "$text", default)]
    pub text: String,
}

impl Failure {
    /// Body text of the failure element, or its `message` attribute when the body is empty.
    pub fn description(&self) -> &str {
        let text = self.text.trim();
        if text.is_empty() {
            self.message.as_deref().unwrap_or_default()
        } else {
            text
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TestCase {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@classname", default)]
    pub class_name: Option<String>,
    #[serde(rename = "@time", default)]
    pub time: Option<String>,
    #[serde(default)]
    pub skipped: Option<Skipped>,
    #[serde(rename = "failure", default)]
    pub failures: Vec<Failure>,
    #[serde(rename = "error", default)]
    pub errors: Vec<Failure>,
}

impl TestCase {
    pub fn elapsed(&self) -> Duration {
        let Some(time) = self.time.as_deref() else {
            return Duration::ZERO;
        };
        match time.trim().parse::<f64>() {
            Ok(secs) => Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
                log::debug!("Ignoring out of range time {:?} for {}", time, self.name);
                Duration::ZERO
            }),
            Err(_) => {
                log::debug!("Ignoring unparseable time {:?} for {}", time, self.name);
                Duration::ZERO
            }
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// The first `<failure>`, or the first `<error>` when there is none.
    pub fn failure(&self) -> Option<&Failure> {
        self.failures.first().or(self.errors.first())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TestSuite {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "testcase", default)]
    pub cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TestSuites {
    #[serde(rename = "testsuite", default)]
    pub suites: Vec<TestSuite>,
}

/// Which of the two accepted document layouts a report turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportShape {
    SingleSuite(TestSuite),
    MultiSuite(Vec<TestSuite>),
    Unparseable,
}

impl ReportShape {
    /// A `<testsuite>` root with at least one case is tried first, then a
    /// `<testsuites>` wrapper with at least one suite.
    pub fn decode(xml: &[u8]) -> Self {
        if let Some(suite) = decode_single_suite(xml) {
            return ReportShape::SingleSuite(suite);
        }
        if let Some(suites) = decode_multiple_suites(xml) {
            return ReportShape::MultiSuite(suites);
        }
        ReportShape::Unparseable
    }

    pub fn into_suites(self) -> Option<Vec<TestSuite>> {
        match self {
            ReportShape::SingleSuite(suite) => Some(vec![suite]),
            ReportShape::MultiSuite(suites) => Some(suites),
            ReportShape::Unparseable => None,
        }
    }
}

/// Local name of the document's root element.
fn root_element(xml: &[u8]) -> Option<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(e.local_name().as_ref().to_vec())
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

fn has_root(xml: &[u8], tag: &[u8]) -> bool {
    let root = root_element(xml);
    if root.as_deref() != Some(tag) {
        log::debug!(
            "Root element {:?} is not <{}>",
            root.as_deref().map(String::from_utf8_lossy),
            String::from_utf8_lossy(tag)
        );
        return false;
    }
    true
}

pub fn decode_single_suite(xml: &[u8]) -> Option<TestSuite> {
    if !has_root(xml, TAG_TEST_SUITE) {
        return None;
    }
    match quick_xml::de::from_reader::<_, TestSuite>(xml) {
        Ok(suite) if !suite.cases.is_empty() => Some(suite),
        Ok(_) => {
            log::debug!("Document decoded as a single testsuite without test cases");
            None
        }
        Err(e) => {
            log::debug!("Document is not a single testsuite: {}", e);
            None
        }
    }
}

pub fn decode_multiple_suites(xml: &[u8]) -> Option<Vec<TestSuite>> {
    if !has_root(xml, TAG_TEST_SUITES) {
        return None;
    }
    match quick_xml::de::from_reader::<_, TestSuites>(xml) {
        Ok(wrapper) if !wrapper.suites.is_empty() => Some(wrapper.suites),
        Ok(_) => {
            log::debug!("Document decoded as testsuites without nested suites");
            None
        }
        Err(e) => {
            log::debug!("Document is not a testsuites wrapper: {}", e);
            None
        }
    }
}

pub fn parse_bytes(xml: &[u8], source_name: &str) -> Result<Vec<TestSuite>, ParseError> {
    ReportShape::decode(xml)
        .into_suites()
        .ok_or_else(|| ParseError::Unparseable(source_name.to_string()))
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<TestSuite>, ParseError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let xml = std::fs::read(path).map_err(|source| ParseError::Io {
        path: display.clone(),
        source,
    })?;
    let suites = parse_bytes(&xml, &display)?;
    log::debug!(
        "Parsed {} suite(s) with {} case(s) from {}",
        suites.len(),
        suites.iter().map(|s| s.cases.len()).sum::<usize>(),
        display
    );
    Ok(suites)
}
