/*!
 * Wire model of the Read API status resource.
 */

use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque reference to an in-progress remote recognition operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(Url);

impl JobHandle {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status reported by the status resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    /// Any value this client does not know; treated as still pending
    #[serde(other)]
    Unknown,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Body of a status check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOperation {
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_result: Option<AnalyzeResult>,
}

impl ReadOperation {
    /// A pending operation with no result
    pub fn pending(status: OperationStatus) -> Self {
        Self {
            status,
            created_date_time: None,
            last_updated_date_time: None,
            analyze_result: None,
        }
    }

    /// A succeeded operation carrying the given result
    pub fn succeeded(result: AnalyzeResult) -> Self {
        Self {
            analyze_result: Some(result),
            ..Self::pending(OperationStatus::Succeeded)
        }
    }
}

/// Recognition output: one line group per page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default)]
    pub read_results: Vec<ReadResult>,
}

impl AnalyzeResult {
    /// Build a result from plain line texts, one inner vector per group
    pub fn from_groups<S: AsRef<str>>(groups: &[Vec<S>]) -> Self {
        let read_results = groups
            .iter()
            .enumerate()
            .map(|(i, lines)| ReadResult {
                page: i as u32 + 1,
                lines: lines.iter().map(|text| TextLine::new(AsRef::<str>::as_ref(text))).collect(),
                ..Default::default()
            })
            .collect();
        Self { read_results, ..Default::default() }
    }

    /// All lines of all groups in order
    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.read_results.iter().flat_map(|r| r.lines.iter())
    }

    /// Newline-joined text of every line, trimmed
    pub fn text(&self) -> String {
        self.lines()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// One page worth of recognized lines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    #[serde(default)]
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLine {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bounding_box: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub words: Vec<Word>,
}

impl TextLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bounding_box: Vec<f64>,
    #[serde(default)]
    pub confidence: f64,
}
