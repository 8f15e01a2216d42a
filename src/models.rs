use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title shown for posts whose title is blank.
pub const UNTITLED_PLACEHOLDER: &str = "[Untitled]";

/// A project summary eligible for ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidatePost {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl CandidatePost {
    pub fn new(id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Title for display and prompting, with a placeholder for blank titles.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            UNTITLED_PLACEHOLDER
        } else {
            &self.title
        }
    }
}

/// A ranking request as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub user_text: String,
    pub profile_tags: Option<String>,
}

impl SearchRequest {
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            profile_tags: None,
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.profile_tags = Some(tags.into());
        self
    }

    /// Tags with surrounding whitespace removed; blank tags count as absent.
    pub fn tags(&self) -> Option<&str> {
        self.profile_tags
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Coarse relevance bucket reported by the ranking model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RelevanceLabel {
    #[serde(rename = "Exceptional match")]
    Exceptional,
    #[serde(rename = "Strong match")]
    Strong,
    #[serde(rename = "Moderate match")]
    Moderate,
    #[serde(rename = "Mild match")]
    Mild,
    #[serde(rename = "Low match")]
    Low,
}

impl RelevanceLabel {
    pub const ALL: [RelevanceLabel; 5] = [
        RelevanceLabel::Exceptional,
        RelevanceLabel::Strong,
        RelevanceLabel::Moderate,
        RelevanceLabel::Mild,
        RelevanceLabel::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelevanceLabel::Exceptional => "Exceptional match",
            RelevanceLabel::Strong => "Strong match",
            RelevanceLabel::Moderate => "Moderate match",
            RelevanceLabel::Mild => "Mild match",
            RelevanceLabel::Low => "Low match",
        }
    }

    /// Accepts "Strong match" as well as the bare "Strong", case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase();
        let head = normalized
            .strip_suffix(" match")
            .unwrap_or(&normalized)
            .trim();
        match head {
            "exceptional" => Some(RelevanceLabel::Exceptional),
            "strong" => Some(RelevanceLabel::Strong),
            "moderate" => Some(RelevanceLabel::Moderate),
            "mild" => Some(RelevanceLabel::Mild),
            "low" => Some(RelevanceLabel::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelevanceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated entry of a ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankingRecord {
    pub rank_position: u32,
    pub post_id: i64,
    pub justification: String,
    #[serde(rename = "relevance")]
    pub relevance_label: RelevanceLabel,
    pub fit_score: u8,
}

/// Token accounting reported by the ranking service.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_units: u64,
    pub output_units: u64,
}

/// Unparsed reply from the ranking service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelReply {
    pub text: String,
    pub usage: TokenUsage,
}

/// Diagnostic block attached to every ranking response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticInfo {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub status: String,
    pub raw_output: String,
    pub filtered_candidate_count: usize,
    /// Parsed records discarded because their post id was never offered.
    pub dropped_records: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub ranked_at: DateTime<Utc>,
}

impl DiagnosticInfo {
    /// Diagnostics for a call that never reached the ranking service.
    pub fn without_remote_call(status: impl Into<String>, filtered_candidate_count: usize) -> Self {
        Self {
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            estimated_cost: 0.0,
            status: status.into(),
            raw_output: String::new(),
            filtered_candidate_count,
            dropped_records: 0,
            error: None,
            ranked_at: Utc::now(),
        }
    }
}

/// Engine output: ordered records plus diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub results: Vec<RankingRecord>,
    pub debug: DiagnosticInfo,
}

/// POST /api/smart-search body
#[derive(Debug, Clone, Deserialize)]
pub struct SmartSearchRequest {
    #[serde(default)]
    pub user_request: String,
    #[serde(default)]
    pub profile_tags: Option<String>,
}

impl From<SmartSearchRequest> for SearchRequest {
    fn from(req: SmartSearchRequest) -> Self {
        Self {
            user_text: req.user_request,
            profile_tags: req.profile_tags,
        }
    }
}

/// POST /api/smart-search response
#[derive(Debug, Clone, Serialize)]
pub struct SmartSearchResponse {
    pub results: Vec<RankingRecord>,
    pub dev_debug: DiagnosticInfo,
}

impl From<SearchResponse> for SmartSearchResponse {
    fn from(resp: SearchResponse) -> Self {
        Self {
            results: resp.results,
            dev_debug: resp.debug,
        }
    }
}
