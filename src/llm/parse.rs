//! Validation and parsing of ranking replies.
//!
//! The model is asked to answer with repeated blocks of
//!
//! ```text
//! RANK_POSITION: 1
//! POST_ID: 42
//! JUSTIFICATION: "..."
//! RELEVANCE: "Strong match"
//! FIT_SCORE: 87
//! ```
//!
//! Parsing is fail-closed: a reply that does not carry the required markers
//! yields no records at all, and blocks that do not match the full pattern
//! are skipped rather than partially recovered.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::models::{RankingRecord, RelevanceLabel};

pub const RANK_POSITION: &str = "RANK_POSITION";
pub const POST_ID: &str = "POST_ID";
pub const JUSTIFICATION: &str = "JUSTIFICATION";
pub const RELEVANCE: &str = "RELEVANCE";
pub const FIT_SCORE: &str = "FIT_SCORE";

const STRICT_MARKERS: [&str; 5] = [RANK_POSITION, POST_ID, JUSTIFICATION, RELEVANCE, FIT_SCORE];
const LENIENT_MARKERS: [&str; 2] = [RANK_POSITION, FIT_SCORE];

static BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"RANK_POSITION:\s*(\d+)\s*POST_ID:\s*(\d+)\s*JUSTIFICATION:\s*"(.*?)"\s*RELEVANCE:\s*"([^"\n]*)"\s*FIT_SCORE:\s*(\d+)"#,
    )
    .expect("Invalid ranking block regex")
});

/// How much of the reply grammar must be present before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// All five field markers.
    #[default]
    Strict,
    /// Only `RANK_POSITION` and `FIT_SCORE`.
    Lenient,
}

impl Strictness {
    pub fn required_markers(&self) -> &'static [&'static str] {
        match self {
            Strictness::Strict => &STRICT_MARKERS,
            Strictness::Lenient => &LENIENT_MARKERS,
        }
    }
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Strictness::Strict),
            "lenient" => Ok(Strictness::Lenient),
            other => Err(format!("unknown strictness '{other}' (expected strict or lenient)")),
        }
    }
}

/// Markers required by `strictness` that never occur in `text`.
pub fn missing_markers(text: &str, strictness: Strictness) -> Vec<&'static str> {
    strictness
        .required_markers()
        .iter()
        .copied()
        .filter(|marker| !text.contains(marker))
        .collect()
}

/// Whether `text` carries every marker `strictness` requires.
pub fn validate(text: &str, strictness: Strictness) -> bool {
    missing_markers(text, strictness).is_empty()
}

/// Every well-formed block, in the order it appears in `text`.
///
/// Blocks with a zero rank, a fit score above 100, an unknown relevance label
/// or an unparseable number are skipped.
pub fn parse_blocks(text: &str) -> Vec<RankingRecord> {
    BLOCK_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let rank_position = caps[1].parse::<u32>().ok().filter(|r| *r >= 1)?;
            let post_id = caps[2].parse::<i64>().ok()?;
            let relevance_label = RelevanceLabel::from_label(&caps[4])?;
            let fit_score = caps[5].parse::<u8>().ok().filter(|s| *s <= 100)?;
            Some(RankingRecord {
                rank_position,
                post_id,
                justification: caps[3].trim().to_string(),
                relevance_label,
                fit_score,
            })
        })
        .collect()
}

/// Sort by rank. When two records claim the same rank the earlier one wins.
pub fn order_by_rank(mut records: Vec<RankingRecord>) -> Vec<RankingRecord> {
    records.sort_by_key(|r| r.rank_position);
    records.dedup_by_key(|r| r.rank_position);
    records
}

/// Extract every well-formed block, ordered by rank.
pub fn parse(text: &str) -> Vec<RankingRecord> {
    order_by_rank(parse_blocks(text))
}

/// Result of running a reply through validation and parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub records: Vec<RankingRecord>,
    pub valid: bool,
    pub status: String,
    /// Well-formed records naming a post that was never offered.
    pub dropped_records: usize,
}

/// Validate, then parse, keeping only records for `offered` posts.
///
/// The post id check runs before duplicate ranks are resolved, so a record
/// for an unknown post cannot shadow a valid one at the same rank. Invalid
/// replies produce no records.
pub fn parse_reply(text: &str, strictness: Strictness, offered: &HashSet<i64>) -> ParsedReply {
    let missing = missing_markers(text, strictness);
    if !missing.is_empty() {
        return ParsedReply {
            records: Vec::new(),
            valid: false,
            status: format!(
                "invalid format: reply is missing {}",
                missing.join(", ")
            ),
            dropped_records: 0,
        };
    }

    let (known, unknown): (Vec<_>, Vec<_>) = parse_blocks(text)
        .into_iter()
        .partition(|r| offered.contains(&r.post_id));
    let records = order_by_rank(known);

    let status = match (records.len(), unknown.len()) {
        (0, 0) => "no well-formed ranking blocks in reply".to_string(),
        (0, dropped) => format!("no ranked posts were offered ({dropped} dropped)"),
        (kept, 0) => format!("ok: {kept} ranked"),
        (kept, dropped) => format!("ok: {kept} ranked ({dropped} dropped)"),
    };

    ParsedReply {
        records,
        valid: true,
        status,
        dropped_records: unknown.len(),
    }
}
