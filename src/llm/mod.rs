pub mod client;
pub mod parse;
pub mod prompt;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CandidatePost, RawModelReply};

pub use client::HttpRankingClient;

/// Boundary to the external ranking model.
///
/// Implementations send the request and the pre-filtered candidates to the
/// model and return its raw text. Any transport or service failure is an
/// `Err`; callers do not retry.
#[async_trait]
pub trait RankingClient: Send + Sync {
    async fn rank(
        &self,
        user_text: &str,
        profile_tags: Option<&str>,
        candidates: &[CandidatePost],
    ) -> Result<RawModelReply>;
}
