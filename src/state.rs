use std::sync::Arc;
use std::time::Duration;

use crate::cache::RankingCache;
use crate::config::Config;
use crate::corpus::PostStore;
use crate::llm::{HttpRankingClient, RankingClient};
use crate::search::hybrid::HybridRanker;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: Arc<PostStore>,
    pub ranker: Arc<HybridRanker>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let posts = PostStore::open(&config.posts_path)?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let client: Arc<dyn RankingClient> =
            Arc::new(HttpRankingClient::new(http_client, config.llm.clone()));

        Ok(Self::with_client(config, posts, client))
    }

    /// Assemble state around an existing corpus and ranking client.
    pub fn with_client(config: Config, posts: PostStore, client: Arc<dyn RankingClient>) -> Self {
        let cache = Arc::new(RankingCache::from_config(&config.cache));
        // One second past the HTTP client timeout.
        let timeout = Duration::from_secs(config.llm.timeout_secs.clamp(1, 120) + 1);
        let ranker = HybridRanker::new(client, cache, config.ranking.clone(), timeout);

        Self {
            posts: Arc::new(posts),
            ranker: Arc::new(ranker),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidatePost, RawModelReply};
    use async_trait::async_trait;

    struct SilentClient;

    #[async_trait]
    impl RankingClient for SilentClient {
        async fn rank(
            &self,
            _user_text: &str,
            _profile_tags: Option<&str>,
            _candidates: &[CandidatePost],
        ) -> anyhow::Result<RawModelReply> {
            anyhow::bail!("not reachable in this test")
        }
    }

    #[test]
    fn test_with_client_wires_config_into_ranker() {
        let mut config = Config::default();
        config.cache.capacity = 7;

        let state = AppState::with_client(
            config,
            PostStore::from_posts(vec![CandidatePost::new(1, "t", "d")]),
            Arc::new(SilentClient),
        );

        assert_eq!(state.posts.len(), 1);
        assert_eq!(state.ranker.cache().stats().capacity, 7);
        assert!(state.ranker.cache().is_empty());
    }
}
