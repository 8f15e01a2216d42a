use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::{key_for, CacheOutcome, Computed, RankingCache};
use crate::config::RankingConfig;
use crate::error::{RankingError, SearchError};
use crate::llm::parse::parse_reply;
use crate::llm::RankingClient;
use crate::models::{
    CandidatePost, DiagnosticInfo, RawModelReply, SearchRequest, SearchResponse, TokenUsage,
};
use crate::search::keywords::extract_keywords;
use crate::search::lexical::filter_candidates;

pub const STATUS_NO_CANDIDATES: &str = "no relevant candidates";
pub const STATUS_RANKING_ERROR: &str = "ranking service error";

/// Two-stage ranking: lexical pre-filter, then a remote model re-rank.
///
/// Results are memoized in the injected [`RankingCache`]. Only successful
/// remote calls are cached; empty candidate sets and remote failures are
/// returned uncached so that a later call can succeed.
pub struct HybridRanker {
    client: Arc<dyn RankingClient>,
    cache: Arc<RankingCache>,
    settings: RankingConfig,
    timeout: Duration,
}

impl HybridRanker {
    pub fn new(
        client: Arc<dyn RankingClient>,
        cache: Arc<RankingCache>,
        settings: RankingConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            settings,
            timeout,
        }
    }

    pub fn cache(&self) -> &Arc<RankingCache> {
        &self.cache
    }

    /// Rank `corpus` against `request`.
    ///
    /// Only an empty request is an error. Every other failure degrades to an
    /// empty result with a status in `debug`.
    pub async fn search(
        &self,
        request: &SearchRequest,
        corpus: &[CandidatePost],
    ) -> Result<SearchResponse, SearchError> {
        let user_text = request.user_text.trim();
        if user_text.is_empty() {
            return Err(SearchError::EmptyRequest);
        }
        let tags = request.tags();

        let span = tracing::info_span!("search", request_id = %Uuid::new_v4());
        async move {
            let key = key_for(user_text, tags, corpus.len());
            let (response, outcome) = self
                .cache
                .get_or_compute(&key, || self.rank_uncached(user_text, tags, corpus))
                .await;

            if outcome == CacheOutcome::Hit {
                tracing::info!("Cache hit: {} results", response.results.len());
            }
            Ok(response)
        }
        .instrument(span)
        .await
    }

    async fn rank_uncached(
        &self,
        user_text: &str,
        tags: Option<&str>,
        corpus: &[CandidatePost],
    ) -> Computed {
        // ── Step 1: Lexical pre-filter ───────────────────────
        let keywords = extract_keywords(user_text);
        tracing::debug!("Keywords: {:?}", keywords);

        let candidates = filter_candidates(
            corpus,
            &keywords,
            self.settings.candidate_limit,
            self.settings.min_lexical_score,
        );
        tracing::info!(
            "Lexical filter kept {} of {} posts",
            candidates.len(),
            corpus.len()
        );

        if candidates.is_empty() {
            return Computed::Skip(SearchResponse {
                results: Vec::new(),
                debug: DiagnosticInfo::without_remote_call(STATUS_NO_CANDIDATES, 0),
            });
        }

        // ── Step 2: Remote re-rank ───────────────────────────
        let reply = match self.call_ranker(user_text, tags, &candidates).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Ranking failed: {e:#}");
                let mut debug =
                    DiagnosticInfo::without_remote_call(STATUS_RANKING_ERROR, candidates.len());
                debug.error = Some(format!("{e:#}"));
                return Computed::Skip(SearchResponse {
                    results: Vec::new(),
                    debug,
                });
            }
        };

        // ── Step 3: Validate, parse, cross-check ids ─────────
        Computed::Store(self.build_response(reply, &candidates))
    }

    async fn call_ranker(
        &self,
        user_text: &str,
        tags: Option<&str>,
        candidates: &[CandidatePost],
    ) -> Result<RawModelReply, RankingError> {
        match tokio::time::timeout(self.timeout, self.client.rank(user_text, tags, candidates))
            .await
        {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(RankingError::Timeout(self.timeout)),
        }
    }

    fn build_response(&self, reply: RawModelReply, candidates: &[CandidatePost]) -> SearchResponse {
        let offered: HashSet<i64> = candidates.iter().map(|p| p.id).collect();
        let parsed = parse_reply(&reply.text, self.settings.strictness, &offered);
        if !parsed.valid {
            tracing::warn!("Discarding ranking reply: {}", parsed.status);
        }
        let dropped_records = parsed.dropped_records;
        if dropped_records > 0 {
            tracing::warn!("Dropped {dropped_records} records with post ids that were not offered");
        }
        let results = parsed.records;

        let TokenUsage {
            input_units,
            output_units,
        } = reply.usage;
        tracing::info!(
            "Ranked {} posts ({input_units} in / {output_units} out tokens)",
            results.len()
        );

        SearchResponse {
            results,
            debug: DiagnosticInfo {
                input_tokens: input_units,
                output_tokens: output_units,
                total_tokens: input_units.saturating_add(output_units),
                estimated_cost: self.estimate_cost(reply.usage),
                status: parsed.status,
                raw_output: reply.text,
                filtered_candidate_count: candidates.len(),
                dropped_records,
                error: None,
                ranked_at: Utc::now(),
            },
        }
    }

    fn estimate_cost(&self, usage: TokenUsage) -> f64 {
        usage.input_units as f64 / 1000.0 * self.settings.input_cost_per_1k
            + usage.output_units as f64 / 1000.0 * self.settings.output_cost_per_1k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::parse::Strictness;
    use crate::models::RelevanceLabel;
    use anyhow::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Replays a fixed reply and records every call.
    struct ScriptedClient {
        reply: Mutex<Result<RawModelReply, String>>,
        calls: Mutex<Vec<Vec<i64>>>,
        delay: Option<Duration>,
    }

    impl ScriptedClient {
        fn replying(text: &str) -> Self {
            Self {
                reply: Mutex::new(Ok(RawModelReply {
                    text: text.to_string(),
                    usage: TokenUsage {
                        input_units: 1000,
                        output_units: 500,
                    },
                })),
                calls: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Mutex::new(Err(message.to_string())),
                calls: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl RankingClient for ScriptedClient {
        async fn rank(
            &self,
            _user_text: &str,
            _profile_tags: Option<&str>,
            candidates: &[CandidatePost],
        ) -> Result<RawModelReply> {
            self.calls
                .lock()
                .push(candidates.iter().map(|c| c.id).collect());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.lock().clone().map_err(anyhow::Error::msg)
        }
    }

    fn block(rank: u32, id: i64, score: u32) -> String {
        format!(
            "RANK_POSITION: {rank}\nPOST_ID: {id}\nJUSTIFICATION: \"fits\"\nRELEVANCE: \"Strong match\"\nFIT_SCORE: {score}\n\n"
        )
    }

    fn corpus() -> Vec<CandidatePost> {
        vec![
            CandidatePost::new(1, "CLI kanban board", "terminal kanban tool in Go"),
            CandidatePost::new(2, "Recipe app", "cooking recipes web app"),
        ]
    }

    fn ranker(client: Arc<ScriptedClient>) -> HybridRanker {
        let settings = RankingConfig {
            input_cost_per_1k: 0.001,
            output_cost_per_1k: 0.002,
            ..RankingConfig::default()
        };
        HybridRanker::new(
            client,
            Arc::new(RankingCache::new(16, None)),
            settings,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_empty_request_rejected_without_remote_call() {
        let client = Arc::new(ScriptedClient::replying(&block(1, 1, 90)));
        let ranker = ranker(client.clone());

        let err = ranker
            .search(&SearchRequest::new("   "), &corpus())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::EmptyRequest));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_kanban_scenario_offers_only_matching_candidate() {
        let client = Arc::new(ScriptedClient::replying(&block(1, 1, 92)));
        let ranker = ranker(client.clone());

        let resp = ranker
            .search(&SearchRequest::new("I want a terminal kanban tool"), &corpus())
            .await
            .unwrap();

        assert_eq!(*client.calls.lock(), vec![vec![1]]);
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].post_id, 1);
        assert_eq!(resp.results[0].relevance_label, RelevanceLabel::Strong);
        assert_eq!(resp.debug.filtered_candidate_count, 1);
        assert_eq!(resp.debug.total_tokens, 1500);
        assert!((resp.debug.estimated_cost - 0.002).abs() < 1e-9);
        assert_eq!(resp.debug.status, "ok: 1 ranked");
    }

    #[tokio::test]
    async fn test_no_candidates_skips_remote_and_cache() {
        let client = Arc::new(ScriptedClient::replying(&block(1, 1, 90)));
        let ranker = ranker(client.clone());
        let request = SearchRequest::new("blockchain validator");

        let resp = ranker.search(&request, &corpus()).await.unwrap();
        assert!(resp.results.is_empty());
        assert_eq!(resp.debug.status, STATUS_NO_CANDIDATES);
        assert_eq!(client.call_count(), 0);

        let key = key_for("blockchain validator", None, 2);
        assert!(ranker.cache().get(&key).is_none());
    }

    #[tokio::test]
    async fn test_second_identical_call_is_cache_hit() {
        let client = Arc::new(ScriptedClient::replying(&block(1, 1, 90)));
        let ranker = ranker(client.clone());
        let request = SearchRequest::new("terminal kanban").with_tags("go");

        let first = ranker.search(&request, &corpus()).await.unwrap();
        let second = ranker.search(&request, &corpus()).await.unwrap();

        assert_eq!(client.call_count(), 1);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_corpus_size_change_misses_cache() {
        let client = Arc::new(ScriptedClient::replying(&block(1, 1, 90)));
        let ranker = ranker(client.clone());
        let request = SearchRequest::new("terminal kanban");

        ranker.search(&request, &corpus()).await.unwrap();
        let mut grown = corpus();
        grown.push(CandidatePost::new(3, "Kanban web", "browser kanban"));
        ranker.search(&request, &grown).await.unwrap();

        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_remote_failure_degrades_and_is_not_cached() {
        let client = Arc::new(ScriptedClient::failing("connection refused"));
        let ranker = ranker(client.clone());
        let request = SearchRequest::new("terminal kanban");

        let resp = ranker.search(&request, &corpus()).await.unwrap();
        assert!(resp.results.is_empty());
        assert_eq!(resp.debug.status, STATUS_RANKING_ERROR);
        assert!(resp
            .debug
            .error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused")));

        ranker.search(&request, &corpus()).await.unwrap();
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_timeout_is_ranking_failure() {
        let mut client = ScriptedClient::replying(&block(1, 1, 90));
        client.delay = Some(Duration::from_millis(200));
        let client = Arc::new(client);
        let ranker = HybridRanker::new(
            client.clone(),
            Arc::new(RankingCache::new(16, None)),
            RankingConfig::default(),
            Duration::from_millis(20),
        );

        let resp = ranker
            .search(&SearchRequest::new("terminal kanban"), &corpus())
            .await
            .unwrap();
        assert!(resp.results.is_empty());
        assert_eq!(resp.debug.status, STATUS_RANKING_ERROR);
        assert!(resp.debug.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_cached_with_raw_output() {
        let raw = "Post 1 looks great!";
        let client = Arc::new(ScriptedClient::replying(raw));
        let ranker = ranker(client.clone());
        let request = SearchRequest::new("terminal kanban");

        let resp = ranker.search(&request, &corpus()).await.unwrap();
        assert!(resp.results.is_empty());
        assert_eq!(resp.debug.raw_output, raw);
        assert!(resp.debug.status.starts_with("invalid format"));

        let key = key_for("terminal kanban", None, 2);
        assert!(ranker.cache().get(&key).is_some());
    }

    #[tokio::test]
    async fn test_unknown_post_ids_are_dropped() {
        let reply = format!("{}{}", block(1, 99, 95), block(2, 1, 80));
        let client = Arc::new(ScriptedClient::replying(&reply));
        let ranker = ranker(client);

        let resp = ranker
            .search(&SearchRequest::new("terminal kanban"), &corpus())
            .await
            .unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].post_id, 1);
        assert_eq!(resp.debug.dropped_records, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_does_not_hide_valid_record_at_same_rank() {
        let reply = format!("{}{}", block(1, 99, 95), block(1, 1, 80));
        let client = Arc::new(ScriptedClient::replying(&reply));
        let ranker = ranker(client);

        let resp = ranker
            .search(&SearchRequest::new("terminal kanban"), &corpus())
            .await
            .unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].post_id, 1);
        assert_eq!(resp.results[0].fit_score, 80);
        assert_eq!(resp.debug.dropped_records, 1);
        assert_eq!(resp.debug.status, "ok: 1 ranked (1 dropped)");
    }

    #[tokio::test]
    async fn test_only_unknown_ids_status_reports_nothing_ranked() {
        let client = Arc::new(ScriptedClient::replying(&block(1, 99, 95)));
        let ranker = ranker(client);

        let resp = ranker
            .search(&SearchRequest::new("terminal kanban"), &corpus())
            .await
            .unwrap();
        assert!(resp.results.is_empty());
        assert_eq!(resp.debug.dropped_records, 1);
        assert!(!resp.debug.status.starts_with("ok"));
    }

    #[tokio::test]
    async fn test_huge_token_counts_saturate() {
        let client = Arc::new(ScriptedClient {
            reply: Mutex::new(Ok(RawModelReply {
                text: block(1, 1, 90),
                usage: TokenUsage {
                    input_units: u64::MAX,
                    output_units: 10,
                },
            })),
            calls: Mutex::new(Vec::new()),
            delay: None,
        });
        let ranker = ranker(client);

        let resp = ranker
            .search(&SearchRequest::new("terminal kanban"), &corpus())
            .await
            .unwrap();
        assert_eq!(resp.debug.total_tokens, u64::MAX);
        assert_eq!(resp.results.len(), 1);
        assert!(resp.debug.estimated_cost.is_finite());
    }

    #[tokio::test]
    async fn test_lenient_strictness_accepts_partial_markers() {
        let client = Arc::new(ScriptedClient::replying("RANK_POSITION: 1 FIT_SCORE: 80"));
        let settings = RankingConfig {
            strictness: Strictness::Lenient,
            ..RankingConfig::default()
        };
        let ranker = HybridRanker::new(
            client,
            Arc::new(RankingCache::new(16, None)),
            settings,
            Duration::from_secs(5),
        );

        let resp = ranker
            .search(&SearchRequest::new("terminal kanban"), &corpus())
            .await
            .unwrap();
        assert!(resp.results.is_empty());
        assert!(!resp.debug.status.starts_with("invalid format"));
    }

    #[tokio::test]
    async fn test_stop_word_request_falls_back_to_first_candidates() {
        let client = Arc::new(ScriptedClient::replying(&block(1, 2, 40)));
        let ranker = ranker(client.clone());

        let resp = ranker
            .search(&SearchRequest::new("I want something"), &corpus())
            .await
            .unwrap();
        assert_eq!(*client.calls.lock(), vec![vec![1, 2]]);
        assert_eq!(resp.results[0].post_id, 2);
    }

    #[tokio::test]
    async fn test_results_sorted_with_valid_scores() {
        let reply = format!("{}{}{}", block(3, 2, 10), block(1, 1, 100), block(2, 2, 0));
        let client = Arc::new(ScriptedClient::replying(&reply));
        let ranker = ranker(client);

        let resp = ranker
            .search(&SearchRequest::new("kanban recipes"), &corpus())
            .await
            .unwrap();
        let ranks: Vec<u32> = resp.results.iter().map(|r| r.rank_position).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(resp.results.iter().all(|r| r.fit_score <= 100));
    }
}
