//! # gitwise-search
//!
//! Hybrid relevance ranking for short project summaries. A free-text request
//! (plus optional profile tags) is matched against a corpus of posts with a
//! cheap lexical pre-filter, and the survivors are re-ranked by an external
//! LLM whose structured reply is validated before anything is returned.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────────────┐
//!                    │ User request + tags      │
//!                    └────────────┬─────────────┘
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │ Cache key                │──── hit ───► cached payload
//!                    │ blake3(text, tags, size) │
//!                    └────────────┬─────────────┘
//!                                 │ miss
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │ Keyword extraction       │
//!                    │ stop-words, len > 2      │
//!                    └────────────┬─────────────┘
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │ Lexical filter           │──── none ──► empty, uncached
//!                    │ 3/2/2/1 weights, top 20  │
//!                    └────────────┬─────────────┘
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │ LLM ranking call         │──── error ─► empty, uncached
//!                    │ one block per candidate  │
//!                    └────────────┬─────────────┘
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │ Validate + parse         │
//!                    │ drop unknown post ids    │
//!                    └────────────┬─────────────┘
//!                                 ▼
//!                    ┌──────────────────────────┐
//!                    │ Store in cache, return   │
//!                    └──────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, LLM, ranking and cache
//! - [`models`] - Shared data types: `CandidatePost`, `RankingRecord`, request/response types
//! - [`error`] - Engine error types
//! - [`search::keywords`] - Keyword extraction from free-text requests
//! - [`search::lexical`] - Weighted keyword scoring and top-N filtering
//! - [`search::hybrid`] - The orchestrator tying filter, cache and LLM together
//! - [`cache`] - BLAKE3 cache keys and a bounded, coalescing result cache
//! - [`llm`] - The `RankingClient` boundary, HTTP client, prompt and reply parser
//! - [`corpus`] - Read-only JSON snapshot of the posts corpus
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state

pub mod api;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod error;
pub mod llm;
pub mod models;
pub mod search;
pub mod state;
