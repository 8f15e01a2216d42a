use crate::models::CandidatePost;
use crate::search::keywords::KeywordSet;

/// Keyword in the title as a whole word.
const TITLE_WORD_WEIGHT: u32 = 3;
/// Keyword inside a title word.
const TITLE_PARTIAL_WEIGHT: u32 = 2;
/// Keyword in title or description as a whole word.
const CONTENT_WORD_WEIGHT: u32 = 2;
/// Keyword anywhere in title or description.
const CONTENT_PARTIAL_WEIGHT: u32 = 1;

/// A candidate with its lexical score, before filtering.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate<'a> {
    pub post: &'a CandidatePost,
    pub lexical_score: u32,
}

/// Lower-cased title and title+description of a post, pre-split into words.
struct PostText {
    title: String,
    title_words: Vec<String>,
    content: String,
    content_words: Vec<String>,
}

impl PostText {
    fn new(post: &CandidatePost) -> Self {
        let title = post.title.to_lowercase();
        let content = format!("{} {}", title, post.description.to_lowercase());
        Self {
            title_words: words(&title),
            content_words: words(&content),
            title,
            content,
        }
    }
}

/// Split on anything that is not a word character, like a regex `\b`.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Weight of the strongest match of one keyword. Only one rule applies.
fn keyword_weight(text: &PostText, keyword: &str) -> u32 {
    if text.title_words.iter().any(|w| w == keyword) {
        TITLE_WORD_WEIGHT
    } else if text.title.contains(keyword) {
        TITLE_PARTIAL_WEIGHT
    } else if text.content_words.iter().any(|w| w == keyword) {
        CONTENT_WORD_WEIGHT
    } else if text.content.contains(keyword) {
        CONTENT_PARTIAL_WEIGHT
    } else {
        0
    }
}

/// Sum of per-keyword weights for a single post.
pub fn score_candidate(post: &CandidatePost, keywords: &KeywordSet) -> u32 {
    let text = PostText::new(post);
    keywords.iter().map(|k| keyword_weight(&text, k)).sum()
}

/// Score every candidate, keep those at or above `min_score`, best first.
///
/// Ties keep corpus order.
pub fn score_candidates<'a>(
    candidates: &'a [CandidatePost],
    keywords: &KeywordSet,
    min_score: u32,
) -> Vec<ScoredCandidate<'a>> {
    let mut scored: Vec<ScoredCandidate<'a>> = candidates
        .iter()
        .map(|post| ScoredCandidate {
            post,
            lexical_score: score_candidate(post, keywords),
        })
        .filter(|s| s.lexical_score >= min_score)
        .collect();

    // Vec::sort_by is stable
    scored.sort_by(|a, b| b.lexical_score.cmp(&a.lexical_score));
    scored
}

/// Cheap pre-screen bounding what reaches the ranking model.
///
/// With no keywords, scoring is bypassed and the first `limit` candidates are
/// returned in corpus order so that vague requests still get a bounded set.
pub fn filter_candidates(
    candidates: &[CandidatePost],
    keywords: &KeywordSet,
    limit: usize,
    min_score: u32,
) -> Vec<CandidatePost> {
    if keywords.is_empty() {
        return candidates.iter().take(limit).cloned().collect();
    }

    score_candidates(candidates, keywords, min_score)
        .into_iter()
        .take(limit)
        .map(|s| s.post.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::keywords::extract_keywords;

    fn kw(words: &[&str]) -> KeywordSet {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn kanban_corpus() -> Vec<CandidatePost> {
        vec![
            CandidatePost::new(1, "CLI kanban board", "terminal kanban tool in Go"),
            CandidatePost::new(2, "Recipe app", "cooking recipes web app"),
        ]
    }

    #[test]
    fn test_kanban_scenario_keeps_only_matching_post() {
        let corpus = kanban_corpus();
        let keywords = extract_keywords("I want a terminal kanban tool");

        assert!(score_candidate(&corpus[0], &keywords) >= 2);
        assert_eq!(score_candidate(&corpus[1], &keywords), 0);

        let filtered = filter_candidates(&corpus, &keywords, 20, 2);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, 1);
    }

    #[test]
    fn test_kanban_score_breakdown() {
        let corpus = kanban_corpus();
        // kanban: title word (3), terminal: content word (2), tool: content word (2)
        let score = score_candidate(&corpus[0], &kw(&["kanban", "terminal", "tool"]));
        assert_eq!(score, 7);
    }

    #[test]
    fn test_only_highest_weight_counts_per_keyword() {
        // "board" is a whole title word and also appears in the description;
        // only the title-word weight counts.
        let post = CandidatePost::new(1, "Board", "board board boards");
        assert_eq!(score_candidate(&post, &kw(&["board"])), TITLE_WORD_WEIGHT);
    }

    #[test]
    fn test_partial_title_match() {
        let post = CandidatePost::new(1, "Dashboards", "");
        assert_eq!(score_candidate(&post, &kw(&["dashboard"])), TITLE_PARTIAL_WEIGHT);
    }

    #[test]
    fn test_partial_content_match_alone_is_below_threshold() {
        let post = CandidatePost::new(1, "Notes", "markdown editors");
        assert_eq!(score_candidate(&post, &kw(&["editor"])), CONTENT_PARTIAL_WEIGHT);
        assert!(filter_candidates(&[post], &kw(&["editor"]), 20, 2).is_empty());
    }

    #[test]
    fn test_punctuation_is_a_word_boundary() {
        let post = CandidatePost::new(1, "kanban-cli", "");
        assert_eq!(score_candidate(&post, &kw(&["kanban"])), TITLE_WORD_WEIGHT);
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let corpus = vec![
            CandidatePost::new(1, "Notes", "a rust notes app"),
            CandidatePost::new(2, "Rust compiler", "rust"),
            CandidatePost::new(3, "Chat", "written in rust"),
        ];
        let filtered = filter_candidates(&corpus, &kw(&["rust"]), 20, 2);
        let ids: Vec<i64> = filtered.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_empty_keywords_returns_first_candidates_in_order() {
        let corpus: Vec<CandidatePost> = (0..30)
            .map(|i| CandidatePost::new(i, format!("Post {i}"), ""))
            .collect();
        let filtered = filter_candidates(&corpus, &KeywordSet::new(), 20, 2);
        assert_eq!(filtered.len(), 20);
        assert_eq!(filtered[0].id, 0);
        assert_eq!(filtered[19].id, 19);
    }

    #[test]
    fn test_limit_respected() {
        let corpus: Vec<CandidatePost> = (0..50)
            .map(|i| CandidatePost::new(i, "Rust tool", ""))
            .collect();
        let filtered = filter_candidates(&corpus, &kw(&["rust"]), 20, 2);
        assert_eq!(filtered.len(), 20);
    }

    #[test]
    fn test_no_matches_yields_empty() {
        let filtered = filter_candidates(&kanban_corpus(), &kw(&["blockchain"]), 20, 2);
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_empty_corpus() {
        assert!(filter_candidates(&[], &kw(&["rust"]), 20, 2).is_empty());
        assert!(filter_candidates(&[], &KeywordSet::new(), 20, 2).is_empty());
    }
}
