use std::collections::BTreeSet;

/// Normalized salient terms of a request.
pub type KeywordSet = BTreeSet<String>;

/// Words carrying no intent in a project request.
const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "get", "give", "had", "has",
    "have", "help", "how", "i", "if", "in", "into", "is", "it", "its", "just", "like", "looking",
    "make", "me", "more", "most", "my", "need", "not", "of", "on", "one", "or", "our", "please",
    "really", "show", "so", "some", "something", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "to", "too", "use", "using", "very", "want", "was", "we",
    "were", "what", "when", "where", "which", "who", "why", "will", "with", "would", "you",
    "your",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Extract the keyword set from free-text user input.
///
/// Tokens are lower-cased and split on whitespace. A token survives only if it
/// is longer than two characters, purely alphabetic and not a stop word.
pub fn extract_keywords(user_text: &str) -> KeywordSet {
    user_text
        .to_lowercase()
        .split_whitespace()
        .filter(|token| token.chars().count() > 2)
        .filter(|token| token.chars().all(char::is_alphabetic))
        .filter(|token| !is_stop_word(token))
        .map(str::to_string)
        .collect()
}
