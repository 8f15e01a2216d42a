use std::fmt::Write;

use crate::models::{CandidatePost, RelevanceLabel};

/// Longest user request forwarded to the model, in characters.
pub const MAX_REQUEST_CHARS: usize = 2000;
/// Longest candidate description forwarded to the model, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 600;

pub const SYSTEM_PROMPT: &str = "You are a project recommendation assistant. You rank open-source \
    project posts by how well they match a developer's request. You answer only in the exact \
    block format you are given, with no other commentary.";

/// Collapse control characters and newlines to spaces so a field stays on one line.
pub fn sanitize_for_prompt(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters without splitting a char.
pub fn truncate_to_char_boundary(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// One line per candidate: `ID: {id} | Title: {title} | Description: {description}`.
pub fn format_candidates(candidates: &[CandidatePost]) -> String {
    let mut out = String::new();
    for post in candidates {
        let title = sanitize_for_prompt(post.display_title());
        let description = truncate_to_char_boundary(
            &sanitize_for_prompt(&post.description),
            MAX_DESCRIPTION_CHARS,
        );
        let _ = writeln!(
            out,
            "ID: {} | Title: {} | Description: {}",
            post.id, title, description
        );
    }
    out
}

/// Build the ranking prompt for the filtered candidate set.
pub fn build_ranking_prompt(
    user_text: &str,
    profile_tags: Option<&str>,
    candidates: &[CandidatePost],
) -> String {
    let request = truncate_to_char_boundary(&sanitize_for_prompt(user_text), MAX_REQUEST_CHARS);
    let labels = RelevanceLabel::ALL
        .iter()
        .map(RelevanceLabel::as_str)
        .collect::<Vec<_>>()
        .join("|");

    let mut prompt = String::new();
    let _ = writeln!(prompt, "User request: \"{request}\"");
    if let Some(tags) = profile_tags {
        let _ = writeln!(prompt, "User profile tags: {}", sanitize_for_prompt(tags));
    }
    let _ = write!(
        prompt,
        "\nCandidate projects:\n---\n{}---\n\n\
         Rank the candidate projects by how well they fit the user request. \
         Only use IDs from the list above. For each ranked project reply with exactly \
         this block and nothing else:\n\n\
         RANK_POSITION: {{integer starting at 1}}\n\
         POST_ID: {{integer}}\n\
         JUSTIFICATION: \"{{one sentence on why it fits}}\"\n\
         RELEVANCE: \"{{one of: {labels}}}\"\n\
         FIT_SCORE: {{integer 0-100}}\n\n\
         Separate blocks with a blank line. Do not add any other commentary.",
        format_candidates(candidates)
    );
    prompt
}
