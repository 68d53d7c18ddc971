//! Provider prompts and reply parsing helpers.

use once_cell::sync::Lazy;
use regex::Regex;

/// System prompt for starter generation.
pub const STARTER_SYSTEM_PROMPT: &str = "You help someone reflect on their personal notes. \
Given a JSON description of their recent activity, write up to three short, open questions \
that invite reflection. Reply with only a JSON array of objects with the fields \
\"prompt\" (one sentence), \"label\" (one to three words), and optionally \"context_id\" \
(the context_id of the note the question is about). No prose outside the array.";

/// System prompt for synthesis generation.
pub const SYNTHESIS_SYSTEM_PROMPT: &str = "You synthesize a person's notes into one short \
markdown document. Connect the ideas, name agreements and tensions between the notes, and \
end with open questions. Use markdown headings. Do not invent facts that are not in the notes.";

/// Fenced code block, optionally tagged `json`.
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("code fence pattern is valid")
});

/// First `max_chars` characters of `text` with whitespace collapsed.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

/// Locate the JSON array in a provider reply.
///
/// Providers wrap output in code fences or add chatter around it; this takes
/// the fenced body when present and then the span from the first `[` to the
/// last `]`.
pub fn json_array_span(reply: &str) -> Option<&str> {
    let body = CODE_FENCE
        .captures(reply)
        .and_then(|c| c.get(1))
        .map_or(reply, |m| m.as_str());
    let start = body.find('[')?;
    let end = body.rfind(']')?;
    (end > start).then(|| &body[start..=end])
}
