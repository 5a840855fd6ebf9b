//! Deterministic parsing of the model's sufficiency reply.
//!
//! The prompt instructs the model to reply either with `Final Answer: …` or
//! with the exact phrase `Insufficient context`. Anything that follows
//! neither branch is treated as insufficient rather than an error, so a
//! non-compliant model degrades the run instead of aborting it.

use tracing::warn;

/// Marker the model prefixes a usable answer with. Matched case-insensitively.
pub const FINAL_ANSWER_MARKER: &str = "final answer:";

/// Exact reply (case-insensitive) meaning the page cannot answer the query.
pub const INSUFFICIENT_PHRASE: &str = "insufficient context";

/// Structured result of judging one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The page answered the query; payload is the answer text with its
    /// original casing preserved.
    Sufficient(String),
    Insufficient,
}

/// Parse a raw model reply into a [`Verdict`]. Total: any input string maps
/// to exactly one variant, never panics.
pub fn parse_verdict(raw: &str) -> Verdict {
    let lowered = raw.trim().to_lowercase();

    if lowered == INSUFFICIENT_PHRASE {
        return Verdict::Insufficient;
    }

    if let Some(pos) = lowered.find(FINAL_ANSWER_MARKER) {
        // Slice the trimmed original so the answer keeps its casing.
        // Lowercasing can shift byte offsets when the prefix is non-ASCII,
        // so the position from the lowered copy is only a hint.
        let trimmed = raw.trim();
        let answer = match marker_offset(trimmed, pos) {
            Some(start) => trimmed[start + FINAL_ANSWER_MARKER.len()..].trim(),
            None => "",
        };
        if !answer.is_empty() {
            return Verdict::Sufficient(answer.to_string());
        }
        warn!("Found final-answer marker but the subsequent text was empty");
        return Verdict::Insufficient;
    }

    warn!(
        preview = raw.chars().take(100).collect::<String>().as_str(),
        "Model reply contained neither expected marker"
    );
    Verdict::Insufficient
}

/// Locate the marker in the original-cased text. `hint` is the byte position
/// found in the lowercased copy; it is exact whenever lowercasing did not
/// change byte lengths, otherwise fall back to a scan.
fn marker_offset(original: &str, hint: usize) -> Option<usize> {
    let marker_len = FINAL_ANSWER_MARKER.len();
    if original.len() >= hint + marker_len
        && original.is_char_boundary(hint)
        && original[hint..hint + marker_len].eq_ignore_ascii_case(FINAL_ANSWER_MARKER)
    {
        return Some(hint);
    }
    (0..=original.len().saturating_sub(marker_len))
        .filter(|&i| original.is_char_boundary(i) && original.is_char_boundary(i + marker_len))
        .find(|&i| original[i..i + marker_len].eq_ignore_ascii_case(FINAL_ANSWER_MARKER))
}
