//! Rough token estimate shown after each reply.
//!
//! This is a display heuristic, not a tokenizer: whitespace-separated words
//! scaled by 1.3 and truncated.

const TOKENS_PER_WORD: f64 = 1.3;

pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    (words as f64 * TOKENS_PER_WORD) as usize
}
