//! Token estimation, truncation, and chunking
//!
//! Counts are approximations: one token per word or punctuation mark, scaled
//! by 1.3 to cover sub-word splits.

use once_cell::sync::Lazy;
use regex::Regex;

/// Scale applied to the raw word/punctuation count.
pub const TOKEN_SCALE: f64 = 1.3;

/// Characters per token used when sizing chunks.
pub const CHARS_PER_TOKEN: usize = 4;

static TOKEN_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\b\w+\b|[^\w\s]").ok());

/// Estimated token count of `text`.
pub fn estimate_tokens(text: &str) -> usize {
    let raw = match TOKEN_RE.as_ref() {
        Some(re) => re.find_iter(text).count(),
        None => text.split_whitespace().count(),
    };
    (raw as f64 * TOKEN_SCALE) as usize
}

fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Cut the tail of `text` by a tenth at a time until it fits `max_tokens`.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    let mut out = text;
    while estimate_tokens(out) > max_tokens {
        let chars = out.chars().count();
        let cut = (chars / 10).max(1);
        out = take_chars(out, chars - cut);
    }
    out.to_string()
}

/// Proportionally shorten `text` to `max_tokens - buffer` tokens.
///
/// When the cut leaves a newline in its last fifth, the text ends at that
/// newline instead.
pub fn truncate_text_for_model(text: &str, max_tokens: usize, buffer: usize) -> String {
    let effective = max_tokens.saturating_sub(buffer);
    let tokens = estimate_tokens(text);
    if tokens <= effective {
        return text.to_string();
    }

    let chars = text.chars().count();
    let cut = (chars as f64 * effective as f64 / tokens as f64) as usize;
    let truncated = take_chars(text, cut);

    match truncated.rfind('\n') {
        Some(idx) if truncated[..idx].chars().count() as f64 > 0.8 * cut as f64 => {
            truncated[..idx].to_string()
        }
        _ => truncated.to_string(),
    }
}

fn tail_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    if n >= total {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Split `text` into paragraph-packed chunks of about `max_tokens` each.
///
/// Each chunk after the first starts with the last `overlap` tokens worth of
/// characters from the previous chunk. Paragraphs longer than a chunk are
/// split on character boundaries.
pub fn chunk_text(text: &str, max_tokens: usize, overlap: usize) -> Vec<String> {
    let max_chars = max_tokens.max(1) * CHARS_PER_TOKEN;
    let overlap_chars = (overlap * CHARS_PER_TOKEN).min(max_chars / 2);

    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut pieces: Vec<String> = Vec::new();
    for paragraph in text.split("\n\n").filter(|p| !p.trim().is_empty()) {
        let mut rest = paragraph;
        while rest.chars().count() > max_chars {
            let head = take_chars(rest, max_chars);
            pieces.push(head.to_string());
            rest = &rest[head.len()..];
        }
        if !rest.is_empty() {
            pieces.push(rest.to_string());
        }
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for piece in pieces {
        let needed = if current.is_empty() {
            piece.chars().count()
        } else {
            current.chars().count() + 2 + piece.chars().count()
        };

        if needed > max_chars && !current.is_empty() {
            let carry = tail_chars(&current, overlap_chars).to_string();
            chunks.push(std::mem::take(&mut current));
            if !carry.is_empty() && carry.chars().count() + 2 + piece.chars().count() <= max_chars {
                current.push_str(&carry);
                current.push_str("\n\n");
            }
        } else if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&piece);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
