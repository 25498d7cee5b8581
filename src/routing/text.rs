//! Text helpers used by the router: greetings, mention tokens, and chunking.

/// Maximum characters per outbound fragment (Discord allows 2000).
pub const FRAGMENT_LIMIT: usize = 1990;

/// Whether `text` is, or starts with, one of `tokens` followed by a word boundary.
///
/// `text` is expected to already be lowercased and trimmed.
pub fn is_greeting(text: &str, tokens: &[String]) -> bool {
    tokens.iter().any(|token| {
        let Some(rest) = text.strip_prefix(token.as_str()) else {
            return false;
        };

        match rest.chars().next() {
            None => true,
            Some(c) => !c.is_alphanumeric() && c != '_',
        }
    })
}

/// Remove every `<@id>` and `<@!id>` token for `bot_user_id`, then trim.
pub fn strip_mentions(text: &str, bot_user_id: &str) -> String {
    if bot_user_id.is_empty() {
        return text.trim().to_string();
    }

    let plain = format!("<@{bot_user_id}>");
    let nick = format!("<@!{bot_user_id}>");

    text.replace(&plain, "").replace(&nick, "").trim().to_string()
}

/// Split `text` into ordered fragments of at most `limit` characters.
///
/// Splits on character boundaries only; empty input yields no fragments.
pub fn chunk(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut fragments = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for c in text.chars() {
        if count == limit {
            fragments.push(std::mem::take(&mut current));
            count = 0;
        }

        current.push(c);
        count += 1;
    }

    if !current.is_empty() {
        fragments.push(current);
    }

    fragments
}

// Tests.
