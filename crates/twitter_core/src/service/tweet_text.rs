//! Free-text helpers for tweet composition.
//!
//! `#token` runs inside tweet text become tag tokens and are removed from the
//! stored content. Tokens keep their case; `#X` and `#x` are different tags.

use once_cell::sync::Lazy;
use regex::Regex;

static HASHTAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([^\s#]+)").expect("valid hashtag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Tweet text split into stored content and tag tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTweet {
    pub content: String,
    /// Tokens in order of appearance, repeats included.
    pub tags: Vec<String>,
}

/// Splits `"hello #x #y"` into content `"hello"` and tags `["x", "y"]`.
pub fn parse_tweet_text(text: &str) -> ParsedTweet {
    let tags = HASHTAG_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();
    let without_tags = HASHTAG_RE.replace_all(text, " ");
    let content = WHITESPACE_RE
        .replace_all(&without_tags, " ")
        .trim()
        .to_string();

    ParsedTweet { content, tags }
}

/// Splits a space-separated tag prompt (`"x y"`) into tokens.
///
/// Leading `#` marks are tolerated and stripped. Empty input yields no tokens.
pub fn split_tag_input(line: &str) -> Vec<String> {
    line.split_whitespace()
        .map(|token| token.trim_start_matches('#'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_tweet_text, split_tag_input};

    #[test]
    fn parse_extracts_hashtags_and_strips_them_from_content() {
        let parsed = parse_tweet_text("hello #x #y");
        assert_eq!(parsed.content, "hello");
        assert_eq!(parsed.tags, vec!["x", "y"]);
    }

    #[test]
    fn parse_keeps_inline_words_and_collapses_whitespace() {
        let parsed = parse_tweet_text("  good #Rust\nmorning   #rust  all ");
        assert_eq!(parsed.content, "good morning all");
        assert_eq!(parsed.tags, vec!["Rust", "rust"]);
    }

    #[test]
    fn parse_ignores_bare_hash_marks() {
        let parsed = parse_tweet_text("# not a tag ##");
        assert!(parsed.tags.is_empty());
        assert_eq!(parsed.content, "# not a tag ##");
    }

    #[test]
    fn split_tag_input_drops_empty_tokens() {
        assert!(split_tag_input("").is_empty());
        assert!(split_tag_input("   ").is_empty());
        assert_eq!(split_tag_input("x  #y z"), vec!["x", "y", "z"]);
    }
}
