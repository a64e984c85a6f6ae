// Participant mention extraction from slash command text

use regex::Regex;
use std::sync::OnceLock;

fn mention_regex() -> &'static Regex {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    MENTION.get_or_init(|| Regex::new(r"^<@([^<>\s]+)>$").expect("Invalid regex pattern"))
}

/// Extract participant ids from free text.
///
/// Only complete whitespace-delimited `<@ID>` tokens count. Order and
/// duplicates are preserved; anything else is skipped silently.
///
/// ```
/// use common::mentions::parse_mentions;
///
/// assert_eq!(parse_mentions("<@A> <@B> <@A>"), vec!["A", "B", "A"]);
/// assert!(parse_mentions("hello <@X").is_empty());
/// ```
pub fn parse_mentions(text: &str) -> Vec<String> {
    let regex = mention_regex();
    text.split_whitespace()
        .filter_map(|token| regex.captures(token))
        .filter_map(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
        .collect()
}

/// Render a participant id as a mention
pub fn format_mention(user_id: &str) -> String {
    format!("<@{}>", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_order_and_duplicates() {
        assert_eq!(parse_mentions("<@A> <@B> <@A>"), vec!["A", "B", "A"]);
    }

    #[test]
    fn test_unterminated_mention_is_ignored() {
        assert!(parse_mentions("hello <@X").is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_mentions("").is_empty());
        assert!(parse_mentions("   \t\n").is_empty());
    }

    #[test]
    fn test_mixed_whitespace_separators() {
        assert_eq!(
            parse_mentions("<@U1>\t<@U2>\n  <@U3>"),
            vec!["U1", "U2", "U3"]
        );
    }

    #[test]
    fn test_partial_markers_are_skipped() {
        let text = "<@> @U1 <U2> <@U3>, x<@U4> <@U5>y <@U6";
        assert!(parse_mentions(text).is_empty());
    }

    #[test]
    fn test_mentions_among_words() {
        assert_eq!(
            parse_mentions("next up <@U123ABC> then <@W999>"),
            vec!["U123ABC", "W999"]
        );
    }

    #[test]
    fn test_identifier_body_is_opaque() {
        assert_eq!(parse_mentions("<@U1|alice>"), vec!["U1|alice"]);
    }

    #[test]
    fn test_nested_markers_are_rejected() {
        assert!(parse_mentions("<@<@U1>>").is_empty());
    }

    #[test]
    fn test_format_mention() {
        assert_eq!(format_mention("U42"), "<@U42>");
    }
}
