//! Canonical Slack user mentions.
//!
//! Every mention this system emits has exactly one textual form:
//! `<@USERID>` where the ID is `U` followed by uppercase alphanumerics.
//! LLM output and hand-edited messages routinely drop the wrapper or add
//! stray whitespace; `normalize_mention` repairs what it can and leaves the
//! rest for the codec's precondition check to reject.

/// Returns true when `mention` matches `<@U[A-Z0-9]+>` exactly.
pub fn is_canonical_mention(mention: &str) -> bool {
    let Some(inner) = mention.strip_prefix("<@").and_then(|rest| rest.strip_suffix('>')) else {
        return false;
    };
    is_user_id(inner)
}

/// Returns true for a bare Slack user ID: `U` followed by at least one
/// uppercase letter or digit.
pub fn is_user_id(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() >= 2
        && bytes[0] == b'U'
        && bytes[1..].iter().all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit())
}

/// Best-effort repair to canonical form. Idempotent: canonical input comes
/// back unchanged. A bare user ID gains the `<@...>` wrapper; a wrapper with
/// stray inner whitespace is tightened. Anything else is returned as-is so
/// the caller's validation can name the offending string.
pub fn normalize_mention(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_canonical_mention(trimmed) {
        return trimmed.to_string();
    }
    if is_user_id(trimmed) {
        return format!("<@{trimmed}>");
    }
    if let Some(inner) = trimmed.strip_prefix("<@").and_then(|rest| rest.strip_suffix('>')) {
        let inner = inner.trim();
        if is_user_id(inner) {
            return format!("<@{inner}>");
        }
    }
    trimmed.to_string()
}

/// Finds the first canonical mention embedded in free text, e.g. the
/// `<@U123>` inside a rendered `✅ <@U123>` section.
pub fn find_mention(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find("<@") {
        let start = search_from + offset;
        let Some(end) = text[start..].find('>') else {
            return None;
        };
        let candidate = &text[start..=start + end];
        if is_canonical_mention(candidate) {
            return Some(candidate);
        }
        search_from = start + 2;
    }
    None
}

/// Strips a single leading self-mention of `bot_user_id` from `text` and
/// trims the remainder. Mentions later in the text belong to the user's
/// request and are left alone.
pub fn strip_leading_mention(text: &str, bot_user_id: &str) -> String {
    let trimmed = text.trim_start();
    let tag = format!("<@{bot_user_id}>");
    let stripped = trimmed.strip_prefix(tag.as_str()).unwrap_or(trimmed);
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        find_mention, is_canonical_mention, is_user_id, normalize_mention, strip_leading_mention,
    };

    #[test]
    fn canonical_mentions_are_recognized() {
        assert!(is_canonical_mention("<@U12345>"));
        assert!(is_canonical_mention("<@UABC09>"));
        assert!(!is_canonical_mention("U12345"));
        assert!(!is_canonical_mention("<@u12345>"));
        assert!(!is_canonical_mention("<@W12345>"));
        assert!(!is_canonical_mention("<@U>"));
        assert!(!is_canonical_mention("<@U12 45>"));
        assert!(!is_canonical_mention(""));
    }

    #[test]
    fn user_id_requires_leading_u_and_uppercase_body() {
        assert!(is_user_id("U1"));
        assert!(is_user_id("U0XYZ99"));
        assert!(!is_user_id("U"));
        assert!(!is_user_id("u123"));
        assert!(!is_user_id("X123"));
    }

    #[test]
    fn normalization_is_idempotent_on_canonical_input() {
        assert_eq!(normalize_mention("<@U12345>"), "<@U12345>");
        assert_eq!(normalize_mention(&normalize_mention("U12345")), "<@U12345>");
    }

    #[test]
    fn normalization_wraps_bare_user_ids() {
        assert_eq!(normalize_mention("U12345"), "<@U12345>");
        assert_eq!(normalize_mention("  U12345  "), "<@U12345>");
    }

    #[test]
    fn normalization_tightens_sloppy_wrappers() {
        assert_eq!(normalize_mention("<@ U12345 >"), "<@U12345>");
    }

    #[test]
    fn normalization_passes_garbage_through_for_later_rejection() {
        assert_eq!(normalize_mention("invalidUserIdFormat"), "invalidUserIdFormat");
        assert!(!is_canonical_mention(&normalize_mention("invalidUserIdFormat")));
    }

    #[test]
    fn finds_first_mention_in_rendered_text() {
        assert_eq!(find_mention("✅ <@U1A2B>"), Some("<@U1A2B>"));
        assert_eq!(find_mention("⬜ <@U9> then <@U8>"), Some("<@U9>"));
        assert_eq!(find_mention("no mentions here"), None);
        assert_eq!(find_mention("<@bogus> but then <@U77>"), Some("<@U77>"));
        assert_eq!(find_mention("<@unterminated"), None);
    }

    #[test]
    fn strips_only_the_leading_bot_mention() {
        assert_eq!(strip_leading_mention("<@UBOT> move U2 online", "UBOT"), "move U2 online");
        assert_eq!(
            strip_leading_mention("  <@UBOT>   swap <@U1> and <@U2>  ", "UBOT"),
            "swap <@U1> and <@U2>"
        );
        assert_eq!(strip_leading_mention("plain request", "UBOT"), "plain request");
        assert_eq!(strip_leading_mention("<@UBOT>", "UBOT"), "");
        assert_eq!(strip_leading_mention("<@UOTHER> hi", "UBOT"), "<@UOTHER> hi");
    }
}
