/// Lowercase every token once so per-request matching only lowercases the UA.
pub fn normalize_tokens(tokens: &[String]) -> Vec<String> {
    tokens.iter().map(|t| t.to_ascii_lowercase()).collect()
}

/// Check whether a User-Agent names a browser.
///
/// Matching is plain substring containment, ASCII case-insensitive, against
/// tokens already lowercased by [`normalize_tokens`]. An empty UA never
/// matches. Since `mozilla` is a stock token, nearly every client that sends
/// a Mozilla-compatible UA passes this check.
pub fn is_browser(user_agent: &str, lowered_tokens: &[String]) -> bool {
    if user_agent.is_empty() {
        return false;
    }
    let ua_lower = user_agent.to_ascii_lowercase();
    lowered_tokens
        .iter()
        .any(|token| ua_lower.contains(token.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock_tokens() -> Vec<String> {
        normalize_tokens(&[
            "Chrome".into(),
            "Firefox".into(),
            "Safari".into(),
            "Edge".into(),
            "Opera".into(),
            "MSIE".into(),
            "Trident".into(),
            "Mozilla".into(),
        ])
    }

    #[test]
    fn test_real_browsers_match() {
        let tokens = stock_tokens();
        assert!(is_browser(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            &tokens
        ));
        assert!(is_browser(
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
            &tokens
        ));
        assert!(is_browser("Opera/9.80 (Windows NT 6.1) Presto/2.12", &tokens));
        assert!(is_browser("Trident/7.0; rv:11.0", &tokens));
    }

    #[test]
    fn test_case_insensitive() {
        let tokens = stock_tokens();
        assert!(is_browser("MOZILLA", &tokens));
        assert!(is_browser("firefox", &tokens));
        assert!(is_browser("xxmsiexx", &tokens));
    }

    #[test]
    fn test_non_browsers_rejected() {
        let tokens = stock_tokens();
        assert!(!is_browser("", &tokens));
        assert!(!is_browser("curl/7.68.0", &tokens));
        assert!(!is_browser("python-requests/2.31.0", &tokens));
        assert!(!is_browser("Wget/1.21", &tokens));
    }

    #[test]
    fn test_mozilla_compatible_libraries_pass() {
        let tokens = stock_tokens();
        assert!(is_browser("Mozilla/5.0 (compatible; MyScraper/1.0)", &tokens));
    }

    #[test]
    fn test_substring_inside_other_word() {
        // "Edge" inside "knowledge" still counts.
        assert!(is_browser("knowledge-fetcher/2.0", &stock_tokens()));
    }
}
