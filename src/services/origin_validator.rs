//! Origin allow-list parsing and matching.
//!
//! An allow-list is entered as a block of text with one URL pattern per
//! line. Patterns use shell-glob syntax (`*`, `?`, `[...]`) and are matched
//! against the whole origin string, so `*` also crosses `.` and `/`.
//! `https://*.example.com` therefore matches `https://evil.com/.example.com`
//! too; patterns have to be written with that in mind.

use crate::error::AppError;

/// Split an allow-list block into trimmed, non-empty lines.
fn pattern_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Check one line: an absolute `http`/`https` URL with a non-empty host.
fn is_valid_pattern(line: &str) -> bool {
    match url::Url::parse(line) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Validate an allow-list block.
///
/// Blank input is valid and means "no restriction". Any malformed line
/// fails the whole block.
pub fn validate(pattern_list: &str) -> bool {
    pattern_lines(pattern_list).all(is_valid_pattern)
}

/// Parse an allow-list block into the value stored on a key.
///
/// # Returns
///
/// - `Ok(None)` for blank input (clears the allow-list)
/// - `Ok(Some(patterns))` for a valid list
///
/// # Errors
///
/// `ValidationFailed` if any line is malformed. Callers must not apply any
/// part of the list in that case.
pub fn parse_allowed_origins(pattern_list: &str) -> Result<Option<Vec<String>>, AppError> {
    if !validate(pattern_list) {
        return Err(AppError::ValidationFailed(
            "Please enter one origin URL per line or empty the box completely".to_string(),
        ));
    }

    let patterns: Vec<String> = pattern_lines(pattern_list).map(str::to_string).collect();

    if patterns.is_empty() {
        Ok(None)
    } else {
        Ok(Some(patterns))
    }
}

/// Collapse runs of `*` into one. `**` means the same as `*` in an
/// allow-list, but `glob` only accepts it as a whole path component.
fn collapse_stars(pattern: &str) -> String {
    let mut collapsed = String::with_capacity(pattern.len());
    let mut after_star = false;

    for c in pattern.chars() {
        if c == '*' && after_star {
            continue;
        }
        after_star = c == '*';
        collapsed.push(c);
    }

    collapsed
}

/// Match an origin against one allow-list pattern.
///
/// `**` behaves like `*`. Brackets that do not form a valid character
/// class (an unclosed `[`, say) are matched literally while `*` and `?`
/// keep their meaning.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    let pattern = collapse_stars(pattern);

    if let Ok(compiled) = glob::Pattern::new(&pattern) {
        return compiled.matches(origin);
    }

    let literal_brackets: String = pattern
        .chars()
        .map(|c| match c {
            '[' => "[[]".to_string(),
            ']' => "[]]".to_string(),
            other => other.to_string(),
        })
        .collect();

    match glob::Pattern::new(&literal_brackets) {
        Ok(compiled) => compiled.matches(origin),
        Err(_) => pattern == origin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_means_no_restriction() {
        assert!(validate(""));
        assert!(validate("   \n  "));
        assert_eq!(parse_allowed_origins("  \n\n ").unwrap(), None);
    }

    #[test]
    fn any_malformed_line_fails_the_block() {
        assert!(!validate("https://a.example\nnot-a-url"));
        assert!(!validate("ftp://files.example.com"));
        assert!(!validate("https://"));
        assert!(!validate("example.com"));
    }

    #[test]
    fn http_and_https_urls_are_accepted() {
        assert!(validate("https://a.example\nhttp://localhost:8080"));
        assert!(validate("  https://maps.example.com/path  \n"));
    }

    #[test]
    fn wildcard_hosts_are_accepted() {
        assert!(validate("https://*.example.com"));
    }

    #[test]
    fn parsed_lists_are_trimmed_and_skip_blank_lines() {
        let parsed = parse_allowed_origins(" https://a.example \n\n http://b.example\n").unwrap();

        assert_eq!(
            parsed,
            Some(vec![
                "https://a.example".to_string(),
                "http://b.example".to_string()
            ])
        );
    }

    #[test]
    fn parse_rejects_invalid_lists() {
        let result = parse_allowed_origins("https://a.example\nnot-a-url");
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }

    #[test]
    fn glob_matching() {
        assert!(origin_matches("https://*.example.com", "https://sub.example.com"));
        assert!(!origin_matches("https://other.com", "https://sub.example.com"));
        assert!(origin_matches("https://?.example.com", "https://a.example.com"));
        assert!(origin_matches("https://[ab].example.com", "https://b.example.com"));
        assert!(!origin_matches("https://[ab].example.com", "https://c.example.com"));
    }

    #[test]
    fn star_is_permissive_across_separators() {
        assert!(origin_matches("https://*example.com", "https://evil-example.com"));
        assert!(origin_matches("https://*", "https://a.b/c"));
    }

    #[test]
    fn double_star_matches_like_a_single_star() {
        assert!(validate("https://**.example.com"));
        assert!(origin_matches("https://**.example.com", "https://a.example.com"));
        assert!(origin_matches("https://***", "https://a.b/c"));
        assert!(!origin_matches("https://**.example.com", "https://example.org"));
    }

    #[test]
    fn stray_brackets_keep_wildcards_working() {
        assert!(origin_matches("https://*[.example", "https://x[.example"));
        assert!(origin_matches("https://a].example", "https://a].example"));
        assert!(!origin_matches("https://*[.example", "https://x.example"));
    }

    #[test]
    fn invalid_glob_syntax_matches_literally() {
        assert!(origin_matches("https://a[.example", "https://a[.example"));
        assert!(!origin_matches("https://a[.example", "https://ab.example"));
    }
}
