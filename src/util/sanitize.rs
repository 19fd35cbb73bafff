use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern should be valid"));
static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9_-]").expect("unsafe char pattern should be valid")
});

/// Converts a human readable name into a token safe for file names.
///
/// Every run of whitespace becomes a single `_`, every other character outside of `[A-Za-z0-9_-]`
/// becomes `-`.
pub fn sanitize(name: &str) -> String {
    let name = WHITESPACE.replace_all(name, "_");
    UNSAFE_CHARS.replace_all(&name, "-").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_token(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    #[test]
    fn replaces_whitespace_and_symbols() {
        assert_eq!(sanitize("My Photos"), "My_Photos");
        assert_eq!(sanitize("a\tb\nc"), "a_b_c");
        assert_eq!(sanitize("My  Photos"), "My_Photos");
        assert_eq!(sanitize(" \t padded \n"), "_padded_");
        assert_eq!(sanitize("app/db:main"), "app-db-main");
        assert_eq!(sanitize("Grüße & Co."), "Gr--e_-_Co-");
    }

    #[test]
    fn keeps_safe_names() {
        assert_eq!(sanitize("already_safe-Name01"), "already_safe-Name01");
    }

    #[test]
    fn output_is_token_and_idempotent() {
        for name in ["My Photos", "$(rm -rf /)", "'quoted'", "über  alles", "a;b|c&d"] {
            let once = sanitize(name);
            assert!(is_token(&once), "{once} should be a safe token");
            assert_eq!(sanitize(&once), once);
        }
    }
}
