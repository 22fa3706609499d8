use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Angle brackets are excluded so Discord's `<https://...>` (embed suppressed) still matches,
    // and `|` so a `||spoiler||` wrapper never ends up inside the link.
    RE.get_or_init(|| Regex::new(r"(?i)\bhttps?://[^\s<>|]+").expect("valid regex"))
}

/// Extract every http(s) link from a chat message, in order.
///
/// Duplicates are kept: each occurrence becomes its own job. Links starting
/// with `ignore_prefix` (the bot's own CDN) are skipped.
pub fn extract_links(text: &str, ignore_prefix: Option<&str>) -> Vec<Url> {
    link_re()
        .find_iter(text)
        .map(|m| trim_trailing_punctuation(m.as_str()))
        .filter(|candidate| match ignore_prefix {
            Some(prefix) if !prefix.is_empty() => !candidate.starts_with(prefix),
            _ => true,
        })
        .filter_map(|candidate| Url::parse(candidate).ok())
        .filter(|url| url.host_str().is_some_and(|h| !h.is_empty()))
        .collect()
}

/// Drop sentence punctuation glued to the end of a link, keeping balanced
/// closing parens (`https://en.wikipedia.org/wiki/Foo_(bar)`).
fn trim_trailing_punctuation(s: &str) -> &str {
    let mut end = s.len();
    loop {
        let Some(last) = s[..end].chars().next_back() else {
            break;
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' | '*' | '_' | '~' | '`' => true,
            ')' => {
                let body = &s[..end];
                body.matches('(').count() < body.matches(')').count()
            }
            ']' => {
                let body = &s[..end];
                body.matches('[').count() < body.matches(']').count()
            }
            _ => false,
        };
        if !strip {
            break;
        }
        end -= last.len_utf8();
    }
    &s[..end]
}
