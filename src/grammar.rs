//! Grammar validation helpers for MIME type names.
//!
//! Based on the RFC 2045 token definition; a registered name such as
//! `text/plain` is two tokens joined by a single slash.

/// Reports whether the character is in 'tspecials' as defined by RFC 1521 and RFC 2045.
///
/// tspecials := "(" / ")" / "<" / ">" / "@" / "," / ";" / ":" / "\" / <"> / "/" / "[" / "]" / "?" / "="
pub fn is_tspecial(c: char) -> bool {
    matches!(c, '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '=')
}

/// Reports whether the character is in 'token' as defined by RFC 1521 and RFC 2045.
///
/// token := 1*<any (US-ASCII) CHAR except SPACE, CTLs, or tspecials>
pub fn is_token_char(c: char) -> bool {
    c > '\x20' && c < '\x7f' && !is_tspecial(c)
}

/// Reports whether the string is a valid 'token' as defined by RFC 1521 and RFC 2045.
///
/// A token must be non-empty and contain only valid token characters.
pub fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

/// Reports whether the string is a structurally valid MIME type name:
/// exactly one `/` separating two non-empty tokens.
///
/// # Examples
///
/// ```
/// use mimeinfo::grammar::is_valid_mime_type;
///
/// assert!(is_valid_mime_type("text/plain"));
/// assert!(is_valid_mime_type("application/x-foo"));
/// assert!(!is_valid_mime_type("text"));
/// assert!(!is_valid_mime_type("text/pl ain"));
/// assert!(!is_valid_mime_type("a/b/c"));
/// ```
pub fn is_valid_mime_type(s: &str) -> bool {
    match s.split_once('/') {
        Some((media, sub)) => is_token(media) && is_token(sub),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_tspecial() {
        assert!(is_tspecial('('));
        assert!(is_tspecial('/'));
        assert!(is_tspecial('='));
        assert!(!is_tspecial('a'));
        assert!(!is_tspecial('-'));
    }

    #[test]
    fn test_is_token_char() {
        assert!(is_token_char('a'));
        assert!(is_token_char('X'));
        assert!(is_token_char('-'));
        assert!(is_token_char('+'));
        assert!(!is_token_char(' '));
        assert!(!is_token_char('/'));
        assert!(!is_token_char('\x7f'));
        assert!(!is_token_char('\x01'));
    }

    #[test]
    fn test_is_token() {
        assert!(is_token("plain"));
        assert!(is_token("x-tar"));
        assert!(is_token("svg+xml"));
        assert!(!is_token(""));
        assert!(!is_token("has space"));
    }

    #[test]
    fn test_is_valid_mime_type() {
        assert!(is_valid_mime_type("text/plain"));
        assert!(is_valid_mime_type("image/svg+xml"));
        assert!(is_valid_mime_type("application/vnd.oasis.opendocument.text"));
        assert!(!is_valid_mime_type("text"));
        assert!(!is_valid_mime_type("/plain"));
        assert!(!is_valid_mime_type("text/"));
        assert!(!is_valid_mime_type("te xt/plain"));
        assert!(!is_valid_mime_type("a/b/c"));
    }
}
