//! Case classification and case-preserving rendering.

use serde::Serialize;

/// Casing class of a matched span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseClass {
    /// "JOHN SMITH"
    Upper,
    /// "john smith"
    Lower,
    /// "John Smith"
    Title,
    /// Anything else, including spans without cased letters.
    Mixed,
}

impl CaseClass {
    /// Classify a span. Checks run in order: upper, lower, title.
    pub fn of(text: &str) -> Self {
        if !text.chars().any(is_cased) {
            return CaseClass::Mixed;
        }
        if !text.chars().any(char::is_lowercase) {
            return CaseClass::Upper;
        }
        if !text.chars().any(char::is_uppercase) {
            return CaseClass::Lower;
        }
        if text.split_whitespace().all(is_title_token) {
            return CaseClass::Title;
        }
        CaseClass::Mixed
    }

    /// Render `replacement` in this class.
    pub fn apply(self, replacement: &str) -> String {
        match self {
            CaseClass::Upper => replacement.to_uppercase(),
            CaseClass::Lower => replacement.to_lowercase(),
            CaseClass::Title => title_case(replacement),
            CaseClass::Mixed => replacement.to_string(),
        }
    }

    /// Whether rendering in this class can be inverted by re-classifying.
    pub fn is_regular(self) -> bool {
        !matches!(self, CaseClass::Mixed)
    }
}

/// Render `replacement` in the casing class of `matched`.
pub fn preserve_case(matched: &str, replacement: &str) -> String {
    CaseClass::of(matched).apply(replacement)
}

fn is_cased(c: char) -> bool {
    c.is_uppercase() || c.is_lowercase()
}

/// First character upper-case or uncased; no later upper-case letters.
fn is_title_token(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => false,
        Some(_) => !chars.any(char::is_uppercase),
        None => true,
    }
}

/// Upper-case the first letter of each whitespace-delimited token, lower-case
/// the rest of the token. Whitespace runs are kept as they are.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_token_start = true;
    for c in text.chars() {
        if c.is_whitespace() {
            out.push(c);
            at_token_start = true;
        } else if at_token_start {
            out.extend(c.to_uppercase());
            at_token_start = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// Case-fold for lookup keys and scanning.
///
/// Each character is lower-cased only when that yields exactly one character
/// of the same UTF-8 width, so byte offsets in the folded text are byte
/// offsets in the original.
pub fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        out.push(fold_char(c));
    }
    out
}

fn fold_char(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) if l.len_utf8() == c.len_utf8() => l,
        _ => c,
    }
}

/// Word character for boundary checks: Unicode alphanumeric or underscore.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(CaseClass::of("JOHN SMITH"), CaseClass::Upper);
        assert_eq!(CaseClass::of("john smith"), CaseClass::Lower);
        assert_eq!(CaseClass::of("John Smith"), CaseClass::Title);
        assert_eq!(CaseClass::of("jOHN"), CaseClass::Mixed);
        assert_eq!(CaseClass::of("McDonald"), CaseClass::Mixed);
        assert_eq!(CaseClass::of("555-0100"), CaseClass::Mixed);
        assert_eq!(CaseClass::of("John"), CaseClass::Title);
        assert_eq!(CaseClass::of("J"), CaseClass::Upper);
    }

    #[test]
    fn test_classify_emails() {
        assert_eq!(CaseClass::of("john@x.com"), CaseClass::Lower);
        assert_eq!(CaseClass::of("JOHN@X.COM"), CaseClass::Upper);
        assert_eq!(CaseClass::of("John@x.com"), CaseClass::Title);
    }

    #[test]
    fn test_apply() {
        assert_eq!(preserve_case("JOHN SMITH", "Alex Johnson"), "ALEX JOHNSON");
        assert_eq!(preserve_case("john smith", "Alex Johnson"), "alex johnson");
        assert_eq!(preserve_case("John Smith", "alex johnson"), "Alex Johnson");
        assert_eq!(preserve_case("jOHN sMITH", "Alex johnson"), "Alex johnson");
    }

    #[test]
    fn test_title_case_keeps_whitespace() {
        assert_eq!(title_case("alex  van\tdyke"), "Alex  Van\tDyke");
        assert_eq!(title_case("ALEX"), "Alex");
    }

    #[test]
    fn test_fold_preserves_byte_length() {
        for s in ["JOHN", "Ärger", "İstanbul", "ẞtraße", "Σίσυφος", "ＦＵＬＬ"] {
            assert_eq!(fold(s).len(), s.len(), "{s}");
        }
        assert_eq!(fold("JoHn"), "john");
        assert_eq!(fold("ÄRGER"), "ärger");
    }

    #[test]
    fn test_word_chars() {
        assert!(is_word_char('a'));
        assert!(is_word_char('é'));
        assert!(is_word_char('_'));
        assert!(is_word_char('7'));
        assert!(!is_word_char('\''));
        assert!(!is_word_char(' '));
    }
}
