//! Phone-number identity normalization and matching.
//!
//! WhatsApp identifies a conversation by a JID like `33612345678@s.whatsapp.net`,
//! while a contact is configured with a human-typed number like `+33 6 12 34 56 78`.
//! The same peer can also show up with or without its country code depending on
//! how the phone stored it. Matching must therefore be suffix-aware, not strict.

/// Transport suffixes stripped before digit extraction.
const JID_SUFFIXES: [&str; 3] = ["@s.whatsapp.net", "@c.us", "@g.us"];

/// Assumed country-code width for the prefix-tolerant comparison.
const COUNTRY_CODE_LEN: usize = 2;

/// Normalize a raw identifier to its digit form.
///
/// Strips known transport suffixes first, then every non-digit character, so
/// `"+33 6 12 34 56 78"` and `"33612345678@c.us"` both normalize to
/// `"33612345678"`.
pub fn normalize(raw: &str) -> String {
    let mut s = raw;
    for suffix in JID_SUFFIXES {
        if let Some(stripped) = s.strip_suffix(suffix) {
            s = stripped;
            break;
        }
    }
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Suffix-aware identity comparison.
///
/// Two identifiers match when their normalized forms are equal, or when one
/// equals the other with its leading country code (2 digits) removed. The
/// comparison is deliberately symmetric: a contact stored as `"+33612345678"`
/// matches an incoming `"612345678"` and vice versa.
///
/// Identifiers of `COUNTRY_CODE_LEN` digits or fewer only ever match their
/// exact equal: stripping the assumed country code from them would leave an
/// empty or near-empty string and produce false positives.
pub fn matches(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);

    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    if a.len() <= COUNTRY_CODE_LEN || b.len() <= COUNTRY_CODE_LEN {
        return false;
    }

    a[COUNTRY_CODE_LEN..] == b || b[COUNTRY_CODE_LEN..] == a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_jid_suffix() {
        assert_eq!(normalize("33612345678@c.us"), "33612345678");
        assert_eq!(normalize("33612345678@s.whatsapp.net"), "33612345678");
    }

    #[test]
    fn test_normalize_strips_formatting() {
        assert_eq!(normalize("+33 6 12 34 56 78"), "33612345678");
        assert_eq!(normalize("(06) 12-34-56-78"), "0612345678");
    }

    #[test]
    fn test_matches_exact() {
        assert!(matches("33612345678", "33612345678"));
        assert!(matches("33612345678@c.us", "+33612345678"));
    }

    #[test]
    fn test_matches_without_country_code() {
        assert!(matches("33612345678", "612345678"));
        assert!(matches("612345678", "33612345678"));
    }

    #[test]
    fn test_no_match_different_numbers() {
        assert!(!matches("33612345678", "33698765432"));
    }

    #[test]
    fn test_short_numbers_never_match_via_stripping() {
        // "33" minus its country code is empty and must not match anything.
        assert!(!matches("33", "612345678"));
        assert!(!matches("612345678", "33"));
        assert!(matches("33", "33"));
    }

    #[test]
    fn test_empty_never_matches() {
        assert!(!matches("", ""));
        assert!(!matches("@c.us", "33612345678"));
    }

    #[test]
    fn test_matches_is_not_substring_containment() {
        // Sharing a tail is not enough: only a country-code-width prefix may differ.
        assert!(!matches("5212345678", "12345"));
    }
}
