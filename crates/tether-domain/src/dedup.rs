//! Duplicate detection helpers
//!
//! Two entities are considered the same when they share a type, an exact
//! name, and at least one phone-shaped or email-shaped fragment in their
//! details or contact data.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Minimum digit count for a run of digits to count as a phone number
pub const MIN_PHONE_DIGITS: usize = 7;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\d[\d\s().\-]{5,}\d").expect("phone pattern is valid")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("date pattern is valid")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

/// Keep only ASCII digits
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Extract normalized phone-like and email-like fragments from free text
///
/// Phones are reduced to their digits (and dropped below
/// [`MIN_PHONE_DIGITS`]); emails are lowercased.
pub fn contact_fragments(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();

    for m in EMAIL_RE.find_iter(text) {
        out.insert(m.as_str().to_lowercase());
    }

    // Emails and ISO dates are removed first so their digits are not read as phones
    let without_emails = EMAIL_RE.replace_all(text, " ");
    let scrubbed = DATE_RE.replace_all(&without_emails, " ");
    for m in PHONE_RE.find_iter(&scrubbed) {
        for digits in split_phone_run(m.as_str()) {
            if digits.len() >= MIN_PHONE_DIGITS {
                out.insert(digits);
            }
        }
    }

    out
}

/// Split a phone-shaped match into the numbers it contains
///
/// Whitespace-separated groups are joined into one number until it is long
/// enough to be a phone, so `555 123 4567` stays whole while
/// `5551234567 5559876543` yields two numbers.
fn split_phone_run(run: &str) -> Vec<String> {
    let mut numbers = Vec::new();
    let mut current = String::new();

    for group in run.split_whitespace().map(digits_only) {
        if current.len() >= MIN_PHONE_DIGITS && group.len() >= MIN_PHONE_DIGITS {
            numbers.push(std::mem::take(&mut current));
        }
        current.push_str(&group);
    }
    if !current.is_empty() {
        numbers.push(current);
    }
    numbers
}

/// Whether two fragment sets share anything
pub fn fragments_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.intersection(b).next().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_fragments_normalize() {
        let fragments = contact_fragments("Call (555) 123-4567 or +1 555.987.6543");
        assert!(fragments.contains("5551234567"));
        assert!(fragments.contains("15559876543"));
    }

    #[test]
    fn test_space_separated_numbers_stay_apart() {
        let fragments = contact_fragments("5551234567 5559876543");
        assert_eq!(fragments.len(), 2);
        assert!(fragments.contains("5551234567"));
        assert!(fragments.contains("5559876543"));

        let grouped = contact_fragments("home 555 123 4567  work +1 555 987 6543");
        assert!(grouped.contains("5551234567"));
        assert!(grouped.contains("15559876543"));
    }

    #[test]
    fn test_short_numbers_ignored() {
        let fragments = contact_fragments("Room 12, ext 345, born 1990");
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_dates_are_not_phones() {
        let fragments = contact_fragments("Birthday: 1990-04-12");
        assert!(fragments.is_empty());
    }

    #[test]
    fn test_email_fragments_lowercased() {
        let fragments = contact_fragments("Reach me at Alice.Smith+tag@Example.COM");
        assert!(fragments.contains("alice.smith+tag@example.com"));
        assert_eq!(fragments.len(), 1);
    }

    #[test]
    fn test_overlap() {
        let a = contact_fragments("Phone: 5551234567");
        let b = contact_fragments("old number 555 123 4567, new 5550000000");
        let c = contact_fragments("bob@example.com");
        assert!(fragments_overlap(&a, &b));
        assert!(!fragments_overlap(&a, &c));
    }
}
