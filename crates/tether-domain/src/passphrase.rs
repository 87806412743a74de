//! Backup passphrase rules

/// Number of words in a backup passphrase
pub const PASSPHRASE_WORDS: usize = 6;

/// Check that a passphrase is exactly six lowercase alphabetic words
///
/// Words may be separated by any run of whitespace.
///
/// # Examples
///
/// ```
/// use tether_domain::passphrase::validate_passphrase;
///
/// assert!(validate_passphrase("one two three four five six"));
/// assert!(!validate_passphrase("One two three four five six"));
/// assert!(!validate_passphrase("one two three four five"));
/// ```
pub fn validate_passphrase(s: &str) -> bool {
    let words: Vec<&str> = s.split_whitespace().collect();
    words.len() == PASSPHRASE_WORDS
        && words
            .iter()
            .all(|w| w.chars().all(|c| c.is_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_six_words_any_spacing() {
        assert!(validate_passphrase("alpha  bravo\tcharlie delta echo\nfoxtrot"));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(!validate_passphrase(""));
        assert!(!validate_passphrase("one two three four five six seven"));
        assert!(!validate_passphrase("one two three four five s1x"));
        assert!(!validate_passphrase("one two three four five six!"));
        assert!(!validate_passphrase("one two three four five café"));
    }
}
