//! Node name matching with SCPI abbreviation rules.
//!
//! A node name is an uppercase mandatory stem followed by an optional
//! lowercase suffix (`VERSion`). The input may spell the stem alone or
//! the full name, in any case. Nothing in between is accepted.

/// Match the start of `input` against `name`.
///
/// Returns the number of input bytes the name accepts, 0 for no match.
pub fn match_name(input: &[u8], name: &str) -> usize {
    let name = name.as_bytes();
    let mut matched = 0usize;

    while let Some(&expected) = name.get(matched) {
        let next = input.get(matched).copied();
        if next.is_some_and(|c| c.eq_ignore_ascii_case(&expected)) {
            matched += 1;
            continue;
        }

        if matched == 0 {
            return 0;
        }
        // The whole stem must be spelled
        if expected.is_ascii_uppercase() || expected.is_ascii_digit() {
            return 0;
        }
        // The token must end here
        if next.is_some_and(|c| c.is_ascii_alphabetic()) {
            return 0;
        }
        // Truncating inside the suffix is not allowed
        if !name[matched - 1].is_ascii_uppercase() {
            return 0;
        }
        return matched;
    }

    if input.get(matched).is_some_and(|c| c.is_ascii_alphabetic()) {
        return 0;
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_and_full_name() {
        assert_eq!(match_name(b"VERS", "VERSion"), 4);
        assert_eq!(match_name(b"VERSION", "VERSion"), 7);
        assert_eq!(match_name(b"vers?", "VERSion"), 4);
        assert_eq!(match_name(b"version?", "VERSion"), 7);
    }

    #[test]
    fn test_partial_suffix_rejected() {
        assert_eq!(match_name(b"VERSIO", "VERSion"), 0);
        assert_eq!(match_name(b"VERSi", "VERSion"), 0);
        assert_eq!(match_name(b"VERSIO?", "VERSion"), 0);
    }

    #[test]
    fn test_partial_stem_rejected() {
        assert_eq!(match_name(b"VER", "VERSion"), 0);
        assert_eq!(match_name(b"FX", "FX2"), 0);
    }

    #[test]
    fn test_trailing_letters_rejected() {
        assert_eq!(match_name(b"VERSIONX", "VERSion"), 0);
        assert_eq!(match_name(b"VERSX", "VERSion"), 0);
        assert_eq!(match_name(b"IDNX", "IDN"), 0);
    }

    #[test]
    fn test_delimiters_end_token() {
        assert_eq!(match_name(b"IDN?", "IDN"), 3);
        assert_eq!(match_name(b"SYST:VERS", "SYSTem"), 4);
        assert_eq!(match_name(b"RES 1", "RESet"), 3);
        assert_eq!(match_name(b"WINDow;POS", "WINDow"), 6);
        assert_eq!(match_name(b"FX2:RES", "FX2"), 3);
    }

    #[test]
    fn test_empty_and_mismatch() {
        assert_eq!(match_name(b"", "VERSion"), 0);
        assert_eq!(match_name(b"?", "VERSion"), 0);
        assert_eq!(match_name(b"ECHO", "VERSion"), 0);
    }
}
