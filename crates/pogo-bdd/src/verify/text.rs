use regex::Regex;

use crate::error::VerifyError;

/// Characters whose presence shows non-ASCII text survived the round trip.
pub const LOCALE_CHARS: [char; 7] = ['ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß'];

pub fn contains(output: &str, expected: &str) -> Result<(), VerifyError> {
    if output.contains(expected) {
        Ok(())
    } else {
        Err(VerifyError::NotFound {
            expected: expected.to_string(),
            output: output.to_string(),
        })
    }
}

pub fn contains_ignore_case(output: &str, expected: &str) -> Result<(), VerifyError> {
    if output.to_lowercase().contains(&expected.to_lowercase()) {
        Ok(())
    } else {
        Err(VerifyError::NotFound {
            expected: expected.to_string(),
            output: output.to_string(),
        })
    }
}

pub fn not_contains(output: &str, unexpected: &str) -> Result<(), VerifyError> {
    if output.contains(unexpected) {
        Err(VerifyError::UnexpectedlyFound {
            unexpected: unexpected.to_string(),
            output: output.to_string(),
        })
    } else {
        Ok(())
    }
}

pub fn has_locale_characters(output: &str) -> Result<(), VerifyError> {
    if output.chars().any(|c| LOCALE_CHARS.contains(&c)) {
        Ok(())
    } else {
        Err(VerifyError::NoLocaleCharacters {
            output: output.to_string(),
        })
    }
}

/// Asserts some part of `output` matches `pattern`.
pub fn matches_pattern(output: &str, pattern: &str) -> Result<(), VerifyError> {
    let re = Regex::new(pattern).map_err(|e| VerifyError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    if re.is_match(output) {
        Ok(())
    } else {
        Err(VerifyError::NoMatch {
            pattern: pattern.to_string(),
            output: output.to_string(),
        })
    }
}
