//! Placeholder tokens in directives.

use std::collections::BTreeMap;

use crate::error::PreconditionError;

pub const TEMP_MODELS_DIR: &str = "{{temp_models_dir}}";
pub const CUSTOM_DET_MODEL: &str = "{{custom_det_model}}";
pub const CUSTOM_REC_MODEL: &str = "{{custom_rec_model}}";
pub const CUSTOM_DICT: &str = "{{custom_dict}}";
pub const ROOT: &str = "{{root}}";
pub const SERVER_URL: &str = "{{server_url}}";

/// Every token and what an earlier step must have created for it.
pub const TOKENS: [(&str, &str); 6] = [
    (TEMP_MODELS_DIR, "temporary models directory"),
    (CUSTOM_DET_MODEL, "custom detection model"),
    (CUSTOM_REC_MODEL, "custom recognition model"),
    (CUSTOM_DICT, "custom dictionary"),
    (ROOT, "scenario root directory"),
    (SERVER_URL, "running server"),
];

/// Replaces every known token that occurs in `directive`.
///
/// A token with no recorded value fails instead of leaving the literal
/// placeholder in the command line.
pub fn substitute(
    directive: &str,
    values: &BTreeMap<&'static str, String>,
) -> Result<String, PreconditionError> {
    let mut result = directive.to_string();
    for (token, what) in TOKENS {
        if !result.contains(token) {
            continue;
        }
        let value = values
            .get(token)
            .ok_or_else(|| PreconditionError::UnresolvedToken {
                token: token.to_string(),
                what: what.to_string(),
            })?;
        result = result.replace(token, value);
    }
    Ok(result)
}
