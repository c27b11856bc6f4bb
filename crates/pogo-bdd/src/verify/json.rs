//! JSON extraction and dotted-path navigation.
//!
//! Tool output often starts with banners or progress lines, so the payload
//! is located at the first line that begins with `{` or `[` and parses as
//! a value. A line whose value is cut short ends the search with an error.
//! Text after the value is ignored.

use log::debug;
use serde_json::Value;

use crate::error::VerifyError;

/// Path segment asserting that the preceding field is an array.
pub const ARRAY_SEGMENT: &str = "array";

pub fn extract(output: &str) -> Result<Value, VerifyError> {
    let mut first_error: Option<String> = None;

    for line_start in line_offsets(output) {
        let candidate = output[line_start..].trim_start_matches([' ', '\t']);
        if !candidate.starts_with(['{', '[']) {
            continue;
        }

        let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => return Ok(value),
            // A payload cut off mid-write is final; nested values inside it
            // must not be mistaken for the document.
            Some(Err(e)) if e.is_eof() => {
                return Err(VerifyError::InvalidJson {
                    reason: e.to_string(),
                    output: output.to_string(),
                })
            }
            // Bracketed log lines such as `[1/2] loading` are skipped.
            Some(Err(e)) => {
                debug!("skipping non-JSON line: {}", e);
                first_error.get_or_insert_with(|| e.to_string());
            }
            None => {}
        }
    }

    match first_error {
        Some(reason) => Err(VerifyError::InvalidJson {
            reason,
            output: output.to_string(),
        }),
        None => Err(VerifyError::NoJson {
            output: output.to_string(),
        }),
    }
}

fn line_offsets(output: &str) -> impl Iterator<Item = usize> + '_ {
    std::iter::once(0).chain(output.match_indices('\n').map(|(i, _)| i + 1))
}

/// Walks `path` (e.g. `ocr.regions`) through nested objects.
///
/// Numeric segments index into arrays. A segment equal to `array` ends the
/// walk and requires the value reached so far to be an array.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Result<&'a Value, VerifyError> {
    let mut current = value;

    for segment in path.split('.').filter(|s| !s.is_empty()) {
        if segment == ARRAY_SEGMENT {
            return if current.is_array() {
                Ok(current)
            } else {
                Err(VerifyError::NotAnArray {
                    path: path.to_string(),
                    json: pretty(value),
                })
            };
        }

        current = match current {
            Value::Object(map) => map.get(segment).ok_or_else(|| VerifyError::PathMissing {
                path: path.to_string(),
                segment: segment.to_string(),
                json: pretty(value),
            })?,
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(idx) => items.get(idx).ok_or_else(|| VerifyError::PathMissing {
                    path: path.to_string(),
                    segment: segment.to_string(),
                    json: pretty(value),
                })?,
                Err(_) => {
                    return Err(VerifyError::NotAnObject {
                        path: path.to_string(),
                        segment: segment.to_string(),
                        json: pretty(value),
                    })
                }
            },
            _ => {
                return Err(VerifyError::NotAnObject {
                    path: path.to_string(),
                    segment: segment.to_string(),
                    json: pretty(value),
                })
            }
        };
    }

    Ok(current)
}

/// Extracts JSON from `output` and asserts that `path` resolves.
pub fn assert_path(output: &str, path: &str) -> Result<Value, VerifyError> {
    let value = extract(output)?;
    let found = lookup(&value, path)?;
    Ok(found.clone())
}

pub fn array_len(value: &Value, path: &str) -> Result<usize, VerifyError> {
    match lookup(value, path)? {
        Value::Array(items) => Ok(items.len()),
        _ => Err(VerifyError::NotAnArray {
            path: path.to_string(),
            json: pretty(value),
        }),
    }
}

/// Compares the value at `path` with `expected`, where strings compare by
/// content and everything else by its JSON rendering.
pub fn assert_equals(value: &Value, path: &str, expected: &str) -> Result<(), VerifyError> {
    let found = lookup(value, path)?;
    let actual = match found {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if actual == expected {
        Ok(())
    } else {
        Err(VerifyError::ValueMismatch {
            path: path.to_string(),
            expected: expected.to_string(),
            actual,
            json: pretty(value),
        })
    }
}

/// Asserts `field` of every element of the array at `array_path` is a
/// number no smaller than `min`.
pub fn all_at_least(
    value: &Value,
    array_path: &str,
    field: &str,
    min: f64,
) -> Result<usize, VerifyError> {
    let items = match lookup(value, array_path)? {
        Value::Array(items) => items,
        _ => {
            return Err(VerifyError::NotAnArray {
                path: array_path.to_string(),
                json: pretty(value),
            })
        }
    };

    for (index, item) in items.iter().enumerate() {
        let actual = item
            .get(field)
            .and_then(Value::as_f64)
            .ok_or_else(|| VerifyError::PathMissing {
                path: format!("{}.{}.{}", array_path, index, field),
                segment: field.to_string(),
                json: pretty(value),
            })?;

        if actual < min {
            return Err(VerifyError::ConfidenceBelow {
                index,
                field: field.to_string(),
                actual,
                min,
                json: pretty(value),
            });
        }
    }

    Ok(items.len())
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "Loading detection model...\nLoading recognition model...\n{\"success\": true, \"ocr\": {\"regions\": [{\"text\": \"Hello\", \"det_conf\": 0.91}, {\"text\": \"World\", \"det_conf\": 0.85}]}}\n";

    #[test]
    fn test_extract_skips_preamble() {
        let value = extract(OUTPUT).unwrap();
        assert_eq!(value["success"], Value::Bool(true));
    }

    #[test]
    fn test_extract_skips_bracketed_progress_lines() {
        let output = "[1/2] loading models\n[2/2] running\n{\"ok\": 1}";
        let value = extract(output).unwrap();
        assert_eq!(value["ok"], 1);
    }

    #[test]
    fn test_extract_top_level_array() {
        let value = extract("models:\n[\"det\", \"rec\"]").unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_extract_no_json() {
        assert!(matches!(
            extract("plain text only"),
            Err(VerifyError::NoJson { .. })
        ));
    }

    #[test]
    fn test_extract_invalid_json() {
        assert!(matches!(
            extract("result:\n{\"unterminated\": "),
            Err(VerifyError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_truncated_object_is_invalid() {
        let output = "{\"success\": true, \"ocr\": {\"regions\": []}, \"filename\": ";
        assert!(matches!(extract(output), Err(VerifyError::InvalidJson { .. })));
        assert!(assert_path(output, "regions").is_err());
    }

    #[test]
    fn test_truncated_payload_hides_later_lines() {
        let output = "{\"ocr\": {\n  \"regions\": [\n{\"text\": \"Hello\"}\n";
        assert!(matches!(extract(output), Err(VerifyError::InvalidJson { .. })));
    }

    #[test]
    fn test_extract_ignores_mid_line_braces() {
        let output = "using config {default}\n  {\"ok\": true}\n";
        assert_eq!(extract(output).unwrap()["ok"], Value::Bool(true));
    }

    #[test]
    fn test_lookup_nested_path() {
        let value = extract(OUTPUT).unwrap();
        assert!(lookup(&value, "ocr.regions").unwrap().is_array());
        assert_eq!(lookup(&value, "ocr.regions.1.text").unwrap(), "World");
    }

    #[test]
    fn test_lookup_array_segment() {
        let value = extract(OUTPUT).unwrap();
        assert!(lookup(&value, "ocr.regions.array").is_ok());
        assert!(matches!(
            lookup(&value, "ocr.array"),
            Err(VerifyError::NotAnArray { .. })
        ));
    }

    #[test]
    fn test_lookup_missing_segment() {
        let value = extract(OUTPUT).unwrap();
        match lookup(&value, "ocr.pages") {
            Err(VerifyError::PathMissing { segment, .. }) => assert_eq!(segment, "pages"),
            other => panic!("Expected PathMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_lookup_through_scalar_fails() {
        let value = extract(OUTPUT).unwrap();
        assert!(matches!(
            lookup(&value, "success.value"),
            Err(VerifyError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let value = extract(OUTPUT).unwrap();
        let first = lookup(&value, "ocr.regions").unwrap().clone();
        let second = lookup(&value, "ocr.regions").unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(
            assert_path(OUTPUT, "ocr.regions").unwrap(),
            assert_path(OUTPUT, "ocr.regions").unwrap()
        );
    }

    #[test]
    fn test_all_at_least() {
        let value = extract(OUTPUT).unwrap();
        assert_eq!(all_at_least(&value, "ocr.regions", "det_conf", 0.8).unwrap(), 2);
        match all_at_least(&value, "ocr.regions", "det_conf", 0.9) {
            Err(VerifyError::ConfidenceBelow { index, .. }) => assert_eq!(index, 1),
            other => panic!("Expected ConfidenceBelow, got {:?}", other),
        }
    }

    #[test]
    fn test_assert_equals() {
        let value = extract(OUTPUT).unwrap();
        assert!(assert_equals(&value, "success", "true").is_ok());
        assert!(assert_equals(&value, "ocr.regions.0.text", "Hello").is_ok());
        assert!(assert_equals(&value, "ocr.regions.0.text", "World").is_err());
    }

    #[test]
    fn test_array_len() {
        let value = extract(OUTPUT).unwrap();
        assert_eq!(array_len(&value, "ocr.regions").unwrap(), 2);
        assert!(array_len(&value, "success").is_err());
    }
}
