use std::path::Path;

use serde_json::Value;

use crate::error::VerifyError;

pub fn assert_exists(path: &Path) -> Result<(), VerifyError> {
    if path.exists() {
        Ok(())
    } else {
        Err(VerifyError::MissingFile {
            path: path.to_path_buf(),
        })
    }
}

pub fn read(path: &Path) -> Result<String, VerifyError> {
    assert_exists(path)?;
    std::fs::read_to_string(path).map_err(|e| VerifyError::ReadFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub fn assert_file_contains(path: &Path, expected: &str) -> Result<(), VerifyError> {
    let content = read(path)?;
    super::text::contains(&content, expected)
}

pub fn assert_file_json(path: &Path) -> Result<Value, VerifyError> {
    let content = read(path)?;
    super::json::extract(&content)
}
