//! Shared helpers for pogo-bdd integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pogo_bdd::logging::init_test_logging;
use pogo_bdd::{HarnessConfig, SyntheticTool, TestContext};

/// Defaults with timeouts short enough for failure paths to finish quickly.
pub fn fast_config() -> HarnessConfig {
    HarnessConfig {
        command_timeout_secs: 2,
        health_poll_interval_ms: 50,
        health_timeout_ms: 1_500,
        stop_grace_ms: 500,
        ..HarnessConfig::default()
    }
}

/// A scenario context wired to the synthetic tool.
pub fn synthetic_context() -> TestContext {
    init_test_logging();
    TestContext::new(Arc::new(fast_config())).with_tool(Arc::new(SyntheticTool::new()))
}

/// Writes a small file that passes as an image for the synthetic tool.
pub fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"\x89PNG\r\n\x1a\n").expect("Failed to write test image");
    path
}
