//! Test helper utilities

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use asset_preview::{Frame, Preview, PreviewResult, RequestId};

/// Write `contents` to a config file inside a fresh temp directory
pub fn temp_config(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, contents).expect("Failed to write temp config");
    (temp_dir, path)
}

/// A final still result for cache tests
pub fn still(request: &str, shade: u8) -> PreviewResult {
    PreviewResult::new(
        RequestId::from(request),
        Preview::Image {
            image: Frame::solid(2, 2, [shade, shade, shade, 255]),
            degraded: false,
        },
    )
}
