//! Integration tests for the download pipeline
//!
//! These tests run the full page-to-disk cycle against a simulated image
//! server built on wiremock.

mod common;
mod download_tests;
mod pipeline_tests;
