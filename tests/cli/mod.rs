//! CLI command integration tests
//!
//! These run the embedscan binary against temp projects, in both output
//! formats (text, json).

pub mod analyze_tests;
pub mod discover_tests;
