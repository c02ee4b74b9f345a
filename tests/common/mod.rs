//! Common test utilities and fixtures for embedscan integration tests
//!
//! This module provides:
//! - `TestRepo` builder for creating project trees in a temp dir
//! - Assertions over CLI output and analysis results

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod test_repo;

pub use assertions::*;
pub use test_repo::TestRepo;
