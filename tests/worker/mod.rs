//! Worker channel tests

pub mod channel_tests;
