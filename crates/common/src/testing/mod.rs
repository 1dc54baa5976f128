//! Testing utilities shared by crate test suites

pub mod async_utils;

pub use async_utils::timeout_ok;
