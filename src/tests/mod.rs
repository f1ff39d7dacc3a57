//! Shared test doubles and end-to-end scenario tests.

mod data_tests;
pub mod support;
