//! Integration tests for Price-Sweep
//!
//! These tests use wiremock to stand in for retailer sites and run whole retailer sweeps
//! end-to-end, from identifier CSV to database and CSV output.

mod run_tests;
