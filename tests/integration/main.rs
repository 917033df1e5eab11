//! Integration tests for restaurant-finder
//!
//! These tests run the provider clients, the caching layer, the tools and the
//! JSON-RPC server against a mock HTTP upstream.

// Test utilities and common setup
mod common;

mod providers_tests;
mod server_tests;
mod usage_tests;
