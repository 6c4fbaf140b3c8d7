//! Hosting layer for the pricing pipeline
//!
//! Configuration loading and the HTTP surface, split from the binary so
//! the router can be exercised in tests.

pub mod api;
pub mod config;
