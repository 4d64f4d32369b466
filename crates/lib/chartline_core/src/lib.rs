//! # chartline_core
//!
//! Core domain logic for Chartline: conversation normalization, the chart
//! system prompt, model provider adapters and chart normalization.

pub mod chart;
pub mod conversation;
pub mod prompt;
pub mod provider;
pub mod reply;
pub mod request;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
