//! Relaygate - an HTTP gateway with static fallback responses
//!
//! This library provides a small gateway that:
//! - Answers CORS preflight requests directly
//! - Strips platform routing prefixes from inbound paths
//! - Forwards each request once to a configured upstream, bounded by a timeout
//! - Relays successful JSON replies unchanged
//! - Serves canned, route-matched JSON documents when the upstream fails

pub mod config;
pub mod dataset;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;
