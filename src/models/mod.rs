//! Typed views over Jira responses.
//!
//! Most responses are returned as raw JSON documents; only the fixed-shape
//! ones get a model here.

mod server_info;

pub use server_info::*;
