//! Carbon agent - host carbon footprint monitor
//!
//! Library half of the agent binary, exposing configuration and the HTTP
//! API so both can be exercised from integration tests.

pub mod api;
pub mod config;
