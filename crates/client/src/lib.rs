//! TWS-style gateway client adapter.
//!
//! Speaks the gateway's NUL-delimited ASCII field protocol: a version
//! handshake on connect, then typed incoming messages (only the catalog of
//! message type names is surfaced here; full message decoding is out of
//! scope for the verification harnesses this crate serves).

pub mod client;
pub mod protocol;

pub use client::{TwsClient, TwsConfig};
