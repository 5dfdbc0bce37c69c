//! Foundational low-level utilities shared across Carson crates.
//!
//! Provides atomic report writes and RFC 3339 timestamp helpers used by the
//! review gate, the review sweep, and their report artifacts.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::{write_json_pretty_atomic, write_text_atomic};
pub use time_utils::{
    current_unix_timestamp_ms, format_rfc3339_seconds, latest_timestamp, parse_rfc3339_utc,
};
