//! HTTP request handlers.
//!
//! - [`test_server`]: runs a probe against a user-supplied endpoint

pub mod test_server;
