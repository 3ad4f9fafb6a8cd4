//! Endpoint probing.
//!
//! A probe checks a user-supplied endpoint in two steps: a connectivity check
//! and a functionality check with a small synthetic payload. The functionality
//! response is then classified as HTML, JSON (with extracted version and
//! capability tags) or opaque text.
//!
//! ## Components
//!
//! - [`http`]: the `HttpClient` seam, its reqwest implementation and a recording mock
//! - [`executor`]: the two-step pipeline and its fallback rules
//! - [`classify`]: pure response-shape heuristics
//! - [`models`]: request, result and outcome types as they appear on the wire

pub mod classify;
pub mod executor;
pub mod http;
pub mod models;

pub use classify::{ResponseShape, classify};
pub use executor::{ProbeExecutor, ProbeSettings};
pub use http::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient, TransportError};
pub use models::{Capability, ProbeOutcome, ProbeRequest, ProbeResult};

#[cfg(any(test, feature = "test-utils"))]
pub use http::{MockCall, MockHttpClient};
