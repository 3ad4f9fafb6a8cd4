//! API layer for HTTP request handling.
//!
//! - **[`handlers`]**: Axum route handlers
//!
//! # API Structure
//!
//! - `POST /api/test-mcp`: probe an endpoint and report what it returned
//! - `GET /healthz`: liveness
//!
//! Request and response bodies are defined in [`crate::probes::models`].

pub mod handlers;
