//! Test utilities for integration testing (available with `test-utils` feature).

use axum_test::TestServer;
use std::sync::Arc;

use crate::probes::{MockHttpClient, ProbeExecutor};
use crate::{AppState, Config};

/// Default configuration; static file serving is off unless a test sets `static_dir`.
pub fn create_test_config() -> Config {
    Config::default()
}

/// Build state whose executor sends every request to `mock`.
pub fn create_test_state(mock: &MockHttpClient) -> AppState {
    let config = create_test_config();
    let executor = ProbeExecutor::with_settings(Arc::new(mock.clone()), config.probe.settings());
    AppState::builder().config(config).executor(executor).build()
}

pub fn create_test_app(mock: &MockHttpClient) -> TestServer {
    let router = crate::build_router(create_test_state(mock)).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}
