//! # mcp-tester: Diagnostic Probe Service for MCP and Model Endpoints
//!
//! `mcp-tester` is a small web service that answers one question about a user-supplied HTTP
//! endpoint: is it up, and what does it say when spoken to? A browser form posts a URL (and an
//! optional bearer token) to `/api/test-mcp`; the service probes the endpoint and returns a
//! normalized view of what came back.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! [reqwest](https://github.com/seanmonstar/reqwest) for outbound requests. There is no
//! persistence: every probe lives for the duration of one request.
//!
//! ### Request Flow
//!
//! 1. The handler in [`api::handlers::test_server`] decodes the request body.
//! 2. [`probes::ProbeExecutor`] runs a **connectivity check** (HEAD, falling back to a
//!    time-bounded GET when HEAD fails or is answered with 405). A 5xx answer stops the probe.
//! 3. It then runs a **functionality check**: a POST of a small synthetic prompt, falling back to
//!    one GET when POST fails or is answered with 405.
//! 4. [`probes::classify()`] sniffs the functionality response as HTML, JSON (extracting a version
//!    and capability tags) or opaque text.
//! 5. The outcome becomes a `200` result, a `400` validation error or a `500` failure report.
//!
//! ### Core Components
//!
//! The **probe layer** ([`probes`]) holds the pipeline. Outbound HTTP goes through the
//! [`probes::HttpClient`] trait so the pipeline can be tested against a recording mock.
//!
//! The **API layer** ([`api`]) maps probe outcomes to HTTP responses.
//!
//! **Configuration** ([`config`]) comes from a YAML file and `MCP_TESTER_` environment
//! variables; **telemetry** ([`telemetry`]) sets up `tracing` with optional OTLP export.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use mcp_tester::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = mcp_tester::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     mcp_tester::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod probes;
pub mod telemetry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use config::CorsOrigin;
use probes::{ProbeExecutor, ReqwestHttpClient};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};

/// Shared state handed to every handler.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .executor(executor)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub executor: ProbeExecutor,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors = &config.cors;

    let allow_origin = if cors.allowed_origins.contains(&CorsOrigin::Wildcard) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Browsers send the bare origin, without path or trailing slash
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut layer = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if let Some(max_age) = cors.max_age {
        layer = layer.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(layer)
}

/// Build the application router with all endpoints and middleware.
///
/// - `POST /api/test-mcp`: endpoint probe
/// - `GET /healthz`: liveness
/// - static assets from `static_dir` at every other path, when configured
///
/// # Errors
///
/// Returns an error if the CORS configuration cannot be turned into header values.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors_layer = create_cors_layer(&state.config)?;
    let static_dir = state.config.static_dir.clone();

    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/test-mcp", post(api::handlers::test_server::test_server))
        .with_state(state);

    if let Some(dir) = static_dir {
        debug!("Serving static assets from {}", dir.display());
        router = router.fallback_service(ServeDir::new(dir));
    }

    let router = router.layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_request(DefaultOnRequest::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(cors_layer),
    );

    Ok(router)
}

/// The configured service, ready to serve.
///
/// 1. **Create**: [`Application::new`] builds the HTTP client, probe executor and router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: when the shutdown future resolves, in-flight requests drain and telemetry is flushed
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting MCP tester with configuration: {:#?}", config);

        let client = reqwest::Client::builder().user_agent(config.probe.user_agent.as_str()).build()?;
        let executor = ProbeExecutor::with_settings(Arc::new(ReqwestHttpClient::with_client(client)), config.probe.settings());

        let state = AppState::builder().config(config.clone()).executor(executor).build();
        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "MCP tester listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
