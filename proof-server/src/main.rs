//! # Confidential Donations - Proof Server
//!
//! Donation badge proof server. Each request runs the Noir badge circuit
//! through the external toolchain and returns Garaga calldata for the
//! on-chain UltraHonk verifier.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: port 3001, circuit at zk-badges/donation_badge
//! cargo run -p proof-server
//!
//! # Custom circuit location and toolchain
//! CIRCUIT_DIR=/srv/badge BB_BIN=/opt/bb/bb cargo run -p proof-server
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Detailed server status
//! - `POST /api/generate-proof` - Generate a badge proof
//! - `POST /api/v1/proof/generate` - Same, versioned path
//! - `POST /api/v1/commitment` - Compute a donation commitment

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use proof_server::{create_routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        circuit_dir = %config.circuit_dir.display(),
        circuit = %config.circuit_name,
        "Starting Confidential Donations Proof Server"
    );

    if !config.circuit_dir.is_dir() {
        warn!(
            circuit_dir = %config.circuit_dir.display(),
            "Circuit directory not found; proof requests will fail until it exists"
        );
    }

    // Create application state
    let state = AppState::new(config.pipeline());

    // Build router
    let app = create_routes(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.socket_addr()?;
    info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build CORS layer from the configured origins
fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if config.cors_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Initialize logging based on configuration
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    }
}
