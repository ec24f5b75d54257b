// Library entry point for proof-server
// Exposes core modules for testing and the binary

pub mod config;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use config::Config;
pub use routes::create_routes;
pub use services::{commitment, pipeline};
pub use state::AppState;
