//! Credential issuer HTTP API
//!
//! Mints short-lived realtime credentials for the browser/console client:
//! - POST /api/session - Exchange the server secret for an ephemeral key
//! - OPTIONS /api/session - CORS pre-flight
//! - GET /health - Health check
//!
//! Every response carries permissive CORS headers.

mod error;
mod handlers;
mod provider;
mod routes;
mod state;

pub use error::{ErrorResponse, IssuerError};
pub use provider::ProviderClient;
pub use routes::create_router;
pub use state::AppState;
