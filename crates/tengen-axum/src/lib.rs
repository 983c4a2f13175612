//! HTTP facade over the analysis engine.
//!
//! Exposes `POST /analyze` and `GET /health` over a shared
//! [`tengen_core::ports::AnalysisEngine`]. Handlers never talk to the
//! engine process directly; everything goes through the port.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::HttpError;
pub use routes::create_router;
pub use server::start_server;
pub use state::{ApiContext, AppState};
