//! HTTP surface: health check and WebSocket upgrade

pub mod routes;

pub use routes::{build_router, AppError};
