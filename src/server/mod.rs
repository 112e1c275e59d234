//! HTTP server
//!
//! Startup (root, process lock, quota baseline, listener), shared state and
//! the axum router with its browse page.

pub mod core;
pub mod lock;
pub mod page;
pub mod routes;
pub mod state;

pub use self::core::Server;
pub use routes::app;
pub use state::AppState;
