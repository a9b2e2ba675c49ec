//! HTTP surface for Mr. French: chat submission per channel, history and
//! task retrieval, zone get/set, reset, and the analyzer audit log.
//!
//! Everything here is a thin pass-through; the behavior lives in
//! `french-chat` and the stores.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
