//! API Module
//!
//! HTTP sidecar exposing the offline service to a local front-end. See
//! [`create_router`] for the endpoint list.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
