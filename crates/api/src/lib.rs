//! HTTP API: server wiring, identity extraction, and the authorization layer.

pub mod app;
pub mod context;
pub mod middleware;
