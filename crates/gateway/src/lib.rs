//! HTTP gateway: the platform webhook endpoints, the operator API, and
//! server startup wiring.

pub mod api_routes;
pub mod server;
pub mod webhook_routes;

pub use server::{AppState, assemble_state, build_gateway_app, start_gateway};
