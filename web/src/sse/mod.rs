//! SSE HTTP handlers for the web layer.
//!
//! This module contains only the Axum handlers for the event stream endpoints.
//! The broadcast core (Manager, channels, connections, event codec) lives in
//! the `sse` crate.

pub mod handler;
