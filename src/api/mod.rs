//! API Module
//!
//! REST adapter for registering and resolving content, plus health,
//! readiness and metrics endpoints.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
