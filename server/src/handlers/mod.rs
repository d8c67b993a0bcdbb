//! HTTP handlers for the todos server.

pub mod assets;
pub mod metrics;
pub mod todos;
