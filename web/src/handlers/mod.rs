//! Reusable request handlers.
//!
//! Handlers take the raw [`Request`](axum::extract::Request) so they can be
//! registered on a [`RequestRouter`](crate::RequestRouter) directly.

pub mod health;
pub mod observers;

pub use health::health_check;
