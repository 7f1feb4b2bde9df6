//! Browser UI: upload form, results page and a JSON API, served with axum.
//!
//! Enabled by the `web` feature (on by default).

pub mod page;
pub mod render;
pub mod server;

pub use server::{router, serve, serve_on};
